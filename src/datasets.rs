use chrono::{NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::{SqlitePool, types::Json};
use tokio::fs::File;
use tracing::{info, instrument, warn};
use unicode_normalization::UnicodeNormalization;

use crate::access::ensure_owner;
use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};
use crate::loader::{self, FileKind, PREVIEW_ROWS};
use crate::models::Dataset;
use crate::storage::FileStore;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
}

/// Longest sanitized client name, in bytes. The stored name adds at most
/// 48 bytes of owner id, timestamp and counter, staying under `NAME_MAX`.
pub const MAX_FILENAME_LEN: usize = 200;

const DATASET_COLUMNS: &str = r#"id, filename, original_filename, file_size, "rows", columns,
    column_names, data_types, preview_data, upload_date, user_id"#;

/// A file received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name supplied by the client, possibly empty
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An opened stored file ready to be sent back to its owner
#[derive(Debug)]
pub struct DatasetDownload {
    pub file: File,
    pub download_name: String,
    pub size: i64,
}

/// Uploaded datasets, scoped by owner
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    pool: SqlitePool,
    store: FileStore,
    uploads: UploadConfig,
}

impl DatasetRegistry {
    pub fn new(pool: SqlitePool, store: FileStore, uploads: UploadConfig) -> Self {
        Self {
            pool,
            store,
            uploads,
        }
    }

    /// Store and parse an uploaded file, then record it as a dataset
    ///
    /// The raw bytes are written to the content store under
    /// `{owner_id}_{YYYYMMDD_HHMMSS}_{sanitized name}`, parsed, and summarised
    /// into a dataset row. A failure after the file was written removes it
    /// again, so a rejected upload leaves nothing behind.
    ///
    /// # Arguments
    /// * `file` - The uploaded file, `None` when the request carried none
    /// * `owner_id` - Id of the uploading user
    ///
    /// # Returns
    /// * `AppResult<Dataset>` - The inserted dataset
    ///
    /// # Errors
    /// * `NoFileProvided` - no file, or an empty file name
    /// * `UnsupportedFileType` - extension other than csv / xlsx / xls
    /// * `PayloadTooLarge` - more bytes than the configured limit
    /// * `Parse` - the contents could not be read as a table
    #[instrument(skip(self, file), fields(filename))]
    pub async fn ingest(&self, file: Option<UploadedFile>, owner_id: i64) -> AppResult<Dataset> {
        let file = match file {
            Some(file) if !file.filename.is_empty() => file,
            _ => return Err(AppError::NoFileProvided),
        };
        tracing::Span::current().record("filename", file.filename.as_str());

        let extension = file_extension(&file.filename)
            .filter(|ext| self.uploads.is_allowed(ext))
            .ok_or_else(|| AppError::UnsupportedFileType(file.filename.clone()))?;
        let kind = FileKind::from_extension(&extension)
            .ok_or_else(|| AppError::UnsupportedFileType(file.filename.clone()))?;

        if file.bytes.len() > self.uploads.max_bytes {
            return Err(AppError::PayloadTooLarge(self.uploads.max_bytes));
        }

        let sanitized = truncate_filename(&secure_filename(&file.filename), MAX_FILENAME_LEN);
        let original_filename = match sanitized {
            name if file_extension(&name).is_some_and(|ext| ext.eq_ignore_ascii_case(&extension)) => {
                name
            }
            _ => format!("upload.{}", extension.to_ascii_lowercase()),
        };

        let uploaded_at = Utc::now().naive_utc();
        let stored_name = self
            .store_unique(owner_id, uploaded_at, &original_filename, &file.bytes)
            .await?;

        match self
            .record(&stored_name, &original_filename, &file.bytes, kind, uploaded_at, owner_id)
            .await
        {
            Ok(dataset) => {
                info!(
                    dataset_id = dataset.id,
                    rows = dataset.rows,
                    columns = dataset.columns,
                    "dataset ingested"
                );
                Ok(dataset)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.remove(&stored_name).await {
                    warn!(error = ?cleanup, "failed to remove rejected upload");
                }
                Err(e)
            }
        }
    }

    async fn store_unique(
        &self,
        owner_id: i64,
        uploaded_at: NaiveDateTime,
        name: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        self.store.ensure_root().await?;

        let stamp = uploaded_at.format("%Y%m%d_%H%M%S");
        let mut candidate = format!("{owner_id}_{stamp}_{name}");
        let mut attempt = 1;
        while !self.store.put_new(&candidate, bytes).await? {
            // Same user, same second, same name.
            attempt += 1;
            candidate = format!("{owner_id}_{stamp}_{attempt}_{name}");
        }
        Ok(candidate)
    }

    async fn record(
        &self,
        stored_name: &str,
        original_filename: &str,
        bytes: &[u8],
        kind: FileKind,
        uploaded_at: NaiveDateTime,
        owner_id: i64,
    ) -> AppResult<Dataset> {
        let table = loader::load_table(bytes, kind)?;

        let dataset = sqlx::query_as::<_, Dataset>(&format!(
            r#"
            INSERT INTO dataset (filename, original_filename, file_size, "rows", columns,
                column_names, data_types, preview_data, upload_date, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {DATASET_COLUMNS}
            "#
        ))
        .bind(stored_name)
        .bind(original_filename)
        .bind(bytes.len() as i64)
        .bind(table.row_count() as i64)
        .bind(table.column_count() as i64)
        .bind(Json(&table.columns))
        .bind(Json(table.data_types()))
        .bind(Json(table.preview(PREVIEW_ROWS)))
        .bind(uploaded_at)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(dataset)
    }

    /// Look a dataset up by id regardless of owner.
    pub async fn find(&self, dataset_id: i64) -> AppResult<Option<Dataset>> {
        let dataset = sqlx::query_as::<_, Dataset>(&format!(
            "SELECT {DATASET_COLUMNS} FROM dataset WHERE id = ?"
        ))
        .bind(dataset_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dataset)
    }

    /// Fetch a dataset on behalf of `user_id`
    ///
    /// # Errors
    /// * `NotFound` - no dataset with that id
    /// * `Forbidden` - the dataset belongs to someone else
    pub async fn fetch_owned(&self, dataset_id: i64, user_id: i64) -> AppResult<Dataset> {
        let dataset = self
            .find(dataset_id)
            .await?
            .ok_or(AppError::NotFound("Dataset"))?;
        ensure_owner(&dataset, user_id)?;
        Ok(dataset)
    }

    /// Open the stored raw file of an owned dataset for download
    ///
    /// # Errors
    /// * `NotFound` / `Forbidden` - as for [`DatasetRegistry::fetch_owned`]
    /// * `FileMissing` - the row exists but the stored file is gone
    #[instrument(skip(self))]
    pub async fn export(&self, dataset_id: i64, user_id: i64) -> AppResult<DatasetDownload> {
        let dataset = self.fetch_owned(dataset_id, user_id).await?;

        let file = match self.store.open(&dataset.filename).await? {
            Some(file) => file,
            None => {
                warn!(stored = %dataset.filename, "dataset file missing from store");
                return Err(AppError::FileMissing);
            }
        };

        Ok(DatasetDownload {
            file,
            download_name: dataset.original_filename,
            size: dataset.file_size,
        })
    }

    /// The owner's datasets, newest first.
    pub async fn list_recent(&self, user_id: i64, limit: i64) -> AppResult<Vec<Dataset>> {
        let datasets = sqlx::query_as::<_, Dataset>(&format!(
            "SELECT {DATASET_COLUMNS} FROM dataset WHERE user_id = ?
             ORDER BY upload_date DESC, id DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(datasets)
    }

    /// All of the owner's datasets, newest first.
    pub async fn list(&self, user_id: i64) -> AppResult<Vec<Dataset>> {
        // A negative LIMIT means no limit in SQLite.
        self.list_recent(user_id, -1).await
    }

    /// Delete an owned dataset, its charts (by cascade) and its stored file.
    #[instrument(skip(self))]
    pub async fn delete(&self, dataset_id: i64, user_id: i64) -> AppResult<()> {
        let dataset = self.fetch_owned(dataset_id, user_id).await?;

        sqlx::query("DELETE FROM dataset WHERE id = ?")
            .bind(dataset.id)
            .execute(&self.pool)
            .await?;

        self.store.remove(&dataset.filename).await?;
        info!(dataset_id, "dataset deleted");
        Ok(())
    }
}

/// Extension after the last dot, if the name has one.
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .filter(|ext| !ext.is_empty())
}

/// Reduce a client-supplied file name to a safe, flat ASCII name
///
/// The name is NFKD-normalized so accented letters keep their base letter.
/// Path separators become spaces, whitespace runs become `_`, every
/// character outside `[A-Za-z0-9_.-]` is dropped and leading or trailing
/// dots and underscores are trimmed. The result may be empty.
///
/// # Examples
/// ```
/// use fluxion::datasets::secure_filename;
///
/// assert_eq!(secure_filename("My cool data.csv"), "My_cool_data.csv");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("rapport é.csv"), "rapport_e.csv");
/// ```
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    UNSAFE_FILENAME_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Shorten a sanitized name to at most `max` bytes, keeping its extension.
///
/// Expects the ASCII output of [`secure_filename`].
pub fn truncate_filename(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    let keep = max.saturating_sub(extension.len()).min(stem.len());
    let stem = stem[..keep].trim_end_matches(|c| c == '.' || c == '_');
    format!("{stem}{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filename_strips_traversal_and_unsafe_chars() {
        assert_eq!(secure_filename("sales.csv"), "sales.csv");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\data.xlsx"), "C_Users_me_data.xlsx");
        assert_eq!(secure_filename("rapport é$%.csv"), "rapport_e.csv");
        assert_eq!(secure_filename("Ångström ﬁle.csv"), "Angstrom_file.csv");
        assert_eq!(secure_filename("日本.csv"), "csv");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn long_names_are_cut_before_the_extension() {
        let name = format!("{}.xlsx", "a".repeat(300));
        let cut = truncate_filename(&name, MAX_FILENAME_LEN);
        assert_eq!(cut.len(), MAX_FILENAME_LEN);
        assert!(cut.ends_with("a.xlsx"));

        assert_eq!(truncate_filename("short.csv", MAX_FILENAME_LEN), "short.csv");
        assert_eq!(truncate_filename("abc_____defgh.csv", 12), "abc.csv");
        assert_eq!(truncate_filename("abcdefghij", 4), "abcd");
    }

    #[test]
    fn extension_is_taken_after_the_last_dot() {
        assert_eq!(file_extension("a.tar.csv").as_deref(), Some("csv"));
        assert_eq!(file_extension("REPORT.XLSX").as_deref(), Some("XLSX"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}
