#![cfg(feature = "web")]

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::datasets::{DatasetDownload, file_extension};
use crate::error::{AppError, AppResult};

/// Stream a stored dataset file back as an attachment
///
/// The file is streamed rather than read into memory. The download keeps
/// the name the user uploaded it under.
///
/// # Arguments
/// * `download` - The opened file and its download name
///
/// # Returns
/// * `AppResult<Response>` - A 200 response with the raw bytes as body
pub fn attachment(download: DatasetDownload) -> AppResult<Response> {
    let content_type = content_type_for(&download.download_name);
    let disposition = content_disposition(&download.download_name);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, download.size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(download.file)))
        .map_err(|e| AppError::Internal(format!("building download response: {e}")))
}

/// MIME type by file extension
///
/// # Examples
/// ```
/// use fluxion::downloader::content_type_for;
///
/// assert_eq!(content_type_for("sales.csv"), "text/csv; charset=utf-8");
/// assert_eq!(content_type_for("notes"), "application/octet-stream");
/// ```
pub fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).map(|ext| ext.to_ascii_lowercase()).as_deref() {
        Some("csv") => "text/csv; charset=utf-8",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_quotes_and_encodes() {
        assert_eq!(
            content_disposition("sales.csv"),
            "attachment; filename=\"sales.csv\"; filename*=UTF-8''sales.csv"
        );
        assert_eq!(
            content_disposition("ventes été.csv"),
            "attachment; filename=\"ventes _t_.csv\"; filename*=UTF-8''ventes%20%C3%A9t%C3%A9.csv"
        );
    }

    #[test]
    fn spreadsheet_types() {
        assert_eq!(
            content_type_for("Q1.XLSX"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(content_type_for("old.xls"), "application/vnd.ms-excel");
    }
}
