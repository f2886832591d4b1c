//! Chart registry: saved chart definitions and public sharing.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sqlx::{SqlitePool, types::Json};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

use crate::access::ensure_owner;
use crate::datasets::DatasetRegistry;
use crate::error::{AppError, AppResult};
use crate::models::{Chart, ChartConfig, ChartView, DEFAULT_CHART_TITLE};

/// Random bytes behind every share token.
pub const SHARE_TOKEN_BYTES: usize = 32;

/// Longest accepted chart title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

const CHART_COLUMNS: &str = "id, title, chart_type, config, created_at, updated_at, is_public,
    share_token, user_id, dataset_id";

/// Kinds of chart the dashboard can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Scatter,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [ChartType::Bar, ChartType::Line, ChartType::Pie, ChartType::Scatter];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Invalid chart type '{s}'. Choose one of: bar, line, pie, scatter."
                ))
            })
    }
}

/// Body of a save-chart request
///
/// The configuration fields sit next to the title and type in the same
/// object, e.g. `{"title": "Sales", "chart_type": "bar", "dataset_id": 3,
/// "x_axis": "region", "y_axis": "amount"}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<i64>,
    #[serde(flatten)]
    pub config: ChartConfig,
}

/// Generate a fresh share token: 32 random bytes, URL-safe base64.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone)]
pub struct ChartRegistry {
    pool: SqlitePool,
    datasets: DatasetRegistry,
}

impl ChartRegistry {
    pub fn new(pool: SqlitePool, datasets: DatasetRegistry) -> Self {
        Self { pool, datasets }
    }

    /// Save a new chart
    ///
    /// A blank title becomes "Untitled Chart" and a missing type becomes
    /// `bar`. The referenced dataset must belong to the same owner.
    ///
    /// # Arguments
    /// * `draft` - Title, type, dataset id and configuration
    /// * `owner_id` - Id of the saving user
    ///
    /// # Returns
    /// * `AppResult<Chart>` - The stored chart with its id and timestamps
    ///
    /// # Errors
    /// * `Validation` - unknown chart type, overlong title, no dataset id
    /// * `NotFound` - the dataset does not exist
    /// * `Forbidden` - the dataset belongs to another user
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: ChartDraft, owner_id: i64) -> AppResult<Chart> {
        let title = match draft.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => DEFAULT_CHART_TITLE.to_string(),
        };
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation(format!(
                "Chart title must be at most {MAX_TITLE_LEN} characters long."
            )));
        }

        let chart_type = match draft.chart_type.as_deref().map(str::trim) {
            Some(kind) if !kind.is_empty() => kind.parse()?,
            _ => ChartType::default(),
        };

        let dataset_id = draft
            .dataset_id
            .ok_or_else(|| AppError::validation("A dataset is required to save a chart."))?;
        self.datasets.fetch_owned(dataset_id, owner_id).await?;

        let now = Utc::now().naive_utc();
        let chart = sqlx::query_as::<_, Chart>(&format!(
            r#"
            INSERT INTO chart (title, chart_type, config, created_at, updated_at, is_public,
                share_token, user_id, dataset_id)
            VALUES (?, ?, ?, ?, ?, 0, NULL, ?, ?)
            RETURNING {CHART_COLUMNS}
            "#
        ))
        .bind(&title)
        .bind(chart_type.as_str())
        .bind(Json(&draft.config))
        .bind(now)
        .bind(now)
        .bind(owner_id)
        .bind(dataset_id)
        .fetch_one(&self.pool)
        .await?;

        info!(chart_id = chart.id, %chart_type, dataset_id, "chart saved");
        Ok(chart)
    }

    async fn find(&self, chart_id: i64) -> AppResult<Option<Chart>> {
        let chart = sqlx::query_as::<_, Chart>(&format!(
            "SELECT {CHART_COLUMNS} FROM chart WHERE id = ?"
        ))
        .bind(chart_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(chart)
    }

    /// Load a chart row on behalf of `user_id` (`NotFound` / `Forbidden`).
    pub async fn fetch_owned(&self, chart_id: i64, user_id: i64) -> AppResult<Chart> {
        let chart = self
            .find(chart_id)
            .await?
            .ok_or(AppError::NotFound("Chart"))?;
        ensure_owner(&chart, user_id)?;
        Ok(chart)
    }

    /// Owned chart with its dataset embedded (`None` if the dataset is gone).
    pub async fn fetch(&self, chart_id: i64, user_id: i64) -> AppResult<ChartView> {
        let chart = self.fetch_owned(chart_id, user_id).await?;
        let dataset = self.datasets.find(chart.dataset_id).await?;
        Ok(chart.to_view(dataset.as_ref()))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, chart_id: i64, user_id: i64) -> AppResult<()> {
        let chart = self.fetch_owned(chart_id, user_id).await?;

        sqlx::query("DELETE FROM chart WHERE id = ?")
            .bind(chart.id)
            .execute(&self.pool)
            .await?;

        info!(chart_id, "chart deleted");
        Ok(())
    }

    /// Make a chart public and return its share token
    ///
    /// The token is generated on the first call only; later calls, including
    /// after an unshare, hand back the same token.
    #[instrument(skip(self))]
    pub async fn share(&self, chart_id: i64, owner_id: i64) -> AppResult<String> {
        let chart = self.fetch_owned(chart_id, owner_id).await?;

        let token: String = sqlx::query_scalar(
            "UPDATE chart
             SET share_token = COALESCE(share_token, ?), is_public = 1, updated_at = ?
             WHERE id = ?
             RETURNING share_token",
        )
        .bind(generate_share_token())
        .bind(Utc::now().naive_utc())
        .bind(chart.id)
        .fetch_one(&self.pool)
        .await?;

        info!(chart_id, first_share = chart.share_token.is_none(), "chart shared");
        Ok(token)
    }

    /// Make a chart private again. The token is kept for a later re-share.
    #[instrument(skip(self))]
    pub async fn unshare(&self, chart_id: i64, owner_id: i64) -> AppResult<()> {
        let chart = self.fetch_owned(chart_id, owner_id).await?;

        sqlx::query("UPDATE chart SET is_public = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().naive_utc())
            .bind(chart.id)
            .execute(&self.pool)
            .await?;

        info!(chart_id, "chart unshared");
        Ok(())
    }

    /// Public view of a shared chart, no authentication involved
    ///
    /// # Errors
    /// * `NotFound` - unless a chart carries exactly this token *and* is
    ///   currently public
    pub async fn view_public(&self, share_token: &str) -> AppResult<ChartView> {
        let chart = sqlx::query_as::<_, Chart>(&format!(
            "SELECT {CHART_COLUMNS} FROM chart WHERE share_token = ? AND is_public = 1"
        ))
        .bind(share_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Chart"))?;

        let dataset = self.datasets.find(chart.dataset_id).await?;
        Ok(chart.to_view(dataset.as_ref()))
    }

    /// The owner's charts, newest first.
    pub async fn list(&self, owner_id: i64) -> AppResult<Vec<Chart>> {
        let charts = sqlx::query_as::<_, Chart>(&format!(
            "SELECT {CHART_COLUMNS} FROM chart WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(charts)
    }
}
