//! Rows of the `user`, `dataset` and `chart` tables and their JSON views.
//!
//! The four document-shaped columns (`column_names`, `data_types`,
//! `preview_data`, `config`) are plain TEXT in the schema and are read and
//! written through [`sqlx::types::Json`], so the stored text is always the
//! JSON document described here:
//!
//! - `column_names`: `["region", "amount"]`
//! - `data_types`: `{"region": "text", "amount": "integer"}`
//! - `preview_data`: `[{"region": "east", "amount": 100}, ...]`
//! - `config`: `{"x_axis": ..., "y_axis": ..., "value_column": ...,
//!   "label_column": ..., "color_scheme": "default", "chart_options": {}}`

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};

/// One preview row: column name → cell value, in column order.
pub type PreviewRow = IndexMap<String, Value>;

/// Column name → inferred type label, in column order.
pub type ColumnTypes = IndexMap<String, String>;

/// Default title applied to charts saved without one.
pub const DEFAULT_CHART_TITLE: &str = "Untitled Chart";

/// Default colour scheme stored in a chart configuration.
pub const DEFAULT_COLOR_SCHEME: &str = "default";

/// Registered account
///
/// The password hash never leaves the process: it is skipped when the user
/// is serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
}

/// Snapshot of one uploaded tabular file
#[derive(Debug, Clone, FromRow)]
pub struct Dataset {
    pub id: i64,
    /// Storage-unique name of the raw file in the content store
    pub filename: String,
    /// Name shown to the user and used as the download name
    pub original_filename: String,
    pub file_size: i64,
    pub rows: i64,
    pub columns: i64,
    pub column_names: Json<Vec<String>>,
    pub data_types: Json<ColumnTypes>,
    pub preview_data: Json<Vec<PreviewRow>>,
    pub upload_date: NaiveDateTime,
    pub user_id: i64,
}

/// Client-facing serialization of a [`Dataset`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetView {
    pub id: i64,
    pub filename: String,
    pub file_size: i64,
    pub rows: i64,
    pub columns: i64,
    pub column_names: Vec<String>,
    pub data_types: ColumnTypes,
    pub preview: Vec<PreviewRow>,
    pub upload_date: NaiveDateTime,
}

impl Dataset {
    pub fn to_view(&self) -> DatasetView {
        DatasetView {
            id: self.id,
            filename: self.original_filename.clone(),
            file_size: self.file_size,
            rows: self.rows,
            columns: self.columns,
            column_names: self.column_names.0.clone(),
            data_types: self.data_types.0.clone(),
            preview: self.preview_data.0.clone(),
            upload_date: self.upload_date,
        }
    }
}

/// Stored chart configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartConfig {
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub value_column: Option<String>,
    #[serde(default)]
    pub label_column: Option<String>,
    #[serde(default = "default_color_scheme", deserialize_with = "color_scheme_or_default")]
    pub color_scheme: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chart_options: IndexMap<String, Value>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            x_axis: None,
            y_axis: None,
            value_column: None,
            label_column: None,
            color_scheme: default_color_scheme(),
            chart_options: IndexMap::new(),
        }
    }
}

fn default_color_scheme() -> String {
    DEFAULT_COLOR_SCHEME.to_string()
}

fn color_scheme_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_color_scheme))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Saved visualization definition
#[derive(Debug, Clone, FromRow)]
pub struct Chart {
    pub id: i64,
    pub title: String,
    /// Stored as free text so rows written before type validation still load
    pub chart_type: String,
    pub config: Json<ChartConfig>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub user_id: i64,
    pub dataset_id: i64,
}

/// Client-facing serialization of a [`Chart`] with its dataset embedded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartView {
    pub id: i64,
    pub title: String,
    pub chart_type: String,
    pub config: ChartConfig,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub dataset: Option<DatasetView>,
}

/// Chart listing entry (no embedded dataset)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSummary {
    pub id: i64,
    pub title: String,
    pub chart_type: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub dataset_id: i64,
}

impl Chart {
    pub fn to_view(&self, dataset: Option<&Dataset>) -> ChartView {
        ChartView {
            id: self.id,
            title: self.title.clone(),
            chart_type: self.chart_type.clone(),
            config: self.config.0.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_public: self.is_public,
            share_token: self.share_token.clone(),
            dataset: dataset.map(Dataset::to_view),
        }
    }

    pub fn to_summary(&self) -> ChartSummary {
        ChartSummary {
            id: self.id,
            title: self.title.clone(),
            chart_type: self.chart_type.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_public: self.is_public,
            share_token: self.share_token.clone(),
            dataset_id: self.dataset_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: ChartConfig = serde_json::from_value(json!({ "x_axis": "region" })).unwrap();
        assert_eq!(config.x_axis.as_deref(), Some("region"));
        assert_eq!(config.color_scheme, "default");
        assert!(config.chart_options.is_empty());
    }

    #[test]
    fn config_accepts_nulls_written_by_older_rows() {
        let stored = json!({
            "x_axis": null,
            "y_axis": "amount",
            "value_column": null,
            "label_column": null,
            "color_scheme": null,
            "chart_options": null
        });
        let config: ChartConfig = serde_json::from_value(stored).unwrap();
        assert_eq!(config.color_scheme, "default");
        assert!(config.chart_options.is_empty());
    }

    #[test]
    fn config_serializes_every_documented_key() {
        let value = serde_json::to_value(ChartConfig::default()).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "x_axis",
                "y_axis",
                "value_column",
                "label_column",
                "color_scheme",
                "chart_options"
            ]
        );
        assert_eq!(object["x_axis"], Value::Null);
    }

    #[test]
    fn user_serialization_skips_the_hash() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            full_name: None,
            created_at: chrono::Utc::now().naive_utc(),
            is_active: true,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["username"], "alice");
    }
}
