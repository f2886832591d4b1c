#![cfg(feature = "web")]

//! JSON endpoints behind the dashboard.
//!
//! Every handler here takes a [`CurrentUser`], so anonymous calls are turned
//! away with a 401 before any registry is touched. Ownership of the targeted
//! dataset or chart is then checked by the registry itself.

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::access::CurrentUser;
use crate::app::AppState;
use crate::charts::ChartDraft;
use crate::config::Config;
use crate::datasets::UploadedFile;
use crate::downloader;
use crate::error::{AppError, AppResult};

/// Entries shown in the dashboard's recent activity list.
pub const RECENT_ACTIVITY_ITEMS: i64 = 5;

/// Name of the multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let recent = state
        .datasets
        .list_recent(user.id, RECENT_ACTIVITY_ITEMS)
        .await?;

    let recent_activity: Vec<Value> = recent
        .iter()
        .map(|dataset| {
            json!({
                "id": dataset.id,
                "icon": "📁",
                "text": format!("Uploaded \"{}\"", dataset.original_filename),
                "time": dataset.upload_date.format("%B %d, %Y at %I:%M %p").to_string(),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "user": user,
        "recent_activity": recent_activity,
    })))
}

pub async fn list_datasets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let datasets: Vec<_> = state
        .datasets
        .list(user.id)
        .await?
        .iter()
        .map(|dataset| dataset.to_view())
        .collect();

    Ok(Json(json!({ "success": true, "datasets": datasets })))
}

/// Handle a dataset upload
///
/// Reads the `file` field of a multipart body and hands it to the dataset
/// registry. Bodies over the configured limit are rejected with 413 while
/// still being read.
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let limit = state.config.uploads.max_bytes;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        file = Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let dataset = state.datasets.ingest(file, user.id).await?;
    Ok(Json(json!({ "success": true, "data": dataset.to_view() })))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::validation(err.body_text())
    }
}

pub async fn download_dataset(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(dataset_id): Path<i64>,
) -> AppResult<Response> {
    let download = state.datasets.export(dataset_id, user.id).await?;
    downloader::attachment(download)
}

pub async fn delete_dataset(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(dataset_id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.datasets.delete(dataset_id, user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Dataset deleted successfully!",
    })))
}

pub async fn save_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ChartDraft>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(draft) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let chart = state.charts.create(draft, user.id).await?;

    Ok(Json(json!({
        "success": true,
        "chart_id": chart.id,
        "message": "Chart saved successfully!",
    })))
}

pub async fn list_charts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let charts: Vec<_> = state
        .charts
        .list(user.id)
        .await?
        .iter()
        .map(|chart| chart.to_summary())
        .collect();

    Ok(Json(json!({ "success": true, "charts": charts })))
}

pub async fn get_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chart_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let chart = state.charts.fetch(chart_id, user.id).await?;
    Ok(Json(json!({ "success": true, "chart": chart })))
}

pub async fn delete_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chart_id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.charts.delete(chart_id, user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Chart deleted successfully!",
    })))
}

pub async fn share_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chart_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let token = state.charts.share(chart_id, user.id).await?;
    let share_url = share_url(&state.config, &headers, &token);

    Ok(Json(json!({
        "success": true,
        "share_url": share_url,
        "share_token": token,
    })))
}

pub async fn unshare_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chart_id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.charts.unshare(chart_id, user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Chart is now private",
    })))
}

/// Absolute link to the public view of a shared chart
///
/// Uses `PUBLIC_BASE_URL` when configured, otherwise the scheme and host the
/// request arrived with.
pub fn share_url(config: &Config, headers: &HeaderMap, token: &str) -> String {
    let base = match &config.public_base_url {
        Some(base) => base.clone(),
        None => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("http");
            let host = headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("localhost");
            format!("{scheme}://{host}")
        }
    };
    format!("{base}/shared/{token}")
}

pub async fn health(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Json(json!({ "status": "ok", "database": "ok" })).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
                .into_response()
        }
    }
}
