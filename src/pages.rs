#![cfg(feature = "web")]

//! Server-rendered HTML pages.
//!
//! Templates are compiled into the binary and registered once at startup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::error::{AppError, AppResult};

const TEMPLATES: [(&str, &str); 6] = [
    ("login", include_str!("./templates/login.hbs")),
    ("signup", include_str!("./templates/signup.hbs")),
    ("profile", include_str!("./templates/profile.hbs")),
    ("change_password", include_str!("./templates/change_password.hbs")),
    ("shared_chart", include_str!("./templates/shared_chart.hbs")),
    ("error", include_str!("./templates/error.hbs")),
];

pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    /// Register every page template
    ///
    /// # Errors
    /// * Returns `AppError::Internal` if a template does not parse
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry
            .register_partial("styles", include_str!("./templates/styles.hbs"))
            .map_err(|e| AppError::Internal(format!("template styles: {e}")))?;
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(|e| AppError::Internal(format!("template {name}: {e}")))?;
        }
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> AppResult<Html<String>> {
        self.registry
            .render(name, data)
            .map(Html)
            .map_err(|e| AppError::Internal(format!("rendering {name}: {e}")))
    }

    /// Render a page with a non-200 status, e.g. a form re-rendered with an error.
    pub fn render_with_status<T: Serialize>(
        &self,
        status: StatusCode,
        name: &str,
        data: &T,
    ) -> AppResult<Response> {
        Ok((status, self.render(name, data)?).into_response())
    }

    /// The error page; falls back to plain text if even that fails to render.
    pub fn error_page(&self, status: StatusCode, error: &str, message: &str) -> Response {
        match self.render("error", &json!({ "error": error, "message": message })) {
            Ok(html) => (status, html).into_response(),
            Err(_) => (status, error.to_string()).into_response(),
        }
    }
}

/// Serialize `value` for embedding inside a `<script>` element.
///
/// `<`, `>` and `&` are written as unicode escapes so that the data can
/// never close the element.
pub fn embed_json<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Public view of a shared chart
///
/// No login is needed. Unknown tokens and charts that are no longer public
/// both get the same 404 page.
pub async fn shared_chart(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let chart = match state.charts.view_public(&token).await {
        Ok(chart) => chart,
        Err(AppError::NotFound(_)) => {
            return state.pages.error_page(
                StatusCode::NOT_FOUND,
                "Chart not found or no longer shared",
                "This chart may have been made private or deleted.",
            );
        }
        Err(e) => return e.into_response(),
    };

    let rendered = embed_json(&chart).and_then(|chart_json| {
        let data: Value = json!({ "chart": chart, "chart_json": chart_json });
        state.pages.render("shared_chart", &data)
    });
    match rendered {
        Ok(html) => html.into_response(),
        Err(e) => e.into_response(),
    }
}
