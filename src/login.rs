#![cfg(feature = "web")]

//! Login, sign-up, logout and account pages.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::access::{CurrentUser, PageUser, SESSION_COOKIE, safe_next, session_cookie};
use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::users::{PasswordChange, ProfileUpdate, Signup};

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Checkbox value, present only when ticked
    #[serde(default)]
    pub remember: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub registered: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub updated: Option<String>,
}

/// Landing page: signed-in users go to the dashboard, everyone else logs in.
pub async fn landing(user: Option<CurrentUser>) -> Redirect {
    match user {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

/// Serve the login page
///
/// # Arguments
/// * `query` - Optional `next` target and the `registered` marker set after sign-up
pub async fn login_page(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let notice = query
        .registered
        .as_ref()
        .map(|_| "Registration successful! Please log in.");
    let html = state.pages.render(
        "login",
        &json!({ "next": safe_next(query.next.as_deref()), "notice": notice }),
    )?;
    Ok(html.into_response())
}

/// Handle login form submission
///
/// On success a session row is created, its id is stored in the signed
/// cookie and the browser is sent on to `next` (local paths only) or the
/// dashboard.
///
/// # Arguments
/// * `jar` - Signed cookie jar receiving the session cookie
/// * `form` - Username, password, remember-me flag and `next`
///
/// # Returns
/// * `AppResult<Response>` - Redirect on success, the login page with an
///   error otherwise
pub async fn handle_login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let next = safe_next(form.next.as_deref()).map(str::to_string);

    let Some(user) = state.users.authenticate(&form.username, &form.password).await? else {
        warn!(username = %form.username, "failed login");
        return state.pages.render_with_status(
            StatusCode::UNAUTHORIZED,
            "login",
            &json!({
                "error": "Invalid username or password",
                "username": form.username,
                "next": next,
            }),
        );
    };

    let session = &state.config.session;
    let lifetime = if form.remember.is_some() {
        Duration::days(session.remember_days)
    } else {
        Duration::hours(session.ttl_hours)
    };
    let session_id = state.sessions.create(user.id, lifetime).await?;
    info!(user_id = user.id, remember = form.remember.is_some(), "user logged in");

    let jar = jar.add(session_cookie(session_id, lifetime.num_seconds()));
    let target = next.unwrap_or_else(|| "/dashboard".to_string());
    Ok((jar, Redirect::to(&target)).into_response())
}

pub async fn signup_page(State(state): State<AppState>) -> AppResult<Response> {
    Ok(state.pages.render("signup", &json!({}))?.into_response())
}

/// Handle sign-up form submission
///
/// Validation problems re-render the form, keeping what was typed except
/// the passwords.
pub async fn handle_signup(
    State(state): State<AppState>,
    Form(signup): Form<Signup>,
) -> AppResult<Response> {
    let echo = json!({
        "username": signup.username,
        "email": signup.email,
        "full_name": signup.full_name,
    });

    match state.users.register(signup).await {
        Ok(_) => Ok(Redirect::to("/login?registered=1").into_response()),
        Err(AppError::Validation(message)) => {
            let mut data = echo;
            data["error"] = json!(message);
            state
                .pages
                .render_with_status(StatusCode::BAD_REQUEST, "signup", &data)
        }
        Err(e) => Err(e),
    }
}

/// Handle logout
///
/// Destroys the session row and the cookie, whether or not the session was
/// still valid.
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(cookie.value()).await {
            warn!(error = ?e, "could not remove session row on logout");
        }
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

pub async fn profile_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Query(query): Query<ProfileQuery>,
) -> AppResult<Response> {
    let profile = state.users.profile(user.id).await?;
    let notice = match query.updated.as_deref() {
        Some("password") => Some("Password changed successfully!"),
        Some(_) => Some("Profile updated successfully!"),
        None => None,
    };

    Ok(state
        .pages
        .render("profile", &json!({ "profile": profile, "notice": notice }))?
        .into_response())
}

/// Handle the profile edit form (email and full name).
pub async fn handle_profile(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(update): Form<ProfileUpdate>,
) -> AppResult<Response> {
    match state.users.update_profile(user.id, update).await {
        Ok(_) => Ok(Redirect::to("/profile?updated=profile").into_response()),
        Err(AppError::Validation(message)) => {
            let profile = state.users.profile(user.id).await?;
            state.pages.render_with_status(
                StatusCode::BAD_REQUEST,
                "profile",
                &json!({ "profile": profile, "error": message }),
            )
        }
        Err(e) => Err(e),
    }
}

pub async fn change_password_page(
    State(state): State<AppState>,
    PageUser(_): PageUser,
) -> AppResult<Response> {
    Ok(state.pages.render("change_password", &json!({}))?.into_response())
}

pub async fn handle_change_password(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(change): Form<PasswordChange>,
) -> AppResult<Response> {
    match state.users.change_password(user.id, change).await {
        Ok(()) => Ok(Redirect::to("/profile?updated=password").into_response()),
        Err(AppError::Validation(message)) => state.pages.render_with_status(
            StatusCode::BAD_REQUEST,
            "change_password",
            &json!({ "error": message }),
        ),
        Err(e) => Err(e),
    }
}
