//! Access gate: ownership predicate, server-side sessions and, with the `web`
//! feature, the request extractors that resolve the signed session cookie.
//!
//! Authentication happens here; authorization does not. The gate only knows
//! *who* is calling. Whether that caller may touch a dataset or chart is
//! decided by the registries through [`ensure_owner`], after they have
//! loaded the resource.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Chart, Dataset, User};

/// A resource that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Dataset {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Chart {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// True when `user_id` owns `resource`.
pub fn is_owner<R: Owned + ?Sized>(resource: &R, user_id: i64) -> bool {
    resource.owner_id() == user_id
}

/// `Forbidden` unless `user_id` owns `resource`.
pub fn ensure_owner<R: Owned + ?Sized>(resource: &R, user_id: i64) -> AppResult<()> {
    if is_owner(resource, user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Server-side login sessions
///
/// The cookie only carries the random session id; the row maps it to a user
/// and an expiry time.
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session
    ///
    /// Expired sessions of every user are purged first.
    ///
    /// # Arguments
    /// * `user_id` - The user to create a session for
    /// * `lifetime` - How long the session stays valid
    ///
    /// # Returns
    /// * `AppResult<String>` - A unique session ID
    pub async fn create(&self, user_id: i64, lifetime: Duration) -> AppResult<String> {
        let now = Utc::now().naive_utc();

        let purged = sqlx::query("DELETE FROM session WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            debug!(purged, "removed expired sessions");
        }

        let session_id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO session (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(&session_id)
            .bind(user_id)
            .bind(now)
            .bind(now + lifetime)
            .execute(&self.pool)
            .await?;

        Ok(session_id)
    }

    /// Validate a session
    ///
    /// # Returns
    /// * `AppResult<Option<User>>` - The active user behind an unexpired
    ///   session, `None` otherwise
    pub async fn resolve(&self, session_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.full_name,
                   u.created_at, u.is_active
            FROM session s
            JOIN "user" u ON u.id = s.user_id
            WHERE s.id = ? AND s.expires_at > ? AND u.is_active = 1
            "#,
        )
        .bind(session_id)
        .bind(Utc::now().naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Remove a session; unknown ids are ignored.
    pub async fn destroy(&self, session_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Accept a post-login redirect target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| path.starts_with('/') && !path.starts_with("//") && !path.contains('\\'))
}

#[cfg(feature = "web")]
pub use gate::*;

#[cfg(feature = "web")]
mod gate {
    use axum::{
        extract::{FromRequestParts, Request, State},
        http::request::Parts,
        middleware::Next,
        response::{IntoResponse, Redirect, Response},
    };
    use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};

    use crate::app::AppState;
    use crate::error::AppError;
    use crate::models::User;

    /// Name of the signed cookie holding the session id.
    pub const SESSION_COOKIE: &str = "fluxion_session";

    /// The authenticated caller of a request
    #[derive(Debug, Clone)]
    pub struct CurrentUser(pub User);

    /// Like [`CurrentUser`], but anonymous callers are sent to the login page
    #[derive(Debug, Clone)]
    pub struct PageUser(pub User);

    /// Build the session cookie
    ///
    /// # Arguments
    /// * `session_id` - Id returned by [`super::SessionStore::create`]
    /// * `max_age_secs` - Browser-side lifetime, matching the session row
    pub fn session_cookie(session_id: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, session_id))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }

    /// Session resolution middleware
    ///
    /// Looks up the signed session cookie and, when it names a live session,
    /// stores the [`CurrentUser`] in the request extensions. Never rejects:
    /// the extractors decide whether a route needs a user.
    pub async fn resolve_session(
        State(state): State<AppState>,
        jar: SignedCookieJar,
        mut request: Request,
        next: Next,
    ) -> Response {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            match state.sessions.resolve(cookie.value()).await {
                Ok(Some(user)) => {
                    request.extensions_mut().insert(CurrentUser(user));
                }
                Ok(None) => {}
                Err(e) => return e.into_response(),
            }
        }

        next.run(request).await
    }

    #[axum::async_trait]
    impl<S> FromRequestParts<S> for CurrentUser
    where
        S: Send + Sync,
    {
        type Rejection = AppError;

        async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
            parts
                .extensions
                .get::<CurrentUser>()
                .cloned()
                .ok_or(AppError::Unauthenticated)
        }
    }

    #[axum::async_trait]
    impl<S> FromRequestParts<S> for PageUser
    where
        S: Send + Sync,
    {
        type Rejection = Redirect;

        async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
            match parts.extensions.get::<CurrentUser>() {
                Some(CurrentUser(user)) => Ok(PageUser(user.clone())),
                None => {
                    let target = parts
                        .uri
                        .path_and_query()
                        .map(|pq| pq.as_str())
                        .unwrap_or("/");
                    Err(login_redirect(target))
                }
            }
        }
    }

    /// Redirect to the login page, coming back to `target` afterwards.
    pub fn login_redirect(target: &str) -> Redirect {
        Redirect::to(&format!("/login?next={}", urlencoding::encode(target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing(i64);

    impl Owned for Thing {
        fn owner_id(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn ownership_predicate() {
        assert!(is_owner(&Thing(7), 7));
        assert!(!is_owner(&Thing(7), 8));
        assert!(ensure_owner(&Thing(7), 7).is_ok());
        assert!(matches!(ensure_owner(&Thing(7), 8), Err(AppError::Forbidden)));
    }

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(safe_next(Some("/dashboard")), Some("/dashboard"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
