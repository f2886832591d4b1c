//! User directory: account records and their uniqueness rules.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::credentials::{hash_password, verify_password};
use crate::db::is_unique_violation;
use crate::error::{AppError, AppResult};
use crate::models::{Dataset, DatasetView, User};
use crate::storage::FileStore;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub const USERNAME_TAKEN: &str = "Username already taken. Please choose a different one.";
pub const EMAIL_TAKEN: &str = "Email already registered. Please use a different email address.";
pub const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect.";

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 20;
const MAX_FULL_NAME_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 6;
const PROFILE_RECENT_UPLOADS: i64 = 3;

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, created_at, is_active";

/// Sign-up form data
#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub password: String,
    pub password2: String,
}

/// Profile edit form data
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Password change form data
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub new_password2: String,
}

/// Everything the profile page shows about a user
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub datasets_count: i64,
    pub charts_count: i64,
    pub days_since_joined: i64,
    pub recent_uploads: Vec<DatasetView>,
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
    store: FileStore,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool, store: FileStore) -> Self {
        Self { pool, store }
    }

    /// Register a new user
    ///
    /// # Arguments
    /// * `signup` - The submitted sign-up form
    ///
    /// # Returns
    /// * `AppResult<User>` - The created, active user
    ///
    /// # Errors
    /// * `Validation` - a field is malformed, or the username or email is taken
    #[instrument(skip_all, fields(username = %signup.username))]
    pub async fn register(&self, signup: Signup) -> AppResult<User> {
        let username = signup.username.trim();
        let email = signup.email.trim();
        let full_name = normalize_full_name(signup.full_name.as_deref());

        validate_username(username)?;
        validate_email(email)?;
        validate_full_name(full_name.as_deref())?;
        validate_new_password(&signup.password, &signup.password2)?;

        if self.username_exists(username).await? {
            return Err(AppError::validation(USERNAME_TAKEN));
        }
        if self.email_owner(email).await?.is_some() {
            return Err(AppError::validation(EMAIL_TAKEN));
        }

        let password_hash = hash_password(&signup.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO "user" (username, email, password_hash, full_name, created_at, is_active)
               VALUES (?, ?, ?, ?, ?, 1)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(&full_name)
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_to_validation)?;

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Check a username and password
    ///
    /// Unknown users, wrong passwords and deactivated accounts all come back
    /// as `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE username = ?"#
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };
        if !user.is_active || !verify_password(password, &user.password_hash)? {
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn find(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE id = ?"#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Update email and full name; the email must stay unique.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> AppResult<User> {
        let email = update.email.trim();
        let full_name = normalize_full_name(update.full_name.as_deref());
        validate_email(email)?;
        validate_full_name(full_name.as_deref())?;

        if let Some(owner) = self.email_owner(email).await? {
            if owner != user_id {
                return Err(AppError::validation(EMAIL_TAKEN));
            }
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE "user" SET email = ?, full_name = ? WHERE id = ? RETURNING {USER_COLUMNS}"#
        ))
        .bind(email)
        .bind(&full_name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique_to_validation)?
        .ok_or(AppError::NotFound("User"))?;

        Ok(user)
    }

    /// Replace the password after checking the current one.
    #[instrument(skip(self, change))]
    pub async fn change_password(&self, user_id: i64, change: PasswordChange) -> AppResult<()> {
        let user = self
            .find(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if !verify_password(&change.current_password, &user.password_hash)? {
            return Err(AppError::validation(WRONG_CURRENT_PASSWORD));
        }
        validate_new_password(&change.new_password, &change.new_password2)?;

        let password_hash = hash_password(&change.new_password)?;
        sqlx::query(r#"UPDATE "user" SET password_hash = ? WHERE id = ?"#)
            .bind(&password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id, "password changed");
        Ok(())
    }

    /// Delete a user with all their datasets, charts and sessions
    ///
    /// Rows go by cascade; the raw files of the user's datasets are removed
    /// from the content store afterwards.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i64) -> AppResult<()> {
        let stored: Vec<String> = sqlx::query_scalar("SELECT filename FROM dataset WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let deleted = sqlx::query(r#"DELETE FROM "user" WHERE id = ?"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(AppError::NotFound("User"));
        }

        for name in stored {
            if let Err(e) = self.store.remove(&name).await {
                warn!(error = ?e, file = %name, "could not remove dataset file of deleted user");
            }
        }

        info!(user_id, "user deleted");
        Ok(())
    }

    /// Summary shown on the profile page.
    pub async fn profile(&self, user_id: i64) -> AppResult<Profile> {
        let user = self
            .find(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        let datasets_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dataset WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        let charts_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chart WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let recent_uploads: Vec<DatasetView> = sqlx::query_as::<_, Dataset>(
            r#"SELECT id, filename, original_filename, file_size, "rows", columns,
                      column_names, data_types, preview_data, upload_date, user_id
               FROM dataset WHERE user_id = ?
               ORDER BY upload_date DESC, id DESC LIMIT ?"#,
        )
        .bind(user_id)
        .bind(PROFILE_RECENT_UPLOADS)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|dataset| dataset.to_view())
        .collect();

        let days_since_joined = (Utc::now().naive_utc() - user.created_at).num_days();

        Ok(Profile {
            user,
            datasets_count,
            charts_count,
            days_since_joined,
            recent_uploads,
        })
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM "user" WHERE username = ?"#)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn email_owner(&self, email: &str) -> AppResult<Option<i64>> {
        let found = sqlx::query_scalar(r#"SELECT id FROM "user" WHERE email = ?"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }
}

// A concurrent sign-up can still slip past the pre-checks.
fn unique_to_validation(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err, "user.username") {
        AppError::validation(USERNAME_TAKEN)
    } else if is_unique_violation(&err, "user.email") {
        AppError::validation(EMAIL_TAKEN)
    } else {
        err.into()
    }
}

fn normalize_full_name(full_name: Option<&str>) -> Option<String> {
    full_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AppError::validation(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters long."
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::validation("Invalid email address."));
    }
    Ok(())
}

fn validate_full_name(full_name: Option<&str>) -> AppResult<()> {
    if full_name.is_some_and(|name| name.chars().count() > MAX_FULL_NAME_LEN) {
        return Err(AppError::validation(format!(
            "Full name must be at most {MAX_FULL_NAME_LEN} characters long."
        )));
    }
    Ok(())
}

fn validate_new_password(password: &str, confirmation: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }
    if password != confirmation {
        return Err(AppError::validation("Passwords must match."));
    }
    Ok(())
}
