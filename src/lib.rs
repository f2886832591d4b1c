/*!
# Fluxion

A multi-user web dashboard for uploading tabular files (CSV / Excel),
inspecting a preview of their contents, and saving chart definitions against
them, with optional public sharing through an unguessable link.

## Architecture

### Registries
- **Credential Store** (`credentials`) - Argon2id password hashing
- **User Directory** (`users`) - accounts, uniqueness of username and email
- **Dataset Registry** (`datasets`) - turns an uploaded file into stored
  metadata plus a JSON preview; the parsing itself lives in `loader`
- **Chart Registry** (`charts`) - chart definitions and share tokens
- **Access Gate** (`access`) - server-side sessions behind a signed cookie
  and the single ownership predicate used by both registries

### Persistence
- SQLite through `sqlx`, schema in `migrations/`
- Document-shaped columns (`column_names`, `data_types`, `preview_data`,
  `config`) are stored as JSON text, see `models`
- Raw uploads live in a flat directory keyed by a generated unique name
  (`storage`)

### Web layer (feature `web`, on by default)
- `app` - state, router and server loop
- `api` - JSON endpoints used by the dashboard
- `login` - login, sign-up and account pages
- `pages` - Handlebars templates and the public shared-chart page
- `downloader` - streams stored files back as attachments

## REST API Endpoints

- `POST /upload` - Upload a CSV / Excel file, returns the dataset view
- `GET /datasets`, `DELETE /delete-dataset/{id}`, `GET /download-dataset/{id}`
- `POST /save-chart`, `GET /charts`, `GET /get-chart/{id}`, `DELETE /delete-chart/{id}`
- `POST /share-chart/{id}`, `POST /unshare-chart/{id}`
- `GET /shared/{token}` - Public chart page, no login needed
- `GET /dashboard` - Recent activity of the signed-in user
- `GET /health` - Liveness and database check
*/

pub mod access;
pub mod charts;
pub mod config;
pub mod credentials;
pub mod datasets;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod storage;
pub mod users;

#[cfg(feature = "web")]
pub mod api;
#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod downloader;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod pages;

pub use error::{AppError, AppResult};
