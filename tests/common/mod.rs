//! Shared fixtures for the integration tests.
//!
//! Every test gets its own temporary directory holding the SQLite file and
//! the upload folder, so tests never see each other's rows or files.

#![allow(dead_code)]

use sqlx::SqlitePool;
use tempfile::TempDir;

use fluxion::charts::ChartRegistry;
use fluxion::config::Config;
use fluxion::datasets::{DatasetRegistry, UploadedFile};
use fluxion::db;
use fluxion::models::User;
use fluxion::storage::FileStore;
use fluxion::users::{Signup, UserDirectory};

pub const SALES_CSV: &[u8] = b"region,amount\neast,100\nwest,\n";

pub const PASSWORD: &str = "s3cret-pass";

pub struct TestEnv {
    // Held so the directory outlives the test.
    pub dir: TempDir,
    pub config: Config,
    pub pool: SqlitePool,
    pub store: FileStore,
    pub users: UserDirectory,
    pub datasets: DatasetRegistry,
    pub charts: ChartRegistry,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", dir.path().join("fluxion.db").display());
    config.database.max_connections = 2;
    config.uploads.dir = dir.path().join("uploads");
    config
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    setup_with(dir, config).await
}

pub async fn setup_with(dir: TempDir, config: Config) -> TestEnv {
    let pool = db::connect(&config.database).await.unwrap();
    let store = FileStore::new(config.uploads.dir.clone());
    let datasets = DatasetRegistry::new(pool.clone(), store.clone(), config.uploads.clone());

    TestEnv {
        users: UserDirectory::new(pool.clone(), store.clone()),
        charts: ChartRegistry::new(pool.clone(), datasets.clone()),
        datasets,
        store,
        pool,
        config,
        dir,
    }
}

pub fn signup(username: &str) -> Signup {
    Signup {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: None,
        password: PASSWORD.to_string(),
        password2: PASSWORD.to_string(),
    }
}

pub async fn create_user(env: &TestEnv, username: &str) -> User {
    env.users.register(signup(username)).await.unwrap()
}

pub fn upload(filename: &str, bytes: &[u8]) -> Option<UploadedFile> {
    Some(UploadedFile {
        filename: filename.to_string(),
        bytes: bytes.to_vec(),
    })
}

/// Names of the files currently in the upload folder.
pub fn stored_files(env: &TestEnv) -> Vec<String> {
    match std::fs::read_dir(env.store.root()) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
