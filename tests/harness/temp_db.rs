use std::path::{Path, PathBuf};
use std::sync::Arc;

use signalbot::adapter::outbound::crypto::CredentialCipher;
use signalbot::adapter::outbound::sqlite::database::connection::{
    create_pool, run_migrations, DbPool,
};
use signalbot::adapter::outbound::sqlite::store::SqliteStore;
use tempfile::TempDir;

/// Fixed key so a second store can reopen the same file.
pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Temporary SQLite database for integration tests.
pub struct TempDb {
    dir: TempDir,
    pool: DbPool,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("data").join("subscribers.db");
        let pool = create_pool(path.to_str().expect("utf-8 path")).expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");
        Self { dir, pool }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("data").join("subscribers.db")
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        let cipher = CredentialCipher::from_key(TEST_KEY).expect("test key");
        Arc::new(SqliteStore::new(self.pool.clone(), cipher))
    }
}
