use std::sync::Arc;

use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use leadkit_core::error::StoreError;

use crate::schema::init_sql;
use crate::store::db_err;

/// Generate an entity id: `{prefix}_` + 10 random alphanumeric chars.
pub(crate) fn generate_id(prefix: &str) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("{prefix}_{chars}")
}

/// Generate a cryptographically random hex string of `n` bytes (2n hex chars).
pub(crate) fn rand_hex(n: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// The embedded DuckDB store behind all repositories.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. The connection is wrapped in `Arc<Mutex<_>>` so the
/// async runtime serialises all statements while the struct stays cheap to
/// clone and share across Axum handlers. Multi-statement writes (campaign
/// send fan-out, stage moves, cascade deletes) run inside one transaction on
/// the locked connection.
pub struct LeadStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl LeadStore {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
    /// read from `Config.duckdb_memory_limit` at the call site. Runs the
    /// idempotent schema DDL and seeds the settings table.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch(&init_sql(memory_limit)).map_err(db_err)?;
        Self::seed_settings_sync(&conn)?;
        info!("DuckDB opened at {path} with memory_limit={memory_limit}, threads=2");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests — data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(&init_sql("1GB")).map_err(db_err)?;
        Self::seed_settings_sync(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Seed the `settings` table on first run.
    ///
    /// Uses `INSERT OR IGNORE` so re-runs on every startup are safe.
    /// Separate parameterized execute() calls — DuckDB does not support
    /// multi-statement batches with parameters.
    fn seed_settings_sync(conn: &Connection) -> Result<(), StoreError> {
        let jwt_secret = rand_hex(32);
        let install_id = rand_hex(8);
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('jwt_secret', ?1)",
            duckdb::params![jwt_secret],
        )
        .map_err(db_err)?;
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('version', ?1)",
            duckdb::params!["1"],
        )
        .map_err(db_err)?;
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('install_id', ?1)",
            duckdb::params![install_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Read an instance setting, `None` if the key is absent.
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT value FROM settings WHERE key = ?1")
            .map_err(db_err)?;
        match stmt.query_row(duckdb::params![key], |row| row.get::<_, String>(0)) {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// The JWT signing secret, generated at first open.
    pub async fn jwt_secret(&self) -> Result<String, StoreError> {
        self.get_setting("jwt_secret")
            .await?
            .ok_or_else(|| StoreError::Schema("settings missing jwt_secret".to_string()))
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Returns an error if the connection
    /// is unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1").map_err(db_err)?;
        Ok(())
    }

    /// Acquire the connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify or seed stored
    /// data. Production code should use the typed repository methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
