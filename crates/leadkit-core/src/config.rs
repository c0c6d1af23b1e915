#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub auth_mode: AuthMode,
    pub session_days: u32,
    pub argon2_memory_kb: u32,
    pub duckdb_memory_limit: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    /// All routes open, auth context taken from unsigned identity headers.
    /// Intended for tests and local development only.
    None,
    /// Bearer session JWT minted by /api/auth/login, argon2id password hashes.
    Local,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("LEADKIT_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("LEADKIT_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            auth_mode: match std::env::var("LEADKIT_AUTH").as_deref() {
                Ok("none") => AuthMode::None,
                _ => AuthMode::Local,
            },
            session_days: std::env::var("LEADKIT_SESSION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            argon2_memory_kb: std::env::var("LEADKIT_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()
                .unwrap_or(65536),
            duckdb_memory_limit: std::env::var("LEADKIT_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            cors_origins: std::env::var("LEADKIT_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }
}
