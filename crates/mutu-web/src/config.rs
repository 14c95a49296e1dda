use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Root directory for uploaded evidence
    pub upload_dir: PathBuf,
    pub port: u16,
    /// Accept cross-origin requests from anywhere
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            upload_dir: PathBuf::from("uploads"),
            port: DEFAULT_PORT,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: std::env::var_os("MUTU_DB").map_or(defaults.db_path, PathBuf::from),
            upload_dir: std::env::var_os("MUTU_UPLOAD_DIR")
                .map_or(defaults.upload_dir, PathBuf::from),
            port: std::env::var("MUTU_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            cors_permissive: std::env::var("MUTU_CORS_PERMISSIVE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("mutu.db"),
        |dir| dir.join("mutu").join("mutu.db"),
    )
}
