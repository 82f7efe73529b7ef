use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Секрет HS256, общий с приложением, которое выпускает токены
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Потолок размера загружаемого файла
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Сколько строк данных отдаёт предпросмотр
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Регион для разбора телефонов без кода страны (ISO 3166-1 alpha-2)
    #[serde(default = "default_region")]
    pub default_region: String,
    #[serde(default = "default_delimiter")]
    pub default_delimiter: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            preview_rows: default_preview_rows(),
            default_region: default_region(),
            default_delimiter: default_delimiter(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_preview_rows() -> usize {
    20
}

fn default_region() -> String {
    "RU".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/crm.db"

[server]
port = 3000

[auth]
jwt_secret = "change-me-in-config-toml"

[import]
max_upload_bytes = 10485760
preview_rows = 20
default_region = "RU"
default_delimiter = ","
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    // Try to find config.toml next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    default_config()
}

pub fn default_config() -> anyhow::Result<Config> {
    Ok(toml::from_str(DEFAULT_CONFIG)?)
}

/// Сохранить конфигурацию процесса (один раз при старте)
pub fn install(config: Config) -> anyhow::Result<&'static Config> {
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Configuration is already installed"))?;
    get()
}

pub fn get() -> anyhow::Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("Configuration has not been loaded"))
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = default_config().unwrap();
        assert_eq!(config.database.path, "target/db/crm.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.import.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.import.default_region, "RU");
    }

    #[test]
    fn test_missing_import_section_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[database]
path = "crm.db"

[auth]
jwt_secret = "s"
"#,
        )
        .unwrap();
        assert_eq!(config.import.preview_rows, 20);
        assert_eq!(config.import.default_delimiter, ",");
        assert_eq!(config.server.port, 3000);
    }
}
