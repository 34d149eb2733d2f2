use std::str::FromStr;
use std::{fs, path::Path, path::PathBuf};

use common::prelude::{KeyPair, PrivateKey};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "kmschain";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `name: value` line per field, binary values hex encoded
    #[default]
    Hex,
    /// A single JSON object
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Output format for command results
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output: OutputFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.kmschain)
    pub kms_dir: PathBuf,
    /// Path to the owner's private key PEM file
    pub key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.kmschain)
    pub fn kms_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory with a fresh key pair
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let kms_dir = Self::kms_dir(custom_path)?;

        if kms_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        // Reject bad config before touching the filesystem
        let config = config.unwrap_or_default();
        config.level()?;

        fs::create_dir_all(&kms_dir)?;

        let keypair = KeyPair::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let key_path = kms_dir.join(KEY_FILE_NAME);
        let pem = keypair
            .private
            .to_pem()
            .map_err(|e| StateError::InvalidKey(e.to_string()))?;
        write_secret(&key_path, &pem)?;

        let config_path = kms_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        tracing::info!(dir = %kms_dir.display(), public_key = %keypair.public, "initialized state directory");

        Ok(Self {
            kms_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let kms_dir = Self::kms_dir(custom_path)?;

        if !kms_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = kms_dir.join(KEY_FILE_NAME);
        let config_path = kms_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            kms_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load the owner's private key from the key file
    pub fn load_key(&self) -> Result<PrivateKey, StateError> {
        load_key_file(&self.key_path)
    }
}

/// Read a PEM private key from `path`
pub fn load_key_file(path: &Path) -> Result<PrivateKey, StateError> {
    let pem = fs::read_to_string(path)?;
    PrivateKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))
}

#[cfg(unix)]
fn write_secret(path: &Path, contents: &str) -> Result<(), StateError> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_secret(path: &Path, contents: &str) -> Result<(), StateError> {
    fs::write(path, contents)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("kmschain directory not initialized. Run 'kms init' first")]
    NotInitialized,

    #[error("kmschain directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_load() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");

        let state = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(state.key_path.exists());
        assert!(state.config_path.exists());
        assert_eq!(state.config, AppConfig::default());

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config, state.config);
        let key = loaded.load_key().unwrap();
        assert_eq!(key, state.load_key().unwrap());
    }

    #[test]
    fn test_init_twice_fails() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");
        AppState::init(Some(dir.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_load_missing_key() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");
        let state = AppState::init(Some(dir.clone()), None).unwrap();
        fs::remove_file(&state.key_path).unwrap();
        assert!(matches!(
            AppState::load(Some(dir)),
            Err(StateError::MissingFile(_))
        ));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str("log_level = \"debug\"").unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output, OutputFormat::Hex);
        assert_eq!(config.level().unwrap(), tracing::Level::DEBUG);

        let config: AppConfig = toml::from_str("output = \"json\"").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn test_init_rejects_bad_log_level() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");
        let config = AppConfig {
            log_level: "loud".to_string(),
            output: OutputFormat::Hex,
        };
        assert!(matches!(
            AppState::init(Some(dir.clone()), Some(config)),
            Err(StateError::InvalidLogLevel(_))
        ));
        assert!(!dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let state = AppState::init(Some(temp.path().join("state")), None).unwrap();
        let mode = fs::metadata(&state.key_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
