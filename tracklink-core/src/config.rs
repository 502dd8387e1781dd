use std::path::{Path, PathBuf};

use serde::Deserialize;

use tracklink_types::Protocol;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_ADDRESS_PREFIX: &str = "/tracklink";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown protocol '{0}' (expected udp or tcp)")]
    Protocol(String),
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    dispatch: DispatchConfig,
}

#[derive(Deserialize, Default)]
struct ServerConfig {
    protocol: Option<String>,
    bind: Option<String>,
    port: Option<u16>,
    address_prefix: Option<String>,
}

#[derive(Deserialize, Default)]
struct DispatchConfig {
    log_rejections: Option<bool>,
    evaluate: Option<bool>,
}

/// Where and how the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub protocol: Protocol,
    pub bind: String,
    pub port: u16,
    pub address_prefix: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            protocol: Protocol::Udp,
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
        }
    }
}

impl ServerSettings {
    /// `bind:port`, ready for `ToSocketAddrs`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub log_rejections: bool,
    pub evaluate: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            log_rejections: true,
            evaluate: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server: ServerSettings,
    pub dispatch: DispatchSettings,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    /// A malformed user file is logged and ignored.
    pub fn load() -> Self {
        let mut base = embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_file(&path) {
                    Ok(user) => merge(&mut base, user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring config {}: {}", path.display(), e)
                    }
                }
            }
        }

        resolve(base)
    }

    /// Embedded defaults merged with an explicit file. Errors are returned,
    /// not swallowed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut base = embedded();
        merge(&mut base, read_file(path)?);
        log::info!(target: "config", "loaded {}", path.display());
        Ok(resolve(base))
    }

    /// Embedded defaults merged with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut base = embedded();
        let user: ConfigFile = toml::from_str(contents)?;
        check_protocol(&user.server)?;
        merge(&mut base, user);
        Ok(resolve(base))
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tracklink").join("config.toml"))
}

fn embedded() -> ConfigFile {
    match toml::from_str(DEFAULT_CONFIG) {
        Ok(file) => file,
        Err(e) => {
            log::error!(target: "config", "embedded config.toml is malformed: {}", e);
            ConfigFile::default()
        }
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&contents)?;
    check_protocol(&file.server)?;
    Ok(file)
}

fn check_protocol(server: &ServerConfig) -> Result<(), ConfigError> {
    match server.protocol.as_deref() {
        Some(p) if Protocol::parse(p).is_none() => Err(ConfigError::Protocol(p.to_string())),
        _ => Ok(()),
    }
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_server(&mut base.server, user.server);
    merge_dispatch(&mut base.dispatch, user.dispatch);
}

fn merge_server(base: &mut ServerConfig, user: ServerConfig) {
    if user.protocol.is_some() {
        base.protocol = user.protocol;
    }
    if user.bind.is_some() {
        base.bind = user.bind;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.address_prefix.is_some() {
        base.address_prefix = user.address_prefix;
    }
}

fn merge_dispatch(base: &mut DispatchConfig, user: DispatchConfig) {
    if user.log_rejections.is_some() {
        base.log_rejections = user.log_rejections;
    }
    if user.evaluate.is_some() {
        base.evaluate = user.evaluate;
    }
}

fn resolve(file: ConfigFile) -> Config {
    let server_fallback = ServerSettings::default();
    let dispatch_fallback = DispatchSettings::default();
    Config {
        server: ServerSettings {
            protocol: file
                .server
                .protocol
                .as_deref()
                .and_then(Protocol::parse)
                .unwrap_or(server_fallback.protocol),
            bind: file.server.bind.unwrap_or(server_fallback.bind),
            port: file.server.port.unwrap_or(server_fallback.port),
            address_prefix: file
                .server
                .address_prefix
                .map(|p| normalize_prefix(&p))
                .unwrap_or(server_fallback.address_prefix),
        },
        dispatch: DispatchSettings {
            log_rejections: file
                .dispatch
                .log_rejections
                .unwrap_or(dispatch_fallback.log_rejections),
            evaluate: file.dispatch.evaluate.unwrap_or(dispatch_fallback.evaluate),
        },
    }
}

/// Leading slash, no trailing slash. An empty prefix stays empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn embedded_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.address(), "127.0.0.1:8000");
        assert!(config.dispatch.evaluate);
        assert!(config.dispatch.log_rejections);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9100
            protocol = "tcp"

            [dispatch]
            evaluate = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.protocol, Protocol::Tcp);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert!(!config.dispatch.evaluate);
        assert!(config.dispatch.log_rejections);
    }

    #[test]
    fn prefix_normalized() {
        let config = Config::from_toml_str("[server]\naddress_prefix = \"renoise/\"").unwrap();
        assert_eq!(config.server.address_prefix, "/renoise");
        let config = Config::from_toml_str("[server]\naddress_prefix = \"\"").unwrap();
        assert_eq!(config.server.address_prefix, "");
    }

    #[test]
    fn bad_protocol_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("[server]\nprotocol = \"sctp\""),
            Err(ConfigError::Protocol(_))
        ));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("[server\nport = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"0.0.0.0\"").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
