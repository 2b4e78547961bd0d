use std::sync::OnceLock;

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // logging
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub tokio_console: bool,

    // build
    pub app_version: Option<String>,
    #[serde(default = "default_local")]
    pub source: String,
    #[serde(default = "default_local")]
    pub git_commit: String,
    #[serde(default = "default_local")]
    pub pipeline_id: String,
    #[serde(default = "default_local")]
    pub version: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    4000
}

fn default_database_url() -> String {
    "sqlite.db".into()
}

fn default_local() -> String {
    "local".into()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Self>()
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide configuration, read from the environment (and `.env`) on first use.
///
/// Malformed values are reported once and replaced by the defaults.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::from_env().unwrap_or_else(|error| {
            eprintln!("invalid configuration, falling back to defaults: {error}");
            defaults()
        })
    })
}

fn defaults() -> Config {
    Config {
        host: default_host(),
        port: default_port(),
        database_url: default_database_url(),
        log_json: false,
        tokio_console: false,
        app_version: None,
        source: default_local(),
        git_commit: default_local(),
        pipeline_id: default_local(),
        version: default_local(),
    }
}

#[cfg(test)]
pub fn config_override<F>(override_config: F) -> &'static Config
where
    F: FnOnce(Config) -> Config,
{
    CONFIG.get_or_init(|| override_config(Config::from_env().unwrap_or_else(|_| defaults())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_locally() {
        let config = defaults();
        assert_eq!(config.addr(), "127.0.0.1:4000");
        assert_eq!(config.database_url, "sqlite.db");
        assert!(!config.log_json);
    }
}
