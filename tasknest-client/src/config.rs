use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;

/// Read from `TASKNEST_*` variables (and `.env`).
#[derive(Deserialize, Debug, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_api_url() -> String {
    "http://localhost:4000".into()
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".tasknest").join("session.json")
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed("TASKNEST_").from_env::<Self>()?)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            session_path: default_session_path(),
        }
    }
}
