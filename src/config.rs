use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Runtime configuration, layered as defaults < `HYBRID_DAO_*` environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection string, e.g. `sqlite://data.sqlite`.
    pub database_url: String,
    pub loglevel: String,
    pub busy_timeout_ms: u64,
    /// Pretty-print the `json` blob column.
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://hybrid.sqlite".to_string(),
            loglevel: "info".to_string(),
            busy_timeout_ms: 5_000,
            pretty_json: true,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("HYBRID_DAO_"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        dotenvy::dotenv().ok();
        Self::figment().extract()
    }

    /// Same settings pointed at another database.
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid HYBRID_DAO_* configuration"));
