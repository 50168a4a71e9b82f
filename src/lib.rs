use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, FileFormat};
use serde::Deserialize;

pub mod domain;
pub mod infrastructure;

#[derive(Clone, Debug, Deserialize)]
pub struct HotelConfig {
    pub server: Server,
    pub store: Store,
    pub logger: Logger,
}

impl HotelConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(config::File::with_name("hotel.toml").required(false))
            .add_source(
                config::Environment::with_prefix("HOTEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<HotelConfig>()
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(config::File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize::<HotelConfig>()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("store.backend", "InMemory")?
            .set_default("logger.level", "INFO")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub tls: Option<Tls>,
}

impl Server {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PEM encoded certificate and key paths
#[derive(Clone, Debug, Deserialize)]
pub struct Tls {
    pub cert: String,
    pub key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Store {
    pub backend: Backend,
    pub meilisearch: Option<MeiliSearch>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Backend {
    InMemory,
    MeiliSearch,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeiliSearch {
    pub url: String,
    pub api_key: String,
    #[serde(default = "MeiliSearch::default_index")]
    pub index: String,
    /// スノーフレークIDのマシンID（同じインデックスを使うプロセスごとに変える）
    #[serde(default = "MeiliSearch::default_snowflake_id")]
    pub machine_id: i32,
    /// スノーフレークIDのノードID
    #[serde(default = "MeiliSearch::default_snowflake_id")]
    pub node_id: i32,
    /// 1回の検索で取得する最大件数（超える場合は読み込みエラー）
    #[serde(default = "MeiliSearch::default_max_hits")]
    pub max_hits: usize,
    /// タスク完了を待つ秒数
    #[serde(default = "MeiliSearch::default_task_timeout")]
    pub task_timeout: u64,
}

impl MeiliSearch {
    fn default_index() -> String {
        "reservation".to_owned()
    }

    fn default_snowflake_id() -> i32 {
        1
    }

    fn default_max_hits() -> usize {
        1000
    }

    fn default_task_timeout() -> u64 {
        30
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}
