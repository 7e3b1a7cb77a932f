use combiner_common::types::Tags;
use combiner_core::builtin::BuiltinKind;
use serde::{Deserialize, Serialize};

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config/combiner.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    /// Largest accepted HTTP request body, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub http_max_body_bytes: usize,
    /// Largest gRPC message decoded or encoded, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub grpc_max_message_bytes: usize,

    /// CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub kind: BuiltinKind,
    /// Static tags attached to every high-level response.
    #[serde(default)]
    pub tags: Tags,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            grpc_port: default_grpc_port(),
            http_max_body_bytes: default_max_message_bytes(),
            grpc_max_message_bytes: default_max_message_bytes(),
            cors_allowed_origins: Vec::new(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    9000
}

fn default_grpc_port() -> u16 {
    5000
}

fn default_max_message_bytes() -> usize {
    4 * 1024 * 1024
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{path}': {e}"))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{path}': {e}"))?;
        Ok(config)
    }

    /// Load `path` when given; otherwise [`DEFAULT_CONFIG_PATH`] if it exists,
    /// else built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(DEFAULT_CONFIG_PATH)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.grpc_port)
    }
}
