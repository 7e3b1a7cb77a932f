use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use combiner_core::{Combiner, CombinerError};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub combiner: Arc<Combiner>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(combiner: Combiner, config: ServerConfig) -> Self {
        Self {
            combiner: Arc::new(combiner),
            start_time: Utc::now(),
            config: Arc::new(config),
        }
    }

    /// Run one pipeline call on the blocking pool. A panicking collaborator
    /// surfaces as an aggregation failure.
    pub async fn combine<T, F>(&self, f: F) -> Result<T, CombinerError>
    where
        F: FnOnce(&Combiner) -> Result<T, CombinerError> + Send + 'static,
        T: Send + 'static,
    {
        let combiner = self.combiner.clone();
        tokio::task::spawn_blocking(move || f(&combiner))
            .await
            .unwrap_or_else(|e| {
                Err(CombinerError::AggregationFailed(format!(
                    "aggregation task failed: {e}"
                )))
            })
    }
}
