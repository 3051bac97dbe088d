use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LlmProvider;
use crate::store::DocumentStore;

pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub config: AppConfig,
    pub llm: Arc<dyn LlmProvider>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            llm: Arc::clone(&self.llm),
        }
    }
}
