use crate::config::Config;
use crate::llm::TextGenerator;
use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,

    /// Generative text provider. Injected here (rather than constructed
    /// globally) so tests can substitute a scripted fake.
    pub generator: Arc<dyn TextGenerator>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn TextGenerator> {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}
