use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::notifications::composer::MessageComposer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Pluggable message composer. LLM-backed when an Anthropic key is configured.
    pub composer: Arc<dyn MessageComposer>,
}
