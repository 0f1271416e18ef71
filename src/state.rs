use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::editor::Editor;
use crate::images::ImageClient;
use crate::llm::LlmClients;
use crate::research::ResearchClient;

/// Shared handles injected into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub llm: LlmClients,
    pub research: Option<Arc<ResearchClient>>,
    pub images: Option<Arc<ImageClient>>,
    pub editor: Arc<Editor>,
}

impl AppState {
    /// Build every external client from configuration. Missing API keys leave
    /// the matching client unset.
    pub fn from_config(config: Config, db: Database) -> anyhow::Result<Self> {
        let llm = LlmClients::from_config(&config)?;
        let research = ResearchClient::from_config(&config)
            .transpose()?
            .map(Arc::new);
        let images = ImageClient::from_config(&config).transpose()?.map(Arc::new);
        let editor = Arc::new(Editor::new(config.max_versions));

        if research.is_none() {
            tracing::warn!("BRAVE_API_KEY not set; posts will be generated without research");
        }
        if images.is_none() {
            tracing::warn!(
                provider = config.image_provider.as_str(),
                "No image API key set; posts will be generated without images"
            );
        }
        if !llm.any_available() {
            tracing::warn!("No LLM API key set; generation and editing will fail");
        }

        Ok(Self {
            db,
            config: Arc::new(config),
            llm,
            research,
            images,
            editor,
        })
    }
}
