use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::article::Article;
use super::image::Image;

pub const DEFAULT_PROVIDER: &str = "groq";

pub(crate) fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_research_count() -> u32 {
    5
}

fn default_image_count() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    #[serde(default = "default_research_count")]
    pub research_count: u32,
    #[serde(default = "default_true")]
    pub include_images: bool,
    #[serde(default = "default_image_count")]
    pub image_count: u32,
    #[serde(default = "default_true")]
    pub embed_images: bool,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<(), String> {
        let topic_len = self.topic.trim().chars().count();
        if !(3..=200).contains(&topic_len) {
            return Err("Topic must be between 3 and 200 characters".to_string());
        }
        if !(1..=10).contains(&self.research_count) {
            return Err("research_count must be between 1 and 10".to_string());
        }
        if !(1..=5).contains(&self.image_count) {
            return Err("image_count must be between 1 and 5".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub id: String,
    pub markdown: String,
    pub references: Vec<Article>,
    pub images: Vec<Image>,
    pub metadata: Value,
}
