use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate::default_provider;

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_true() -> bool {
    true
}

fn validate_edit_input(markdown: &str, instruction: &str) -> Result<(), String> {
    if markdown.chars().count() < 10 {
        return Err("Markdown must be at least 10 characters".to_string());
    }
    validate_instruction(instruction)
}

fn validate_instruction(instruction: &str) -> Result<(), String> {
    let len = instruction.trim().chars().count();
    if !(5..=500).contains(&len) {
        return Err("Instruction must be between 5 and 500 characters".to_string());
    }
    Ok(())
}

/// One snapshot in the in-memory edit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditVersion {
    pub version_id: String,
    pub content: String,
    pub instruction: String,
    pub timestamp: DateTime<Utc>,
    pub parent_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub markdown: String,
    pub instruction: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_true")]
    pub track_version: bool,
    #[serde(default)]
    pub export_diff: bool,
}

impl EditRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_edit_input(&self.markdown, &self.instruction)?;
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 1.0".to_string());
        }
        if !(1..=8000).contains(&self.max_tokens) {
            return Err("max_tokens must be between 1 and 8000".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleEditRequest {
    pub markdown: String,
    pub instruction: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
}

impl SimpleEditRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_edit_input(&self.markdown, &self.instruction)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedPostEditRequest {
    pub instruction: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
}

impl SavedPostEditRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_instruction(&self.instruction)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditResponse {
    pub markdown: String,
    pub instruction_applied: String,
    pub edited_at: DateTime<Utc>,
    pub success: bool,
    pub model_used: String,
    pub provider_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleEditResponse {
    pub markdown: String,
    pub instruction_applied: String,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedPostEditResponse {
    pub post_id: i64,
    pub version_number: i64,
    pub markdown: String,
    pub instruction_applied: String,
    pub edited_at: DateTime<Utc>,
    pub model_used: String,
    pub provider_used: String,
    pub changes_summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionHistoryResponse {
    pub versions: Vec<EditVersion>,
    pub current_version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UndoResponse {
    pub markdown: String,
    pub version_restored: String,
    pub restored_at: DateTime<Utc>,
}
