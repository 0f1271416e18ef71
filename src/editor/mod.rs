pub mod diff;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::llm::{ChatClient, ChatRequest};
use crate::models::EditVersion;
use crate::writer::strip_code_fence;

pub use diff::{ChangeSummary, unified_diff};

pub const EDITOR_SYSTEM_PROMPT: &str = "You are a professional blog editor skilled at improving and modifying content based on specific instructions. Always return clean Markdown content without additional commentary.";
pub const DEFAULT_EDIT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_EDIT_MAX_TOKENS: u32 = 4000;
pub const EDIT_FAILED_SUMMARY: &str = "Edit failed";

#[derive(Debug, Clone, Copy)]
pub struct EditOptions<'a> {
    pub temperature: f32,
    pub max_tokens: u32,
    pub track_version: bool,
    pub model: Option<&'a str>,
}

impl Default for EditOptions<'_> {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_EDIT_TEMPERATURE,
            max_tokens: DEFAULT_EDIT_MAX_TOKENS,
            track_version: true,
            model: None,
        }
    }
}

/// Outcome of one edit. On failure `edited_content` equals `original_content`.
#[derive(Debug, Clone)]
pub struct EditResult {
    pub original_content: String,
    pub edited_content: String,
    pub instruction: String,
    pub changes_summary: String,
    pub diff_text: String,
    pub timestamp: DateTime<Utc>,
    pub model_used: String,
    pub provider_used: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub version_id: Option<String>,
}

/// Bounded FIFO of edit snapshots. Version ids carry a counter that is never reused.
#[derive(Debug)]
pub struct VersionHistory {
    versions: VecDeque<EditVersion>,
    max_versions: usize,
    next_seq: u64,
}

impl VersionHistory {
    pub fn new(max_versions: usize) -> Self {
        let max_versions = max_versions.max(1);
        Self {
            versions: VecDeque::with_capacity(max_versions),
            max_versions,
            next_seq: 1,
        }
    }

    pub fn push(&mut self, content: String, instruction: String) -> EditVersion {
        let timestamp = Utc::now();
        let version = EditVersion {
            version_id: format!("v{}_{}", self.next_seq, timestamp.format("%Y%m%d_%H%M%S")),
            content,
            instruction,
            timestamp,
            parent_version: self.versions.back().map(|v| v.version_id.clone()),
        };
        self.next_seq += 1;

        self.versions.push_back(version.clone());
        while self.versions.len() > self.max_versions {
            if let Some(evicted) = self.versions.pop_front() {
                tracing::debug!(version_id = %evicted.version_id, "Evicted oldest edit version");
            }
        }

        tracing::info!(version_id = %version.version_id, "Added version to history");
        version
    }

    /// Snapshots, oldest first.
    pub fn versions(&self) -> Vec<EditVersion> {
        self.versions.iter().cloned().collect()
    }

    pub fn find(&self, version_id: &str) -> Option<&EditVersion> {
        self.versions.iter().find(|v| v.version_id == version_id)
    }

    pub fn latest(&self) -> Option<&EditVersion> {
        self.versions.back()
    }

    pub fn clear(&mut self) {
        self.versions.clear();
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn max_versions(&self) -> usize {
        self.max_versions
    }
}

/// Applies natural-language edits and keeps the shared in-memory version history.
#[derive(Debug)]
pub struct Editor {
    history: Mutex<VersionHistory>,
}

impl Editor {
    pub fn new(max_versions: usize) -> Self {
        Self {
            history: Mutex::new(VersionHistory::new(max_versions)),
        }
    }

    fn history_lock(&self) -> MutexGuard<'_, VersionHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn apply_edit(
        &self,
        llm: &ChatClient,
        content: &str,
        instruction: &str,
        options: EditOptions<'_>,
    ) -> EditResult {
        let provider_used = llm.provider().as_str().to_string();
        let requested_model = options.model.unwrap_or(llm.model()).to_string();
        let preview: String = instruction.chars().take(100).collect();
        tracing::info!(instruction = %preview, provider = %provider_used, "Applying edit");

        let prompt = build_edit_prompt(content, instruction);
        let completion = llm
            .complete(ChatRequest {
                system: Some(EDITOR_SYSTEM_PROMPT),
                prompt: &prompt,
                temperature: options.temperature,
                max_tokens: options.max_tokens,
                model: options.model,
            })
            .await;

        let timestamp = Utc::now();
        let completion = match completion {
            Ok(completion) => completion,
            Err(error) => {
                tracing::error!("Error applying edit: {}", error);
                return EditResult {
                    original_content: content.to_string(),
                    edited_content: content.to_string(),
                    instruction: instruction.to_string(),
                    changes_summary: EDIT_FAILED_SUMMARY.to_string(),
                    diff_text: String::new(),
                    timestamp,
                    model_used: requested_model,
                    provider_used,
                    success: false,
                    error_message: Some(error.to_string()),
                    version_id: None,
                };
            }
        };

        let edited = strip_code_fence(&completion.content);
        let diff_text = unified_diff(content, &edited);
        let changes_summary = ChangeSummary::compute(content, &edited, instruction).to_string();

        let version_id = options.track_version.then(|| {
            self.history_lock()
                .push(edited.clone(), instruction.to_string())
                .version_id
        });

        tracing::info!(model = %completion.model, "Edit applied successfully");
        EditResult {
            original_content: content.to_string(),
            edited_content: edited,
            instruction: instruction.to_string(),
            changes_summary,
            diff_text,
            timestamp,
            model_used: completion.model,
            provider_used,
            success: true,
            error_message: None,
            version_id,
        }
    }

    pub fn history(&self) -> Vec<EditVersion> {
        self.history_lock().versions()
    }

    /// Content of `version_id`, leaving the history untouched.
    pub fn undo_to_version(&self, version_id: &str) -> Option<String> {
        let history = self.history_lock();
        match history.find(version_id) {
            Some(version) => {
                tracing::info!(version_id, "Reverted to version");
                Some(version.content.clone())
            }
            None => {
                tracing::warn!(version_id, "Version not found in history");
                None
            }
        }
    }

    pub fn latest(&self) -> Option<EditVersion> {
        self.history_lock().latest().cloned()
    }

    pub fn clear_history(&self) {
        self.history_lock().clear();
        tracing::info!("Version history cleared");
    }
}

pub fn build_edit_prompt(content: &str, instruction: &str) -> String {
    format!(
        r#"Edit the given blog post according to the specific instruction provided.

**ORIGINAL BLOG POST:**
{content}

**EDITING INSTRUCTION:**
{instruction}

**EDITING GUIDELINES:**
1. Follow the instruction precisely while maintaining content quality
2. Preserve the Markdown formatting and structure
3. Keep the original tone and style unless specifically asked to change it
4. Maintain any existing references, links, and citations
5. If adding content, make it consistent with existing content
6. If removing content, ensure remaining content flows naturally

**IMPORTANT:** Return ONLY the fully edited blog post in Markdown format. Do not include explanations, comments, or metadata.

**EDITED BLOG POST:**"#
    )
}
