use serde::{Deserialize, Serialize};

/// A search result used as generation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(alias = "description")]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
}
