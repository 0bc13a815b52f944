use serde::{Deserialize, Serialize};

/// Lightweight candidate returned by a free-text search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub year: String,
    pub subtype: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub link: String,
}
