use chrono::Utc;
use serde::Serialize;

use crate::app::GenError;
use crate::domain::{Record, SearchResult};

/// Top-level JSON wrapper shared by every response.
///
/// `generate_at` is stamped when the envelope is built, right before it is
/// serialized; adapters never see it.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub body: Body,
    pub copyright: String,
    pub version: &'static str,
    pub generate_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Body {
    Record(Record),
    Search(SearchBody),
    Failure(FailureBody),
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchBody {
    pub success: bool,
    pub error: Option<String>,
    pub format: String,
    pub data: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureBody {
    pub success: bool,
    pub error: Option<String>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Diagnostic>,
}

/// Structured error report attached under `debug=1`.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Error source chain, outermost first
    pub causes: Vec<String>,
    pub timestamp: i64,
    pub request: String,
}

impl Diagnostic {
    pub fn from_error(err: &GenError, request: &str) -> Self {
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: format!("{}: {}", err.kind(), err),
            kind: err.kind().to_string(),
            causes,
            timestamp: Utc::now().timestamp(),
            request: request.to_string(),
        }
    }
}

impl Body {
    pub fn search(data: Vec<SearchResult>) -> Self {
        Body::Search(SearchBody {
            success: true,
            error: None,
            format: String::new(),
            data,
        })
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Body::Failure(FailureBody {
            success: false,
            error: Some(error.into()),
            format: String::new(),
            debug: None,
        })
    }

    pub fn failure_with_debug(error: impl Into<String>, debug: Diagnostic) -> Self {
        Body::Failure(FailureBody {
            success: false,
            error: Some(error.into()),
            format: String::new(),
            debug: Some(debug),
        })
    }

    pub fn is_success(&self) -> bool {
        match self {
            Body::Record(record) => record.success,
            Body::Search(search) => search.success,
            Body::Failure(_) => false,
        }
    }
}

impl Envelope {
    pub fn new(body: Body, maintainer: &str) -> Self {
        Self {
            body,
            copyright: format!("Powered by @{}", maintainer),
            version: env!("CARGO_PKG_VERSION"),
            generate_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> crate::app::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
