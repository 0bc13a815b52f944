use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Douban,
    Imdb,
    Bangumi,
    Steam,
    Indienova,
    Epic,
}

impl Site {
    pub const ALL: [Site; 6] = [
        Site::Douban,
        Site::Imdb,
        Site::Bangumi,
        Site::Steam,
        Site::Indienova,
        Site::Epic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Douban => "douban",
            Site::Imdb => "imdb",
            Site::Bangumi => "bangumi",
            Site::Steam => "steam",
            Site::Indienova => "indienova",
            Site::Epic => "epic",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown site: {0}")]
pub struct UnknownSite(pub String);

impl FromStr for Site {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Site::ALL
            .into_iter()
            .find(|site| site.as_str() == s)
            .ok_or_else(|| UnknownSite(s.to_string()))
    }
}
