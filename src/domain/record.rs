use serde::{Deserialize, Serialize};

use crate::domain::Site;
use crate::sources::bangumi::BangumiInfo;
use crate::sources::douban::DoubanInfo;
use crate::sources::epic::EpicInfo;
use crate::sources::imdb::ImdbInfo;
use crate::sources::indienova::IndienovaInfo;
use crate::sources::steam::SteamInfo;

/// A credited person as published in a page's structured data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Source-specific fields. Each variant renders its own description.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Details {
    Douban(DoubanInfo),
    Imdb(ImdbInfo),
    Bangumi(BangumiInfo),
    Steam(SteamInfo),
    Indienova(IndienovaInfo),
    Epic(EpicInfo),
}

impl Details {
    pub fn site(&self) -> Site {
        match self {
            Details::Douban(_) => Site::Douban,
            Details::Imdb(_) => Site::Imdb,
            Details::Bangumi(_) => Site::Bangumi,
            Details::Steam(_) => Site::Steam,
            Details::Indienova(_) => Site::Indienova,
            Details::Epic(_) => Site::Epic,
        }
    }

    /// BBCode description; a pure function of the extracted fields.
    pub fn render(&self) -> String {
        match self {
            Details::Douban(info) => info.template().render(),
            Details::Imdb(info) => info.template().render(),
            Details::Bangumi(info) => info.template().render(),
            Details::Steam(info) => info.template().render(),
            Details::Indienova(info) => info.template().render(),
            Details::Epic(info) => info.template().render(),
        }
    }
}

/// Output of one adapter run.
///
/// `success` and `error` are exclusive: a found record always carries a
/// rendered `format`, a failed one never does.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub success: bool,
    pub error: Option<String>,
    pub format: String,
    pub site: Site,
    pub sid: String,
    #[serde(flatten)]
    pub details: Option<Details>,
}

impl Record {
    pub fn found(sid: impl Into<String>, details: Details) -> Self {
        Self {
            success: true,
            error: None,
            format: details.render(),
            site: details.site(),
            sid: sid.into(),
            details: Some(details),
        }
    }

    pub fn failure(site: Site, sid: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            format: String::new(),
            site,
            sid: sid.into(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::epic::EpicInfo;

    #[test]
    fn test_failure_has_no_format() {
        let record = Record::failure(Site::Steam, "1", "gone");
        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some("gone"));
        assert!(record.format.is_empty());
    }

    #[test]
    fn test_found_renders_format() {
        let info = EpicInfo {
            name: "Celeste".into(),
            ..Default::default()
        };
        let record = Record::found("celeste", Details::Epic(info));
        assert!(record.success);
        assert!(record.error.is_none());
        assert_eq!(record.site, Site::Epic);
        assert!(record.format.contains("游戏名称：Celeste"));
    }

    #[test]
    fn test_details_flatten_into_record() {
        let info = EpicInfo {
            name: "Celeste".into(),
            ..Default::default()
        };
        let record = Record::found("celeste", Details::Epic(info));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["site"], "epic");
        assert_eq!(json["sid"], "celeste");
        assert_eq!(json["name"], "Celeste");
        assert_eq!(json["success"], true);
        assert!(json["error"].is_null());
    }
}
