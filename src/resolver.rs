//! Maps a free-form resource link onto a `(site, sid)` pair.
//!
//! Rules are tried in order and the first match wins, so a broader pattern
//! must never precede a narrower one it could shadow.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Site;

static RULES: LazyLock<Vec<(Site, Regex)>> = LazyLock::new(|| {
    [
        (
            Site::Douban,
            r"(?:https?://)?(?:(?:movie|www)\.)?douban\.com/(?:subject|movie)/(\d+)/?",
        ),
        (Site::Imdb, r"(?:https?://)?(?:www\.|m\.)?imdb\.com/title/(tt\d+)"),
        (
            Site::Bangumi,
            r"(?:https?://)?(?:bgm\.tv|bangumi\.tv|chii\.in)/subject/(\d+)/?",
        ),
        (
            Site::Steam,
            r"(?:https?://)?(?:store\.)?steam(?:powered|community)\.com/app/(\d+)/?",
        ),
        (Site::Indienova, r"(?:https?://)?indienova\.com/game/([^/\s?#]+)"),
        (
            Site::Epic,
            r"(?:https?://)?(?:www|store)\.epicgames\.com/(?:store/)?[a-z]{2}-[A-Z]{2}/p(?:roduct)?/([^/\s?#]+)",
        ),
    ]
    .into_iter()
    .map(|(site, pattern)| (site, Regex::new(pattern).expect("valid site pattern")))
    .collect()
});

/// A resolved resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub site: Site,
    pub sid: String,
}

pub fn resolve(url: &str) -> Option<Target> {
    RULES.iter().find_map(|(site, pattern)| {
        pattern.captures(url).and_then(|caps| caps.get(1)).map(|sid| Target {
            site: *site,
            sid: sid.as_str().to_string(),
        })
    })
}
