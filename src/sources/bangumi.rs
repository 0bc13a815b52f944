//! Bangumi (bgm.tv) subjects.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{GenError, Result};
use crate::domain::{Details, Record, SearchResult, Site};
use crate::fetcher::Fetcher;
use crate::parser::html::{select_in, text_in, text_of};
use crate::parser::Document;
use crate::sources::{Adapter, Searcher, NONE_EXIST_ERROR};
use crate::template::Template;

/// Infobox rows that describe the subject rather than credit its staff.
static NON_STAFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(中文名|话数|放送开始|放送星期|别名|官方网站|播放电视台|其他电视台|Copyright)")
        .expect("valid infobox regex")
});
static COVER_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/cover/[lcmsg]/").expect("valid cover regex"));

const STAFF_SHOWN: usize = 15;
const CAST_SHOWN: usize = 9;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BangumiInfo {
    pub alt: String,
    pub cover: String,
    pub poster: String,
    pub story: String,
    pub staff: Vec<String>,
    pub info: Vec<String>,
    pub bangumi_votes: String,
    pub bangumi_rating_average: String,
    pub tags: Vec<String>,
    pub cast: Vec<String>,
}

impl BangumiInfo {
    pub fn template(&self) -> Template {
        let head = |items: &[String], n: usize| {
            items.iter().take(n).cloned().collect::<Vec<_>>().join("\n")
        };

        Template::new()
            .poster(&self.poster)
            .line("[b]Story: [/b]\n\n", &self.story, "\n\n")
            .line("[b]Staff: [/b]\n\n", head(&self.staff, STAFF_SHOWN), "\n\n")
            .line("[b]Cast: [/b]\n\n", head(&self.cast, CAST_SHOWN), "\n\n")
            .line("(来源于 ", &self.alt, " )\n")
    }
}

pub struct Bangumi {
    fetcher: Arc<dyn Fetcher>,
}

impl Bangumi {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for Bangumi {
    fn site(&self) -> Site {
        Site::Bangumi
    }

    async fn generate(&self, sid: &str) -> Result<Record> {
        if sid.is_empty() || !sid.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Record::failure(Site::Bangumi, sid, NONE_EXIST_ERROR));
        }

        let link = format!("https://bgm.tv/subject/{}", sid);
        let characters_link = format!("{}/characters", link);

        tracing::debug!("Generating bangumi subject {}", sid);
        let (page, characters) = futures::try_join!(
            self.fetcher.get(&link),
            self.fetcher.get(&characters_link),
        )?;

        if page.body.contains("呜咕，出错了") {
            return Ok(Record::failure(Site::Bangumi, sid, NONE_EXIST_ERROR));
        }

        let mut info = parse_subject(&page.body)?;
        info.alt = link;
        info.cast = parse_characters(&characters.body)?;

        Ok(Record::found(sid, Details::Bangumi(info)))
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    list: Vec<Subject>,
}

#[derive(Debug, Deserialize)]
struct Subject {
    #[serde(default)]
    url: String,
    #[serde(default, rename = "type")]
    kind: u8,
    #[serde(default)]
    name: String,
    #[serde(default)]
    name_cn: String,
    #[serde(default)]
    air_date: String,
}

fn subject_type(kind: u8) -> &'static str {
    match kind {
        1 => "漫画/小说",
        2 => "动画/二次元番",
        3 => "音乐",
        4 => "游戏",
        6 => "三次元番",
        _ => "",
    }
}

#[async_trait]
impl Searcher for Bangumi {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let mut url = Url::parse("https://api.bgm.tv/search/subject/")?;
        url.path_segments_mut()
            .map_err(|_| GenError::Other("bangumi search url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(query);
        url.query_pairs_mut().append_pair("responseGroup", "large");

        let response = self.fetcher.get(url.as_str()).await?;
        let found: SearchResponse = serde_json::from_str(&response.body)?;

        Ok(found
            .list
            .into_iter()
            .map(|s| SearchResult {
                year: s.air_date.chars().take(4).collect(),
                subtype: subject_type(s.kind).to_string(),
                title: if s.name_cn.is_empty() {
                    s.name.clone()
                } else {
                    s.name_cn
                },
                subtitle: Some(s.name),
                link: s.url,
            })
            .collect())
    }
}

fn parse_subject(raw: &str) -> Result<BangumiInfo> {
    let doc = Document::parse(raw);

    let poster = doc
        .attr("div#bangumiInfo a.thickbox.cover", "href")?
        .map(|href| {
            let href = if href.starts_with("//") {
                format!("https:{}", href)
            } else {
                href
            };
            COVER_SIZE.replace(&href, "/cover/l/").into_owned()
        })
        .unwrap_or_default();

    let (info, staff): (Vec<String>, Vec<String>) = doc
        .texts("div#bangumiInfo ul#infobox li")?
        .into_iter()
        .partition(|row| NON_STAFF.is_match(row));

    Ok(BangumiInfo {
        cover: poster.clone(),
        poster,
        story: doc.text("div#subject_summary")?,
        staff,
        info,
        bangumi_votes: doc.text(r#"span[property="v:votes"]"#)?,
        bangumi_rating_average: doc.text(r#"div.global_score > span[property="v:average"]"#)?,
        tags: doc.texts("#subject_detail > div.subject_tag_section > div > a > span")?,
        ..Default::default()
    })
}

/// `character: cv，cv` per row of the characters page.
fn parse_characters(raw: &str) -> Result<Vec<String>> {
    let doc = Document::parse(raw);
    let rows = doc.select(
        "div#columnInSubjectA > div.light_odd > div.clearit, \
         div#columnInSubjectA > div.light_even > div.clearit",
    )?;

    let mut cast = Vec::with_capacity(rows.len());
    for row in rows {
        let name = match text_in(row, "h2 span.tip")? {
            tip if !tip.is_empty() => tip,
            _ => text_in(row, "h2 a")?,
        };
        let name = name.replacen('/', "", 1).trim().to_string();

        let mut voices = Vec::new();
        for p in select_in(row, "div.clearit > p")? {
            let voice = match text_in(p, "small")? {
                small if !small.is_empty() => small,
                _ => text_of(p).trim().to_string(),
            };
            if !voice.is_empty() {
                voices.push(voice);
            }
        }

        cast.push(format!("{}: {}", name, voices.join("，")));
    }

    Ok(cast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;

    const LINK: &str = "https://bgm.tv/subject/253";
    const CHARACTERS: &str = "https://bgm.tv/subject/253/characters";

    const SUBJECT_PAGE: &str = r#"<html><body>
        <div id="bangumiInfo">
            <a href="//lain.bgm.tv/pic/cover/c/c9/f0/253_t3XWb.jpg" class="thickbox cover"><img src="x"/></a>
            <ul id="infobox">
                <li><span class="tip">中文名: </span>星际牛仔</li>
                <li><span class="tip">话数: </span>26</li>
                <li><span class="tip">导演: </span><a href="/person/1">渡辺信一郎</a></li>
                <li><span class="tip">音乐: </span><a href="/person/2">菅野よう子</a></li>
                <li><span class="tip">放送开始: </span>1998年4月3日</li>
            </ul>
        </div>
        <div class="global_score"><span property="v:average" class="number">9.1</span></div>
        <span property="v:votes">12345</span>
        <div id="subject_summary">  2071年，宇宙世纪。  </div>
        <div id="subject_detail"><div class="subject_tag_section"><div class="inner">
            <a class="l" href="/anime/tag/科幻"><span>科幻</span> <small>100</small></a>
            <a class="l" href="/anime/tag/TV"><span>TV</span> <small>90</small></a>
        </div></div></div>
    </body></html>"#;

    const CHARACTERS_PAGE: &str = r#"<html><body><div id="columnInSubjectA">
        <div class="light_odd"><div class="clearit">
            <div class="clearit">
                <h2><a href="/character/1" class="l">スパイク・スピーゲル</a> <span class="tip">/ 斯派克·斯皮格尔</span></h2>
            </div>
            <div class="actorBadge clearit">
                <p><a href="/person/3" class="l">山寺宏一</a></p>
                <p><small class="grey">山寺宏一</small></p>
            </div>
        </div></div>
        <div class="light_even"><div class="clearit">
            <div class="clearit"><h2><a href="/character/2" class="l">Ein</a></h2></div>
            <div class="actorBadge clearit"><p><a href="/person/4" class="l">山寺宏一</a></p></div>
        </div></div>
    </div></body></html>"#;

    #[test]
    fn test_parse_subject() {
        let info = parse_subject(SUBJECT_PAGE).unwrap();

        assert_eq!(
            info.poster,
            "https://lain.bgm.tv/pic/cover/l/c9/f0/253_t3XWb.jpg"
        );
        assert_eq!(info.cover, info.poster);
        assert_eq!(info.story, "2071年，宇宙世纪。");
        assert_eq!(info.staff, vec!["导演: 渡辺信一郎", "音乐: 菅野よう子"]);
        assert_eq!(info.info.len(), 3);
        assert_eq!(info.bangumi_rating_average, "9.1");
        assert_eq!(info.bangumi_votes, "12345");
        assert_eq!(info.tags, vec!["科幻", "TV"]);
    }

    #[test]
    fn test_parse_characters_reads_both_row_groups() {
        let cast = parse_characters(CHARACTERS_PAGE).unwrap();
        assert_eq!(
            cast,
            vec!["斯派克·斯皮格尔: 山寺宏一，山寺宏一", "Ein: 山寺宏一"]
        );
    }

    #[test]
    fn test_template_limits_staff() {
        let info = BangumiInfo {
            staff: (0..20).map(|i| format!("职位{}: 某人", i)).collect(),
            alt: LINK.to_string(),
            ..Default::default()
        };
        let out = info.template().render();
        assert!(out.contains("职位14: 某人"));
        assert!(!out.contains("职位15: 某人"));
        assert!(out.ends_with("(来源于 https://bgm.tv/subject/253 )"));
    }

    #[test]
    fn test_cast_renders_nine_but_keeps_all() {
        let info = BangumiInfo {
            cast: (1..=12).map(|i| format!("角色{}号: 声优{}号", i, i)).collect(),
            alt: LINK.to_string(),
            ..Default::default()
        };
        let record = Record::found("253", Details::Bangumi(info));

        assert!(record.format.contains("角色9号: 声优9号"));
        assert!(!record.format.contains("角色10号"));
        let Some(Details::Bangumi(info)) = record.details else {
            panic!("expected bangumi details");
        };
        assert_eq!(info.cast.len(), 12);
    }

    #[tokio::test]
    async fn test_generate() {
        let stub = StubFetcher::new()
            .route(LINK, 200, SUBJECT_PAGE)
            .route(CHARACTERS, 200, CHARACTERS_PAGE);
        let record = Bangumi::new(Arc::new(stub)).generate("253").await.unwrap();

        assert!(record.success);
        assert_eq!(
            record.format,
            "[img]https://lain.bgm.tv/pic/cover/l/c9/f0/253_t3XWb.jpg[/img]\n\n\
             [b]Story: [/b]\n\n2071年，宇宙世纪。\n\n\
             [b]Staff: [/b]\n\n导演: 渡辺信一郎\n音乐: 菅野よう子\n\n\
             [b]Cast: [/b]\n\n斯派克·斯皮格尔: 山寺宏一，山寺宏一\nEin: 山寺宏一\n\n\
             (来源于 https://bgm.tv/subject/253 )"
        );
    }

    #[tokio::test]
    async fn test_not_found() {
        let stub = StubFetcher::new()
            .route(LINK, 404, "<html><body><h2>呜咕，出错了</h2></body></html>")
            .route(CHARACTERS, 404, "");
        let record = Bangumi::new(Arc::new(stub)).generate("253").await.unwrap();
        assert_eq!(record.error.as_deref(), Some(NONE_EXIST_ERROR));
    }

    #[tokio::test]
    async fn test_search() {
        let stub = StubFetcher::new().route(
            "https://api.bgm.tv/search/subject/cowboy%20bebop?responseGroup=large",
            200,
            r#"{"results": 2, "list": [
                {"id": 253, "url": "http://bgm.tv/subject/253", "type": 2, "name": "カウボーイビバップ", "name_cn": "星际牛仔", "air_date": "1998-04-03"},
                {"id": 9, "url": "http://bgm.tv/subject/9", "type": 3, "name": "Tank!", "name_cn": "", "air_date": ""}
            ]}"#,
        );
        let results = Bangumi::new(Arc::new(stub)).search("cowboy bebop").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "星际牛仔");
        assert_eq!(results[0].subtitle.as_deref(), Some("カウボーイビバップ"));
        assert_eq!(results[0].subtype, "动画/二次元番");
        assert_eq!(results[0].year, "1998");
        assert_eq!(results[1].title, "Tank!");
        assert_eq!(results[1].year, "");
    }

    #[tokio::test]
    async fn test_search_without_hits() {
        let stub = StubFetcher::new().route(
            "https://api.bgm.tv/search/subject/zzz?responseGroup=large",
            200,
            r#"{"request": "/search/subject/zzz", "code": 404, "error": "Not Found"}"#,
        );
        let results = Bangumi::new(Arc::new(stub)).search("zzz").await.unwrap();
        assert!(results.is_empty());
    }
}
