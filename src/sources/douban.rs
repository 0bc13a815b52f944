//! Douban movie/TV subjects.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::app::Result;
use crate::domain::{Details, Person, Record, SearchResult, Site};
use crate::fetcher::{FetchOptions, Fetcher};
use crate::parser::{as_text, parse_embedded_json, parse_jsonp, Document};
use crate::resolver::resolve;
use crate::sources::{or_zero, people, split_list, Adapter, Searcher, NONE_EXIST_ERROR};
use crate::template::{indent, Template};

const BANNED_ERROR: &str = "GenHelp was temporary banned by Douban, Please wait....";
const NO_INTRODUCTION: &str = "暂无相关剧情介绍";
const INFO_LABELS: &str = "#info span.pl";

static POSTER_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"s(_ratio_poster|pic)").expect("valid poster regex"));
static IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tt\d+").expect("valid imdb id regex"));
static RELEASE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{1,2}))?(?:-(\d{1,2}))?").expect("valid release date regex")
});
static AWARD_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(div|ul)[^>]*>").expect("valid award block regex"));
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static TRAILING_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +\n").expect("valid trailing space regex"));

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoubanInfo {
    pub douban_link: String,
    pub chinese_title: String,
    pub foreign_title: String,
    pub aka: Vec<String>,
    pub trans_title: Vec<String>,
    pub this_title: Vec<String>,
    pub year: String,
    pub region: Vec<String>,
    pub genre: Vec<String>,
    pub language: Vec<String>,
    pub playdate: Vec<String>,
    pub imdb_id: String,
    pub imdb_link: String,
    pub imdb_rating_average: String,
    pub imdb_votes: String,
    pub imdb_rating: String,
    pub douban_rating_average: String,
    pub douban_votes: String,
    pub douban_rating: String,
    pub episodes: String,
    pub duration: String,
    pub introduction: String,
    pub poster: String,
    pub director: Vec<Person>,
    pub writer: Vec<Person>,
    pub cast: Vec<Person>,
    pub tags: Vec<String>,
    pub awards: String,
}

impl DoubanInfo {
    pub fn template(&self) -> Template {
        let cast_separator = format!("\n{}  　", "　".repeat(4));

        Template::new()
            .poster(&self.poster)
            .field("◎译　　名　", self.trans_title.join("/"))
            .field("◎片　　名　", self.this_title.join("/"))
            .field("◎年　　代　", &self.year)
            .field("◎产　　地　", self.region.join(" / "))
            .field("◎类　　别　", self.genre.join(" / "))
            .field("◎语　　言　", self.language.join(" / "))
            .field("◎上映日期　", self.playdate.join(" / "))
            .field("◎IMDb评分  ", &self.imdb_rating)
            .field("◎IMDb链接  ", &self.imdb_link)
            .field("◎豆瓣评分　", &self.douban_rating)
            .field("◎豆瓣链接　", &self.douban_link)
            .field("◎集　　数　", &self.episodes)
            .field("◎片　　长　", &self.duration)
            .field("◎导　　演　", names(&self.director, " / "))
            .field("◎编　　剧　", names(&self.writer, " / "))
            .field("◎主　　演　", names(&self.cast, &cast_separator).trim())
            .line("\n◎标　　签　", self.tags.join(" | "), "\n")
            .line("\n◎简　　介\n\n　　", indent(&self.introduction, "　　"), "\n")
            .line("\n◎获奖情况\n\n　　", indent(&self.awards, "　　"), "\n")
    }
}

fn names(people: &[Person], sep: &str) -> String {
    people
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

pub struct Douban {
    fetcher: Arc<dyn Fetcher>,
    cookie: Option<String>,
    apikeys: Vec<String>,
}

impl Douban {
    pub fn new(fetcher: Arc<dyn Fetcher>, cookie: Option<String>, apikeys: Vec<String>) -> Self {
        Self {
            fetcher,
            cookie,
            apikeys,
        }
    }

    fn options(&self) -> FetchOptions {
        FetchOptions::with_cookie(self.cookie.as_deref())
    }

    fn choose_key(&self) -> Option<String> {
        pick_api_key(&self.apikeys, &mut rand::rng()).map(String::from)
    }

    /// Douban subject id for an IMDb title, via the legacy v2 API.
    async fn lookup_imdb(&self, imdb_id: &str) -> Result<Option<String>> {
        let Some(apikey) = self.choose_key() else {
            tracing::warn!("No douban apikeys configured, cannot look up {}", imdb_id);
            return Ok(None);
        };

        let url = format!(
            "https://api.douban.com/v2/movie/imdb/{}?apikey={}",
            imdb_id, apikey
        );
        let response = self.fetcher.get(&url).await?;
        let json: Value = serde_json::from_str(&response.body).unwrap_or(Value::Null);

        Ok(json
            .get("alt")
            .and_then(Value::as_str)
            .and_then(resolve)
            .filter(|target| target.site == Site::Douban)
            .map(|target| target.sid))
    }
}

#[async_trait]
impl Adapter for Douban {
    fn site(&self) -> Site {
        Site::Douban
    }

    async fn generate(&self, sid: &str) -> Result<Record> {
        let subject = if sid.starts_with("tt") {
            match self.lookup_imdb(sid).await? {
                Some(subject) => subject,
                None => {
                    return Ok(Record::failure(
                        Site::Douban,
                        sid,
                        format!("Can't find this imdb_id({}) in Douban.", sid),
                    ))
                }
            }
        } else if !sid.is_empty() && sid.chars().all(|c| c.is_ascii_digit()) {
            sid.to_string()
        } else {
            return Ok(Record::failure(Site::Douban, sid, NONE_EXIST_ERROR));
        };

        let link = format!("https://movie.douban.com/subject/{}/", subject);
        let awards_link = format!("{}awards", link);
        let options = self.options();

        tracing::debug!("Generating douban subject {}", subject);
        let (page, awards) = futures::try_join!(
            self.fetcher.fetch(&link, &options),
            self.fetcher.fetch(&awards_link, &options),
        )?;

        if page.body.contains("你想访问的页面不存在") {
            return Ok(Record::failure(Site::Douban, sid, NONE_EXIST_ERROR));
        }
        if page.body.contains("检测到有异常请求") {
            return Ok(Record::failure(Site::Douban, sid, BANNED_ERROR));
        }

        let mut info = parse_subject(&page.body, &link)?;
        info.awards = parse_awards(&awards.body)?;

        if !info.imdb_id.is_empty() {
            match self.fetcher.get(&imdb_rating_url(&info.imdb_id)).await {
                Ok(response) => apply_imdb_rating(&mut info, &parse_jsonp(&response.body)),
                Err(e) => tracing::warn!("IMDb rating for {} unavailable: {}", info.imdb_id, e),
            }
        }

        Ok(Record::found(sid, Details::Douban(info)))
    }
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    sub_title: String,
    #[serde(default)]
    year: String,
    #[serde(default, rename = "type")]
    kind: String,
}

#[async_trait]
impl Searcher for Douban {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let url = format!("https://movie.douban.com/j/subject_suggest?q={}", encoded);
        let response = self.fetcher.fetch(&url, &self.options()).await?;
        let suggestions: Vec<Suggestion> = serde_json::from_str(&response.body)?;

        Ok(suggestions
            .into_iter()
            .map(|s| SearchResult {
                year: s.year,
                subtype: s.kind,
                title: s.title,
                subtitle: Some(s.sub_title).filter(|t| !t.is_empty()),
                link: format!("https://movie.douban.com/subject/{}/", s.id),
            })
            .collect())
    }
}

/// Uniform pick from the configured key pool.
pub fn pick_api_key<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> Option<&'a str> {
    pool.choose(rng).map(String::as_str)
}

fn imdb_rating_url(imdb_id: &str) -> String {
    format!(
        "https://p.media-imdb.com/static-content/documents/v1/title/{}/ratings%3Fjsonp=imdb.rating.run:imdb.api.title.ratings/data.json",
        imdb_id
    )
}

fn apply_imdb_rating(info: &mut DoubanInfo, json: &Value) {
    let Some(resource) = json.get("resource") else {
        return;
    };
    info.imdb_rating_average = or_zero(as_text(&resource["rating"]));
    info.imdb_votes = or_zero(as_text(&resource["ratingCount"]));
    info.imdb_rating = format!(
        "{}/10 from {} users",
        info.imdb_rating_average, info.imdb_votes
    );
}

fn parse_subject(raw: &str, link: &str) -> Result<DoubanInfo> {
    let doc = Document::parse(raw);

    let ld_json = match doc.first(r#"script[type="application/ld+json"]"#)? {
        Some(script) => parse_embedded_json(&script.inner_html())?,
        None => Value::Null,
    };

    let chinese_title = doc.text("title")?.replace("(豆瓣)", "").trim().to_string();
    let foreign_title = doc
        .text(r#"span[property="v:itemreviewed"]"#)?
        .replace(&chinese_title, "")
        .trim()
        .to_string();

    let mut aka = doc
        .labeled(INFO_LABELS, "又名")?
        .map(|value| split_list(&value, " / "))
        .unwrap_or_default();
    aka.sort();

    let (trans_title, this_title) = if foreign_title.is_empty() {
        (aka.join("/"), chinese_title.clone())
    } else {
        let mut trans = vec![chinese_title.clone()];
        trans.extend(aka.iter().cloned());
        (trans.join("/"), foreign_title.clone())
    };

    let labeled_list = |label: &str| -> Result<Vec<String>> {
        Ok(doc
            .labeled(INFO_LABELS, label)?
            .map(|value| split_list(&value, " / "))
            .unwrap_or_default())
    };

    let mut playdate = doc.texts(r#"#info span[property="v:initialReleaseDate"]"#)?;
    sort_release_dates(&mut playdate);

    let imdb_text = match doc.labeled(INFO_LABELS, "IMDb")? {
        Some(text) => text,
        None => doc.text(r#"#info a[href*="imdb.com/title/tt"]"#)?,
    };
    let imdb_id = IMDB_ID
        .find(&imdb_text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let imdb_link = if imdb_id.is_empty() {
        String::new()
    } else {
        format!("https://www.imdb.com/title/{}/", imdb_id)
    };

    let duration = match doc.labeled(INFO_LABELS, "单集片长")? {
        Some(duration) => duration,
        None => doc.text(r#"#info span[property="v:runtime"]"#)?,
    };

    let introduction = doc
        .first_text(&[
            "#link-report-intra > span.all.hidden",
            r#"#link-report-intra > [property="v:summary"]"#,
            "#link-report > span.all.hidden",
            r#"#link-report > [property="v:summary"]"#,
        ])?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let rating = &ld_json["aggregateRating"];
    let douban_rating_average = or_zero(as_text(&rating["ratingValue"]));
    let douban_votes = or_zero(as_text(&rating["ratingCount"]));

    let poster = POSTER_SIZE
        .replace_all(&as_text(&ld_json["image"]), "l$1")
        .replacen("img3", "img1", 1);

    Ok(DoubanInfo {
        douban_link: link.to_string(),
        aka,
        trans_title: split_list(&trans_title, "/"),
        this_title: split_list(&this_title, "/"),
        year: doc
            .text("#content > h1 > span.year")?
            .chars()
            .skip(1)
            .take(4)
            .collect(),
        region: labeled_list("制片国家/地区")?,
        genre: doc.texts(r#"#info span[property="v:genre"]"#)?,
        language: labeled_list("语言")?,
        playdate,
        imdb_id,
        imdb_link,
        douban_rating: format!("{}/10 from {} users", douban_rating_average, douban_votes),
        douban_rating_average,
        douban_votes,
        episodes: doc.labeled(INFO_LABELS, "集数")?.unwrap_or_default(),
        duration,
        introduction: if introduction.is_empty() {
            NO_INTRODUCTION.to_string()
        } else {
            introduction
        },
        poster,
        director: people(&ld_json["director"]),
        writer: people(&ld_json["author"]),
        cast: people(&ld_json["actor"]),
        tags: doc.texts(r#"div.tags-body > a[href^="/tag"]"#)?,
        chinese_title,
        foreign_title,
        ..Default::default()
    })
}

/// Awards page flattened to one line per festival and one per award.
fn parse_awards(raw: &str) -> Result<String> {
    let doc = Document::parse(raw);
    let Some(article) = doc.first("#content > div > div.article")? else {
        return Ok(String::new());
    };

    let compact = article
        .inner_html()
        .replace([' ', '\n'], "")
        .replace("</li><li>", "</li> <li>")
        .replace("</a><span", "</a> <span");
    let blocks = AWARD_BLOCK.replace_all(&compact, "\n");
    let plain = ANY_TAG.replace_all(&blocks, "");
    let decoded = html_escape::decode_html_entities(&plain).replace('\u{a0}', " ");

    Ok(TRAILING_SPACES
        .replace_all(&decoded, "\n")
        .trim()
        .to_string())
}

/// Ascending by the leading `YYYY[-MM[-DD]]`; undated entries keep their
/// relative order at the end.
fn sort_release_dates(dates: &mut [String]) {
    dates.sort_by_key(|date| match RELEASE_DATE.captures(date) {
        Some(caps) => {
            let part = |i| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            (false, part(1), part(2), part(3))
        }
        None => (true, 0, 0, 0),
    });
}
