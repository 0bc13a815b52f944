//! indienova GameDB entries.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::ElementRef;
use serde::Serialize;

use crate::app::Result;
use crate::domain::{Details, Record, Site};
use crate::fetcher::{FetchOptions, Fetcher};
use crate::parser::html::{attr_of, select_in, text_of};
use crate::parser::Document;
use crate::sources::{split_list, Adapter, NONE_EXIST_ERROR};
use crate::template::Template;

const SHOW_ALL: &str = "查看全部 +";
const TAGS_SHOWN: usize = 8;

static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \n]+").expect("valid spaces regex"));
static PRICE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \n]{2,}").expect("valid price gap regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndienovaInfo {
    pub cover: String,
    pub poster: String,
    pub chinese_title: String,
    pub another_title: String,
    pub english_title: String,
    pub release_date: String,
    pub links: Vec<GameLink>,
    pub intro: String,
    pub intro_detail: Vec<String>,
    pub descr: String,
    pub rate: String,
    pub dev: Vec<String>,
    #[serde(rename = "pub")]
    pub publisher: Vec<String>,
    pub screenshot: Vec<String>,
    pub cat: Vec<String>,
    pub level: Vec<String>,
    pub price: Vec<String>,
}

impl IndienovaInfo {
    pub fn template(&self) -> Template {
        let tags: Vec<&str> = self
            .cat
            .iter()
            .take(TAGS_SHOWN)
            .map(String::as_str)
            .collect();
        let links: Vec<String> = self
            .links
            .iter()
            .map(|link| format!("[url={}]{}[/url]", link.url, link.name))
            .collect();

        Template::new()
            .poster(&self.cover)
            .text("【基本信息】\n\n")
            .field("中文名称：", &self.chinese_title)
            .field("英文名称：", &self.english_title)
            .field("其他名称：", &self.another_title)
            .field("发行时间：", &self.release_date)
            .field("评分：", &self.rate)
            .field("开发商：", self.dev.join(" / "))
            .field("发行商：", self.publisher.join(" / "))
            .line("", self.intro_detail.join("\n"), "\n")
            .field("标签：", tags.join(" | "))
            .field("链接地址：", links.join("  "))
            .field("价格信息：", self.price.join(" / "))
            .text("\n")
            .line("【游戏简介】\n\n", &self.descr, "\n\n")
            .gallery("【游戏截图】", &self.screenshot)
            .gallery("【游戏评级】", &self.level)
    }
}

pub struct Indienova {
    fetcher: Arc<dyn Fetcher>,
    cookie: Option<String>,
}

impl Indienova {
    pub fn new(fetcher: Arc<dyn Fetcher>, cookie: Option<String>) -> Self {
        Self { fetcher, cookie }
    }
}

#[async_trait]
impl Adapter for Indienova {
    fn site(&self) -> Site {
        Site::Indienova
    }

    async fn generate(&self, sid: &str) -> Result<Record> {
        if sid.is_empty() || sid.contains(['/', '?', '#']) {
            return Ok(Record::failure(Site::Indienova, sid, NONE_EXIST_ERROR));
        }

        let url = format!("https://indienova.com/game/{}", sid);
        tracing::debug!("Generating indienova game {}", sid);
        let page = self
            .fetcher
            .fetch(&url, &FetchOptions::with_cookie(self.cookie.as_deref()))
            .await?;

        if page.body.contains("出现错误") {
            return Ok(Record::failure(Site::Indienova, sid, NONE_EXIST_ERROR));
        }

        let info = parse_game(&page.body)?;
        Ok(Record::found(sid, Details::Indienova(info)))
    }
}

fn parse_game(raw: &str) -> Result<IndienovaInfo> {
    let doc = Document::parse(raw);

    let poster = doc.attr("div.cover-image img", "src")?.unwrap_or_default();
    let chinese_title = doc
        .text("title")?
        .split('|')
        .next()
        .and_then(|title| title.split('-').next())
        .unwrap_or_default()
        .trim()
        .to_string();

    let links = doc
        .select("div#tabs-link a.gamedb-link")?
        .into_iter()
        .map(|a| GameLink {
            name: text_of(a).trim().to_string(),
            url: attr_of(a, "href").unwrap_or_default(),
        })
        .collect();

    let intro = doc.text("#tabs-intro div.bottommargin-sm")?;
    let intro_detail = doc
        .texts("#tabs-intro p.single-line")?
        .into_iter()
        .map(|line| SPACES.replace_all(&line, " ").replace(',', "/").trim().to_string())
        .collect();

    let descr = doc.text("article")?.replacen("……显示全部", "", 1).trim().to_string();

    let scores = doc.texts("div#scores text")?;
    let rate = match scores.as_slice() {
        [a, b, c, d, ..] => format!("{}:{} / {}:{}", a, b, c, d),
        _ => String::new(),
    };

    let companies = doc.texts(r#"div#tabs-devpub ul[class^="db-companies"]"#)?;
    let company_list = |i: usize| {
        companies
            .get(i)
            .map(|list| split_list(list, "\n"))
            .unwrap_or_default()
    };
    let publisher = if companies.len() == 2 {
        company_list(1)
    } else {
        Vec::new()
    };

    let tags = doc.text("div.indienova-tags.gamedb-tags")?;

    Ok(IndienovaInfo {
        cover: poster.clone(),
        poster,
        chinese_title,
        another_title: doc.text("div.title-holder h1 small")?,
        english_title: doc.text("div.title-holder h1 span")?,
        release_date: doc.text("div.title-holder p.gamedb-release")?,
        links,
        descr: if descr.is_empty() { intro.clone() } else { descr },
        intro,
        intro_detail,
        rate,
        dev: company_list(0),
        publisher,
        screenshot: doc.attrs("li.slide img", "src")?,
        cat: dedupe_tags(tags.lines().map(str::trim)),
        level: parse_level(&doc)?,
        price: parse_prices(&doc)?,
    })
}

/// First occurrence of each tag, without the "show all" link or blanks.
pub fn dedupe_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if tag.is_empty() || tag == SHOW_ALL || out.iter().any(|seen| seen == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Rating badges in the block right after the "分级" heading.
fn parse_level(doc: &Document) -> Result<Vec<String>> {
    let block = doc
        .select("h4")?
        .into_iter()
        .find(|h4| text_of(*h4).contains("分级"))
        .and_then(|h4| h4.next_siblings().find_map(ElementRef::wrap))
        .filter(|el| el.value().classes().any(|class| class == "bottommargin-sm"));

    match block {
        Some(block) => Ok(select_in(block, "img")?
            .into_iter()
            .filter_map(|img| attr_of(img, "src"))
            .collect()),
        None => Ok(Vec::new()),
    }
}

/// `store：price` per storefront; each entry holds store, platform and
/// price blocks in that order.
fn parse_prices(doc: &Document) -> Result<Vec<String>> {
    let mut prices = Vec::new();
    for item in doc.select("ul.db-stores li")? {
        let blocks = select_in(item, "a > div")?;
        let text = |i: usize| {
            blocks
                .get(i)
                .map(|el| text_of(*el).trim().to_string())
                .unwrap_or_default()
        };
        let price = PRICE_GAP.replace(&text(2), " ").into_owned();
        prices.push(format!("{}：{}", text(0), price));
    }
    Ok(prices)
}
