//! Steam store apps, with the Chinese title from the keylol SteamDB mirror.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::app::Result;
use crate::domain::{Details, Record, Site};
use crate::fetcher::{FetchOptions, Fetcher};
use crate::parser::html::{attr_of, select_in, text_of};
use crate::parser::{as_text, html_to_bbcode, parse_jsonp, Document};
use crate::sources::{Adapter, NONE_EXIST_ERROR};
use crate::template::Template;

const BANNED_ERROR: &str = "GenHelp was temporary banned by Steam Server, Please wait....";

/// Skips the age gate and mature-content prompt, and forces Chinese.
const STORE_COOKIE: &str = "lastagecheckage=1-January-1975; birthtime=157737601; mature_content=1; wants_mature_content=1; Steam_Language=schinese";

const LANGUAGE_COLUMNS: [&str; 3] = ["界面", "完全音频", "字幕"];

static LABEL_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[ \t\n]+").expect("valid label gap regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\n]{2,}").expect("valid whitespace regex"));
static SCREENSHOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+?url=(http.+?)\.[\dx]+(.+?)(\?t=\d+)?$").expect("valid screenshot regex")
});
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));

#[derive(Debug, Clone, Default, Serialize)]
pub struct SteamInfo {
    pub steam_id: String,
    pub cover: String,
    pub poster: String,
    pub name: String,
    pub name_chs: String,
    pub detail: String,
    pub linkbar: String,
    pub tags: Vec<String>,
    pub review: Vec<String>,
    pub language: Vec<String>,
    pub descr: String,
    pub screenshot: Vec<String>,
    pub sysreq: Vec<String>,
}

impl SteamInfo {
    pub fn template(&self) -> Template {
        let store_link = if self.steam_id.is_empty() {
            String::new()
        } else {
            format!("https://store.steampowered.com/app/{}/", self.steam_id)
        };

        Template::new()
            .poster(&self.poster)
            .text("【基本信息】\n\n")
            .field("中文名: ", &self.name_chs)
            .line("", &self.detail, "\n")
            .field("官方网站: ", &self.linkbar)
            .field("Steam页面: ", store_link)
            .field("游戏语种: ", self.language.join(" | "))
            .field("标签: ", self.tags.join(" | "))
            .line("\n", self.review.join("\n"), "\n")
            .text("\n")
            .line("【游戏简介】\n\n", &self.descr, "\n\n")
            .line("【配置需求】\n\n", self.sysreq.join("\n"), "\n\n")
            .gallery("【游戏截图】", &self.screenshot)
    }
}

pub struct Steam {
    fetcher: Arc<dyn Fetcher>,
}

impl Steam {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for Steam {
    fn site(&self) -> Site {
        Site::Steam
    }

    async fn generate(&self, sid: &str) -> Result<Record> {
        if sid.is_empty() || !sid.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Record::failure(Site::Steam, sid, NONE_EXIST_ERROR));
        }

        let store_url = format!("https://store.steampowered.com/app/{}/?l=schinese", sid);
        let steamdb_url = format!("https://steamdb.keylol.com/app/{}/data.js?v=38", sid);
        let options = FetchOptions {
            cookie: Some(STORE_COOKIE.to_string()),
            no_redirect: true,
        };

        tracing::debug!("Generating steam app {}", sid);
        let (page, steamdb) = futures::join!(
            self.fetcher.fetch(&store_url, &options),
            self.fetcher.get(&steamdb_url),
        );
        let page = page?;

        // Unknown apps redirect to the store front page
        if (300..400).contains(&page.status) {
            return Ok(Record::failure(Site::Steam, sid, NONE_EXIST_ERROR));
        }
        if page.status == 403 {
            return Ok(Record::failure(Site::Steam, sid, BANNED_ERROR));
        }

        let mut info = parse_app(&page.body)?;
        info.steam_id = sid.to_string();

        match steamdb {
            Ok(response) => info.name_chs = as_text(&parse_jsonp(&response.body)["name_cn"]),
            Err(e) => tracing::warn!("SteamDB data for {} unavailable: {}", sid, e),
        }

        Ok(Record::found(sid, Details::Steam(info)))
    }
}

fn parse_app(raw: &str) -> Result<SteamInfo> {
    let doc = Document::parse(raw);

    let poster = doc
        .attr("img.game_header_image_full[src]", "src")?
        .map(|src| strip_timestamp(&src).to_string())
        .unwrap_or_default();

    let detail = match doc.first("div.details_block")? {
        Some(block) => rejoin(&LABEL_GAP.replace_all(&text_of(block), ": "), "\n", "\n"),
        None => String::new(),
    };

    let review = doc
        .texts("div.user_reviews_summary_row")?
        .into_iter()
        .map(|row| {
            WHITESPACE_RUN
                .replace_all(&row.replacen('：', ":", 1), " ")
                .trim()
                .to_string()
        })
        .collect();

    let linkbar = doc
        .select("a.linkbar")?
        .into_iter()
        .find(|a| text_of(*a).contains("访问网站"))
        .and_then(|a| attr_of(a, "href"))
        .map(|href| decode_link_filter(&href))
        .unwrap_or_default();

    let descr = match doc.first("div#game_area_description")? {
        Some(description) => html_to_bbcode(&description.inner_html())
            .replacen("[h2]关于这款游戏[/h2]", "", 1)
            .trim()
            .to_string(),
        None => String::new(),
    };

    let screenshot = doc
        .attrs("div.screenshot_holder a", "href")?
        .into_iter()
        .map(|href| SCREENSHOT.replace(&href, "$1$2").into_owned())
        .collect();

    Ok(SteamInfo {
        cover: poster.clone(),
        poster,
        name: doc.first_text(&["div.apphub_AppName", r#"span[itemprop="name"]"#])?,
        detail,
        linkbar,
        tags: doc.texts("a.app_tag")?,
        review,
        language: parse_languages(&doc)?,
        descr,
        screenshot,
        sysreq: parse_sysreq(&doc)?,
        ..Default::default()
    })
}

fn strip_timestamp(url: &str) -> &str {
    url.split("?t=").next().unwrap_or(url)
}

/// Target of a `linkfilter/?u=` (or `?url=`) redirect.
fn decode_link_filter(href: &str) -> String {
    Url::parse(href)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "u" || key == "url")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| href.to_string())
}

/// First three supported languages with their interface/audio/subtitle flags.
fn parse_languages(doc: &Document) -> Result<Vec<String>> {
    let mut languages = Vec::new();
    for row in doc
        .select("table.game_language_options tr:not(.unsupported)")?
        .into_iter()
        .skip(1)
        .take(3)
    {
        let cells = select_in(row, "td")?;
        let Some(name) = cells.first().map(|td| text_of(*td).trim().to_string()) else {
            continue;
        };

        let supported: Vec<&str> = LANGUAGE_COLUMNS
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                cells
                    .get(i + 1)
                    .is_some_and(|td| text_of(*td).contains('✔'))
            })
            .map(|(_, column)| *column)
            .collect();

        languages.push(if supported.is_empty() {
            name
        } else {
            format!("{} ({})", name, supported.join(", "))
        });
    }
    Ok(languages)
}

fn parse_sysreq(doc: &Document) -> Result<Vec<String>> {
    let mut sysreq = Vec::new();
    for block in doc.select("div.sysreq_contents > div.game_area_sys_req")? {
        let os = match block.value().attr("data-os") {
            Some("win") => "Windows",
            Some("mac") => "Mac OS X",
            Some("linux") => "SteamOS + Linux",
            Some(other) => other,
            None => "",
        };

        let marked = LINE_BREAK.replace_all(&block.inner_html(), "[br]").into_owned();
        let text = text_of(Document::fragment(&marked).root());
        // Blank lines separate minimum from recommended; [br] separates rows
        let content = rejoin(&rejoin(&text, "\n", "\n\n"), "[br]", "\n");

        sysreq.push(format!("{}\n{}", os, content));
    }
    Ok(sysreq)
}

/// Pieces of `text` between `split`, trimmed, blank ones dropped.
fn rejoin(text: &str, split: &str, join: &str) -> String {
    text.split(split)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;

    const STORE: &str = "https://store.steampowered.com/app/367520/?l=schinese";
    const STEAMDB: &str = "https://steamdb.keylol.com/app/367520/data.js?v=38";

    const APP_PAGE: &str = r##"<html><body>
        <div class="apphub_AppName">Hollow Knight</div>
        <img class="game_header_image_full" src="https://cdn.akamai.steamstatic.com/steam/apps/367520/header_schinese.jpg?t=1667006028">
        <a class="app_tag" href="#"> 类银河战士恶魔城 </a>
        <a class="app_tag" href="#">独立</a>
        <div class="user_reviews_summary_row">
            <div class="subtitle column">全部评测：</div>
            <div class="summary column"><span class="game_review_summary positive">好评如潮</span>
            <span class="responsive_hidden">(123,456)</span></div>
        </div>
        <div class="details_block">
            <b>名称:</b> Hollow Knight<br>
            <b>开发者:</b>
            <a href="#">Team Cherry</a><br>
            <b>发行日期:</b> 2017 年 2 月 24 日<br>
        </div>
        <a class="linkbar" href="https://discord.gg/hollowknight">Discord</a>
        <a class="linkbar" href="https://steamcommunity.com/linkfilter/?u=http%3A%2F%2Fhollowknight.com" rel="noreferrer">访问网站 <img src="x"></a>
        <table class="game_language_options">
            <tr><th></th><th>界面</th><th>完全音频</th><th>字幕</th></tr>
            <tr><td class="ellipsis">简体中文</td><td class="checkcol"><span>✔</span></td><td class="checkcol"></td><td class="checkcol"><span>✔</span></td></tr>
            <tr class="unsupported"><td>德语</td><td></td><td></td><td></td></tr>
            <tr><td>英语</td><td class="checkcol"><span>✔</span></td><td class="checkcol"><span>✔</span></td><td class="checkcol"><span>✔</span></td></tr>
            <tr><td>法语</td><td class="checkcol"></td><td class="checkcol"></td><td class="checkcol"></td></tr>
            <tr><td>日语</td><td class="checkcol"><span>✔</span></td><td></td><td></td></tr>
        </table>
        <div id="game_area_description" class="game_area_description"><h2>关于这款游戏</h2>在 <i>空洞骑士</i> 中探索。</div>
        <div class="sysreq_contents">
            <div class="game_area_sys_req sysreq_content active" data-os="win">
                <strong>最低配置:</strong><br>
                <strong>操作系统:</strong> Windows 7<br>
                <strong>处理器:</strong> Intel Core 2 Duo<br>
            </div>
        </div>
        <div class="screenshot_holder"><a href="https://store.steampowered.com/linkfilter/?url=https://steamcdn-a.akamaihd.net/steam/apps/367520/ss_5384f9f8.1920x1080.jpg?t=1568137346"></a></div>
        <div class="screenshot_holder"><a href="https://shared.steamstatic.com/ss_d5b6.jpg"></a></div>
    </body></html>"##;

    #[test]
    fn test_parse_app() {
        let info = parse_app(APP_PAGE).unwrap();

        assert_eq!(info.name, "Hollow Knight");
        assert_eq!(
            info.poster,
            "https://cdn.akamai.steamstatic.com/steam/apps/367520/header_schinese.jpg"
        );
        assert_eq!(info.tags, vec!["类银河战士恶魔城", "独立"]);
        assert_eq!(info.review, vec!["全部评测: 好评如潮 (123,456)"]);
        assert_eq!(
            info.detail,
            "名称: Hollow Knight\n开发者: Team Cherry\n发行日期: 2017 年 2 月 24 日"
        );
        assert_eq!(info.linkbar, "http://hollowknight.com");
        assert_eq!(info.descr, "在 [i]空洞骑士[/i] 中探索。");
    }

    #[test]
    fn test_languages_skip_unsupported_and_cap_at_three() {
        let info = parse_app(APP_PAGE).unwrap();
        assert_eq!(
            info.language,
            vec!["简体中文 (界面, 字幕)", "英语 (界面, 完全音频, 字幕)", "法语"]
        );
    }

    #[test]
    fn test_screenshots() {
        let info = parse_app(APP_PAGE).unwrap();
        assert_eq!(
            info.screenshot,
            vec![
                "https://steamcdn-a.akamaihd.net/steam/apps/367520/ss_5384f9f8.jpg",
                "https://shared.steamstatic.com/ss_d5b6.jpg",
            ]
        );
    }

    #[test]
    fn test_sysreq() {
        let info = parse_app(APP_PAGE).unwrap();
        assert_eq!(
            info.sysreq,
            vec!["Windows\n最低配置:\n操作系统: Windows 7\n处理器: Intel Core 2 Duo"]
        );
    }

    #[test]
    fn test_decode_link_filter() {
        assert_eq!(
            decode_link_filter("https://steamcommunity.com/linkfilter/?url=https%3A%2F%2Fexample.com%2Fa"),
            "https://example.com/a"
        );
        assert_eq!(decode_link_filter("https://example.com/"), "https://example.com/");
    }

    #[tokio::test]
    async fn test_generate() {
        let stub = Arc::new(
            StubFetcher::new()
                .route(STORE, 200, APP_PAGE)
                .route(STEAMDB, 200, r#"proc({"name_cn":"空洞骑士"});"#),
        );
        let record = Steam::new(stub.clone()).generate("367520").await.unwrap();

        assert!(record.success);
        let format = &record.format;
        assert!(format.starts_with("[img]https://cdn.akamai.steamstatic.com/"));
        assert!(format.contains("【基本信息】\n\n中文名: 空洞骑士\n名称: Hollow Knight\n"));
        assert!(format.contains("官方网站: http://hollowknight.com\n"));
        assert!(format.contains("Steam页面: https://store.steampowered.com/app/367520/\n"));
        assert!(format.contains("标签: 类银河战士恶魔城 | 独立\n\n全部评测: 好评如潮 (123,456)\n\n【游戏简介】"));
        assert!(format.contains("【配置需求】\n\nWindows\n最低配置:"));
        assert!(format.ends_with("[img]https://shared.steamstatic.com/ss_d5b6.jpg[/img]"));

        let (_, options) = stub
            .calls()
            .into_iter()
            .find(|(url, _)| url == STORE)
            .unwrap();
        assert!(options.no_redirect);
        assert!(options.cookie.unwrap().contains("birthtime=157737601"));
    }

    #[tokio::test]
    async fn test_missing_steamdb_is_tolerated() {
        let stub = StubFetcher::new().route(STORE, 200, APP_PAGE);
        let record = Steam::new(Arc::new(stub)).generate("367520").await.unwrap();
        assert!(record.success);
        assert!(!record.format.contains("中文名"));
    }

    #[tokio::test]
    async fn test_redirect_and_ban() {
        let stub = StubFetcher::new()
            .route(STORE, 302, "")
            .route(STEAMDB, 200, "");
        let record = Steam::new(Arc::new(stub)).generate("367520").await.unwrap();
        assert_eq!(record.error.as_deref(), Some(NONE_EXIST_ERROR));

        let stub = StubFetcher::new()
            .route(STORE, 403, "")
            .route(STEAMDB, 200, "");
        let record = Steam::new(Arc::new(stub)).generate("367520").await.unwrap();
        assert_eq!(record.error.as_deref(), Some(BANNED_ERROR));
    }
}
