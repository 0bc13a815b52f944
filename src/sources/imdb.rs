//! IMDb titles.
//!
//! The title page's ld+json block is the primary source. `__NEXT_DATA__`
//! adds review counts and rankings, the details panel is read as
//! label/value pairs, and the release-info sub-page supplies per-country
//! dates and alternate titles.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::app::Result;
use crate::domain::{Details, Person, Record, SearchResult, Site};
use crate::fetcher::Fetcher;
use crate::parser::html::{attr_of, select_in, text_in, text_of};
use crate::parser::{as_text, parse_embedded_json, Document};
use crate::sources::{or_zero, people, split_list, Adapter, Searcher, NONE_EXIST_ERROR};
use crate::template::{indent, Template};

const LIST_ITEM: &str = "li.ipc-metadata-list__item";
const ITEM_LABEL: &str = ".ipc-metadata-list-item__label";
const ITEM_VALUE: &str = ".ipc-metadata-list-item__list-content-item";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseDate {
    pub country: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AkaTitle {
    pub country: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImdbInfo {
    pub imdb_id: String,
    pub imdb_link: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    pub genre: Vec<String>,
    #[serde(rename = "contentRating")]
    pub content_rating: String,
    #[serde(rename = "datePublished")]
    pub date_published: String,
    pub description: String,
    pub duration: String,
    pub poster: String,
    pub year: String,
    pub actors: Vec<Person>,
    pub directors: Vec<Person>,
    pub creators: Vec<Person>,
    pub keywords: Vec<String>,
    pub imdb_votes: String,
    pub imdb_rating_average: String,
    pub imdb_rating: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metascore: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critic: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u64>,
    pub details: BTreeMap<String, Vec<String>>,
    pub release_date: Vec<ReleaseDate>,
    pub aka: Vec<AkaTitle>,
}

impl ImdbInfo {
    pub fn template(&self) -> Template {
        let names = |people: &[Person]| {
            people
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" / ")
        };

        Template::new()
            .poster(&self.poster)
            .field("Title: ", &self.name)
            .field("Keywords: ", self.keywords.join(", "))
            .field("Date Published: ", &self.date_published)
            .field("IMDb Rating: ", &self.imdb_rating)
            .field("IMDb Link: ", &self.imdb_link)
            .field("Directors: ", names(&self.directors))
            .field("Creators: ", names(&self.creators))
            .field("Actors: ", names(&self.actors))
            .line(
                "\nIntroduction\n    ",
                indent(&self.description, "　　"),
                "\n",
            )
    }
}

pub struct Imdb {
    fetcher: Arc<dyn Fetcher>,
}

impl Imdb {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for Imdb {
    fn site(&self) -> Site {
        Site::Imdb
    }

    async fn generate(&self, sid: &str) -> Result<Record> {
        let Some(imdb_id) = normalize_id(sid) else {
            return Ok(Record::failure(Site::Imdb, sid, NONE_EXIST_ERROR));
        };

        let link = format!("https://www.imdb.com/title/{}/", imdb_id);
        let release_link = format!("{}releaseinfo", link);

        tracing::debug!("Generating imdb title {}", imdb_id);
        let (page, release) = futures::try_join!(
            self.fetcher.get(&link),
            self.fetcher.get(&release_link),
        )?;

        if page.status == 404 || page.body.contains("404 Error - IMDb") {
            return Ok(Record::failure(Site::Imdb, sid, NONE_EXIST_ERROR));
        }

        let mut info = parse_title(&page.body, &imdb_id, &link)?;
        let (release_date, aka) = parse_release_info(&release.body)?;
        info.release_date = release_date;
        info.aka = aka;

        Ok(Record::found(sid, Details::Imdb(info)))
    }
}

#[derive(Debug, Default, Deserialize)]
struct Suggestions {
    #[serde(default)]
    d: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    #[serde(default)]
    id: String,
    #[serde(default)]
    l: String,
    #[serde(default)]
    q: String,
    #[serde(default)]
    y: Value,
}

#[async_trait]
impl Searcher for Imdb {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim().to_lowercase();
        let Some(first) = query.chars().next() else {
            return Ok(Vec::new());
        };

        let encode = |s: &str| form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
        let url = format!(
            "https://v2.sg.media-imdb.com/suggestion/{}/{}.json",
            encode(&first.to_string()),
            encode(&query)
        );
        let response = self.fetcher.get(&url).await?;
        let suggestions: Suggestions = serde_json::from_str(&response.body)?;

        Ok(suggestions
            .d
            .into_iter()
            .filter(|s| s.id.starts_with("tt"))
            .map(|s| SearchResult {
                year: as_text(&s.y),
                subtype: s.q,
                title: s.l,
                subtitle: None,
                link: format!("https://www.imdb.com/title/{}", s.id),
            })
            .collect())
    }
}

/// `tt` plus at least seven digits, from `tt123`, `123` or `tt0111161`.
pub fn normalize_id(sid: &str) -> Option<String> {
    let digits = sid.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("tt{:0>7}", digits))
}

fn parse_title(raw: &str, imdb_id: &str, link: &str) -> Result<ImdbInfo> {
    let doc = Document::parse(raw);

    let ld_json = match doc.first(r#"script[type="application/ld+json"]"#)? {
        Some(script) => parse_embedded_json(&text_of(script))?,
        None => Value::Null,
    };
    let next_data = match doc.first("script#__NEXT_DATA__")? {
        Some(script) => parse_embedded_json(&text_of(script))?,
        None => Value::Null,
    };

    let genre = match &ld_json["genre"] {
        Value::Array(items) => items.iter().map(as_text).collect(),
        Value::String(genre) => vec![genre.clone()],
        _ => Vec::new(),
    };
    let date_published = as_text(&ld_json["datePublished"]);

    let rating = &ld_json["aggregateRating"];
    let imdb_votes = or_zero(as_text(&rating["ratingCount"]));
    let imdb_rating_average = or_zero(as_text(&rating["ratingValue"]));

    let title = title_data(&next_data, imdb_id);
    let count = |path: &[&str]| {
        path.iter()
            .try_fold(&title, |value, key| value.get(*key))
            .and_then(Value::as_u64)
    };

    Ok(ImdbInfo {
        imdb_id: imdb_id.to_string(),
        imdb_link: link.to_string(),
        kind: as_text(&ld_json["@type"]),
        name: as_text(&ld_json["name"]),
        genre,
        content_rating: as_text(&ld_json["contentRating"]),
        year: date_published.chars().take(4).collect(),
        date_published,
        description: as_text(&ld_json["description"]),
        duration: as_text(&ld_json["duration"]),
        poster: as_text(&ld_json["image"]),
        actors: people(&ld_json["actor"]),
        directors: people(&ld_json["director"]),
        creators: people(&ld_json["creator"]),
        keywords: split_list(&as_text(&ld_json["keywords"]), ","),
        imdb_rating: format!("{}/10 from {} users", imdb_rating_average, imdb_votes),
        imdb_votes,
        imdb_rating_average,
        metascore: count(&["metacritic", "metascore", "score"]),
        reviews: count(&["reviews", "total"]),
        critic: count(&["criticReviewsTotal", "total"]),
        popularity: count(&["meterRanking", "currentRank"]),
        details: parse_details(&doc)?,
        ..Default::default()
    })
}

/// Every non-null field describing `imdb_id` across the page's data
/// fragments, later fragments overriding earlier ones.
fn title_data(next_data: &Value, imdb_id: &str) -> Value {
    let mut merged = Map::new();
    let mut absorb = |fragment: &Value| {
        if let Value::Object(fields) = fragment {
            for (key, value) in fields {
                if !value.is_null() {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    };

    if let Some(Value::Object(state)) = next_data.pointer("/props/urqlState") {
        for entry in state.values() {
            let title = &entry["data"]["title"];
            if title["id"].as_str() == Some(imdb_id) {
                absorb(title);
            }
        }
    }
    for key in ["aboveTheFoldData", "mainColumnData"] {
        if let Some(fragment) = next_data.pointer(&format!("/props/pageProps/{}", key)) {
            absorb(fragment);
        }
    }

    Value::Object(merged)
}

fn parse_details(doc: &Document) -> Result<BTreeMap<String, Vec<String>>> {
    let mut details = BTreeMap::new();
    let items = doc.select(&format!(
        "section[cel_widget_id='StaticFeature_Details'] {}",
        LIST_ITEM
    ))?;

    for item in items {
        let label = text_in(item, ITEM_LABEL)?;
        let values: Vec<String> = select_in(item, ITEM_VALUE)?
            .into_iter()
            .map(|value| {
                let text = text_of(value).trim().to_string();
                match attr_of(value, "href") {
                    Some(href) if href.starts_with("http") => format!("{} - {}", text, href),
                    _ => text,
                }
            })
            .collect();

        if !label.is_empty() && !values.is_empty() {
            details.insert(label, values);
        }
    }

    Ok(details)
}

/// Release dates and alternate titles. The legacy table markup wins when
/// present; otherwise the metadata-list sections are read.
fn parse_release_info(raw: &str) -> Result<(Vec<ReleaseDate>, Vec<AkaTitle>)> {
    let doc = Document::parse(raw);

    let mut release_dates = table_pairs(
        &doc,
        "tr.release-date-item",
        "td.release-date-item__country-name",
        "td.release-date-item__date",
    )?;
    if release_dates.is_empty() {
        release_dates = list_pairs(&doc, r#"[data-testid="sub-section-releases"]"#)?;
    }

    let mut akas = table_pairs(&doc, "tr.aka-item", "td.aka-item__name", "td.aka-item__title")?;
    if akas.is_empty() {
        akas = list_pairs(&doc, r#"[data-testid="sub-section-akas"]"#)?;
    }

    Ok((
        release_dates
            .into_iter()
            .map(|(country, date)| ReleaseDate { country, date })
            .collect(),
        akas.into_iter()
            .map(|(country, title)| AkaTitle { country, title })
            .collect(),
    ))
}

fn table_pairs(
    doc: &Document,
    rows: &str,
    key: &str,
    value: &str,
) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for row in doc.select(rows)? {
        let (k, v) = (text_in(row, key)?, text_in(row, value)?);
        if !k.is_empty() && !v.is_empty() {
            pairs.push((k, v));
        }
    }
    Ok(pairs)
}

fn list_pairs(doc: &Document, section: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for item in doc.select(&format!("{} {}", section, LIST_ITEM))? {
        let key = text_in(item, ITEM_LABEL)?;
        let value = select_in(item, ITEM_VALUE)?
            .into_iter()
            .next()
            .map(|el| text_of(el).trim().to_string())
            .unwrap_or_default();
        if !key.is_empty() && !value.is_empty() {
            pairs.push((key, value));
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;

    const LINK: &str = "https://www.imdb.com/title/tt0111161/";
    const RELEASE: &str = "https://www.imdb.com/title/tt0111161/releaseinfo";

    const TITLE_PAGE: &str = r#"<html><head>
        <script type="application/ld+json">{
            "@type": "Movie",
            "name": "The Shawshank Redemption",
            "image": "https://m.media-amazon.com/images/M/poster.jpg",
            "description": "Two imprisoned men bond over a number of years.",
            "contentRating": "R",
            "genre": ["Drama"],
            "datePublished": "1994-10-14",
            "keywords": "prison,escape,friendship",
            "duration": "PT2H22M",
            "aggregateRating": {"ratingCount": 2800000, "ratingValue": 9.3},
            "director": [{"@type": "Person", "url": "https://www.imdb.com/name/nm0001104/", "name": "Frank Darabont"}],
            "creator": [
                {"@type": "Organization", "url": "https://www.imdb.com/company/co0040620/"},
                {"@type": "Person", "url": "https://www.imdb.com/name/nm0000175/", "name": "Stephen King"}
            ],
            "actor": [
                {"@type": "Person", "url": "https://www.imdb.com/name/nm0000209/", "name": "Tim Robbins"},
                {"@type": "Person", "url": "https://www.imdb.com/name/nm0000151/", "name": "Morgan Freeman"}
            ]
        }</script>
        <script id="__NEXT_DATA__" type="application/json">{
            "props": {
                "pageProps": {
                    "aboveTheFoldData": {"id": "tt0111161", "meterRanking": {"currentRank": 75}, "reviews": null},
                    "mainColumnData": {"id": "tt0111161", "criticReviewsTotal": {"total": 171}}
                },
                "urqlState": {
                    "1": {"data": {"title": {"id": "tt0111161", "metacritic": {"metascore": {"score": 82}}, "reviews": {"total": 11500}}}},
                    "2": {"data": {"title": {"id": "tt9999999", "reviews": {"total": 1}}}}
                }
            }
        }</script>
        </head><body>
        <section cel_widget_id="StaticFeature_Details"><ul>
            <li class="ipc-metadata-list__item">
                <span class="ipc-metadata-list-item__label">Country of origin</span>
                <ul><li><a class="ipc-metadata-list-item__list-content-item" href="/search/title/?country_of_origin=US">United States</a></li></ul>
            </li>
            <li class="ipc-metadata-list__item">
                <span class="ipc-metadata-list-item__label">Official site</span>
                <ul><li><a class="ipc-metadata-list-item__list-content-item" href="https://www.warnerbros.com/">Official Facebook</a></li></ul>
            </li>
            <li class="ipc-metadata-list__item">
                <span class="ipc-metadata-list-item__label">Empty</span>
            </li>
        </ul></section>
        </body></html>"#;

    const LEGACY_RELEASE_PAGE: &str = r#"<html><body><table>
        <tr class="release-date-item">
            <td class="release-date-item__country-name"><a href="/x">Canada</a></td>
            <td class="release-date-item__date">10 September 1994</td>
        </tr>
        <tr class="release-date-item">
            <td class="release-date-item__country-name">Nowhere</td>
            <td class="release-date-item__date"> </td>
        </tr>
        </table><table>
        <tr class="aka-item"><td class="aka-item__name">Brazil</td><td class="aka-item__title">Um Sonho de Liberdade</td></tr>
        </table></body></html>"#;

    const CURRENT_RELEASE_PAGE: &str = r#"<html><body>
        <div data-testid="sub-section-releases"><ul>
            <li class="ipc-metadata-list__item">
                <a class="ipc-metadata-list-item__label">United States</a>
                <ul><li><span class="ipc-metadata-list-item__list-content-item">October 14, 1994</span></li></ul>
            </li>
        </ul></div>
        <div data-testid="sub-section-akas"><ul>
            <li class="ipc-metadata-list__item">
                <span class="ipc-metadata-list-item__label">France</span>
                <ul><li><span class="ipc-metadata-list-item__list-content-item">Les évadés</span></li></ul>
            </li>
        </ul></div>
        </body></html>"#;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("tt0111161").as_deref(), Some("tt0111161"));
        assert_eq!(normalize_id("111161").as_deref(), Some("tt0111161"));
        assert_eq!(normalize_id("tt12345678").as_deref(), Some("tt12345678"));
        assert_eq!(normalize_id("42").as_deref(), Some("tt0000042"));
        assert_eq!(normalize_id("tt"), None);
        assert_eq!(normalize_id("tt12ab"), None);
    }

    #[test]
    fn test_parse_title() {
        let info = parse_title(TITLE_PAGE, "tt0111161", LINK).unwrap();

        assert_eq!(info.kind, "Movie");
        assert_eq!(info.name, "The Shawshank Redemption");
        assert_eq!(info.genre, vec!["Drama"]);
        assert_eq!(info.year, "1994");
        assert_eq!(info.keywords, vec!["prison", "escape", "friendship"]);
        assert_eq!(info.imdb_rating, "9.3/10 from 2800000 users");
        assert_eq!(info.creators.len(), 1);
        assert_eq!(info.creators[0].name, "Stephen King");
        assert_eq!(info.actors.len(), 2);
        assert_eq!(info.metascore, Some(82));
        assert_eq!(info.reviews, Some(11500));
        assert_eq!(info.critic, Some(171));
        assert_eq!(info.popularity, Some(75));
    }

    #[test]
    fn test_parse_details() {
        let info = parse_title(TITLE_PAGE, "tt0111161", LINK).unwrap();
        assert_eq!(info.details["Country of origin"], vec!["United States"]);
        assert_eq!(
            info.details["Official site"],
            vec!["Official Facebook - https://www.warnerbros.com/"]
        );
        assert!(!info.details.contains_key("Empty"));
    }

    #[test]
    fn test_release_info_legacy_markup() {
        let (dates, akas) = parse_release_info(LEGACY_RELEASE_PAGE).unwrap();
        assert_eq!(
            dates,
            vec![ReleaseDate {
                country: "Canada".into(),
                date: "10 September 1994".into()
            }]
        );
        assert_eq!(akas[0].title, "Um Sonho de Liberdade");
    }

    #[test]
    fn test_release_info_current_markup() {
        let (dates, akas) = parse_release_info(CURRENT_RELEASE_PAGE).unwrap();
        assert_eq!(dates[0].country, "United States");
        assert_eq!(dates[0].date, "October 14, 1994");
        assert_eq!(
            akas,
            vec![AkaTitle {
                country: "France".into(),
                title: "Les évadés".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_generate() {
        let stub = StubFetcher::new()
            .route(LINK, 200, TITLE_PAGE)
            .route(RELEASE, 200, LEGACY_RELEASE_PAGE);
        let record = Imdb::new(Arc::new(stub)).generate("111161").await.unwrap();

        assert!(record.success);
        assert_eq!(record.sid, "111161");
        assert_eq!(
            record.format,
            "[img]https://m.media-amazon.com/images/M/poster.jpg[/img]\n\n\
             Title: The Shawshank Redemption\n\
             Keywords: prison, escape, friendship\n\
             Date Published: 1994-10-14\n\
             IMDb Rating: 9.3/10 from 2800000 users\n\
             IMDb Link: https://www.imdb.com/title/tt0111161/\n\
             Directors: Frank Darabont\n\
             Creators: Stephen King\n\
             Actors: Tim Robbins / Morgan Freeman\n\n\
             Introduction\n    Two imprisoned men bond over a number of years."
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["@type"], "Movie");
        assert_eq!(json["imdb_id"], "tt0111161");
        assert_eq!(json["release_date"][0]["country"], "Canada");
    }

    #[tokio::test]
    async fn test_not_found() {
        let stub = StubFetcher::new()
            .route(LINK, 404, "<title>404 Error - IMDb</title>")
            .route(RELEASE, 404, "");
        let record = Imdb::new(Arc::new(stub)).generate("tt0111161").await.unwrap();
        assert_eq!(record.error.as_deref(), Some(NONE_EXIST_ERROR));

        let record = Imdb::new(Arc::new(StubFetcher::new()))
            .generate("ttabc")
            .await
            .unwrap();
        assert!(!record.success);
    }

    #[tokio::test]
    async fn test_search_keeps_titles_only() {
        let stub = StubFetcher::new().route(
            "https://v2.sg.media-imdb.com/suggestion/s/shawshank.json",
            200,
            r#"{"d": [
                {"id": "tt0111161", "l": "The Shawshank Redemption", "q": "feature", "y": 1994},
                {"id": "nm0000209", "l": "Tim Robbins"}
            ]}"#,
        );
        let results = Imdb::new(Arc::new(stub)).search("Shawshank").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].year, "1994");
        assert_eq!(results[0].subtype, "feature");
        assert_eq!(results[0].link, "https://www.imdb.com/title/tt0111161");
    }
}
