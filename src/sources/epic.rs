//! Epic Games Store products, read from the store's content API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::app::{GenError, Result};
use crate::domain::{Details, Record, Site};
use crate::fetcher::Fetcher;
use crate::sources::{Adapter, NONE_EXIST_ERROR};
use crate::template::Template;

/// Requirement lines for one system type (`Windows`, `macOS`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemRequirements {
    pub system: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EpicInfo {
    pub name: String,
    pub epic_link: String,
    pub desc: String,
    pub poster: String,
    pub logo: String,
    pub screenshot: Vec<String>,
    pub language: Vec<String>,
    pub min_req: Vec<SystemRequirements>,
    pub max_req: Vec<SystemRequirements>,
    pub level: Vec<String>,
}

impl EpicInfo {
    pub fn template(&self) -> Template {
        Template::new()
            .poster(&self.logo)
            .text("【基本信息】\n\n")
            .field("游戏名称：", &self.name)
            .field("商店链接：", &self.epic_link)
            .text("\n")
            .line("【支持语言】\n\n", self.language.join("\n"), "\n\n")
            .line("【游戏简介】\n\n", &self.desc, "\n\n")
            .line("【最低配置】\n\n", requirements(&self.min_req), "\n\n")
            .line("【推荐配置】\n\n", requirements(&self.max_req), "\n\n")
            .gallery("【游戏截图】", &self.screenshot)
            .gallery("【游戏评级】", &self.level)
    }
}

fn requirements(systems: &[SystemRequirements]) -> String {
    systems
        .iter()
        .map(|s| format!("{}\n{}", s.system, s.items.join("\n")))
        .collect::<Vec<_>>()
        .join("\n")
}

// The content API sends `null` for absent sections as often as it omits
// them, so every field reads `null` as its default.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Product {
    #[serde(deserialize_with = "nullable")]
    pages: Vec<Page>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Page {
    #[serde(deserialize_with = "nullable")]
    product_name: String,
    #[serde(deserialize_with = "nullable")]
    data: PageData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageData {
    #[serde(deserialize_with = "nullable")]
    about: About,
    #[serde(deserialize_with = "nullable")]
    hero: Hero,
    #[serde(deserialize_with = "nullable")]
    gallery: Gallery,
    #[serde(deserialize_with = "nullable")]
    requirements: Requirements,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct About {
    #[serde(deserialize_with = "nullable")]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Hero {
    #[serde(deserialize_with = "nullable")]
    logo_image: Image,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Image {
    #[serde(deserialize_with = "nullable")]
    src: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Gallery {
    #[serde(deserialize_with = "nullable")]
    gallery_images: Vec<Image>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Requirements {
    #[serde(deserialize_with = "nullable")]
    languages: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    systems: Vec<System>,
    #[serde(deserialize_with = "nullable")]
    legal_tags: Vec<Image>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct System {
    #[serde(deserialize_with = "nullable")]
    system_type: String,
    #[serde(deserialize_with = "nullable")]
    details: Vec<Requirement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Requirement {
    #[serde(deserialize_with = "nullable")]
    title: String,
    minimum: Option<String>,
    recommended: Option<String>,
}

pub struct Epic {
    fetcher: Arc<dyn Fetcher>,
}

impl Epic {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for Epic {
    fn site(&self) -> Site {
        Site::Epic
    }

    async fn generate(&self, sid: &str) -> Result<Record> {
        if sid.is_empty() || sid.contains(['/', '?', '#']) {
            return Ok(Record::failure(Site::Epic, sid, NONE_EXIST_ERROR));
        }

        let url = format!(
            "https://store-content.ak.epicgames.com/api/zh-CN/content/products/{}",
            sid
        );
        tracing::debug!("Generating epic product {}", sid);
        let response = self.fetcher.get(&url).await?;

        if response.status == 404 {
            return Ok(Record::failure(Site::Epic, sid, NONE_EXIST_ERROR));
        }

        let product: Product = serde_json::from_str(&response.body)?;
        let info = product_info(product, sid)?;
        Ok(Record::found(sid, Details::Epic(info)))
    }
}

fn product_info(product: Product, sid: &str) -> Result<EpicInfo> {
    let page = product
        .pages
        .into_iter()
        .next()
        .ok_or_else(|| GenError::Parse(format!("epic product {} has no pages", sid)))?;
    let data = page.data;
    let requirements = data.requirements;

    let (min_req, max_req): (Vec<_>, Vec<_>) = requirements
        .systems
        .iter()
        .map(|system| {
            let lines = |pick: fn(&Requirement) -> &Option<String>| SystemRequirements {
                system: system.system_type.clone(),
                items: system
                    .details
                    .iter()
                    .map(|d| format!("{}: {}", d.title, pick(d).as_deref().unwrap_or_default()))
                    .collect(),
            };
            (lines(|d| &d.minimum), lines(|d| &d.recommended))
        })
        .unzip();

    let logo = data.hero.logo_image.src;

    Ok(EpicInfo {
        name: page.product_name,
        epic_link: format!("https://www.epicgames.com/store/zh-CN/product/{}/home", sid),
        desc: data.about.description,
        poster: logo.clone(),
        logo,
        screenshot: data
            .gallery
            .gallery_images
            .into_iter()
            .map(|image| image.src)
            .collect(),
        language: normalize_languages(&requirements.languages),
        min_req,
        max_req,
        level: requirements
            .legal_tags
            .into_iter()
            .map(|tag| tag.src)
            .collect(),
    })
}

/// Rejoin language entries the store split apart.
///
/// An entry without a `：`/`:` label continues the previous one; an entry
/// packing several labelled groups with ` - ` is split into one line each.
pub fn normalize_languages(raw: &[String]) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for lang in raw {
        let labelled = lang.contains(':') || lang.contains('：');
        if !labelled {
            if let Some(last) = languages.last_mut() {
                last.push('、');
                last.push_str(lang);
                continue;
            }
        }

        if lang.contains('-') {
            languages.extend(
                lang.split('-')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(String::from),
            );
        } else {
            languages.push(lang.clone());
        }
    }
    languages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;

    const API: &str = "https://store-content.ak.epicgames.com/api/zh-CN/content/products/celeste";

    const PRODUCT: &str = r#"{
        "productName": "Celeste",
        "pages": [{
            "productName": "Celeste",
            "data": {
                "about": {"description": "帮助玛德琳在攀登塞莱斯特山的旅程中面对内心的恶魔。"},
                "hero": {"logoImage": {"src": "https://cdn1.epicgames.com/logo.png"}},
                "gallery": {"galleryImages": [{"src": "https://cdn1.epicgames.com/s1.jpg"}, {"src": "https://cdn1.epicgames.com/s2.jpg"}]},
                "requirements": {
                    "languages": ["语音：英语", "法语", "文本：简体中文 - 字幕：日语"],
                    "systems": [{
                        "systemType": "Windows",
                        "details": [
                            {"title": "操作系统", "minimum": "Windows 7", "recommended": "Windows 10"},
                            {"title": "内存", "minimum": "2 GB", "recommended": null}
                        ]
                    }],
                    "legalTags": [{"src": "https://cdn1.epicgames.com/esrb.png"}]
                }
            }
        }]
    }"#;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_languages() {
        assert_eq!(
            normalize_languages(&strings(&["语音：英语", "法语", "文本：简体中文"])),
            vec!["语音：英语、法语", "文本：简体中文"]
        );
        assert_eq!(
            normalize_languages(&strings(&["语音：英语、法语 - 文本：俄语"])),
            vec!["语音：英语、法语", "文本：俄语"]
        );
        assert_eq!(normalize_languages(&strings(&["英语"])), vec!["英语"]);
    }

    #[test]
    fn test_product_info() {
        let product: Product = serde_json::from_str(PRODUCT).unwrap();
        let info = product_info(product, "celeste").unwrap();

        assert_eq!(info.name, "Celeste");
        assert_eq!(info.logo, "https://cdn1.epicgames.com/logo.png");
        assert_eq!(info.screenshot.len(), 2);
        assert_eq!(info.language, vec!["语音：英语、法语", "文本：简体中文", "字幕：日语"]);
        assert_eq!(
            info.min_req,
            vec![SystemRequirements {
                system: "Windows".into(),
                items: strings(&["操作系统: Windows 7", "内存: 2 GB"]),
            }]
        );
        assert_eq!(info.max_req[0].items, strings(&["操作系统: Windows 10", "内存: "]));
        assert_eq!(info.level, vec!["https://cdn1.epicgames.com/esrb.png"]);
    }

    #[test]
    fn test_product_without_pages() {
        let product: Product = serde_json::from_str(r#"{"pages": []}"#).unwrap();
        assert!(matches!(
            product_info(product, "x"),
            Err(GenError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_generate() {
        let stub = StubFetcher::new().route(API, 200, PRODUCT);
        let record = Epic::new(Arc::new(stub)).generate("celeste").await.unwrap();

        assert!(record.success);
        assert_eq!(
            record.format,
            "[img]https://cdn1.epicgames.com/logo.png[/img]\n\n\
             【基本信息】\n\n\
             游戏名称：Celeste\n\
             商店链接：https://www.epicgames.com/store/zh-CN/product/celeste/home\n\n\
             【支持语言】\n\n语音：英语、法语\n文本：简体中文\n字幕：日语\n\n\
             【游戏简介】\n\n帮助玛德琳在攀登塞莱斯特山的旅程中面对内心的恶魔。\n\n\
             【最低配置】\n\nWindows\n操作系统: Windows 7\n内存: 2 GB\n\n\
             【推荐配置】\n\nWindows\n操作系统: Windows 10\n内存: \n\n\
             【游戏截图】\n\n[img]https://cdn1.epicgames.com/s1.jpg[/img]\n[img]https://cdn1.epicgames.com/s2.jpg[/img]\n\n\
             【游戏评级】\n\n[img]https://cdn1.epicgames.com/esrb.png[/img]"
        );
    }

    #[tokio::test]
    async fn test_null_sections_degrade_to_empty() {
        let body = r#"{"pages": [{
            "productName": "Celeste",
            "data": {
                "about": {"description": null},
                "hero": {"logoImage": null},
                "gallery": {"galleryImages": null},
                "requirements": {"languages": null, "systems": [{"systemType": "Windows", "details": null}], "legalTags": null}
            }
        }]}"#;
        let stub = StubFetcher::new().route(API, 200, body);
        let record = Epic::new(Arc::new(stub)).generate("celeste").await.unwrap();

        assert!(record.success);
        let Some(Details::Epic(info)) = record.details else {
            panic!("expected epic details");
        };
        assert_eq!(info.name, "Celeste");
        assert!(info.screenshot.is_empty());
        assert!(info.language.is_empty());
        assert!(info.level.is_empty());
        assert!(info.logo.is_empty());
        assert_eq!(info.min_req[0].items, Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_not_found() {
        let stub = StubFetcher::new().route(API, 404, r#"{"errorCode": "not found"}"#);
        let record = Epic::new(Arc::new(stub)).generate("celeste").await.unwrap();
        assert_eq!(record.error.as_deref(), Some(NONE_EXIST_ERROR));
    }
}
