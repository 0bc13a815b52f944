use scraper::{ElementRef, Html, Selector};

use crate::app::{GenError, Result};

pub fn css(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| GenError::Selector(format!("{}: {}", selector, e)))
}

/// Parsed page. Not `Send`: parse, extract into owned values, then drop
/// before the next await point.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_document(raw),
        }
    }

    pub fn fragment(raw: &str) -> Self {
        Self {
            html: Html::parse_fragment(raw),
        }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn select(&self, selector: &str) -> Result<Vec<ElementRef<'_>>> {
        let selector = css(selector)?;
        Ok(self.html.select(&selector).collect())
    }

    pub fn first(&self, selector: &str) -> Result<Option<ElementRef<'_>>> {
        let selector = css(selector)?;
        Ok(self.html.select(&selector).next())
    }

    /// Concatenated text of every match, trimmed.
    pub fn text(&self, selector: &str) -> Result<String> {
        Ok(self
            .select(selector)?
            .into_iter()
            .map(text_of)
            .collect::<String>()
            .trim()
            .to_string())
    }

    /// Trimmed text of each match.
    pub fn texts(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self
            .select(selector)?
            .into_iter()
            .map(|el| text_of(el).trim().to_string())
            .collect())
    }

    /// Attribute of the first match that carries it.
    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .select(selector)?
            .into_iter()
            .find_map(|el| attr_of(el, name)))
    }

    pub fn attrs(&self, selector: &str, name: &str) -> Result<Vec<String>> {
        Ok(self
            .select(selector)?
            .into_iter()
            .filter_map(|el| attr_of(el, name))
            .collect())
    }

    /// Text of the first candidate selector whose matches carry non-blank text.
    pub fn first_text(&self, candidates: &[&str]) -> Result<String> {
        for candidate in candidates {
            let text = self.text(candidate)?;
            if !text.is_empty() {
                return Ok(text);
            }
        }
        Ok(String::new())
    }

    /// For `<span class="pl">Label:</span> value<br>` layouts: the bare text
    /// node right after the first label element whose text contains `label`.
    pub fn labeled(&self, labels: &str, label: &str) -> Result<Option<String>> {
        Ok(self
            .select(labels)?
            .into_iter()
            .find(|el| text_of(*el).contains(label))
            .and_then(following_text))
    }
}

pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

pub fn attr_of(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value().attr(name).map(String::from)
}

pub fn select_in<'a>(scope: ElementRef<'a>, selector: &str) -> Result<Vec<ElementRef<'a>>> {
    let selector = css(selector)?;
    Ok(scope.select(&selector).collect())
}

/// Concatenated text of every match under `scope`, trimmed.
pub fn text_in(scope: ElementRef<'_>, selector: &str) -> Result<String> {
    Ok(select_in(scope, selector)?
        .into_iter()
        .map(text_of)
        .collect::<String>()
        .trim()
        .to_string())
}

/// Trimmed value of the text node immediately following `el`.
pub fn following_text(el: ElementRef<'_>) -> Option<String> {
    el.next_sibling()
        .and_then(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
}
