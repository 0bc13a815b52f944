//! Declarative BBCode description templates.
//!
//! Each source lists its lines in a fixed order; a line is emitted only when
//! its value is non-empty, so rendering stays a pure function of the fields.

#[derive(Debug, Clone)]
enum Entry {
    Line {
        prefix: String,
        value: String,
        suffix: String,
    },
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct Template {
    entries: Vec<Entry>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{prefix}{value}{suffix}`, skipped when `value` is empty.
    pub fn line(
        mut self,
        prefix: impl Into<String>,
        value: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        self.entries.push(Entry::Line {
            prefix: prefix.into(),
            value: value.into(),
            suffix: suffix.into(),
        });
        self
    }

    /// `{label}{value}\n`
    pub fn field(self, label: &str, value: impl Into<String>) -> Self {
        self.line(label, value, "\n")
    }

    pub fn poster(self, url: &str) -> Self {
        self.line("[img]", url, "[/img]\n\n")
    }

    /// A `heading` followed by one `[img]` per url.
    pub fn gallery(self, heading: &str, urls: &[String]) -> Self {
        self.line(format!("{}\n\n", heading), images(urls), "\n\n")
    }

    /// Unconditional text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.entries.push(Entry::Text(text.into()));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                Entry::Line {
                    prefix,
                    value,
                    suffix,
                } => {
                    if !value.is_empty() {
                        out.push_str(prefix);
                        out.push_str(value);
                        out.push_str(suffix);
                    }
                }
                Entry::Text(text) => out.push_str(text),
            }
        }
        out.trim().to_string()
    }
}

pub fn images(urls: &[String]) -> String {
    urls.iter()
        .map(|url| format!("[img]{}[/img]", url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-indent continuation lines of a multi-line value.
pub fn indent(value: &str, padding: &str) -> String {
    value.replace('\n', &format!("\n{}", padding))
}
