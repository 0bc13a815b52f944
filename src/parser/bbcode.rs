use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

static LINE_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("valid padding regex"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));

/// Convert a rich-text fragment into BBCode.
///
/// Block elements end their line, inline formatting maps onto the matching
/// tag, and whitespace inside text runs collapses the way a browser would
/// show it.
pub fn html_to_bbcode(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    children(fragment.root_element(), &mut out);

    let out = LINE_PADDING.replace_all(&out, "\n");
    BLANK_RUNS.replace_all(&out, "\n\n").trim().to_string()
}

fn children(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn element(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    match name {
        "script" | "style" | "noscript" => {}
        "br" => out.push('\n'),
        "img" => {
            if let Some(src) = el.value().attr("src") {
                out.push_str(&format!("[img]{}[/img]", src));
            }
        }
        "b" | "strong" => wrap(el, out, "[b]", "[/b]"),
        "i" | "em" => wrap(el, out, "[i]", "[/i]"),
        "u" => wrap(el, out, "[u]", "[/u]"),
        "s" | "strike" | "del" => wrap(el, out, "[s]", "[/s]"),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            block_break(out);
            wrap(el, out, &format!("[{}]", name), &format!("[/{}]", name));
            out.push('\n');
        }
        "a" => match el.value().attr("href") {
            Some(href) => wrap(el, out, &format!("[url={}]", href), "[/url]"),
            None => children(el, out),
        },
        "blockquote" => {
            block_break(out);
            wrap(el, out, "[quote]", "[/quote]");
            out.push('\n');
        }
        "ul" => {
            block_break(out);
            wrap(el, out, "[list]\n", "[/list]");
            out.push('\n');
        }
        "ol" => {
            block_break(out);
            wrap(el, out, "[list=1]\n", "[/list]");
            out.push('\n');
        }
        "li" => {
            out.push_str("[*]");
            children(el, out);
            out.push('\n');
        }
        "p" => {
            block_break(out);
            children(el, out);
            out.push_str("\n\n");
        }
        "div" | "section" | "article" | "tr" => {
            block_break(out);
            children(el, out);
            out.push('\n');
        }
        _ => children(el, out),
    }
}

fn wrap(el: ElementRef<'_>, out: &mut String, open: &str, close: &str) {
    out.push_str(open);
    children(el, out);
    out.push_str(close);
}

fn block_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn push_text(out: &mut String, text: &str) {
    let mut last_was_space = out.ends_with(char::is_whitespace);
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
}
