use reqwest::Url;
use scraper::{Html, Selector};

const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".tar", ".gz", ".mp3", ".mp4", ".avi", ".doc", ".docx",
];

pub fn is_binary_resource(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// http(s) only, fragment removed.
pub fn clean_link(url: &Url) -> Option<Url> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let mut u = url.clone();
    u.set_fragment(None);
    Some(u)
}

pub struct ParsedPage {
    pub title: String,
    pub text: String,
    pub links: Vec<Url>,
}

/// Title, visible text (scripts and styles excluded) and absolute outlinks
/// resolved against `base`, in document order.
pub fn parse_page(html: &str, base: &Url) -> ParsedPage {
    let doc = Html::parse_document(html);
    let sel_title = Selector::parse("title").expect("valid selector");
    let sel_a = Selector::parse("a[href]").expect("valid selector");

    let title = doc
        .select(&sel_title)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let mut words: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|e| matches!(e.name(), "script" | "style" | "noscript"));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    let links = doc
        .select(&sel_a)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|h| base.join(h.trim()).ok())
        .filter_map(|u| clean_link(&u))
        .collect();

    ParsedPage { title, text: words.join(" "), links }
}
