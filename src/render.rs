//! Digest rendering.
//!
//! Both renderers are pure functions of the aggregated feeds: no I/O, no
//! clock reads (the generation time is passed in).
use chrono::DateTime;
use chrono_tz::Tz;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::feed::{FeedItem, ParsedFeed, SortKey, SortOrder};
use crate::util::html_to_text;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M %Z";
const STYLE: &str = "body{font-family:sans-serif;max-width:60em;margin:auto;padding:1em}\
section{border-top:1px solid #ccc;margin-top:1.5em}\
.meta{color:#666;font-size:.9em}\
.missing{color:#a00}";

/// How the digest page is laid out.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub page_title: String,
    pub generated_at: DateTime<Tz>,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
}

impl RenderOptions {
    pub fn new(generated_at: DateTime<Tz>) -> Self {
        Self {
            page_title: "Feed Digest".to_string(),
            generated_at,
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Renders one HTML page with a section per feed, in the order given.
///
/// Each feed's entries are sorted per `options` before rendering. All feed
/// text is escaped, and entry bodies are reduced to plain text.
pub fn render_html(feeds: &[ParsedFeed], options: &RenderOptions) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n",
        encode_text(&options.page_title),
        STYLE
    ));
    html.push_str(&format!(
        "<header><h1>{}</h1><p class=\"meta\">Generated {} from {} feeds</p></header>\n",
        encode_text(&options.page_title),
        options.generated_at.format(DATE_FORMAT),
        feeds.len()
    ));

    for feed in feeds {
        render_feed(&mut html, feed, options);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_feed(html: &mut String, feed: &ParsedFeed, options: &RenderOptions) {
    html.push_str("<section>\n");

    let heading = match feed.links.first() {
        Some(link) if !feed.is_not_found() => format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&link.href),
            encode_text(&feed.title)
        ),
        _ => encode_text(&feed.title).into_owned(),
    };
    html.push_str(&format!("<h2>{}</h2>\n", heading));
    html.push_str(&format!("<p>{}</p>\n", encode_text(&feed.description)));

    if feed.is_not_found() {
        html.push_str(&format!(
            "<p class=\"missing\">{}",
            encode_text(&feed.url)
        ));
        if let Some(reason) = &feed.error {
            html.push_str(&format!(" ({})", encode_text(reason)));
        }
        html.push_str("</p>\n</section>\n");
        return;
    }

    html.push_str(&format!(
        "<p class=\"meta\">Last updated {}</p>\n",
        feed.last_updated.format(DATE_FORMAT)
    ));

    let items = feed.sorted(options.sort_key, options.sort_order);
    if items.is_empty() {
        html.push_str("<p class=\"meta\">No entries.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for item in &items {
            render_item(html, item);
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</section>\n");
}

fn render_item(html: &mut String, item: &FeedItem) {
    html.push_str("<li>");
    match item.primary_link() {
        Some(link) => html.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&link.href),
            encode_text(&item.title)
        )),
        None => html.push_str(&encode_text(&item.title)),
    }
    html.push_str(&format!(
        "<div class=\"meta\">{} &middot; {}</div>",
        encode_text(&item.author),
        item.published.format(DATE_FORMAT)
    ));

    let body = html_to_text(item.body());
    if !body.is_empty() {
        html.push_str(&format!("<p>{}</p>", encode_text(&body)));
    }
    html.push_str("</li>\n");
}

/// Serializes the aggregated feeds as pretty-printed JSON, with each feed's
/// entries sorted per `options`.
pub fn render_json(feeds: &[ParsedFeed], options: &RenderOptions) -> Result<String, serde_json::Error> {
    let sorted: Vec<ParsedFeed> = feeds
        .iter()
        .map(|feed| ParsedFeed {
            items: feed.sorted(options.sort_key, options.sort_order),
            ..feed.clone()
        })
        .collect();
    serde_json::to_string_pretty(&sorted)
}
