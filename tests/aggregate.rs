//! End-to-end tests for a digest run: fetch, parse, aggregate, sort, render.
//!
//! Every test starts its own wiremock server, so feeds are served from
//! 127.0.0.1 and the default (syntactic) URL validation is used.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rss_digest::feed::{
    sort_entries, Aggregator, FeedSettings, SortKey, SortOrder, NOT_FOUND_DESCRIPTION,
    NOT_FOUND_TITLE, UNKNOWN,
};
use rss_digest::render::{render_html, RenderOptions};

fn rss_item(id: &str, title: &str, date: Option<&str>) -> String {
    let pub_date = date
        .map(|d| format!("<pubDate>{d}</pubDate>"))
        .unwrap_or_default();
    format!(
        "<item><guid>{id}</guid><title>{title}</title>\
         <link>https://example.com/{id}</link>{pub_date}</item>"
    )
}

fn rss(title: &str, items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>{title}</title>
<link>https://example.com/</link>
<description>{title} feed</description>
{}
</channel></rss>"#,
        items.join("\n")
    )
}

async fn serve(server: &MockServer, route: &str, body: String, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body).set_delay(delay))
        .mount(server)
        .await;
}

fn settings() -> FeedSettings {
    FeedSettings {
        request_timeout: Duration::from_secs(5),
        ..FeedSettings::default()
    }
}

#[tokio::test]
async fn test_results_follow_input_order_despite_delays() {
    let server = MockServer::start().await;
    let delays = [300u64, 0, 150, 50];
    let mut urls = Vec::new();

    for (i, delay) in delays.iter().enumerate() {
        let route = format!("/feed{i}.xml");
        let item = rss_item(&format!("e{i}"), "Entry", Some("Mon, 01 Jan 2024 00:00:00 GMT"));
        serve(
            &server,
            &route,
            rss(&format!("Feed {i}"), &[item]),
            Duration::from_millis(*delay),
        )
        .await;
        urls.push(format!("{}{}", server.uri(), route));
    }

    let aggregator = Aggregator::new(settings()).unwrap();
    let feeds = aggregator.aggregate(&urls, None).await;

    let titles: Vec<&str> = feeds.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["Feed 0", "Feed 1", "Feed 2", "Feed 3"]);
    for (feed, url) in feeds.iter().zip(&urls) {
        assert_eq!(&feed.url, url);
    }
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let server = MockServer::start().await;
    let good = rss(
        "Good",
        &[rss_item("a", "Alpha", Some("Mon, 01 Jan 2024 00:00:00 GMT"))],
    );

    serve(&server, "/good.xml", good, Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    serve(
        &server,
        "/slow.xml",
        rss("Slow", &[]),
        Duration::from_secs(10),
    )
    .await;
    serve(&server, "/garbage.xml", "definitely not xml".to_string(), Duration::ZERO).await;

    let urls = vec![
        format!("{}/broken.xml", server.uri()),
        format!("{}/good.xml", server.uri()),
        format!("{}/slow.xml", server.uri()),
        "not a url".to_string(),
        format!("{}/garbage.xml", server.uri()),
    ];

    let aggregator = Aggregator::new(FeedSettings {
        request_timeout: Duration::from_millis(300),
        ..FeedSettings::default()
    })
    .unwrap();
    let feeds = aggregator.aggregate(&urls, None).await;

    assert_eq!(feeds.len(), 5);
    for i in [0, 2, 3, 4] {
        assert_eq!(feeds[i].title, NOT_FOUND_TITLE, "feed {i}");
        assert_eq!(feeds[i].description, NOT_FOUND_DESCRIPTION);
        assert!(feeds[i].items.is_empty());
        assert!(feeds[i].links.is_empty());
        assert!(feeds[i].error.is_some());
        assert_eq!(feeds[i].url, urls[i]);
    }
    assert_eq!(feeds[1].title, "Good");
    assert_eq!(feeds[1].items.len(), 1);
    assert_eq!(feeds[1].items[0].title, "Alpha");
}

#[tokio::test]
async fn test_latin1_feed_keeps_accented_text() {
    let server = MockServer::start().await;
    let mut body = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
<rss version=\"2.0\"><channel><title>Caf"
        .to_vec();
    body.push(0xE9);
    body.extend_from_slice(
        b"</title><item><guid>1</guid><title>Cr\xE8me br\xFBl\xE9e</title>\
<link>https://example.com/1</link><pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>\
</item></channel></rss>",
    );

    Mock::given(method("GET"))
        .and(path("/latin1.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "application/rss+xml; charset=ISO-8859-1"),
        )
        .mount(&server)
        .await;

    let aggregator = Aggregator::new(settings()).unwrap();
    let feeds = aggregator
        .aggregate(&[format!("{}/latin1.xml", server.uri())], None)
        .await;

    assert_eq!(feeds[0].title, "Caf\u{e9}");
    assert_eq!(feeds[0].items[0].title, "Cr\u{e8}me br\u{fb}l\u{e9}e");
}

#[tokio::test]
async fn test_undated_entries_are_dropped() {
    let server = MockServer::start().await;
    let body = rss(
        "Mixed",
        &[
            rss_item("dated-1", "First", Some("Mon, 01 Jan 2024 00:00:00 GMT")),
            rss_item("undated", "No date", None),
            rss_item("dated-2", "Second", Some("Tue, 02 Jan 2024 00:00:00 GMT")),
        ],
    );
    serve(&server, "/mixed.xml", body, Duration::ZERO).await;

    let aggregator = Aggregator::new(settings()).unwrap();
    let feeds = aggregator
        .aggregate(&[format!("{}/mixed.xml", server.uri())], None)
        .await;

    let ids: Vec<&str> = feeds[0].items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["dated-1", "dated-2"]);
    assert!(feeds[0].items.iter().all(|i| i.author == UNKNOWN));
}

#[tokio::test]
async fn test_cutoff_leaves_out_entries_at_or_after_it() {
    let server = MockServer::start().await;
    let body = rss(
        "Dated",
        &[
            rss_item("jan1", "One", Some("Mon, 01 Jan 2024 00:00:00 GMT")),
            rss_item("jan2", "Two", Some("Tue, 02 Jan 2024 00:00:00 GMT")),
            rss_item("jan3", "Three", Some("Wed, 03 Jan 2024 00:00:00 GMT")),
        ],
    );
    serve(&server, "/dated.xml", body, Duration::ZERO).await;

    let cutoff: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let aggregator = Aggregator::new(settings()).unwrap();
    let feeds = aggregator
        .aggregate(&[format!("{}/dated.xml", server.uri())], Some(cutoff))
        .await;

    let ids: Vec<&str> = feeds[0].items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["jan1"]);
    assert!(feeds[0]
        .items
        .iter()
        .all(|i| i.published.with_timezone(&Utc) < cutoff));
}

#[tokio::test]
async fn test_fetch_parse_sort_render() {
    let server = MockServer::start().await;
    let body = rss(
        "Example",
        &[
            rss_item("first", "New year", Some("Mon, 01 Jan 2024 09:00:00 GMT")),
            rss_item("third", "Later on", Some("Wed, 03 Jan 2024 09:00:00 GMT")),
        ],
    );
    serve(&server, "/example.xml", body, Duration::ZERO).await;

    let tz: Tz = "Europe/Berlin".parse().unwrap();
    let aggregator = Aggregator::new(FeedSettings {
        timezone: tz,
        ..settings()
    })
    .unwrap();
    let feeds = aggregator
        .aggregate(&[format!("{}/example.xml", server.uri())], None)
        .await;

    let feed = &feeds[0];
    assert_eq!(feed.title, "Example");
    assert_eq!(feed.items.len(), 2);

    let sorted = sort_entries(&feed.items, SortKey::Published, SortOrder::Descending);
    assert_eq!(sorted[0].id, "third");
    assert_eq!(sorted[0].published.timezone(), tz);
    assert_eq!(
        sorted[0].published,
        tz.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap()
    );

    let generated_at = tz.with_ymd_and_hms(2024, 1, 4, 8, 0, 0).unwrap();
    let html = render_html(&feeds, &RenderOptions::new(generated_at));
    assert!(html.find("Later on").unwrap() < html.find("New year").unwrap());
    assert!(html.contains("2024-01-03 10:00 CET"));
}

#[tokio::test]
async fn test_concurrency_cap_and_deadline_together() {
    let server = MockServer::start().await;
    let mut urls = Vec::new();
    for i in 0..4 {
        let route = format!("/capped{i}.xml");
        serve(
            &server,
            &route,
            rss(&format!("Capped {i}"), &[]),
            Duration::from_millis(200),
        )
        .await;
        urls.push(format!("{}{}", server.uri(), route));
    }

    // One at a time, 200ms each: the first two fit in the deadline.
    let aggregator = Aggregator::new(FeedSettings {
        max_concurrency: Some(1),
        deadline: Some(Duration::from_millis(500)),
        ..settings()
    })
    .unwrap();
    let feeds = aggregator.aggregate(&urls, None).await;

    assert_eq!(feeds.len(), 4);
    assert_eq!(feeds[0].title, "Capped 0");
    assert_eq!(feeds[1].title, "Capped 1");
    assert_eq!(feeds[3].title, NOT_FOUND_TITLE);
}
