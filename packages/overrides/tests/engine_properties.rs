//! Properties of the override engine over a realistic page

use folio_common::PageSlug;
use folio_dom::Document;
use folio_overrides::{
    apply_until_resolved, lint_document, Applier, ContentType, EngineConfig, OverrideId,
    OverrideRecord, OverrideStore, OverrideType, RetryPolicy, SelectorEngine, SequentialIds,
};
use std::cell::RefCell;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const SITE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Studio</title></head>
<body>
<header><nav data-nav><a href="/index.html">Home</a><a href="/work.html">Work</a><a href="/contact.html">Contact</a></nav></header>
<nav class="mobile" data-nav><a href="/work.html">Work</a><a href="/contact.html">Contact</a></nav>
<main>
<section><h1>Studio</h1><p>We build <a href="/work.html">things</a>.</p><img src="/team.jpg" alt="Team"></section>
<section><h2>Services</h2><ul><li>Design</li><li>Code</li></ul><blockquote>Great work</blockquote></section>
<section><p>Say hi: <a class="btn" href="/contact.html">Contact</a></p></section>
</main>
<footer><p>Footer text</p><a href="/contact.html">Contact</a></footer>
</body>
</html>"#;

fn engine() -> SelectorEngine {
    SelectorEngine::new(&EngineConfig::default()).unwrap()
}

fn prepared_page() -> Document {
    let mut doc = Document::parse(SITE_PAGE);
    engine().assign_persistent_ids(&mut doc, &mut SequentialIds::new("id"));
    doc
}

fn record(id: &str, selector: &str, content_type: ContentType) -> OverrideRecord {
    OverrideRecord {
        id: OverrideId::new(id),
        target_page: PageSlug::from("index"),
        target_selector: selector.to_string(),
        content_type,
        text: None,
        image: None,
        is_button: false,
        original_content: None,
        override_type: OverrideType::Replace,
        is_active: true,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn test_every_candidate_round_trips() {
    let doc = prepared_page();
    let engine = engine();
    let candidates = engine.editable_candidates(&doc);
    assert!(candidates.len() > 10);

    for node in candidates {
        let selector = engine.stable_selector(&doc, node).unwrap();
        let matches = doc.query_selector_all(&selector).unwrap();

        assert!(matches.contains(&node), "{} lost its element", selector);
        if engine.is_nav_scoped(&selector) {
            for other in &matches {
                assert_eq!(doc.attr(*other, "href"), doc.attr(node, "href"));
            }
        } else {
            assert_eq!(matches, vec![node], "{} is ambiguous", selector);
        }
    }
}

#[test]
fn test_selectors_ignore_position_and_text() {
    let mut doc = prepared_page();
    let engine = engine();
    let quote = doc.query_selector("blockquote").unwrap().unwrap();
    let before = engine.stable_selector(&doc, quote).unwrap();

    // Edit text, then move the whole section to the end of main
    doc.set_text_content(quote, "Changed");
    let section = doc.parent(quote).unwrap();
    let main = doc.parent(section).unwrap();
    doc.append_child(main, section).unwrap();

    assert_eq!(engine.stable_selector(&doc, quote).unwrap(), before);
    assert_eq!(doc.query_selector_all(&before).unwrap(), vec![quote]);
}

#[test]
fn test_prepared_page_lints_clean() {
    let doc = prepared_page();
    assert!(lint_document(&doc, &engine(), None).is_empty());

    let raw = Document::parse(SITE_PAGE);
    assert!(!lint_document(&raw, &engine(), None).is_empty());
}

#[test]
fn test_full_pass_is_idempotent() {
    let mut doc = prepared_page();
    let engine = engine();

    let select = |doc: &Document, css: &str| {
        let node = doc.query_selector(css).unwrap().unwrap();
        engine.stable_selector(doc, node).unwrap()
    };

    let mut text = record("1", &select(&doc, "h1"), ContentType::Text);
    text.text = Some("Tom & Jerry <3".to_string());
    let mut image = record("2", &select(&doc, "img"), ContentType::Image);
    image.image = Some("/new.jpg".to_string());
    image.text = Some("New team".to_string());
    let mut button = record("3", &select(&doc, "main a.btn"), ContentType::Link);
    button.text = Some("Write us".to_string());
    button.image = Some("mailto:hi@example.com".to_string());
    button.is_button = true;
    let mut nav = record("4", &select(&doc, "header a[href=\"/work.html\"]"), ContentType::Link);
    nav.text = Some("Portfolio".to_string());
    nav.image = Some("/work.html".to_string());

    let store = OverrideStore::from_records(PageSlug::from("index"), vec![text, image, button, nav]);
    let applier = Applier::new(&EngineConfig::default(), engine.clone());

    let first = applier.apply_all(&mut doc, &store);
    assert!(first.is_complete());
    let after_first = doc.to_html();

    applier.apply_all(&mut doc, &store);
    assert_eq!(doc.to_html(), after_first);

    // Both navigation copies and only those
    let portfolio: Vec<_> = doc
        .query_selector_all("a")
        .unwrap()
        .into_iter()
        .filter(|a| doc.text_content(*a) == "Portfolio")
        .collect();
    assert_eq!(portfolio.len(), 2);
    let main_work = doc.query_selector("main p a").unwrap().unwrap();
    assert_eq!(doc.text_content(main_work), "things");
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_override_stops_after_budget() {
    let doc = RefCell::new(prepared_page());
    let store = OverrideStore::from_records(
        PageSlug::from("index"),
        vec![record("1", r#"[data-block-id="deleted"]"#, ContentType::Text)],
    );
    let applier = Applier::new(&EngineConfig::default(), engine());
    let policy = RetryPolicy::new(Duration::from_millis(100), 50);

    let start = Instant::now();
    let outcome = apply_until_resolved(&doc, &store, &applier, &policy, &CancellationToken::new()).await;

    assert_eq!(outcome.attempts, 50);
    assert_eq!(outcome.unresolved.len(), 1);
    assert!(!outcome.cancelled);
    assert_eq!(start.elapsed(), Duration::from_millis(4900));
}
