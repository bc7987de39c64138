//! End-to-end editing scenarios against an in-memory backend

use crate::adapter::{MemoryAdapter, PersistenceAdapter};
use crate::config::EngineConfig;
use crate::errors::{OverrideError, SessionError};
use crate::model::{ContentEdit, OriginalContent};
use crate::notify::{NoticeLevel, RecordingNotifier};
use crate::runtime::{PageContext, PageRuntime, RestoreOutcome};
use crate::section_order::inject_sections;
use crate::session::EditState;
use folio_common::PageSlug;
use folio_dom::{Document, NodeId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;

const PAGE: &str = concat!(
    r#"<header><nav data-nav><a href="/index.html">Home</a><a href="/contact.html">Contact</a></nav></header>"#,
    r#"<main>"#,
    r#"<section data-section-id="intro">"#,
    r#"<h1 data-block-id="title">Welcome</h1>"#,
    r#"<p data-block-id="p1">Original text</p>"#,
    r#"<a data-button-id="cta" href="/contact.html">Get in touch</a>"#,
    r#"<img data-block-id="hero" src="/hero.png" alt="Hero">"#,
    r#"<ul><li data-block-id="li1">First <em>item</em></li></ul>"#,
    r#"</section>"#,
    r#"</main>"#,
    r#"<footer><nav data-nav><a href="/contact.html">Contact</a></nav></footer>"#,
);

struct Harness {
    adapter: Arc<MemoryAdapter>,
    notifier: RecordingNotifier,
    runtime: PageRuntime,
}

impl Harness {
    async fn open(adapter: Arc<MemoryAdapter>) -> Self {
        let notifier = RecordingNotifier::new();
        let doc = Rc::new(RefCell::new(Document::parse(PAGE)));
        let mut runtime = PageRuntime::new(
            EngineConfig::default(),
            doc,
            Arc::clone(&adapter) as Arc<dyn crate::adapter::PersistenceAdapter>,
            Box::new(notifier.clone()),
        )
        .unwrap();
        runtime
            .init(&PageContext::ready(PageSlug::from("/index.html")), &CancellationToken::new())
            .await;

        Self {
            adapter,
            notifier,
            runtime,
        }
    }

    async fn admin() -> Self {
        let adapter = Arc::new(MemoryAdapter::new());
        adapter.set_admin(true);
        let mut harness = Self::open(adapter).await;
        harness.runtime.toggle_edit_mode().unwrap();
        harness
    }

    /// Same backend, fresh page view
    async fn reload(&self) -> Self {
        Self::open(Arc::clone(&self.adapter)).await
    }

    fn node(&self, selector: &str) -> NodeId {
        self.runtime
            .document()
            .borrow()
            .query_selector(selector)
            .unwrap()
            .unwrap()
    }

    fn nodes(&self, selector: &str) -> Vec<NodeId> {
        self.runtime
            .document()
            .borrow()
            .query_selector_all(selector)
            .unwrap()
    }

    fn text(&self, node: NodeId) -> String {
        self.runtime.document().borrow().text_content(node)
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.runtime
            .document()
            .borrow()
            .attr(node, name)
            .map(str::to_string)
    }

    fn main_html(&self) -> String {
        let doc = self.runtime.document();
        let doc = doc.borrow();
        let main = doc.query_selector("main").unwrap().unwrap();
        doc.inner_html(main)
    }

    async fn edit(&mut self, selector: &str, edit: ContentEdit) {
        let node = self.node(selector);
        self.runtime.select(node).unwrap();
        self.runtime.save(edit).await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_text_edit_survives_reload() {
    let mut page = Harness::admin().await;
    page.edit("[data-block-id=p1]", ContentEdit::text("Hello")).await;

    let reloaded = page.reload().await;
    let p1 = reloaded.node("[data-block-id=p1]");
    assert_eq!(reloaded.text(p1), "Hello");
    assert_eq!(reloaded.attr(p1, "data-override-managed").as_deref(), Some("1"));
}

#[tokio::test(start_paused = true)]
async fn test_link_button_overload() {
    let mut page = Harness::admin().await;
    page.edit(
        "[data-button-id=cta]",
        ContentEdit::link("Click", "https://x/y", true),
    )
    .await;

    let stored = page.adapter.all_records();
    assert_eq!(stored[0].image.as_deref(), Some("https://x/y"));

    let reloaded = page.reload().await;
    let cta = reloaded.node("[data-button-id=cta]");
    assert_eq!(reloaded.attr(cta, "href").as_deref(), Some("https://x/y"));
    assert_eq!(reloaded.text(cta), "Click");
    assert!(reloaded
        .attr(cta, "class")
        .unwrap_or_default()
        .split_whitespace()
        .any(|class| class == "btn"));
}

#[tokio::test(start_paused = true)]
async fn test_nav_collision() {
    let mut page = Harness::admin().await;
    page.edit(
        "[data-button-id=cta]",
        ContentEdit::link("Talk to us", "/talk.html", false),
    )
    .await;

    let reloaded = page.reload().await;
    for anchor in reloaded.nodes("nav a[href]") {
        assert_ne!(reloaded.text(anchor), "Talk to us");
    }
    assert_eq!(reloaded.nodes(r#"nav a[href="/contact.html"]"#).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_nav_edit_applies_to_every_copy() {
    let mut page = Harness::admin().await;
    page.edit(
        "footer a",
        ContentEdit::link("Reach us", "/contact.html", false),
    )
    .await;

    let reloaded = page.reload().await;
    let copies = reloaded.nodes(r#"[data-nav] a[href="/contact.html"]"#);
    assert_eq!(copies.len(), 2);
    for anchor in copies {
        assert_eq!(reloaded.text(anchor), "Reach us");
    }
    let cta = reloaded.node("[data-button-id=cta]");
    assert_eq!(reloaded.text(cta), "Get in touch");
}

#[tokio::test(start_paused = true)]
async fn test_nav_href_edited_twice_then_restored() {
    let mut page = Harness::admin().await;
    page.edit("footer a", ContentEdit::link("Reach us", "/reach.html", false))
        .await;
    page.edit("footer a", ContentEdit::link("Write to us", "/reach2.html", false))
        .await;

    let active: Vec<_> = page
        .adapter
        .all_records()
        .into_iter()
        .filter(|record| record.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].image.as_deref(), Some("/reach2.html"));
    assert_eq!(
        active[0].original_content,
        Some(OriginalContent::Link {
            href: "/contact.html".to_string(),
            text: "Contact".to_string(),
            is_button: Some(false),
        })
    );

    let copies = page.nodes(r#"[data-nav] a[href="/reach2.html"]"#);
    assert_eq!(copies.len(), 2);
    for anchor in &copies {
        assert_eq!(page.text(*anchor), "Write to us");
    }

    let footer = page.node("footer a");
    page.runtime.select(footer).unwrap();
    assert_eq!(page.runtime.restore().await.unwrap(), RestoreOutcome::Restored);

    let restored = page.nodes(r#"[data-nav] a[href="/contact.html"]"#);
    assert_eq!(restored.len(), 2);
    for anchor in restored {
        assert_eq!(page.text(anchor), "Contact");
        assert_eq!(page.attr(anchor, "data-override-managed"), None);
    }
    assert!(page.adapter.all_records().iter().all(|record| !record.is_active));
    assert!(page.runtime.store().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_original_content_is_captured_once() {
    let mut page = Harness::admin().await;
    for text in ["one", "two", "three", "four"] {
        page.edit("[data-block-id=p1]", ContentEdit::text(text)).await;
    }

    let records = page.adapter.all_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text.as_deref(), Some("four"));
    assert_eq!(
        records[0].original_content,
        Some(OriginalContent::Markup("Original text".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_view_updates_in_place() {
    let mut page = Harness::admin().await;
    page.edit("[data-block-id=title]", ContentEdit::text("First")).await;

    let mut second = page.reload().await;
    second.runtime.toggle_edit_mode().unwrap();
    second.edit("[data-block-id=title]", ContentEdit::text("Second")).await;

    let records = second.adapter.all_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text.as_deref(), Some("Second"));
    assert_eq!(
        records[0].original_content,
        Some(OriginalContent::Markup("Welcome".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_restore_returns_exact_content() {
    let mut page = Harness::admin().await;
    page.runtime.toggle_edit_mode().unwrap();
    let before = page.main_html();
    page.runtime.toggle_edit_mode().unwrap();

    page.edit("[data-block-id=hero]", ContentEdit::image("/new.png", None)).await;
    page.edit(
        "[data-button-id=cta]",
        ContentEdit::link("Go", "/go.html", true),
    )
    .await;
    page.edit("[data-block-id=p1]", ContentEdit::text("Changed")).await;
    assert_ne!(page.main_html(), before);

    for selector in ["[data-block-id=hero]", "[data-button-id=cta]", "[data-block-id=p1]"] {
        let node = page.node(selector);
        page.runtime.select(node).unwrap();
        assert_eq!(page.runtime.restore().await.unwrap(), RestoreOutcome::Restored);
    }

    page.runtime.toggle_edit_mode().unwrap();
    assert_eq!(page.main_html(), before);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_rolls_back() {
    let mut page = Harness::admin().await;
    let p1 = page.node("[data-block-id=p1]");
    page.runtime.select(p1).unwrap();

    page.adapter.set_offline(true);
    let result = page.runtime.save(ContentEdit::text("Never stored")).await;

    assert!(matches!(result, Err(OverrideError::Adapter(_))));
    assert_eq!(page.text(p1), "Original text");
    assert_eq!(page.attr(p1, "data-override-managed"), None);
    assert!(page.runtime.store().is_empty());
    assert_eq!(page.notifier.last().map(|n| n.level), Some(NoticeLevel::Error));

    // The selection survives so the user can retry
    assert_eq!(page.runtime.session().state(), EditState::ElementSelected);
    page.adapter.set_offline(false);
    page.runtime.save(ContentEdit::text("Stored")).await.unwrap();
    assert_eq!(page.text(p1), "Stored");
}

#[tokio::test(start_paused = true)]
async fn test_failed_update_keeps_cached_record() {
    let mut page = Harness::admin().await;
    page.edit("[data-block-id=p1]", ContentEdit::text("Saved")).await;
    let cached = page.runtime.store().iter().next().cloned();

    let p1 = page.node("[data-block-id=p1]");
    page.runtime.select(p1).unwrap();
    page.adapter.set_offline(true);
    assert!(page.runtime.save(ContentEdit::text("Lost")).await.is_err());

    assert_eq!(page.text(p1), "Saved");
    assert_eq!(page.attr(p1, "data-override-managed").as_deref(), Some("1"));
    assert_eq!(page.runtime.store().iter().next().cloned(), cached);
}

#[tokio::test(start_paused = true)]
async fn test_stale_editor_is_cleared() {
    let mut page = Harness::admin().await;
    let p1 = page.node("[data-block-id=p1]");
    page.runtime.select(p1).unwrap();

    page.runtime.document().borrow_mut().remove(p1);

    let result = page.runtime.save(ContentEdit::text("x")).await;
    assert!(matches!(
        result,
        Err(OverrideError::Session(SessionError::StaleEditor))
    ));
    assert!(page.runtime.session().active_editor().is_none());
    assert!(page.adapter.all_records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clicking_inside_a_block_selects_the_block() {
    let mut page = Harness::admin().await;
    let li = page.node("[data-block-id=li1]");
    let em = page.node("li em");
    let title = page.node("h1");

    assert_eq!(page.runtime.select(em).unwrap(), li);
    assert_eq!(page.runtime.select(title).unwrap(), title);
    assert_eq!(
        page.runtime.session().active_editor().map(|editor| editor.element),
        Some(title)
    );

    // Nothing editable encloses the main region itself
    let main = page.node("main");
    assert!(matches!(
        page.runtime.select(main),
        Err(OverrideError::NotEditable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_late_sections_and_single_completion() {
    let adapter = Arc::new(MemoryAdapter::new());
    adapter.set_admin(true);

    // Seed an override for a section that is injected after load
    let mut seed = Harness::open(Arc::clone(&adapter)).await;
    {
        let doc = seed.runtime.document();
        let mut doc = doc.borrow_mut();
        inject_sections(
            &mut doc,
            seed.runtime.engine(),
            r#"<section data-section-id="posts"><p data-block-id="latest">Loading</p></section>"#,
        )
        .unwrap();
    }
    seed.runtime.toggle_edit_mode().unwrap();
    seed.edit("[data-block-id=latest]", ContentEdit::text("Fresh post")).await;

    // New view: the posts section shows up 300ms after sections_ready
    let doc = Rc::new(RefCell::new(Document::parse(PAGE)));
    let mut runtime = PageRuntime::new(
        EngineConfig::default(),
        Rc::clone(&doc),
        Arc::clone(&adapter) as Arc<dyn crate::adapter::PersistenceAdapter>,
        Box::new(RecordingNotifier::new()),
    )
    .unwrap();
    let ctx = PageContext::new(PageSlug::from("index"));
    let applied = runtime.overrides_applied();
    let engine = runtime.engine().clone();
    let cancel = CancellationToken::new();

    let loader = async {
        time::sleep(Duration::from_millis(50)).await;
        assert!(!applied.is_fired());
        ctx.sections_ready.fire();
        time::sleep(Duration::from_millis(300)).await;
        inject_sections(
            &mut doc.borrow_mut(),
            &engine,
            r#"<section data-section-id="posts"><p data-block-id="latest">Loading</p></section>"#,
        )
        .unwrap();
    };

    let (report, _) = tokio::join!(runtime.init(&ctx, &cancel), loader);

    assert!(report.outcome.is_complete());
    assert!(report.outcome.attempts > 1);
    assert!(applied.is_fired());
    assert!(!applied.fire());

    let doc = doc.borrow();
    let latest = doc.query_selector("[data-block-id=latest]").unwrap().unwrap();
    assert_eq!(doc.text_content(latest), "Fresh post");
}

#[tokio::test(start_paused = true)]
async fn test_section_order_replays_for_visitors() {
    let adapter = Arc::new(MemoryAdapter::new());
    adapter.set_admin(true);
    let mut admin = Harness::open(Arc::clone(&adapter)).await;
    {
        let doc = admin.runtime.document();
        inject_sections(
            &mut doc.borrow_mut(),
            admin.runtime.engine(),
            r#"<section data-section-id="about"></section><section data-section-id="faq"></section>"#,
        )
        .unwrap();
    }
    admin.runtime.toggle_edit_mode().unwrap();
    assert!(admin.runtime.overlay().is_active());

    let saved = admin.runtime.move_section("faq", Some("intro")).await.unwrap();
    assert_eq!(saved.order, vec!["faq", "intro", "about"]);

    adapter.set_admin(false);
    let doc = Rc::new(RefCell::new(Document::parse(concat!(
        r#"<main><section data-section-id="intro"></section>"#,
        r#"<section data-section-id="about"></section><section data-section-id="faq"></section></main>"#
    ))));
    let mut visitor = PageRuntime::new(
        EngineConfig::default(),
        Rc::clone(&doc),
        adapter as Arc<dyn crate::adapter::PersistenceAdapter>,
        Box::new(RecordingNotifier::new()),
    )
    .unwrap();
    let report = visitor
        .init(&PageContext::ready(PageSlug::from("index")), &CancellationToken::new())
        .await;

    assert_eq!(report.sections_moved, 3);
    assert!(!report.is_admin);
    assert_eq!(visitor.overlay().current_order(&doc.borrow()), vec!["faq", "intro", "about"]);
}

fn add_sections(page: &Harness) {
    let doc = page.runtime.document();
    inject_sections(
        &mut doc.borrow_mut(),
        page.runtime.engine(),
        r#"<section data-section-id="about"></section><section data-section-id="faq"></section>"#,
    )
    .unwrap();
}

fn section_order(page: &Harness) -> Vec<String> {
    page.runtime
        .overlay()
        .current_order(&page.runtime.document().borrow())
}

#[tokio::test(start_paused = true)]
async fn test_section_move_is_refused_for_visitors() {
    let mut page = Harness::open(Arc::new(MemoryAdapter::new())).await;
    add_sections(&page);

    let result = page.runtime.move_section("faq", Some("intro")).await;
    assert!(matches!(
        result,
        Err(OverrideError::Session(SessionError::NotAuthorized))
    ));
    assert_eq!(section_order(&page), vec!["intro", "about", "faq"]);
    assert!(page
        .adapter
        .get_section_order(&PageSlug::from("/index.html"))
        .await
        .unwrap()
        .order
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_section_move_outside_edit_mode_is_refused() {
    let adapter = Arc::new(MemoryAdapter::new());
    adapter.set_admin(true);
    let mut page = Harness::open(adapter).await;
    add_sections(&page);

    let result = page.runtime.move_section("faq", Some("intro")).await;
    assert!(matches!(
        result,
        Err(OverrideError::Session(SessionError::NotEditing))
    ));
    assert_eq!(section_order(&page), vec!["intro", "about", "faq"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_section_move_is_reverted() {
    let mut page = Harness::admin().await;
    add_sections(&page);

    page.adapter.set_offline(true);
    let result = page.runtime.move_section("faq", Some("intro")).await;

    assert!(matches!(result, Err(OverrideError::Adapter(_))));
    assert_eq!(section_order(&page), vec!["intro", "about", "faq"]);
    assert!(page.runtime.overlay().order().is_none());
    assert_eq!(page.notifier.last().map(|n| n.level), Some(NoticeLevel::Error));

    page.adapter.set_offline(false);
    let saved = page.runtime.move_section("about", None).await.unwrap();
    assert_eq!(saved.order, vec!["intro", "faq", "about"]);
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_renders_defaults() {
    let mut page = Harness::admin().await;
    page.edit("[data-block-id=p1]", ContentEdit::text("Hello")).await;

    page.adapter.set_offline(true);
    let reloaded = page.reload().await;
    let p1 = reloaded.node("[data-block-id=p1]");
    assert_eq!(reloaded.text(p1), "Original text");
    assert!(reloaded.runtime.store().is_empty());
    // Background failures do not notify
    assert!(reloaded.notifier.notices().is_empty());
}
