//! Static rendering of overrides into site pages
//!
//! The same store, applier and section overlay the page runtime uses,
//! run once per file with no retry: a static page has no late content.

use crate::config::{Config, TOKEN_ENV};
use anyhow::{anyhow, Context, Result};
use folio_client::HttpAdapter;
use folio_common::{FileSystem, PageSlug};
use folio_dom::Document;
use folio_overrides::{
    Applier, EngineConfig, MemoryAdapter, OverrideResult, OverrideStore, PassReport,
    PersistenceAdapter, SectionOrderOverlay, SelectorEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One page after overrides and section order were replayed
#[derive(Debug)]
pub struct RenderedPage {
    pub html: String,
    pub report: PassReport,
    pub sections_moved: usize,
}

/// Where overrides come from, in order of preference: an explicit
/// snapshot, the configured snapshot, then the configured API.
pub fn open_adapter(
    config: &Config,
    cwd: &str,
    snapshot: Option<&Path>,
    fs: &dyn FileSystem,
) -> Result<Arc<dyn PersistenceAdapter>> {
    let snapshot = snapshot
        .map(Path::to_path_buf)
        .or_else(|| config.get_overrides_file(cwd));

    if let Some(path) = snapshot {
        let json = fs
            .read_to_string(&path)
            .with_context(|| format!("Cannot read overrides snapshot {}", path.display()))?;
        let adapter = MemoryAdapter::from_json(&json)
            .with_context(|| format!("Invalid overrides snapshot {}", path.display()))?;
        debug!(path = %path.display(), "Using overrides snapshot");
        return Ok(Arc::new(adapter));
    }

    if let Some(base_url) = &config.api_base_url {
        let mut adapter = HttpAdapter::new(base_url.as_str());
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            adapter = adapter.with_token(token);
        }
        debug!(base_url = %adapter.base_url(), "Using override API");
        return Ok(Arc::new(adapter));
    }

    Err(anyhow!(
        "No override source: pass --overrides or set overridesFile or apiBaseUrl"
    ))
}

/// `input` itself when it is a file, otherwise every HTML page below it
pub fn find_html_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_html(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "html" || e == "htm")
        .unwrap_or(false)
}

/// Root that page slugs are computed against
pub fn site_root(input: &Path) -> PathBuf {
    if input.is_file() {
        input.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        input.to_path_buf()
    }
}

/// Slug of a page file relative to the site root
pub fn page_slug(root: &Path, file: &Path) -> PageSlug {
    let relative = file.strip_prefix(root).unwrap_or(file);
    PageSlug::from_path(&relative.to_string_lossy())
}

pub async fn render_page(
    markup: &str,
    page: &PageSlug,
    config: &EngineConfig,
    adapter: &dyn PersistenceAdapter,
) -> OverrideResult<RenderedPage> {
    let engine = SelectorEngine::new(config)?;
    let mut doc = Document::parse(markup);

    let mut store = OverrideStore::new();
    store.load(adapter, page).await;

    let applier = Applier::new(config, engine.clone());
    let report = applier.apply_all(&mut doc, &store);
    for selector in &report.unresolved {
        warn!(page = %page, selector = %selector, "Override target not found");
    }

    let mut overlay = SectionOrderOverlay::new(engine);
    overlay.load(adapter, page).await;
    let sections_moved = overlay.apply_order(&mut doc);

    Ok(RenderedPage {
        html: doc.to_html(),
        report,
        sections_moved,
    })
}
