use crate::config::Config;
use crate::site::find_html_files;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_common::{FileSystem, RealFileSystem};
use folio_dom::Document;
use folio_overrides::{EngineConfig, IdGenerator, SelectorEngine, UuidGenerator};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct AssignIdsArgs {
    /// Page or site directory (defaults to the configured site dir)
    pub input: Option<PathBuf>,

    /// Report pages that lack ids without writing anything
    #[arg(long)]
    pub check: bool,
}

pub fn assign_ids(args: AssignIdsArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.get_site_dir(cwd));
    let pages = find_html_files(&input)?;
    let fs = RealFileSystem;

    println!("{}", "🏷  Assigning persistent ids...".bright_blue().bold());

    let mut total = 0;
    for page in &pages {
        let assigned = assign_file(&fs, page, &config.engine, &mut UuidGenerator, !args.check)?;
        if assigned > 0 {
            println!("  {} {} ({} ids)", "✓".green(), page.display(), assigned);
        }
        total += assigned;
    }

    println!();
    if args.check && total > 0 {
        return Err(anyhow!(
            "{} element(s) lack persistent ids; run `folio assign-ids`",
            total
        ));
    }
    println!(
        "{} {} ids across {} pages",
        "✅".green(),
        total,
        pages.len()
    );

    Ok(())
}

/// Number of ids the page needs; written back only when `write` is set
/// and something changed.
pub fn assign_file(
    fs: &dyn FileSystem,
    path: &Path,
    config: &EngineConfig,
    ids: &mut dyn IdGenerator,
    write: bool,
) -> Result<usize> {
    let engine = SelectorEngine::new(config)?;
    let mut doc = Document::parse(&fs.read_to_string(path)?);
    let assigned = engine.assign_persistent_ids(&mut doc, ids);
    if write && assigned > 0 {
        fs.write(path, &doc.to_html())?;
    }
    Ok(assigned)
}
