use crate::config::Config;
use crate::site::{find_html_files, open_adapter, page_slug, site_root};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_common::{FileSystem, RealFileSystem};
use folio_dom::Document;
use folio_overrides::{
    lint_document, Diagnostic, DiagnosticLevel, OverrideStore, SelectorEngine,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Page or site directory to lint (defaults to the configured site dir)
    pub input: Option<PathBuf>,

    /// Also check that stored overrides still resolve, reading them from
    /// this snapshot (or the configured source when given without a path)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    pub overrides: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn lint(args: LintArgs, cwd: &str, verbose: bool) -> Result<()> {
    let config = Config::load(cwd)?;
    let fs = RealFileSystem;
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.get_site_dir(cwd));
    let engine = SelectorEngine::new(&config.engine)?;

    println!("🔍 {} Folio Linter", "Starting".green().bold());
    println!("   Input: {}", input.display());
    println!();

    let adapter = match &args.overrides {
        Some(path) if path.as_os_str().is_empty() => Some(open_adapter(&config, cwd, None, &fs)?),
        Some(path) => Some(open_adapter(&config, cwd, Some(path), &fs)?),
        None => None,
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let pages = find_html_files(&input)?;
    let root = site_root(&input);
    let mut total_diagnostics = 0;
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &pages {
        let store = match &adapter {
            Some(adapter) => {
                let page = page_slug(&root, file);
                let mut store = OverrideStore::new();
                runtime.block_on(store.load(adapter.as_ref(), &page));
                Some(store)
            }
            None => None,
        };

        let diagnostics = lint_file(&fs, file, &engine, store.as_ref())?;
        let (errors, warnings) = count_levels(&diagnostics);
        report(file, &diagnostics, verbose, &args.format)?;

        total_diagnostics += diagnostics.len();
        total_errors += errors;
        total_warnings += warnings;
    }

    println!();
    println!(
        "✨ {} Linting complete!",
        if total_errors > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );
    println!("   Files checked: {}", pages.len());
    println!("   Total diagnostics: {}", total_diagnostics);

    if total_errors > 0 {
        println!("   {} {}", "Errors:".red(), total_errors);
    }
    if total_warnings > 0 {
        println!("   {} {}", "Warnings:".yellow(), total_warnings);
    }

    if total_errors == 0 && total_warnings == 0 {
        println!("   {} No issues found!", "✓".green());
    }

    // Exit with error code if there are errors
    if total_errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

pub fn lint_file(
    fs: &dyn FileSystem,
    file: &Path,
    engine: &SelectorEngine,
    store: Option<&OverrideStore>,
) -> Result<Vec<Diagnostic>> {
    let doc = Document::parse(&fs.read_to_string(file)?);
    Ok(lint_document(&doc, engine, store))
}

fn count_levels(diagnostics: &[Diagnostic]) -> (usize, usize) {
    let errors = diagnostics
        .iter()
        .filter(|d| matches!(d.level, DiagnosticLevel::Error))
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| matches!(d.level, DiagnosticLevel::Warning))
        .count();
    (errors, warnings)
}

fn report(file: &Path, diagnostics: &[Diagnostic], verbose: bool, format: &str) -> Result<()> {
    if diagnostics.is_empty() {
        if verbose {
            println!("{} {}", "✓".green(), file.display());
        }
        return Ok(());
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
        return Ok(());
    }

    println!("{}", file.display());
    for diagnostic in diagnostics {
        let level_str = match diagnostic.level {
            DiagnosticLevel::Error => "error".red().bold(),
            DiagnosticLevel::Warning => "warning".yellow().bold(),
            DiagnosticLevel::Info => "info".blue().bold(),
        };

        if !verbose && matches!(diagnostic.level, DiagnosticLevel::Info) {
            continue;
        }

        println!("  {} [{}] {}", level_str, diagnostic.rule, diagnostic.message);
        if let Some(selector) = &diagnostic.selector {
            println!("    {}", selector.dimmed());
        }
        if let Some(suggestion) = &diagnostic.suggestion {
            println!("    {} {}", "💡".dimmed(), suggestion.dimmed());
        }
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::{MockFileSystem, PageSlug};
    use folio_overrides::{ContentType, EngineConfig, OverrideId, OverrideRecord, OverrideType};

    fn engine() -> SelectorEngine {
        SelectorEngine::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_lint_file_reports_missing_ids() {
        let fs = MockFileSystem::new();
        let path = Path::new("/site/index.html");
        fs.add_file(path, r#"<main><p data-block-id="a">ok</p><p>no id</p></main>"#);

        let diagnostics = lint_file(&fs, path, &engine(), None).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(count_levels(&diagnostics), (0, 1));
    }

    #[test]
    fn test_lint_file_checks_override_targets() {
        let fs = MockFileSystem::new();
        let path = Path::new("/site/index.html");
        fs.add_file(path, r#"<main><p data-block-id="a">ok</p></main>"#);
        let store = OverrideStore::from_records(
            PageSlug::from("index"),
            vec![OverrideRecord {
                id: OverrideId::new("1"),
                target_page: PageSlug::from("index"),
                target_selector: r#"[data-block-id="gone"]"#.to_string(),
                content_type: ContentType::Text,
                text: Some("x".to_string()),
                image: None,
                is_button: false,
                original_content: None,
                override_type: OverrideType::Replace,
                is_active: true,
                created_at: None,
                updated_at: None,
            }],
        );

        let diagnostics = lint_file(&fs, path, &engine(), Some(&store)).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].selector.as_deref(), Some(r#"[data-block-id="gone"]"#));
    }
}
