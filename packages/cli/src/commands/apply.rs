use crate::config::Config;
use crate::site::{find_html_files, open_adapter, page_slug, render_page, site_root};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_common::{FileSystem, RealFileSystem};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Page or site directory to render (defaults to the configured site dir)
    pub input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "dist")]
    pub out_dir: PathBuf,

    /// Override snapshot to read instead of the configured source
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Print a single rendered page to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let fs = RealFileSystem;
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.get_site_dir(cwd));

    let pages = find_html_files(&input)?;
    if args.stdout && pages.len() != 1 {
        return Err(anyhow!("--stdout needs a single page, found {}", pages.len()));
    }
    let adapter = open_adapter(&config, cwd, args.overrides.as_deref(), &fs)?;
    let root = site_root(&input);

    if !args.stdout {
        println!("{}", "🖨  Applying overrides...".bright_blue().bold());
        println!("Found {} pages", pages.len());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut unresolved = 0;
    for page_file in &pages {
        let page = page_slug(&root, page_file);
        let markup = fs.read_to_string(page_file)?;
        let rendered = runtime.block_on(render_page(
            &markup,
            &page,
            &config.engine,
            adapter.as_ref(),
        ))?;
        unresolved += rendered.report.unresolved.len();

        if args.stdout {
            print!("{}", rendered.html);
            continue;
        }

        let relative = page_file.strip_prefix(&root).unwrap_or(page_file);
        let output_path = args.out_dir.join(relative);
        fs.write(&output_path, &rendered.html)?;

        let status = if rendered.report.is_complete() {
            "✓".green()
        } else {
            "!".yellow()
        };
        println!(
            "  {} {} [{}] {} overrides, {} sections moved → {}",
            status,
            relative.display(),
            page,
            rendered.report.applied.len(),
            rendered.sections_moved,
            output_path.display()
        );
    }

    if args.stdout {
        return Ok(());
    }

    println!();
    if unresolved > 0 {
        println!(
            "{} {} override(s) matched nothing; run `folio lint --overrides` for details",
            "⚠️".yellow(),
            unresolved
        );
    }
    println!("{}", "✅ Done".green().bold());

    Ok(())
}
