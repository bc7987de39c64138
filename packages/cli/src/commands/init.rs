use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_overrides::{EngineConfig, MemoryAdapter};
use std::fs;
use std::path::PathBuf;

const EXAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Home</title></head>
<body>
<header><nav data-nav><a href="/index.html">Home</a><a href="/contact.html">Contact</a></nav></header>
<main>
<section><h1>Welcome</h1><p>Edit this text from the page itself.</p><a class="btn" href="/contact.html">Get in touch</a></section>
<section><h2>About</h2><p>Sections can be reordered.</p></section>
</main>
</body>
</html>
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Site directory
    #[arg(short, long, default_value = "site")]
    pub site_dir: String,

    /// Override API origin; without it overrides live in a local snapshot
    #[arg(long)]
    pub api: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Folio site...".bright_blue().bold());

    let site_dir = PathBuf::from(cwd).join(&args.site_dir);
    if !site_dir.exists() {
        fs::create_dir_all(&site_dir)?;
        println!("  {} Created {}/", "✓".green(), args.site_dir);
    }

    let example_file = site_dir.join("index.html");
    if !example_file.exists() {
        fs::write(&example_file, EXAMPLE_PAGE)?;
        println!("  {} Created index.html", "✓".green());
    }

    let overrides_file = match &args.api {
        Some(_) => None,
        None => {
            let name = "overrides.json";
            let path = PathBuf::from(cwd).join(name);
            if !path.exists() {
                fs::write(&path, MemoryAdapter::new().to_json()?)?;
                println!("  {} Created {}", "✓".green(), name);
            }
            Some(name.to_string())
        }
    };

    let config = Config {
        site_dir: args.site_dir.clone(),
        api_base_url: args.api.clone(),
        overrides_file,
        engine: EngineConfig::default(),
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Site initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: folio assign-ids");
    println!("  2. Run: folio lint");
    println!("  3. Run: folio apply --out-dir dist");

    Ok(())
}
