use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use lexis_core::book::resolve_book;
use lexis_core::config::{DEFAULT_CONFIG_PATH, Settings, expand_path};
use lexis_core::export::ExportFormat;
use lexis_core::extract::{
    ExtractOptions, ExtractProgressCallback, execute_extraction, generate_extraction_summary,
};
use lexis_scanner::BranchPolicy;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Route log output to stderr. `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Settings given on the command line. Unset fields leave the file's value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub catalog_base_url: Option<String>,
    pub page_size: Option<usize>,
    pub max_attempts: Option<u32>,
    pub retry_interval_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_depth: Option<usize>,
    pub branch_policy: Option<BranchPolicy>,
    pub cookie: Option<String>,
}

impl SettingsOverrides {
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        let branch_policy = match args.get_one::<String>("branch-policy") {
            Some(policy) => Some(
                policy
                    .parse::<BranchPolicy>()
                    .map_err(anyhow::Error::msg)?,
            ),
            None => None,
        };

        Ok(Self {
            catalog_base_url: args
                .get_one::<Url>("base-url")
                .map(|url| url.as_str().trim_end_matches('/').to_string()),
            page_size: args.get_one::<usize>("page-size").copied(),
            max_attempts: args.get_one::<u32>("retries").copied(),
            retry_interval_ms: args.get_one::<u64>("retry-interval").copied(),
            timeout_secs: args.get_one::<u64>("timeout").copied(),
            max_depth: args.get_one::<usize>("max-depth").copied(),
            branch_policy,
            cookie: args.get_one::<String>("cookie").cloned(),
        })
    }

    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(base) = self.catalog_base_url {
            settings.catalog_base_url = base;
        }
        if let Some(size) = self.page_size {
            settings.page_size = size;
        }
        if let Some(attempts) = self.max_attempts {
            settings.max_attempts = attempts;
        }
        if let Some(interval) = self.retry_interval_ms {
            settings.retry_interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_secs {
            settings.timeout_secs = timeout;
        }
        if let Some(depth) = self.max_depth {
            settings.max_depth = depth;
        }
        if let Some(policy) = self.branch_policy {
            settings.branch_policy = policy;
        }
        if self.cookie.is_some() {
            settings.cookie = self.cookie;
        }
        settings
    }
}

/// Reject settings no run could succeed with.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.page_size == 0 {
        bail!("page size must be at least 1");
    }
    if settings.max_attempts == 0 {
        bail!("retries must be at least 1 (the first attempt counts)");
    }
    Url::parse(&settings.catalog_base_url)
        .with_context(|| format!("Invalid catalog base URL '{}'", settings.catalog_base_url))?;
    Ok(())
}

/// Load settings from `path` (or the default location) and layer CLI overrides on top.
pub fn load_settings(path: Option<&str>, overrides: SettingsOverrides) -> Result<Settings> {
    let path = expand_path(path.unwrap_or(DEFAULT_CONFIG_PATH));
    let settings = Settings::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    let settings = overrides.apply(settings);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Write a settings file holding every default. Refuses to replace an
/// existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Settings::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_run_settings(settings: &Settings) {
    println!("{} Catalog: {}", "→".blue(), settings.catalog_base_url);
    println!(
        "{} Page size {}, {} attempts {}ms apart, depth limit {}, {} branch policy",
        "→".blue(),
        settings.page_size,
        settings.max_attempts,
        settings.retry_interval_ms,
        settings.max_depth,
        settings.branch_policy
    );
    if settings.cookie.is_some() {
        println!("{} Sending session cookie", "→".blue());
    }
    println!();
}

pub async fn handle_extract(args: &ArgMatches, quiet: bool) -> Result<()> {
    let book_arg = args
        .get_one::<String>("book")
        .context("--book is required")?;
    let book = resolve_book(book_arg)?;
    let book_id = book.id.clone();

    let settings = load_settings(
        args.get_one::<String>("config").map(String::as_str),
        SettingsOverrides::from_matches(args)?,
    )?;

    let output = args
        .get_one::<String>("output")
        .map(|path| expand_path(path));
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ExportFormat::from_str(f));
    let name = args.get_one::<String>("name").cloned();
    let show_progress_bars = !quiet && !args.get_flag("no-progress");

    if !quiet {
        print_divider();
        println!("{}", format!("  EXTRACTING {}", book_id).bright_white().bold());
        print_divider();
        println!();
        print_run_settings(&settings);
    }

    let progress_callback: Option<ExtractProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{} {}", "→".blue(), msg);
        }))
    };

    let options = ExtractOptions {
        book,
        settings,
        output,
        name,
        format,
        show_progress_bars,
    };

    let extraction = execute_extraction(options, progress_callback)
        .await
        .with_context(|| format!("Extraction of {} failed", book_id))?;

    info!(
        "{} entries from {} in {:.1}s",
        extraction.report.rows.len(),
        book_id,
        extraction.elapsed().as_secs_f64()
    );

    if quiet {
        println!("{}", extraction.output.display());
        return Ok(());
    }

    println!();
    print!("{}", generate_extraction_summary(&extraction));
    println!();
    if extraction.report.is_complete() {
        println!(
            "{} Exported {} entries to {}",
            "✓".green().bold(),
            extraction.report.rows.len(),
            extraction.output.display().to_string().bright_white()
        );
    } else {
        println!(
            "{} Exported {} entries to {}, but some branches could not be fetched",
            "⚠".yellow().bold(),
            extraction.report.rows.len(),
            extraction.output.display().to_string().bright_white()
        );
    }

    Ok(())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let path = expand_path(path);
    let force = args.get_flag("force");

    write_default_config(&path, force)?;

    println!(
        "{} Wrote default settings to {}",
        "✓".green().bold(),
        path.display().to_string().bright_white()
    );
    Ok(())
}
