use crate::book::BookRef;
use crate::config::Settings;
use crate::error::Result;
use crate::export::{ExportFormat, export_file_name, export_rows};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use lexis_scanner::catalog::ROOT_PARENT;
use lexis_scanner::client::build_http_client;
use lexis_scanner::title::fetch_page_title;
use lexis_scanner::{CatalogClient, WalkReport, Walker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options for a single extraction run
pub struct ExtractOptions {
    pub book: BookRef,
    pub settings: Settings,
    /// Explicit output file; otherwise the name is derived from the book title.
    pub output: Option<PathBuf>,
    /// Overrides the title read from the book page.
    pub name: Option<String>,
    /// Overrides both the output extension and the configured format.
    pub format: Option<ExportFormat>,
    pub show_progress_bars: bool,
}

/// Callback for reporting extraction progress
pub type ExtractProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub book_id: String,
    pub title: Option<String>,
    pub output: PathBuf,
    pub format: ExportFormat,
    pub report: WalkReport,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl Extraction {
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Terminal spinner that lives for exactly one run and clears itself when dropped.
pub struct RunIndicator {
    bar: Option<ProgressBar>,
}

impl RunIndicator {
    pub fn start(enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("Loading...");
        Self { bar: Some(bar) }
    }

    pub fn set_message(&self, msg: String) {
        if let Some(ref bar) = self.bar {
            bar.set_message(msg);
        }
    }

    fn handle(&self) -> Option<ProgressBar> {
        self.bar.clone()
    }
}

impl Drop for RunIndicator {
    fn drop(&mut self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Pick the output path and format for a run.
///
/// Format precedence: explicit format, then the output file's extension, then
/// the configured default. Without an explicit output the file is named after
/// the title (or the book id) in the current directory.
pub fn resolve_output(
    output: Option<&Path>,
    format: Option<ExportFormat>,
    configured: ExportFormat,
    title: Option<&str>,
    book_id: &str,
) -> (PathBuf, ExportFormat) {
    match output {
        Some(path) => {
            let format = format
                .or_else(|| ExportFormat::from_path(path))
                .unwrap_or(configured);
            (path.to_path_buf(), format)
        }
        None => {
            let format = format.unwrap_or(configured);
            (PathBuf::from(export_file_name(title, book_id, format)), format)
        }
    }
}

/// Read the book's display title, falling back to `None` on any failure.
async fn discover_title(client: &reqwest::Client, book: &BookRef, settings: &Settings) -> Option<String> {
    let page_url = match book.page_url(&settings.book_page_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot build book page URL for {}: {}", book.id, e);
            return None;
        }
    };

    match fetch_page_title(client, &page_url).await {
        Ok(Some(title)) => Some(title),
        Ok(None) => {
            warn!("No title found on {}; naming the export after {}", page_url, book.id);
            None
        }
        Err(e) => {
            warn!("Could not load {}: {}; naming the export after {}", page_url, e, book.id);
            None
        }
    }
}

/// Walk a book's catalog and write its entries to a spreadsheet.
pub async fn execute_extraction(
    options: ExtractOptions,
    progress_callback: Option<ExtractProgressCallback>,
) -> Result<Extraction> {
    let ExtractOptions {
        book,
        settings,
        output,
        name,
        format,
        show_progress_bars,
    } = options;

    let started_at = Local::now();
    info!("Starting extraction of {}", book.id);

    let http = build_http_client(&settings.http_options())?;

    let title = match name {
        Some(name) => Some(name),
        None => discover_title(&http, &book, &settings).await,
    };
    let (output, format) = resolve_output(
        output.as_deref(),
        format,
        settings.format,
        title.as_deref(),
        &book.id,
    );

    if let Some(ref callback) = progress_callback {
        callback(format!(
            "Extracting {} ({}) into {}",
            book.id,
            title.as_deref().unwrap_or("untitled"),
            output.display()
        ));
    }

    let client = CatalogClient::with_client(http, &settings.catalog_base_url, &book.id)?
        .with_retry_policy(settings.retry_policy());

    let indicator = RunIndicator::start(show_progress_bars);
    let spinner = indicator.handle();
    let walker = Walker::new(client)
        .with_page_size(settings.page_size)
        .with_max_depth(settings.max_depth)
        .with_branch_policy(settings.branch_policy)
        .with_progress_callback(Arc::new(move |rows: usize, parent: String| {
            if let Some(ref bar) = spinner {
                let parent = if parent.is_empty() { "top level".to_string() } else { parent };
                bar.set_message(format!("Walking catalog... {} entries, fetching {}", rows, parent));
            }
        }));

    let report = walker.walk(ROOT_PARENT).await;

    if let Some(failure) = report.root_failure() {
        warn!(
            "Top level of {} could not be read ({}); exporting an empty sheet",
            book.id,
            failure.failure.as_deref().unwrap_or("no response")
        );
    }

    indicator.set_message(format!("Writing {} entries...", report.rows.len()));
    export_rows(&report.rows, &output, format)?;
    drop(indicator);

    info!("Wrote {} entries to {}", report.rows.len(), output.display());

    Ok(Extraction {
        book_id: book.id,
        title,
        output,
        format,
        report,
        started_at,
        finished_at: Local::now(),
    })
}

/// Generate a plain-text summary of a finished run
pub fn generate_extraction_summary(extraction: &Extraction) -> String {
    let report = &extraction.report;
    let mut summary = String::new();

    summary.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    summary.push_str("# Summary:\n");
    summary.push_str(&format!("  Book: {}\n", extraction.book_id));
    if let Some(ref title) = extraction.title {
        summary.push_str(&format!("  Title: {}\n", title));
    }
    summary.push_str(&format!("  Entries exported: {}\n", report.rows.len()));
    summary.push_str(&format!("  Parents fetched: {}\n", report.parents_fetched));
    summary.push_str(&format!("  Elapsed: {:.1}s\n", extraction.elapsed().as_secs_f64()));
    summary.push_str(&format!(
        "  Output: {} ({})\n",
        extraction.output.display(),
        extraction.format.extension()
    ));

    if !report.is_complete() {
        summary.push_str("\n## Incomplete\n");
        if report.root_failure().is_some() {
            summary.push_str("  The top level of the catalog could not be read; the export is empty\n");
        }
        for partial in &report.partial_parents {
            let parent = if partial.parent.is_empty() {
                "(top level)"
            } else {
                partial.parent.as_str()
            };
            let total = partial
                .reported_total
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string());
            summary.push_str(&format!(
                "  {}: {} of {} children",
                parent, partial.gathered, total
            ));
            if let Some(ref failure) = partial.failure {
                summary.push_str(&format!(" ({})", failure));
            }
            summary.push('\n');
        }
        if report.depth_skipped > 0 {
            summary.push_str(&format!(
                "  {} branches skipped at the depth limit\n",
                report.depth_skipped
            ));
        }
    }

    summary
}
