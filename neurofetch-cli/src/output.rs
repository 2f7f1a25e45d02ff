//! Terminal output: progress bars while running, a report afterwards.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use neurofetch::batch::{BatchEntry, BatchObserver, BatchReport, ItemStage, ItemStatus};
use neurofetch::catalog::Selection;

const ITEMS_TEMPLATE: &str = "[{bar:40.cyan/blue}] {pos}/{len} {msg}";

const BYTES_TEMPLATE: &str =
    "  {spinner:.blue} {wide_bar:.green/yellow} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

fn style_or_default(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Two-line progress display: items done, and bytes of the current download.
pub struct ProgressDisplay {
    multi: MultiProgress,
    items: ProgressBar,
    bytes: ProgressBar,
}

impl ProgressDisplay {
    pub fn new(total_items: usize) -> Self {
        let multi = MultiProgress::new();

        let items = multi.add(ProgressBar::new(total_items as u64));
        items.set_style(style_or_default(ITEMS_TEMPLATE).progress_chars("#>-"));

        let bytes = multi.add(ProgressBar::new(0));
        bytes.set_style(style_or_default(BYTES_TEMPLATE).progress_chars("█▓▒░  "));

        Self {
            multi,
            items,
            bytes,
        }
    }

    pub fn finish(&self) {
        self.bytes.finish_and_clear();
        self.items.finish_and_clear();
    }
}

impl BatchObserver for ProgressDisplay {
    fn item_started(&self, index: usize, total: usize, selection: &Selection) {
        self.items.set_message(format!(
            "({}/{}) {} {}",
            index + 1,
            total,
            selection.group(),
            selection.name()
        ));
        self.bytes.reset();
        self.bytes.set_length(0);
    }

    fn stage(&self, stage: ItemStage) {
        self.bytes.set_message(stage.name());
    }

    fn bytes(&self, downloaded: u64, total: Option<u64>) {
        if let Some(total) = total {
            self.bytes.set_length(total);
        }
        self.bytes.set_position(downloaded);
    }

    fn item_finished(&self, entry: &BatchEntry) {
        self.items.inc(1);
        // Printing through MultiProgress keeps the bars below the line.
        let _ = self.multi.println(format_entry(entry));
    }
}

/// One report line, e.g. `  ✓ networks  brainExtraction  downloaded 1024 bytes`.
pub fn format_entry(entry: &BatchEntry) -> String {
    let marker = match &entry.status {
        status if status.is_success() => style("✓").green(),
        ItemStatus::Corrupt { .. } | ItemStatus::Unknown => style("!").yellow(),
        _ => style("✗").red(),
    };
    format!(
        "  {} {:<8}  {}  {}",
        marker, entry.group, entry.name, entry.status
    )
}

/// Print the full report and a summary line.
pub fn print_report(report: &BatchReport, include_entries: bool) {
    if include_entries {
        for entry in report.entries() {
            println!("{}", format_entry(entry));
        }
    }

    println!();
    let summary = format!(
        "{} of {} items ready, {} bytes downloaded",
        report.succeeded(),
        report.len(),
        report.bytes_downloaded()
    );
    if report.has_failures() {
        println!("{}", style(summary).yellow().bold());
        println!("Not installed:");
        for entry in report.failures() {
            println!("  {} {}: {}", style("-").red(), entry.name, entry.status);
        }
    } else {
        println!("{}", style(summary).green().bold());
    }
}
