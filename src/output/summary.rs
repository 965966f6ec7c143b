use std::fmt::Write;

use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use console::style;
use serde::Serialize;

use crate::executor::ExecutorMetadata;
use crate::providers::CiProvider;
use crate::uploader::Backend;

/// Everything a PR/MR notifier needs to comment on the run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    /// Title the notifier uses for its comment section
    pub ci_report_title: Option<String>,
    pub provider: CiProvider,
    pub backend: Backend,
    pub build_order: String,
    pub report_url: String,
    /// Primary URL first, then one per plugin
    pub report_urls: Vec<String>,
    pub result_dirs: usize,
    pub executor: Option<ExecutorMetadata>,
    pub published_at: DateTime<Utc>,
}

/// Prints a human-readable summary of the published report to stdout.
pub fn print_summary(summary: &PublishSummary) {
    println!("{}", render_summary(summary));
}

fn render_summary(summary: &PublishSummary) -> String {
    let mut output = String::new();

    let title = summary.ci_report_title.as_deref().unwrap_or("Report");
    let _ = writeln!(output, "{}", style(title).bright().underlined());
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        style("CI provider:").dim(),
        style(summary.provider.label()).cyan(),
        style("Build:").dim(),
        style(&summary.build_order).cyan(),
        style("Result directories:").dim(),
        style(summary.result_dirs).cyan(),
        style("Published:").dim(),
        style(summary.published_at.format("%Y-%m-%d %H:%M UTC")).dim()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Report").fg(TableColor::Cyan),
            Cell::new("URL").fg(TableColor::Cyan),
        ]);

    for (index, url) in summary.report_urls.iter().enumerate() {
        let label = if index == 0 { "main" } else { "plugin" };
        table.add_row(vec![Cell::new(label), Cell::new(url).fg(TableColor::Green)]);
    }

    let _ = writeln!(output, "{table}");
    let _ = write!(output, "{} {}", style("✓").bright().green(), summary.report_url);

    output
}
