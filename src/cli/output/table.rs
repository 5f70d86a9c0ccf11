//! Table output formatting for CLI commands
//!
//! Renders cache metrics and operation timings with comfy-table.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::collections::BTreeMap;
use std::env;

use crate::domain::models::{CacheMetrics, OperationStats};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    pub fn format_cache_metrics(&self, caches: &BTreeMap<String, CacheMetrics>) -> String {
        let mut table = Self::base_table();
        table.set_header(header(&[
            "Cache", "Used", "Size", "Hits", "Misses", "Hit ratio", "Evictions", "Memory (MB)",
        ]));

        for (name, metrics) in caches {
            let ratio = format!("{:.1}%", metrics.hit_ratio * 100.0);
            let ratio_cell = if self.use_colors && metrics.total_requests() > 0 {
                Cell::new(ratio).fg(hit_ratio_color(metrics.hit_ratio))
            } else {
                Cell::new(ratio)
            };

            table.add_row(vec![
                Cell::new(name),
                numeric(metrics.used),
                numeric(metrics.size),
                numeric(metrics.hits),
                numeric(metrics.misses),
                ratio_cell.set_alignment(CellAlignment::Right),
                numeric(metrics.evictions),
                numeric(format!("{:.4}", metrics.memory_usage_mb)),
            ]);
        }

        table.to_string()
    }

    pub fn format_operations(&self, operations: &BTreeMap<String, OperationStats>) -> String {
        let mut table = Self::base_table();
        table.set_header(header(&["Operation", "Calls", "Avg (ms)", "Min (ms)", "Max (ms)"]));

        for (name, stats) in operations {
            let name_cell = if self.use_colors && !stats.optimization_hints.is_empty() {
                Cell::new(name).fg(Color::Yellow)
            } else {
                Cell::new(name)
            };
            table.add_row(vec![
                name_cell,
                numeric(stats.calls),
                numeric(format!("{:.3}", stats.avg)),
                numeric(format!("{:.3}", stats.min)),
                numeric(format!("{:.3}", stats.max)),
            ]);
        }

        table.to_string()
    }

    fn base_table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

fn numeric(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn hit_ratio_color(ratio: f64) -> Color {
    if ratio >= 0.7 {
        Color::Green
    } else if ratio >= 0.3 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Honour NO_COLOR and dumb terminals.
fn supports_color() -> bool {
    env::var_os("NO_COLOR").is_none() && !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}
