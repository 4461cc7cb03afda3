use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, TableComponent,
    modifiers::UTF8_SOLID_INNER_BORDERS, presets::UTF8_FULL,
};
use serde::Serialize;

/// Width of a full chart bar
const BAR_WIDTH: usize = 30;

/// Display text for a missing rate or median
const NOT_AVAILABLE: &str = "N/A";

pub(super) fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub(super) fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub(super) fn format_days(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}d"),
        Some(v) => format!("{v:.1}d"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Bar height as a share of the tallest bar, 0..=100
pub(super) fn bar_percent(value: usize, max: usize) -> usize {
    let max = max.max(1);
    ((value as f64 / max as f64) * 100.0).round() as usize
}

pub(super) fn bar(value: usize, max: usize) -> String {
    let width = bar_percent(value, max) * BAR_WIDTH / 100;
    if width == 0 && value > 0 {
        return "▏".to_string();
    }
    "█".repeat(width)
}

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize JSON output");
        fallback.to_string()
    })
}

pub(super) fn styled_cell(text: &str, color: Option<Color>, bold: bool) -> Cell {
    let mut cell = Cell::new(text);
    if let Some(c) = color {
        cell = cell.fg(c);
    }
    if bold {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

pub(super) fn header_cell(text: &str, use_color: bool) -> Cell {
    let mut cell = Cell::new(text).add_attribute(Attribute::Bold);
    if use_color {
        cell = cell.fg(Color::Cyan);
    }
    cell
}

/// Replace the double-line header separator (╞═╪═╡) with single-line (├─┼─┤)
fn normalize_header_separator(table: &mut Table) {
    table.set_style(TableComponent::HeaderLines, '─');
    table.set_style(TableComponent::LeftHeaderIntersection, '├');
    table.set_style(TableComponent::MiddleHeaderIntersections, '┼');
    table.set_style(TableComponent::RightHeaderIntersection, '┤');
}

/// Create a table with the standard preset, inner borders, and normalized header separator.
pub(super) fn create_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    normalize_header_separator(&mut table);
    table
}

pub(super) fn right_cell(text: &str, color: Option<Color>, bold: bool) -> Cell {
    let mut cell = Cell::new(text).set_alignment(CellAlignment::Right);
    if let Some(c) = color {
        cell = cell.fg(c);
    }
    if bold {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

/// Pick a color only when color output is on
pub(super) fn tint(use_color: bool, color: Color) -> Option<Color> {
    use_color.then_some(color)
}
