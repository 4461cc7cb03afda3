use comfy_table::{Cell, Color};
use std::fmt::Write;

use crate::core::{ChartPoint, Dashboard, DashboardSummary, MonthOption};
use crate::output::format::{
    bar, create_styled_table, format_days, format_percent, header_cell, right_cell, styled_cell,
    tint, to_json,
};

fn summary_table(s: &DashboardSummary, use_color: bool) -> String {
    let mut table = create_styled_table();
    table.set_header(vec![header_cell("Metric", use_color), header_cell("Value", use_color)]);

    let alert = |n: usize| if n > 0 { tint(use_color, Color::Red) } else { None };
    let rows: [(&str, String, Option<Color>); 9] = [
        ("Applications", s.total.to_string(), None),
        ("Active", s.active.to_string(), None),
        ("Responded", s.responded.to_string(), None),
        ("Offers", s.offers.to_string(), tint(use_color && s.offers > 0, Color::Green)),
        ("Response rate", format_percent(s.response_rate), None),
        ("Median response", format_days(s.median_response_days), None),
        ("Overdue follow-ups", s.overdue_follow_ups.to_string(), alert(s.overdue_follow_ups)),
        ("Due today", s.due_today.to_string(), tint(use_color && s.due_today > 0, Color::Yellow)),
        ("Stale", s.stale.to_string(), tint(use_color && s.stale > 0, Color::Yellow)),
    ];
    for (label, value, color) in rows {
        table.add_row(vec![Cell::new(label), right_cell(&value, color, false)]);
    }
    table.to_string()
}

fn activity_table(activity: &[ChartPoint], use_color: bool) -> String {
    let max = activity.iter().map(|p| p.value).max().unwrap_or(0);
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Period", use_color),
        header_cell("Apps", use_color),
        header_cell("", use_color),
    ]);
    for point in activity {
        table.add_row(vec![
            Cell::new(&point.label),
            right_cell(&point.value.to_string(), None, false),
            styled_cell(&bar(point.value, max), tint(use_color, Color::Blue), false),
        ]);
    }
    table.to_string()
}

fn month_line(month: &MonthOption) -> String {
    format!(
        "{}: {} application{}",
        month.label,
        month.applications,
        if month.applications == 1 { "" } else { "s" }
    )
}

/// Summary, activity chart and the selected month as plain text
pub(crate) fn render_dashboard(
    dashboard: &Dashboard,
    source_label: &str,
    use_color: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n  {source_label} Dashboard\n");
    let _ = writeln!(out, "{}", summary_table(&dashboard.summary, use_color));
    let _ = writeln!(out, "\n  Activity by {}\n", dashboard.view);
    let _ = writeln!(out, "{}", activity_table(&dashboard.activity, use_color));

    if let Some(month) = &dashboard.selected_month {
        let _ = writeln!(out, "\n  {}", month_line(month));
    }
    let others: Vec<&str> = dashboard
        .months
        .iter()
        .filter(|m| Some(&m.key) != dashboard.selected_month.as_ref().map(|s| &s.key))
        .map(|m| m.key.as_str())
        .collect();
    if !others.is_empty() {
        let _ = writeln!(out, "  Other months: {}", others.join(", "));
    }
    out.push('\n');
    out
}

pub(crate) fn output_dashboard_json(dashboard: &Dashboard) -> String {
    to_json(dashboard, "{}")
}
