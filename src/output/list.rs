use comfy_table::{Cell, Color};
use chrono::NaiveDate;
use std::fmt::Write;

use crate::cli::SortOrder;
use crate::consts::DATE_FORMAT;
use crate::core::{ListRow, Stage, Status};
use crate::output::format::{
    create_styled_table, csv_escape, header_cell, styled_cell, tint, to_json,
};

/// Rows arrive newest first
fn ordered(rows: &[ListRow], order: SortOrder) -> Vec<&ListRow> {
    match order {
        SortOrder::Desc => rows.iter().collect(),
        SortOrder::Asc => rows.iter().rev().collect(),
    }
}

fn day(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Applied => Color::White,
        Stage::Oa => Color::Blue,
        Stage::Interview => Color::Magenta,
        Stage::Offer => Color::Green,
    }
}

fn status_color(status: Status) -> Option<Color> {
    match status {
        Status::Active => None,
        Status::Accepted => Some(Color::Green),
        Status::Rejected => Some(Color::Red),
        Status::Withdrawn => Some(Color::DarkGrey),
    }
}

fn flags(row: &ListRow) -> String {
    let mut parts = Vec::new();
    if row.overdue {
        parts.push("overdue");
    }
    if row.stale {
        parts.push("stale");
    }
    parts.join(", ")
}

pub(crate) fn print_list_table(
    rows: &[ListRow],
    order: SortOrder,
    source_label: &str,
    use_color: bool,
) {
    if rows.is_empty() {
        println!("\n  No applications found.\n");
        return;
    }

    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("ID", use_color),
        header_cell("Company", use_color),
        header_cell("Role", use_color),
        header_cell("Stage", use_color),
        header_cell("Status", use_color),
        header_cell("Applied", use_color),
        header_cell("Follow-up", use_color),
        header_cell("Flags", use_color),
    ]);

    for row in ordered(rows, order) {
        let follow_up_color = if row.overdue { tint(use_color, Color::Red) } else { None };
        table.add_row(vec![
            Cell::new(&row.id),
            styled_cell(&row.company, None, true),
            Cell::new(&row.role),
            styled_cell(row.stage.as_str(), tint(use_color, stage_color(row.stage)), false),
            styled_cell(
                row.status.as_str(),
                status_color(row.status).filter(|_| use_color),
                false,
            ),
            Cell::new(day(row.applied)),
            styled_cell(&day(row.next_follow_up), follow_up_color, false),
            styled_cell(&flags(row), tint(use_color, Color::Yellow), false),
        ]);
    }

    println!("\n  {source_label} Applications\n");
    println!("{table}");
    println!(
        "\n  {} application{}\n",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    );
}

pub(crate) fn output_list_json(rows: &[ListRow], order: SortOrder) -> String {
    to_json(&ordered(rows, order), "[]")
}

pub(crate) fn output_list_csv(rows: &[ListRow], order: SortOrder) -> String {
    let mut out = String::from(
        "id,company,role,stage,status,applied,last_touch,next_follow_up,overdue,stale,link\n",
    );
    for row in ordered(rows, order) {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv_escape(&row.id),
            csv_escape(&row.company),
            csv_escape(&row.role),
            row.stage,
            row.status,
            day(row.applied),
            day(row.last_touch),
            day(row.next_follow_up),
            row.overdue,
            row.stale,
            csv_escape(row.link.as_deref().unwrap_or_default()),
        );
    }
    out
}
