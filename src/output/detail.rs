use comfy_table::{Cell, Color};
use std::fmt::Write;

use crate::core::ApplicationDetail;
use crate::output::format::{create_styled_table, header_cell, styled_cell, tint, to_json};
use crate::utils::{Timezone, format_date_label};

fn overview(detail: &ApplicationDetail, tz: Timezone, use_color: bool) -> String {
    let app = &detail.application;
    let mut table = create_styled_table();
    table.set_header(vec![header_cell("Field", use_color), header_cell("Value", use_color)]);
    let rows = [
        ("ID", app.id.clone()),
        ("Company", detail.company_name.clone()),
        ("Role", app.role_label().to_string()),
        ("Stage", app.stage().to_string()),
        ("Status", app.status().to_string()),
        ("Applied", format_date_label(app.applied_at.as_deref(), tz)),
        ("Last touch", format_date_label(app.last_touch_at.as_deref(), tz)),
        ("Created", format_date_label(app.created_at.as_deref(), tz)),
        ("Open follow-ups", detail.open_follow_ups().count().to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![styled_cell(label, None, true), Cell::new(value)]);
    }
    table.to_string()
}

fn follow_ups(detail: &ApplicationDetail, tz: Timezone, use_color: bool) -> String {
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("ID", use_color),
        header_cell("Due", use_color),
        header_cell("State", use_color),
        header_cell("Note", use_color),
    ]);
    for f in &detail.follow_ups {
        let (state, color) = if f.is_open() {
            ("open", tint(use_color, Color::Yellow))
        } else {
            ("done", tint(use_color, Color::DarkGrey))
        };
        table.add_row(vec![
            Cell::new(&f.id),
            Cell::new(format_date_label(f.due_at.as_deref(), tz)),
            styled_cell(state, color, false),
            Cell::new(f.note.as_deref().unwrap_or_default()),
        ]);
    }
    table.to_string()
}

/// One application with its follow-ups, links and notes as plain text
pub(crate) fn render_detail(detail: &ApplicationDetail, tz: Timezone, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n  {} at {}\n",
        detail.application.role_label(),
        detail.company_name
    );
    let _ = writeln!(out, "{}", overview(detail, tz, use_color));

    if !detail.follow_ups.is_empty() {
        let _ = writeln!(out, "\n  Follow-ups\n");
        let _ = writeln!(out, "{}", follow_ups(detail, tz, use_color));
    }

    let _ = writeln!(out, "\n  Links");
    if detail.links.is_empty() {
        let _ = writeln!(out, "    none");
    }
    for link in &detail.links {
        let _ = writeln!(out, "    {}: {}", link.label_or_default(), link.href());
    }

    let _ = writeln!(out, "\n  Notes");
    if detail.notes.is_empty() {
        let _ = writeln!(out, "    none");
    }
    for note in &detail.notes {
        let _ = writeln!(
            out,
            "    [{}] {}",
            format_date_label(note.created_at.as_deref(), tz),
            note.content.as_deref().unwrap_or_default().trim()
        );
    }
    out.push('\n');
    out
}

pub(crate) fn output_detail_json(detail: &ApplicationDetail) -> String {
    to_json(detail, "{}")
}
