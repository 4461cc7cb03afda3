//! Dashboard aggregation
//!
//! Buckets applications by day/month/year, computes the response figures
//! and flags stale applications and overdue follow-ups. Everything here is
//! pure: the reference day comes from [`StatsContext`].

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::consts::{DATE_FORMAT, MONTH_KEY_FORMAT};
use crate::core::types::{ApplicationRecord, ApplicationsPageData, FollowUpRecord, Stage, Status};
use crate::utils::{Timezone, parse_record_date};

const DAY_BUCKETS: u32 = 14;
const MONTH_BUCKETS: u32 = 12;
const YEAR_BUCKETS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Period {
    Day,
    #[default]
    Month,
    Year,
}

impl Period {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

/// Reference day and thresholds shared by the derived figures
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatsContext {
    pub(crate) today: NaiveDate,
    pub(crate) timezone: Timezone,
    pub(crate) stale_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ChartPoint {
    pub(crate) key: String,
    pub(crate) label: String,
    pub(crate) value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MonthOption {
    pub(crate) key: String,
    pub(crate) label: String,
    pub(crate) applications: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct DashboardSummary {
    pub(crate) total: usize,
    pub(crate) active: usize,
    pub(crate) offers: usize,
    pub(crate) responded: usize,
    /// Percentage with one decimal, `None` without eligible applications
    pub(crate) response_rate: Option<f64>,
    pub(crate) median_response_days: Option<f64>,
    pub(crate) overdue_follow_ups: usize,
    pub(crate) due_today: usize,
    pub(crate) stale: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Dashboard {
    pub(crate) summary: DashboardSummary,
    pub(crate) view: &'static str,
    pub(crate) activity: Vec<ChartPoint>,
    pub(crate) months: Vec<MonthOption>,
    pub(crate) selected_month: Option<MonthOption>,
}

/// Day an application counts for: applied date, else creation date
pub(crate) fn activity_date(app: &ApplicationRecord, tz: Timezone) -> Option<NaiveDate> {
    parse_record_date(app.applied_at.as_deref(), tz)
        .or_else(|| parse_record_date(app.created_at.as_deref(), tz))
}

/// An employer reacted: the stage moved past Applied or a verdict is in
pub(crate) fn is_responded(app: &ApplicationRecord) -> bool {
    app.stage() != Stage::Applied || matches!(app.status(), Status::Rejected | Status::Accepted)
}

pub(crate) fn is_offer(app: &ApplicationRecord) -> bool {
    app.stage() == Stage::Offer || app.status() == Status::Accepted
}

pub(crate) fn is_overdue(follow_up: &FollowUpRecord, ctx: &StatsContext) -> bool {
    parse_record_date(follow_up.due_at.as_deref(), ctx.timezone).is_some_and(|due| due < ctx.today)
}

fn is_due_today(follow_up: &FollowUpRecord, ctx: &StatsContext) -> bool {
    parse_record_date(follow_up.due_at.as_deref(), ctx.timezone) == Some(ctx.today)
}

/// Active, nothing scheduled, and untouched for longer than the threshold
pub(crate) fn is_stale(
    app: &ApplicationRecord,
    has_open_follow_up: bool,
    ctx: &StatsContext,
) -> bool {
    if app.status() != Status::Active || has_open_follow_up {
        return false;
    }
    let last = parse_record_date(app.last_touch_at.as_deref(), ctx.timezone)
        .or_else(|| activity_date(app, ctx.timezone));
    last.is_some_and(|day| (ctx.today - day).num_days() > ctx.stale_days)
}

/// Application ids that have at least one open follow-up
pub(crate) fn open_follow_up_ids(follow_ups: &[FollowUpRecord]) -> HashSet<&str> {
    follow_ups
        .iter()
        .filter(|f| f.is_open())
        .filter_map(|f| f.application_id.as_deref())
        .collect()
}

pub(crate) fn median(mut values: Vec<i64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    } else {
        Some(values[mid] as f64)
    }
}

fn period_key(date: NaiveDate, period: Period) -> String {
    match period {
        Period::Day => date.format(DATE_FORMAT).to_string(),
        Period::Month => date.format(MONTH_KEY_FORMAT).to_string(),
        Period::Year => date.year().to_string(),
    }
}

fn bucket_days(period: Period, today: NaiveDate) -> Vec<NaiveDate> {
    match period {
        Period::Day => (0..DAY_BUCKETS)
            .rev()
            .filter_map(|back| today.checked_sub_days(chrono::Days::new(back.into())))
            .collect(),
        Period::Month => {
            let first = today.with_day(1).unwrap_or(today);
            (0..MONTH_BUCKETS)
                .rev()
                .filter_map(|back| first.checked_sub_months(Months::new(back)))
                .collect()
        }
        Period::Year => (0..YEAR_BUCKETS)
            .rev()
            .filter_map(|back| NaiveDate::from_ymd_opt(today.year() - back, 1, 1))
            .collect(),
    }
}

fn bucket_label(date: NaiveDate, period: Period) -> String {
    match period {
        Period::Day => date.format("%b %-d").to_string(),
        Period::Month => date.format("%b %Y").to_string(),
        Period::Year => date.year().to_string(),
    }
}

/// Zero-filled chronological buckets ending at `today`
pub(crate) fn activity_series(
    dates: &[NaiveDate],
    period: Period,
    today: NaiveDate,
) -> Vec<ChartPoint> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for date in dates {
        *counts.entry(period_key(*date, period)).or_default() += 1;
    }

    bucket_days(period, today)
        .into_iter()
        .map(|start| {
            let key = period_key(start, period);
            ChartPoint {
                value: counts.get(&key).copied().unwrap_or(0),
                label: bucket_label(start, period),
                key,
            }
        })
        .collect()
}

/// Current month first, then every month with applications, newest first
pub(crate) fn snapshot_months(dates: &[NaiveDate], today: NaiveDate) -> Vec<MonthOption> {
    let mut counts: HashMap<String, (NaiveDate, usize)> = HashMap::new();
    for date in dates {
        let first = date.with_day(1).unwrap_or(*date);
        counts
            .entry(period_key(first, Period::Month))
            .or_insert((first, 0))
            .1 += 1;
    }

    let current_first = today.with_day(1).unwrap_or(today);
    let current_key = period_key(current_first, Period::Month);
    let current_count = counts.remove(&current_key).map_or(0, |(_, n)| n);

    let mut others: Vec<(String, (NaiveDate, usize))> = counts.into_iter().collect();
    others.sort_by(|a, b| b.0.cmp(&a.0));

    std::iter::once((current_key, (current_first, current_count)))
        .chain(others)
        .map(|(key, (first, applications))| MonthOption {
            key,
            label: first.format("%B %Y").to_string(),
            applications,
        })
        .collect()
}

pub(crate) fn summarize(data: &ApplicationsPageData, ctx: &StatsContext) -> DashboardSummary {
    let open_ids = open_follow_up_ids(&data.open_follow_ups);
    let mut summary = DashboardSummary {
        total: data.applications.len(),
        ..Default::default()
    };
    let mut withdrawn_silent = 0;
    let mut response_days = Vec::new();

    for app in &data.applications {
        let status = app.status();
        if status == Status::Active {
            summary.active += 1;
        }
        if is_offer(app) {
            summary.offers += 1;
        }
        if is_stale(app, open_ids.contains(app.id.as_str()), ctx) {
            summary.stale += 1;
        }

        if !is_responded(app) {
            if status == Status::Withdrawn {
                withdrawn_silent += 1;
            }
            continue;
        }
        summary.responded += 1;

        let start = activity_date(app, ctx.timezone);
        let end = parse_record_date(app.last_touch_at.as_deref(), ctx.timezone);
        if let (Some(start), Some(end)) = (start, end) {
            let days = (end - start).num_days();
            if days >= 0 {
                response_days.push(days);
            }
        }
    }

    let eligible = summary.total - withdrawn_silent;
    if eligible > 0 {
        let rate = summary.responded as f64 / eligible as f64 * 100.0;
        summary.response_rate = Some((rate * 10.0).round() / 10.0);
    }
    summary.median_response_days = median(response_days);

    for follow_up in data.open_follow_ups.iter().filter(|f| f.is_open()) {
        if is_overdue(follow_up, ctx) {
            summary.overdue_follow_ups += 1;
        } else if is_due_today(follow_up, ctx) {
            summary.due_today += 1;
        }
    }

    summary
}

pub(crate) fn build_dashboard(
    data: &ApplicationsPageData,
    ctx: &StatsContext,
    period: Period,
    month: Option<&str>,
) -> Dashboard {
    let dates: Vec<NaiveDate> = data
        .applications
        .iter()
        .filter_map(|app| activity_date(app, ctx.timezone))
        .collect();

    let months = snapshot_months(&dates, ctx.today);
    let selected_month = month
        .and_then(|key| months.iter().find(|m| m.key == key))
        .or_else(|| months.first())
        .cloned();

    Dashboard {
        summary: summarize(data, ctx),
        view: period.label(),
        activity: activity_series(&dates, period, ctx.today),
        months,
        selected_month,
    }
}
