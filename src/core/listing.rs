//! Rows of the application list: joins, filters and per-row flags

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::stats::{StatsContext, activity_date, is_overdue, is_stale};
use crate::core::types::{
    ApplicationsPageData, FollowUpRecord, LinkRecord, Stage, Status, company_name,
};
use crate::utils::parse_record_date;

/// Inclusive day range applied to the activity date
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DateRange {
    pub(crate) since: Option<NaiveDate>,
    pub(crate) until: Option<NaiveDate>,
}

impl DateRange {
    pub(crate) fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until }
    }

    pub(crate) fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        if let Some(s) = self.since
            && date < s
        {
            return false;
        }
        if let Some(u) = self.until
            && date > u
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ListFilter {
    pub(crate) stage: Option<Stage>,
    pub(crate) status: Option<Status>,
    /// Case-insensitive substring of the company name
    pub(crate) company: Option<String>,
    /// Case-insensitive substring of the role title or company name
    pub(crate) search: Option<String>,
    pub(crate) dates: DateRange,
    pub(crate) overdue_only: bool,
    pub(crate) stale_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ListRow {
    pub(crate) id: String,
    pub(crate) company: String,
    pub(crate) role: String,
    pub(crate) stage: Stage,
    pub(crate) status: Status,
    pub(crate) applied: Option<NaiveDate>,
    pub(crate) last_touch: Option<NaiveDate>,
    pub(crate) link: Option<String>,
    pub(crate) next_follow_up: Option<NaiveDate>,
    pub(crate) overdue: bool,
    pub(crate) stale: bool,
    #[serde(skip)]
    pub(crate) created_at: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Newest link by `created_at`; on a tie the one listed first wins, since
/// links arrive newest first
fn latest_link<'a>(links: &'a [LinkRecord], app_id: &str) -> Option<&'a LinkRecord> {
    links
        .iter()
        .enumerate()
        .filter(|(_, l)| l.application_id.as_deref() == Some(app_id))
        .filter(|(_, l)| !l.href().is_empty())
        .max_by(|(i, a), (j, b)| a.created_at.cmp(&b.created_at).then(j.cmp(i)))
        .map(|(_, l)| l)
}

/// Earliest dated open follow-up, else the first undated one
fn next_open<'a>(follow_ups: &'a [FollowUpRecord], app_id: &str) -> Option<&'a FollowUpRecord> {
    let mut open = follow_ups
        .iter()
        .filter(|f| f.is_open() && f.application_id.as_deref() == Some(app_id));
    let dated = open
        .clone()
        .filter(|f| f.due_at.is_some())
        .min_by(|a, b| a.due_at.cmp(&b.due_at));
    dated.or_else(|| open.next())
}

impl ListFilter {
    fn matches(&self, row: &ListRow, role_title: &str) -> bool {
        if self.stage.is_some_and(|s| s != row.stage)
            || self.status.is_some_and(|s| s != row.status)
        {
            return false;
        }
        if let Some(company) = self.company.as_deref()
            && !contains_ci(&row.company, company)
        {
            return false;
        }
        if let Some(term) = self.search.as_deref()
            && !contains_ci(role_title, term)
            && !contains_ci(&row.company, term)
        {
            return false;
        }
        if !self.dates.is_unbounded() && !row.applied.is_some_and(|d| self.dates.contains(d)) {
            return false;
        }
        if self.overdue_only && !row.overdue {
            return false;
        }
        if self.stale_only && !row.stale {
            return false;
        }
        true
    }
}

/// Join the page data into rows, newest created first, keeping those the
/// filter accepts
pub(crate) fn build_rows(
    data: &ApplicationsPageData,
    filter: &ListFilter,
    ctx: &StatsContext,
) -> Vec<ListRow> {
    let mut rows: Vec<ListRow> = data
        .applications
        .iter()
        .filter_map(|app| {
            let follow_up = next_open(&data.open_follow_ups, &app.id);
            let row = ListRow {
                id: app.id.clone(),
                company: company_name(app, &data.companies),
                role: app.role_label().to_string(),
                stage: app.stage(),
                status: app.status(),
                applied: activity_date(app, ctx.timezone),
                last_touch: parse_record_date(app.last_touch_at.as_deref(), ctx.timezone),
                link: latest_link(&data.links, &app.id).map(LinkRecord::href),
                next_follow_up: follow_up
                    .and_then(|f| parse_record_date(f.due_at.as_deref(), ctx.timezone)),
                overdue: follow_up.is_some_and(|f| is_overdue(f, ctx)),
                stale: is_stale(app, follow_up.is_some(), ctx),
                created_at: app.created_at.clone(),
            };
            let role_title = app.role_title.as_deref().unwrap_or_default();
            filter.matches(&row, role_title).then_some(row)
        })
        .collect();

    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}
