//! Records stored in the remote tables and the enums that classify them
//!
//! Every column except `id` is nullable upstream, so most fields are
//! `Option`s and the readers below supply the display fallbacks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FormError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum Stage {
    #[default]
    Applied,
    #[serde(rename = "OA")]
    Oa,
    Interview,
    Offer,
}

impl Stage {
    pub(crate) const ALL: [Stage; 4] = [Stage::Applied, Stage::Oa, Stage::Interview, Stage::Offer];
    const ALLOWED: &'static str = "Applied, OA, Interview, Offer";

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::Oa => "OA",
            Stage::Interview => "Interview",
            Stage::Offer => "Offer",
        }
    }

    /// Exact match against the stored values, anything else is `Applied`
    pub(crate) fn parse_or_default(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value.trim())
            .unwrap_or_default()
    }

    pub(crate) fn from_record(value: Option<&str>) -> Self {
        value.map(Self::parse_or_default).unwrap_or_default()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FormError::InvalidChoice {
                field: "stage",
                input: trimmed.to_string(),
                allowed: Self::ALLOWED,
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum Status {
    #[default]
    Active,
    Rejected,
    Accepted,
    Withdrawn,
}

impl Status {
    pub(crate) const ALL: [Status; 4] = [
        Status::Active,
        Status::Rejected,
        Status::Accepted,
        Status::Withdrawn,
    ];
    const ALLOWED: &'static str = "Active, Rejected, Accepted, Withdrawn";

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Rejected => "Rejected",
            Status::Accepted => "Accepted",
            Status::Withdrawn => "Withdrawn",
        }
    }

    pub(crate) fn parse_or_default(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value.trim())
            .unwrap_or_default()
    }

    pub(crate) fn from_record(value: Option<&str>) -> Self {
        value.map(Self::parse_or_default).unwrap_or_default()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FormError::InvalidChoice {
                field: "status",
                input: trimmed.to_string(),
                allowed: Self::ALLOWED,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ApplicationRecord {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) company_id: Option<String>,
    #[serde(default)]
    pub(crate) role_title: Option<String>,
    #[serde(default)]
    pub(crate) stage: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) applied_at: Option<String>,
    #[serde(default)]
    pub(crate) last_touch_at: Option<String>,
    #[serde(default)]
    pub(crate) created_at: Option<String>,
}

impl ApplicationRecord {
    pub(crate) fn stage(&self) -> Stage {
        Stage::from_record(self.stage.as_deref())
    }

    pub(crate) fn status(&self) -> Status {
        Status::from_record(self.status.as_deref())
    }

    pub(crate) fn role_label(&self) -> &str {
        self.role_title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Untitled role")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct CompanyRecord {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct LinkRecord {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) application_id: Option<String>,
    #[serde(default)]
    pub(crate) label: Option<String>,
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) created_at: Option<String>,
}

impl LinkRecord {
    pub(crate) fn label_or_default(&self) -> &str {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Open link")
    }

    pub(crate) fn href(&self) -> String {
        normalize_url(self.url.as_deref().unwrap_or_default().trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct FollowUpRecord {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) application_id: Option<String>,
    #[serde(default)]
    pub(crate) due_at: Option<String>,
    #[serde(default)]
    pub(crate) completed_at: Option<String>,
    #[serde(default)]
    pub(crate) note: Option<String>,
    #[serde(default)]
    pub(crate) created_at: Option<String>,
}

impl FollowUpRecord {
    pub(crate) fn is_open(&self) -> bool {
        self.completed_at
            .as_deref()
            .is_none_or(|s| s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct NoteRecord {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) application_id: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) created_at: Option<String>,
}

/// Rows behind the list and dashboard views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ApplicationsPageData {
    pub(crate) applications: Vec<ApplicationRecord>,
    pub(crate) companies: Vec<CompanyRecord>,
    pub(crate) links: Vec<LinkRecord>,
    pub(crate) open_follow_ups: Vec<FollowUpRecord>,
}

/// Everything shown for a single application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ApplicationDetail {
    pub(crate) application: ApplicationRecord,
    pub(crate) company_name: String,
    pub(crate) notes: Vec<NoteRecord>,
    pub(crate) links: Vec<LinkRecord>,
    pub(crate) follow_ups: Vec<FollowUpRecord>,
}

impl ApplicationDetail {
    pub(crate) fn open_follow_ups(&self) -> impl Iterator<Item = &FollowUpRecord> {
        self.follow_ups.iter().filter(|f| f.is_open())
    }
}

/// Resolve the display name of an application's company
pub(crate) fn company_name(app: &ApplicationRecord, companies: &[CompanyRecord]) -> String {
    let Some(company_id) = app.company_id.as_deref() else {
        return "No company set".to_string();
    };
    companies
        .iter()
        .find(|c| c.id == company_id)
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| "Unknown company".to_string())
}

/// Prefix scheme-less URLs with https://
pub(crate) fn normalize_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    if has_scheme(url) {
        return url.to_string();
    }
    format!("https://{url}")
}

fn has_scheme(url: &str) -> bool {
    match url.find("://") {
        Some(idx) if idx > 0 => url[..idx].chars().all(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parse_or_default_exact_values() {
        assert_eq!(Stage::parse_or_default("OA"), Stage::Oa);
        assert_eq!(Stage::parse_or_default("Offer"), Stage::Offer);
        // stored values are case sensitive
        assert_eq!(Stage::parse_or_default("offer"), Stage::Applied);
        assert_eq!(Stage::parse_or_default(""), Stage::Applied);
    }

    #[test]
    fn stage_from_str_is_lenient_about_case() {
        assert_eq!("interview".parse::<Stage>().unwrap(), Stage::Interview);
        assert_eq!("oa".parse::<Stage>().unwrap(), Stage::Oa);
        assert!("Hired".parse::<Stage>().is_err());
    }

    #[test]
    fn status_defaults_to_active() {
        assert_eq!(Status::parse_or_default("Ghosted"), Status::Active);
        assert_eq!(Status::from_record(None), Status::Active);
        assert_eq!(Status::from_record(Some("Withdrawn")), Status::Withdrawn);
    }

    #[test]
    fn stage_serializes_as_stored_value() {
        assert_eq!(serde_json::to_string(&Stage::Oa).unwrap(), r#""OA""#);
        assert_eq!(
            serde_json::to_string(&Status::Accepted).unwrap(),
            r#""Accepted""#
        );
    }

    #[test]
    fn records_tolerate_missing_columns() {
        let app: ApplicationRecord = serde_json::from_str(r#"{"id":"a1"}"#).unwrap();
        assert_eq!(app.id, "a1");
        assert_eq!(app.stage(), Stage::Applied);
        assert_eq!(app.role_label(), "Untitled role");

        let app: ApplicationRecord =
            serde_json::from_str(r#"{"id":"a2","role_title":null,"stage":"Interview"}"#).unwrap();
        assert_eq!(app.stage(), Stage::Interview);
    }

    #[test]
    fn follow_up_open_when_not_completed() {
        let mut f = FollowUpRecord {
            id: "f1".into(),
            ..Default::default()
        };
        assert!(f.is_open());
        f.completed_at = Some("2026-02-10T10:00:00Z".into());
        assert!(!f.is_open());
    }

    #[test]
    fn company_name_fallbacks() {
        let companies = vec![CompanyRecord {
            id: "c1".into(),
            name: Some("Nova Systems".into()),
        }];
        let mut app = ApplicationRecord {
            id: "a1".into(),
            ..Default::default()
        };
        assert_eq!(company_name(&app, &companies), "No company set");
        app.company_id = Some("c2".into());
        assert_eq!(company_name(&app, &companies), "Unknown company");
        app.company_id = Some("c1".into());
        assert_eq!(company_name(&app, &companies), "Nova Systems");
    }

    #[test]
    fn normalize_url_adds_https() {
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("example.com/jobs"), "https://example.com/jobs");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("HTTPS://example.com"), "HTTPS://example.com");
        assert_eq!(normalize_url("ftp://files.example.com"), "ftp://files.example.com");
        // digits are not a scheme
        assert_eq!(normalize_url("8080://x"), "https://8080://x");
    }

    #[test]
    fn link_label_fallback() {
        let link = LinkRecord {
            id: "l1".into(),
            label: Some("  ".into()),
            url: Some("example.com".into()),
            ..Default::default()
        };
        assert_eq!(link.label_or_default(), "Open link");
        assert_eq!(link.href(), "https://example.com");
    }
}
