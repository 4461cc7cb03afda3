//! Core module - records, form validation and the derived views

mod forms;
mod listing;
mod stats;
mod types;

pub(crate) use forms::{
    Credentials, FollowUpForm, LinkForm, NewApplication, NoteForm, PasswordReset, RecoveryLink,
    RecoveryProof, SignupForm, required_id,
};
pub(crate) use listing::{DateRange, ListFilter, ListRow, build_rows};
pub(crate) use stats::{
    ChartPoint, Dashboard, DashboardSummary, MonthOption, Period, StatsContext, build_dashboard,
};
pub(crate) use types::{
    ApplicationDetail, ApplicationRecord, ApplicationsPageData, CompanyRecord, FollowUpRecord,
    LinkRecord, NoteRecord, Stage, Status, company_name,
};
