//! Read-only sample data for browsing without an account

use crate::core::{
    ApplicationDetail, ApplicationRecord, ApplicationsPageData, CompanyRecord, FollowUpForm,
    FollowUpRecord, LinkForm, LinkRecord, NewApplication, NoteForm, NoteRecord, Stage, Status,
    company_name,
};
use crate::error::StoreError;
use crate::store::Store;

// id, company, role, stage, status, applied, last touch, created
const APPLICATIONS: [[&str; 8]; 6] = [
    ["demo-app-1", "demo-company-1", "Frontend Engineer", "Applied", "Active", "2026-02-03", "2026-02-05T15:00:00Z", "2026-02-03T13:00:00Z"],
    ["demo-app-2", "demo-company-2", "Software Engineer", "Interview", "Active", "2026-01-20", "2026-02-01T10:00:00Z", "2026-01-20T09:00:00Z"],
    ["demo-app-3", "demo-company-3", "Product Engineer", "Offer", "Active", "2026-01-06", "2026-01-29T16:00:00Z", "2026-01-06T11:00:00Z"],
    ["demo-app-4", "demo-company-4", "Full Stack Developer", "Applied", "Rejected", "2025-12-14", "2026-01-04T12:00:00Z", "2025-12-14T10:00:00Z"],
    ["demo-app-5", "demo-company-5", "Platform Engineer", "OA", "Active", "2026-02-11", "2026-02-12T15:00:00Z", "2026-02-11T14:00:00Z"],
    ["demo-app-6", "demo-company-6", "Backend Engineer", "Interview", "Active", "2025-11-08", "2025-11-20T09:00:00Z", "2025-11-08T09:00:00Z"],
];

const COMPANIES: [[&str; 2]; 6] = [
    ["demo-company-1", "Nova Systems"],
    ["demo-company-2", "BluePeak AI"],
    ["demo-company-3", "Northlane Health"],
    ["demo-company-4", "Summit Labs"],
    ["demo-company-5", "OrbitScale"],
    ["demo-company-6", "SignalGrid"],
];

// id, application, label, url, created
const LINKS: [[&str; 5]; 5] = [
    ["demo-link-1", "demo-app-1", "Job Posting", "https://example.com/jobs/frontend", "2026-02-03T13:02:00Z"],
    ["demo-link-2", "demo-app-2", "Application Portal", "https://example.com/jobs/software-engineer", "2026-01-20T09:15:00Z"],
    ["demo-link-3", "demo-app-3", "Hiring Page", "https://example.com/jobs/product-engineer", "2026-01-06T11:10:00Z"],
    ["demo-link-4", "demo-app-5", "OA Link", "https://example.com/oa/platform-engineer", "2026-02-12T09:00:00Z"],
    ["demo-link-5", "demo-app-6", "Company Careers", "https://example.com/careers/backend", "2025-11-08T09:20:00Z"],
];

// id, application, due, note, created
const FOLLOW_UPS: [[&str; 5]; 2] = [
    ["demo-followup-1", "demo-app-2", "2026-02-10T17:00:00Z", "Check in with recruiter after onsite scheduling.", "2026-02-07T10:00:00Z"],
    ["demo-followup-2", "demo-app-5", "2026-02-22T17:00:00Z", "Follow up after OA submission.", "2026-02-13T11:00:00Z"],
];

// id, application, content, created
const NOTES: [[&str; 4]; 3] = [
    ["demo-note-1", "demo-app-2", "Recruiter confirmed panel format: API design + behavioral.", "2026-02-01T11:00:00Z"],
    ["demo-note-2", "demo-app-3", "Offer expected this week pending headcount sign-off.", "2026-01-29T16:30:00Z"],
    ["demo-note-3", "demo-app-6", "No response in over two weeks. Set follow-up immediately.", "2025-12-03T09:30:00Z"],
];

fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

pub(crate) fn demo_page_data() -> ApplicationsPageData {
    ApplicationsPageData {
        applications: APPLICATIONS
            .iter()
            .map(|[id, company, role, stage, status, applied, touched, created]| ApplicationRecord {
                id: id.to_string(),
                company_id: some(company),
                role_title: some(role),
                stage: some(stage),
                status: some(status),
                applied_at: some(applied),
                last_touch_at: some(touched),
                created_at: some(created),
            })
            .collect(),
        companies: COMPANIES
            .iter()
            .map(|[id, name]| CompanyRecord {
                id: id.to_string(),
                name: some(name),
            })
            .collect(),
        links: LINKS
            .iter()
            .map(|[id, app, label, url, created]| LinkRecord {
                id: id.to_string(),
                application_id: some(app),
                label: some(label),
                url: some(url),
                created_at: some(created),
            })
            .collect(),
        open_follow_ups: FOLLOW_UPS
            .iter()
            .map(|[id, app, due, note, created]| FollowUpRecord {
                id: id.to_string(),
                application_id: some(app),
                due_at: some(due),
                completed_at: None,
                note: some(note),
                created_at: some(created),
            })
            .collect(),
    }
}

pub(crate) fn demo_notes(application_id: &str) -> Vec<NoteRecord> {
    NOTES
        .iter()
        .filter(|[_, app, _, _]| *app == application_id)
        .map(|[id, app, content, created]| NoteRecord {
            id: id.to_string(),
            application_id: some(app),
            content: some(content),
            created_at: some(created),
        })
        .collect()
}

pub(crate) struct DemoStore;

impl Store for DemoStore {
    fn label(&self) -> &'static str {
        "Demo"
    }

    fn fetch_page_data(&self) -> Result<ApplicationsPageData, StoreError> {
        Ok(demo_page_data())
    }

    fn fetch_detail(&self, application_id: &str) -> Result<Option<ApplicationDetail>, StoreError> {
        let data = demo_page_data();
        let Some(application) = data
            .applications
            .iter()
            .find(|a| a.id == application_id)
            .cloned()
        else {
            return Ok(None);
        };
        let belongs = |id: &Option<String>| id.as_deref() == Some(application_id);
        Ok(Some(ApplicationDetail {
            company_name: company_name(&application, &data.companies),
            application,
            notes: demo_notes(application_id),
            links: data
                .links
                .into_iter()
                .filter(|l| belongs(&l.application_id))
                .collect(),
            follow_ups: data
                .open_follow_ups
                .into_iter()
                .filter(|f| belongs(&f.application_id))
                .collect(),
        }))
    }

    fn create_application(&self, _form: &NewApplication) -> Result<String, StoreError> {
        Err(StoreError::DemoReadOnly)
    }

    fn update_stage_status(&self, _id: &str, _stage: Stage, _status: Status) -> Result<(), StoreError> {
        Err(StoreError::DemoReadOnly)
    }

    fn set_follow_up(&self, _form: &FollowUpForm) -> Result<(), StoreError> {
        Err(StoreError::DemoReadOnly)
    }

    fn mark_follow_up_done(&self, _id: &str, _application_id: Option<&str>) -> Result<(), StoreError> {
        Err(StoreError::DemoReadOnly)
    }

    fn delete_application(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::DemoReadOnly)
    }

    fn add_note(&self, _form: &NoteForm) -> Result<(), StoreError> {
        Err(StoreError::DemoReadOnly)
    }

    fn add_link(&self, _form: &LinkForm) -> Result<(), StoreError> {
        Err(StoreError::DemoReadOnly)
    }
}
