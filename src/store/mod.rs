//! Data store abstraction layer
//!
//! Commands talk to a [`Store`]; the signed-in backend, the read-only demo
//! fixtures and the offline snapshot each implement it.

pub(crate) mod demo;
pub(crate) mod snapshot;
pub(crate) mod supabase;

use crate::core::{
    ApplicationDetail, ApplicationsPageData, FollowUpForm, LinkForm, NewApplication, NoteForm,
    Stage, Status,
};
use crate::error::StoreError;

pub(crate) trait Store: Send + Sync {
    /// Short name shown in logs and the output header
    fn label(&self) -> &'static str;

    /// Applications, companies, links and open follow-ups of the user
    fn fetch_page_data(&self) -> Result<ApplicationsPageData, StoreError>;

    /// `None` when the application does not exist or is not visible
    fn fetch_detail(&self, application_id: &str) -> Result<Option<ApplicationDetail>, StoreError>;

    /// Returns the id of the new application
    fn create_application(&self, form: &NewApplication) -> Result<String, StoreError>;

    fn update_stage_status(
        &self,
        application_id: &str,
        stage: Stage,
        status: Status,
    ) -> Result<(), StoreError>;

    /// Completes every open follow-up of the application, then schedules a new one
    fn set_follow_up(&self, form: &FollowUpForm) -> Result<(), StoreError>;

    fn mark_follow_up_done(
        &self,
        follow_up_id: &str,
        application_id: Option<&str>,
    ) -> Result<(), StoreError>;

    fn delete_application(&self, application_id: &str) -> Result<(), StoreError>;

    fn add_note(&self, form: &NoteForm) -> Result<(), StoreError>;

    fn add_link(&self, form: &LinkForm) -> Result<(), StoreError>;
}

pub(crate) type BoxedStore = Box<dyn Store>;

pub(crate) use demo::DemoStore;
pub(crate) use snapshot::{SnapshotCache, SnapshotStore};
pub(crate) use supabase::SupabaseStore;
