//! Table access through the PostgREST endpoint (`/rest/v1`)
//!
//! Reads degrade to empty lists when the service answers with an error
//! status. Writes fail with [`StoreError`] instead, except for the follow-on
//! writes (link, note, touch) that trail a write which already succeeded.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::core::{
    ApplicationDetail, ApplicationRecord, ApplicationsPageData, CompanyRecord, FollowUpForm,
    FollowUpRecord, LinkForm, LinkRecord, NewApplication, NoteForm, NoteRecord, Stage, Status,
    company_name,
};
use crate::consts::{DATE_FORMAT, JOB_LINK_LABEL};
use crate::error::StoreError;
use crate::remote::{HttpReply, HttpRequest, Method, Remote};
use crate::store::Store;

const APPLICATION_COLUMNS: &str =
    "id,company_id,role_title,stage,status,applied_at,last_touch_at,created_at";
const LINK_COLUMNS: &str = "id,application_id,label,url,created_at";
const NOTE_COLUMNS: &str = "id,application_id,content,created_at";
const PAGE_LIMIT: &str = "5000";
const LINK_LIMIT: &str = "10000";
const DETAIL_LIMIT: &str = "500";

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `id` of a `return=representation` reply, which is a list or an object
fn returned_id(payload: &Value) -> Option<String> {
    let row = match payload {
        Value::Array(rows) => rows.first()?,
        other => other,
    };
    row.get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) struct SupabaseStore {
    remote: Remote,
    access_token: String,
    user_id: String,
}

impl SupabaseStore {
    pub(crate) fn new(remote: Remote, access_token: String, user_id: String) -> Self {
        Self {
            remote,
            access_token,
            user_id,
        }
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> HttpRequest {
        HttpRequest {
            method,
            url: self.remote.rest_url(table, query),
            headers: self.remote.headers(&self.access_token),
            body,
        }
    }

    fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &'static str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let reply = self
            .remote
            .send(self.request(Method::Get, table, query, None))
            .map_err(|message| StoreError::Transport { table, message })?;
        if !reply.is_success() {
            tracing::warn!(table, status = reply.status, "read failed, treating as empty");
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&reply.body).unwrap_or_else(|e| {
            tracing::warn!(table, error = %e, "unexpected rows payload");
            Vec::new()
        }))
    }

    /// Any reply the server sent, success or not
    fn write_raw(
        &self,
        method: Method,
        table: &'static str,
        query: &[(&str, &str)],
        body: Option<Value>,
        return_representation: bool,
    ) -> Result<HttpReply, StoreError> {
        let mut request = self.request(method, table, query, body);
        if return_representation {
            request
                .headers
                .push(("Prefer", "return=representation".to_string()));
        }
        self.remote
            .send(request)
            .map_err(|message| StoreError::Transport { table, message })
    }

    fn write(
        &self,
        method: Method,
        table: &'static str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<(), StoreError> {
        let reply = self.write_raw(method, table, query, body, false)?;
        if reply.is_success() {
            return Ok(());
        }
        Err(StoreError::Status {
            table,
            status: reply.status,
        })
    }

    /// Write that trails a successful one; failures are only logged
    fn write_follow_on(
        &self,
        method: Method,
        table: &'static str,
        query: &[(&str, &str)],
        body: Value,
    ) {
        if let Err(e) = self.write(method, table, query, Some(body)) {
            tracing::warn!(table, error = %e, "follow-on write failed");
        }
    }

    fn touch_application(&self, application_id: &str) {
        let filter = format!("eq.{application_id}");
        self.write_follow_on(
            Method::Patch,
            "applications",
            &[("id", filter.as_str())],
            json!({ "last_touch_at": now_stamp() }),
        );
    }

    fn find_or_create_company(&self, name: &str) -> Result<String, StoreError> {
        let filter = format!("eq.{name}");
        let existing: Vec<CompanyRecord> = self.fetch_rows(
            "companies",
            &[("select", "id"), ("name", filter.as_str()), ("limit", "1")],
        )?;
        if let Some(company) = existing.into_iter().next() {
            return Ok(company.id);
        }

        let reply = self.write_raw(
            Method::Post,
            "companies",
            &[],
            Some(json!({ "user_id": self.user_id, "name": name })),
            true,
        )?;
        if !reply.is_success() {
            tracing::warn!(status = reply.status, "company insert rejected");
            return Err(StoreError::Company);
        }
        returned_id(&reply.json()).ok_or(StoreError::Company)
    }
}

impl Store for SupabaseStore {
    fn label(&self) -> &'static str {
        "Supabase"
    }

    fn fetch_page_data(&self) -> Result<ApplicationsPageData, StoreError> {
        let ((applications, companies), (links, open_follow_ups)) = rayon::join(
            || {
                rayon::join(
                    || {
                        self.fetch_rows::<ApplicationRecord>(
                            "applications",
                            &[
                                ("select", APPLICATION_COLUMNS),
                                ("order", "created_at.desc"),
                                ("limit", PAGE_LIMIT),
                            ],
                        )
                    },
                    || {
                        self.fetch_rows::<CompanyRecord>(
                            "companies",
                            &[("select", "id,name"), ("limit", PAGE_LIMIT)],
                        )
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        self.fetch_rows::<LinkRecord>(
                            "links",
                            &[
                                ("select", LINK_COLUMNS),
                                ("order", "created_at.desc"),
                                ("limit", LINK_LIMIT),
                            ],
                        )
                    },
                    || {
                        self.fetch_rows::<FollowUpRecord>(
                            "follow_ups",
                            &[
                                ("select", "id,application_id,due_at,completed_at"),
                                ("completed_at", "is.null"),
                                ("order", "due_at.asc"),
                                ("limit", PAGE_LIMIT),
                            ],
                        )
                    },
                )
            },
        );

        Ok(ApplicationsPageData {
            applications: applications?,
            companies: companies?,
            links: links?,
            open_follow_ups: open_follow_ups?,
        })
    }

    fn fetch_detail(&self, application_id: &str) -> Result<Option<ApplicationDetail>, StoreError> {
        let filter = format!("eq.{application_id}");
        let by_app = [
            ("application_id", filter.as_str()),
            ("order", "created_at.desc"),
            ("limit", DETAIL_LIMIT),
        ];

        let ((application, companies), (notes, (links, follow_ups))) = rayon::join(
            || {
                rayon::join(
                    || {
                        self.fetch_rows::<ApplicationRecord>(
                            "applications",
                            &[
                                ("select", APPLICATION_COLUMNS),
                                ("id", filter.as_str()),
                                ("limit", "1"),
                            ],
                        )
                    },
                    || {
                        self.fetch_rows::<CompanyRecord>(
                            "companies",
                            &[("select", "id,name"), ("limit", PAGE_LIMIT)],
                        )
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        let mut query = vec![("select", NOTE_COLUMNS)];
                        query.extend_from_slice(&by_app);
                        self.fetch_rows::<NoteRecord>("notes", &query)
                    },
                    || {
                        rayon::join(
                            || {
                                let mut query = vec![("select", LINK_COLUMNS)];
                                query.extend_from_slice(&by_app);
                                self.fetch_rows::<LinkRecord>("links", &query)
                            },
                            || {
                                self.fetch_rows::<FollowUpRecord>(
                                    "follow_ups",
                                    &[
                                        (
                                            "select",
                                            "id,application_id,due_at,completed_at,note,created_at",
                                        ),
                                        ("application_id", filter.as_str()),
                                        ("order", "due_at.asc"),
                                        ("limit", DETAIL_LIMIT),
                                    ],
                                )
                            },
                        )
                    },
                )
            },
        );

        let Some(application) = application?.into_iter().next() else {
            return Ok(None);
        };
        let companies = companies?;
        Ok(Some(ApplicationDetail {
            company_name: company_name(&application, &companies),
            application,
            notes: notes?,
            links: links?,
            follow_ups: follow_ups?,
        }))
    }

    fn create_application(&self, form: &NewApplication) -> Result<String, StoreError> {
        let company_id = self.find_or_create_company(&form.company)?;

        let applied_at = form
            .applied_at
            .map(|d| Value::from(d.format(DATE_FORMAT).to_string()))
            .unwrap_or(Value::Null);
        let reply = self.write_raw(
            Method::Post,
            "applications",
            &[],
            Some(json!({
                "user_id": self.user_id,
                "company_id": company_id,
                "role_title": form.role_title,
                "stage": form.stage,
                "status": Status::Active,
                "applied_at": applied_at,
            })),
            true,
        )?;
        if !reply.is_success() {
            tracing::warn!(status = reply.status, "application insert rejected");
            return Err(StoreError::Save);
        }
        let application_id = returned_id(&reply.json()).ok_or(StoreError::Save)?;

        if let Some(url) = form.job_link.as_deref() {
            self.write_follow_on(
                Method::Post,
                "links",
                &[],
                json!({
                    "user_id": self.user_id,
                    "application_id": application_id,
                    "label": JOB_LINK_LABEL,
                    "url": url,
                }),
            );
        }
        if let Some(content) = form.notes.as_deref() {
            self.write_follow_on(
                Method::Post,
                "notes",
                &[],
                json!({
                    "user_id": self.user_id,
                    "application_id": application_id,
                    "content": content,
                }),
            );
        }

        tracing::info!(id = %application_id, company = %form.company, "application created");
        Ok(application_id)
    }

    fn update_stage_status(
        &self,
        application_id: &str,
        stage: Stage,
        status: Status,
    ) -> Result<(), StoreError> {
        let filter = format!("eq.{application_id}");
        self.write(
            Method::Patch,
            "applications",
            &[("id", filter.as_str())],
            Some(json!({
                "stage": stage,
                "status": status,
                "last_touch_at": now_stamp(),
            })),
        )
    }

    fn set_follow_up(&self, form: &FollowUpForm) -> Result<(), StoreError> {
        let filter = format!("eq.{}", form.application_id);
        self.write(
            Method::Patch,
            "follow_ups",
            &[("application_id", filter.as_str()), ("completed_at", "is.null")],
            Some(json!({ "completed_at": now_stamp() })),
        )?;
        self.write(
            Method::Post,
            "follow_ups",
            &[],
            Some(json!({
                "user_id": self.user_id,
                "application_id": form.application_id,
                "due_at": form.due_at,
                "note": form.note,
            })),
        )?;
        self.touch_application(&form.application_id);
        Ok(())
    }

    fn mark_follow_up_done(
        &self,
        follow_up_id: &str,
        application_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let filter = format!("eq.{follow_up_id}");
        self.write(
            Method::Patch,
            "follow_ups",
            &[("id", filter.as_str())],
            Some(json!({ "completed_at": now_stamp() })),
        )?;
        if let Some(id) = application_id {
            self.touch_application(id);
        }
        Ok(())
    }

    fn delete_application(&self, application_id: &str) -> Result<(), StoreError> {
        let filter = format!("eq.{application_id}");
        self.write(Method::Delete, "applications", &[("id", filter.as_str())], None)
    }

    fn add_note(&self, form: &NoteForm) -> Result<(), StoreError> {
        self.write(
            Method::Post,
            "notes",
            &[],
            Some(json!({
                "user_id": self.user_id,
                "application_id": form.application_id,
                "content": form.content,
            })),
        )?;
        self.touch_application(&form.application_id);
        Ok(())
    }

    fn add_link(&self, form: &LinkForm) -> Result<(), StoreError> {
        self.write(
            Method::Post,
            "links",
            &[],
            Some(json!({
                "user_id": self.user_id,
                "application_id": form.application_id,
                "label": form.label,
                "url": form.url,
            })),
        )?;
        self.touch_application(&form.application_id);
        Ok(())
    }
}
