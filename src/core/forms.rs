//! Validation of user input before it reaches the auth service or the tables
//!
//! Each form trims its fields and rejects the request with a [`FormError`]
//! when a required value is missing, so no remote call is made for it.

use chrono::{NaiveDate, SecondsFormat};

use crate::consts::{
    DATE_FORMAT, DEFAULT_LINK_LABEL, FOLLOW_UP_DUE_HOUR, MIN_PASSWORD_LEN,
};
use crate::core::types::{Stage, normalize_url};
use crate::error::FormError;

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn required_id(value: &str) -> Result<String, FormError> {
    trimmed(Some(value)).ok_or(FormError::Missing("An id is required."))
}

/// Timestamp at which a follow-up picked for `date` becomes due
pub(crate) fn build_due_at(date: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    let due = date.and_hms_opt(FOLLOW_UP_DUE_HOUR, 0, 0)?.and_utc();
    Some(due.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewApplication {
    pub(crate) company: String,
    pub(crate) role_title: String,
    pub(crate) stage: Stage,
    pub(crate) applied_at: Option<NaiveDate>,
    pub(crate) job_link: Option<String>,
    pub(crate) notes: Option<String>,
}

impl NewApplication {
    pub(crate) fn new(
        company: &str,
        role_title: &str,
        stage: Option<Stage>,
        applied_at: Option<NaiveDate>,
        job_link: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self, FormError> {
        let (Some(company), Some(role_title)) = (trimmed(Some(company)), trimmed(Some(role_title)))
        else {
            return Err(FormError::Missing("Company and role title are required."));
        };
        Ok(Self {
            company,
            role_title,
            stage: stage.unwrap_or_default(),
            applied_at,
            job_link: trimmed(job_link).map(|url| normalize_url(&url)),
            notes: trimmed(notes),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FollowUpForm {
    pub(crate) application_id: String,
    pub(crate) due_at: String,
    pub(crate) note: Option<String>,
}

impl FollowUpForm {
    pub(crate) fn new(
        application_id: &str,
        due_date: &str,
        note: Option<&str>,
    ) -> Result<Self, FormError> {
        let application_id = required_id(application_id)?;
        let due_at = build_due_at(due_date).ok_or_else(|| FormError::InvalidDueDate {
            input: due_date.trim().to_string(),
        })?;
        Ok(Self {
            application_id,
            due_at,
            note: trimmed(note),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NoteForm {
    pub(crate) application_id: String,
    pub(crate) content: String,
}

impl NoteForm {
    pub(crate) fn new(application_id: &str, content: &str) -> Result<Self, FormError> {
        let application_id = required_id(application_id)?;
        let content =
            trimmed(Some(content)).ok_or(FormError::Missing("Note content is required."))?;
        Ok(Self {
            application_id,
            content,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkForm {
    pub(crate) application_id: String,
    pub(crate) label: String,
    pub(crate) url: String,
}

impl LinkForm {
    pub(crate) fn new(
        application_id: &str,
        url: &str,
        label: Option<&str>,
    ) -> Result<Self, FormError> {
        let application_id = required_id(application_id)?;
        let url = trimmed(Some(url)).ok_or(FormError::Missing("A link URL is required."))?;
        Ok(Self {
            application_id,
            label: trimmed(label).unwrap_or_else(|| DEFAULT_LINK_LABEL.to_string()),
            url: normalize_url(&url),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl Credentials {
    pub(crate) fn new(email: &str, password: &str) -> Result<Self, FormError> {
        match (trimmed(Some(email)), trimmed(Some(password))) {
            (Some(email), Some(password)) => Ok(Self { email, password }),
            _ => Err(FormError::Missing("Email and password are required.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SignupForm {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

impl SignupForm {
    pub(crate) fn new(name: &str, email: &str, password: &str) -> Result<Self, FormError> {
        match (
            trimmed(Some(name)),
            trimmed(Some(email)),
            trimmed(Some(password)),
        ) {
            (Some(name), Some(email), Some(password)) => Ok(Self {
                name,
                email,
                password,
            }),
            _ => Err(FormError::Missing("Name, email and password are required.")),
        }
    }
}

/// How the reset request proves it came from a recovery e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecoveryProof {
    AccessToken(String),
    TokenHash(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PasswordReset {
    pub(crate) password: String,
    pub(crate) proof: RecoveryProof,
}

impl PasswordReset {
    pub(crate) fn new(
        password: &str,
        confirm_password: &str,
        access_token: Option<&str>,
        token_hash: Option<&str>,
    ) -> Result<Self, FormError> {
        let (Some(password), Some(confirm)) =
            (trimmed(Some(password)), trimmed(Some(confirm_password)))
        else {
            return Err(FormError::Missing("Enter and confirm your new password."));
        };
        if password != confirm {
            return Err(FormError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::WeakPassword);
        }
        // an access token from the link wins over a token hash
        let proof = match (trimmed(access_token), trimmed(token_hash)) {
            (Some(token), _) => RecoveryProof::AccessToken(token),
            (None, Some(hash)) => RecoveryProof::TokenHash(hash),
            (None, None) => return Err(FormError::InvalidResetLink),
        };
        Ok(Self { password, proof })
    }
}

/// Tokens carried by a password recovery link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RecoveryLink {
    pub(crate) access_token: Option<String>,
    pub(crate) token_hash: Option<String>,
}

impl RecoveryLink {
    /// Read the tokens from the query string, or from a `type=recovery`
    /// fragment when the query has no access token
    pub(crate) fn parse(link: &str) -> Result<Self, FormError> {
        let url = url::Url::parse(link.trim()).map_err(|_| FormError::InvalidResetLink)?;

        let mut parsed = RecoveryLink::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "access_token" if !value.is_empty() => {
                    parsed.access_token = Some(value.into_owned())
                }
                "token_hash" if !value.is_empty() => parsed.token_hash = Some(value.into_owned()),
                _ => {}
            }
        }

        if parsed.access_token.is_none()
            && let Some(fragment) = url.fragment()
        {
            let pairs: Vec<(String, String)> = url::form_urlencoded::parse(fragment.as_bytes())
                .into_owned()
                .collect();
            let is_recovery = pairs.iter().any(|(k, v)| k == "type" && v == "recovery");
            let token = pairs
                .into_iter()
                .find(|(k, v)| k == "access_token" && !v.is_empty())
                .map(|(_, v)| v);
            if is_recovery {
                parsed.access_token = token;
            }
        }

        if parsed.access_token.is_none() && parsed.token_hash.is_none() {
            return Err(FormError::InvalidResetLink);
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_at_is_five_pm_utc() {
        assert_eq!(
            build_due_at("2026-02-10").as_deref(),
            Some("2026-02-10T17:00:00.000Z")
        );
        assert_eq!(build_due_at(""), None);
        assert_eq!(build_due_at("2026-02-30"), None);
    }

    #[test]
    fn new_application_requires_company_and_role() {
        let err = NewApplication::new("  ", "Engineer", None, None, None, None).unwrap_err();
        assert_eq!(err, FormError::Missing("Company and role title are required."));
        assert!(NewApplication::new("Acme", "", None, None, None, None).is_err());
    }

    #[test]
    fn new_application_defaults_and_normalizes() {
        let form = NewApplication::new(
            " Acme ",
            " Backend Engineer ",
            None,
            None,
            Some("acme.dev/jobs/1"),
            Some("   "),
        )
        .unwrap();
        assert_eq!(form.company, "Acme");
        assert_eq!(form.role_title, "Backend Engineer");
        assert_eq!(form.stage, Stage::Applied);
        assert_eq!(form.job_link.as_deref(), Some("https://acme.dev/jobs/1"));
        assert_eq!(form.notes, None);
    }

    #[test]
    fn follow_up_rejects_bad_date() {
        let err = FollowUpForm::new("app-1", "next week", None).unwrap_err();
        assert!(matches!(err, FormError::InvalidDueDate { .. }));
        let ok = FollowUpForm::new("app-1", "2026-03-01", Some(" ping ")).unwrap();
        assert_eq!(ok.note.as_deref(), Some("ping"));
        assert_eq!(ok.due_at, "2026-03-01T17:00:00.000Z");
    }

    #[test]
    fn link_form_default_label() {
        let form = LinkForm::new("app-1", "example.com/oa", None).unwrap();
        assert_eq!(form.label, "Application Link");
        assert_eq!(form.url, "https://example.com/oa");
        assert!(LinkForm::new("app-1", "  ", Some("OA")).is_err());
    }

    #[test]
    fn note_form_requires_content() {
        assert!(NoteForm::new("app-1", "").is_err());
        assert!(NoteForm::new("", "hello").is_err());
    }

    #[test]
    fn credentials_trim_and_require() {
        assert!(Credentials::new("a@b.c", " ").is_err());
        let c = Credentials::new(" a@b.c ", "secret").unwrap();
        assert_eq!(c.email, "a@b.c");
        assert!(SignupForm::new("", "a@b.c", "secret").is_err());
    }

    #[test]
    fn password_reset_validation_order() {
        assert_eq!(
            PasswordReset::new("", "", Some("tok"), None).unwrap_err(),
            FormError::Missing("Enter and confirm your new password.")
        );
        assert_eq!(
            PasswordReset::new("longpassword", "otherpassword", Some("tok"), None).unwrap_err(),
            FormError::PasswordMismatch
        );
        assert_eq!(
            PasswordReset::new("short", "short", Some("tok"), None).unwrap_err(),
            FormError::WeakPassword
        );
        assert_eq!(
            PasswordReset::new("longpassword", "longpassword", None, Some(" ")).unwrap_err(),
            FormError::InvalidResetLink
        );
    }

    #[test]
    fn password_reset_prefers_access_token() {
        let reset =
            PasswordReset::new("longpassword", "longpassword", Some("tok"), Some("hash")).unwrap();
        assert_eq!(reset.proof, RecoveryProof::AccessToken("tok".into()));
        let reset = PasswordReset::new("longpassword", "longpassword", None, Some("hash")).unwrap();
        assert_eq!(reset.proof, RecoveryProof::TokenHash("hash".into()));
    }

    #[test]
    fn recovery_link_from_query() {
        let link =
            RecoveryLink::parse("https://app.example/reset-password?token_hash=abc&type=recovery")
                .unwrap();
        assert_eq!(link.token_hash.as_deref(), Some("abc"));
        assert_eq!(link.access_token, None);
    }

    #[test]
    fn recovery_link_from_fragment() {
        let link = RecoveryLink::parse(
            "https://app.example/reset-password#access_token=tok%2B1&type=recovery&expires_in=3600",
        )
        .unwrap();
        assert_eq!(link.access_token.as_deref(), Some("tok+1"));
    }

    #[test]
    fn recovery_link_fragment_needs_recovery_type() {
        let err =
            RecoveryLink::parse("https://app.example/reset-password#access_token=tok&type=signup")
                .unwrap_err();
        assert_eq!(err, FormError::InvalidResetLink);
        assert!(RecoveryLink::parse("not a url").is_err());
    }
}
