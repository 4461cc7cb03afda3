//! Persisted sign-in state and the guard that every data command runs first

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::client::{AuthClient, AuthSession, AuthUser};
use crate::consts::REFRESH_MAX_AGE_SECS;
use crate::error::{AppError, AuthError, SessionError};

/// Contents of `session.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) access_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) refresh_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) demo: bool,
    /// Identity of the last verified user, used for offline reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
}

fn live<'a>(
    token: Option<&'a str>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<&'a str> {
    let token = token.filter(|t| !t.is_empty())?;
    match expires_at {
        Some(at) if at <= now => None,
        _ => Some(token),
    }
}

impl StoredSession {
    /// Turn demo mode on; any stored tokens are kept and still win
    pub(crate) fn enter_demo(&mut self) {
        self.demo = true;
    }

    /// Store freshly issued tokens; a real session always ends demo mode
    pub(crate) fn apply(&mut self, session: &AuthSession, now: DateTime<Utc>) {
        self.access_token = Some(session.access_token.clone());
        self.access_expires_at = Some(now + Duration::seconds(session.expires_in));
        self.refresh_token = Some(session.refresh_token.clone());
        self.refresh_expires_at = Some(now + Duration::seconds(REFRESH_MAX_AGE_SECS));
        self.demo = false;
    }

    pub(crate) fn remember_user(&mut self, user: &AuthUser) {
        self.user_id = Some(user.id.clone());
        self.email = user.email.clone();
    }

    pub(crate) fn clear_tokens(&mut self) {
        self.access_token = None;
        self.access_expires_at = None;
        self.refresh_token = None;
        self.refresh_expires_at = None;
    }

    pub(crate) fn live_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        live(self.access_token.as_deref(), self.access_expires_at, now)
    }

    pub(crate) fn live_refresh_token(&self, now: DateTime<Utc>) -> Option<&str> {
        live(self.refresh_token.as_deref(), self.refresh_expires_at, now)
    }
}

pub(crate) struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files read as signed out
    pub(crate) fn load(&self) -> StoredSession {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return StoredSession::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "ignoring corrupt session file"
            );
            StoredSession::default()
        })
    }

    /// Write through a temp file so a crash never leaves half a session
    pub(crate) fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        let write_err = |source| SessionError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let data = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(write_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(write_err)
    }

    pub(crate) fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionState {
    Authenticated { access_token: String, user: AuthUser },
    Demo,
}

/// Decide who is running the command, refreshing the access token when it
/// is no longer accepted
pub(crate) fn resolve_session(
    auth: &AuthClient,
    store: &SessionStore,
    now: DateTime<Utc>,
) -> Result<SessionState, AppError> {
    let mut stored = store.load();

    if let Some(token) = stored.live_access_token(now).map(str::to_string)
        && let Some(user) = auth.fetch_user(&token)?
    {
        if stored.user_id.as_deref() != Some(user.id.as_str()) || stored.email != user.email {
            stored.remember_user(&user);
            store.save(&stored)?;
        }
        return Ok(SessionState::Authenticated {
            access_token: token,
            user,
        });
    }

    if let Some(refresh_token) = stored.live_refresh_token(now).map(str::to_string) {
        match auth.refresh(&refresh_token) {
            Ok(session) => {
                stored.apply(&session, now);
                if let Some(user) = auth.fetch_user(&session.access_token)? {
                    tracing::debug!(user = %user.id, "session refreshed");
                    stored.remember_user(&user);
                    store.save(&stored)?;
                    return Ok(SessionState::Authenticated {
                        access_token: session.access_token,
                        user,
                    });
                }
                stored.clear_tokens();
                store.save(&stored)?;
            }
            Err(AuthError::Rejected(reason)) => {
                tracing::info!(%reason, "refresh rejected, clearing session");
                stored.clear_tokens();
                store.save(&stored)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if stored.demo && stored.access_token.is_none() {
        return Ok(SessionState::Demo);
    }
    Err(AppError::NotSignedIn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Method;
    use crate::remote::fake::{FakeTransport, remote, reply};

    fn now() -> DateTime<Utc> {
        "2026-02-15T12:00:00Z".parse().unwrap()
    }

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("session.json"))
    }

    fn signed_in(access: &str, refresh: &str) -> StoredSession {
        let mut s = StoredSession::default();
        s.apply(
            &AuthSession {
                access_token: access.into(),
                refresh_token: refresh.into(),
                expires_in: 3600,
            },
            now(),
        );
        s
    }

    /// Accepts `good` and `fresh` bearers; refresh with `ref-ok` issues `fresh`
    fn backend() -> std::sync::Arc<FakeTransport> {
        FakeTransport::new(|req| {
            if req.method == Method::Get {
                return match req.header("Authorization") {
                    Some("Bearer good") | Some("Bearer fresh") => {
                        reply(200, r#"{"id":"u1","email":"me@example.com"}"#)
                    }
                    _ => reply(401, "{}"),
                };
            }
            let body = req.body.clone().unwrap_or_default();
            if body["refresh_token"] == "ref-ok" {
                reply(200, r#"{"access_token":"fresh","refresh_token":"ref-2","expires_in":3600}"#)
            } else {
                reply(400, r#"{"error_description":"Invalid Refresh Token"}"#)
            }
        })
    }

    #[test]
    fn load_missing_or_corrupt_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(), StoredSession::default());
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), StoredSession::default());
    }

    #[test]
    fn save_load_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        let session = signed_in("acc", "ref");
        store.save(&session).unwrap();
        assert_eq!(store.load(), session);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.clear().unwrap();
        assert!(!store.path().exists());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn token_expiry() {
        let s = signed_in("acc", "ref");
        assert_eq!(s.live_access_token(now()), Some("acc"));
        let later = now() + Duration::hours(2);
        assert_eq!(s.live_access_token(later), None);
        assert_eq!(s.live_refresh_token(later), Some("ref"));
        assert_eq!(s.live_refresh_token(now() + Duration::days(8)), None);
    }

    #[test]
    fn valid_access_token_authenticates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&signed_in("good", "ref-ok")).unwrap();
        let auth = AuthClient::new(remote(backend()));

        let state = resolve_session(&auth, &store, now()).unwrap();
        let SessionState::Authenticated { access_token, user } = state else {
            panic!("expected authenticated");
        };
        assert_eq!(access_token, "good");
        assert_eq!(user.id, "u1");
        assert_eq!(store.load().user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn rejected_access_token_is_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&signed_in("stale", "ref-ok")).unwrap();
        let auth = AuthClient::new(remote(backend()));

        let state = resolve_session(&auth, &store, now()).unwrap();
        assert!(matches!(
            state,
            SessionState::Authenticated { ref access_token, .. } if access_token == "fresh"
        ));
        let saved = store.load();
        assert_eq!(saved.access_token.as_deref(), Some("fresh"));
        assert_eq!(saved.refresh_token.as_deref(), Some("ref-2"));
    }

    #[test]
    fn failed_refresh_clears_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&signed_in("stale", "ref-bad")).unwrap();
        let auth = AuthClient::new(remote(backend()));

        let err = resolve_session(&auth, &store, now()).unwrap_err();
        assert!(matches!(err, AppError::NotSignedIn));
        let saved = store.load();
        assert_eq!(saved.access_token, None);
        assert_eq!(saved.refresh_token, None);
    }

    fn demo_session() -> StoredSession {
        let mut s = StoredSession::default();
        s.enter_demo();
        s
    }

    #[test]
    fn demo_flag_without_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&demo_session()).unwrap();
        let transport = backend();
        let auth = AuthClient::new(remote(transport.clone()));

        assert_eq!(resolve_session(&auth, &store, now()).unwrap(), SessionState::Demo);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn nothing_stored_is_not_signed_in() {
        let dir = tempfile::tempdir().unwrap();
        let auth = AuthClient::new(remote(backend()));
        let err = resolve_session(&auth, &store_in(&dir), now()).unwrap_err();
        assert!(matches!(err, AppError::NotSignedIn));
    }

    #[test]
    fn login_ends_demo_mode() {
        let mut s = demo_session();
        s.apply(
            &AuthSession {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_in: 60,
            },
            now(),
        );
        assert!(!s.demo);
    }

    #[test]
    fn demo_over_a_signed_in_session_keeps_live_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut stored = StoredSession {
            access_token: Some("tok".into()),
            user_id: Some("u1".into()),
            ..Default::default()
        };
        stored.enter_demo();
        store.save(&stored).unwrap();

        let saved = store.load();
        assert!(saved.demo);
        assert_eq!(saved.access_token.as_deref(), Some("tok"));
        assert_eq!(saved.user_id.as_deref(), Some("u1"));
    }
}
