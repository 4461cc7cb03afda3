//! Calls against the hosted auth endpoints (`/auth/v1`)

use serde_json::{Value, json};

use crate::core::{Credentials, SignupForm};
use crate::error::AuthError;
use crate::remote::{HttpReply, HttpRequest, Method, Remote};

/// Tokens issued by a successful sign-in, refresh or recovery exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthSession {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    /// Lifetime of the access token in seconds
    pub(crate) expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthUser {
    pub(crate) id: String,
    pub(crate) email: Option<String>,
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Tokens at the top level or under `session`; all three must be present
pub(crate) fn extract_session(payload: &Value) -> Option<AuthSession> {
    let nested = payload.get("session");
    let pick_str = |key: &str| {
        non_empty_str(payload, key).or_else(|| nested.and_then(|n| non_empty_str(n, key)))
    };
    let pick_secs = |v: &Value| {
        v.get("expires_in")
            .and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)))
            .filter(|n| *n != 0)
    };

    Some(AuthSession {
        access_token: pick_str("access_token")?.to_string(),
        refresh_token: pick_str("refresh_token")?.to_string(),
        expires_in: pick_secs(payload).or_else(|| nested.and_then(pick_secs))?,
    })
}

/// First error field the service filled in, else `fallback`
pub(crate) fn extract_error(payload: &Value, fallback: &str) -> String {
    for key in ["error_description", "error", "msg"] {
        if let Some(message) = non_empty_str(payload, key) {
            return message.to_string();
        }
    }
    match payload.get("code") {
        Some(Value::String(code)) if !code.is_empty() => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => fallback.to_string(),
    }
}

pub(crate) struct AuthClient {
    remote: Remote,
}

impl AuthClient {
    pub(crate) fn new(remote: Remote) -> Self {
        Self { remote }
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> HttpRequest {
        let mut headers = vec![
            ("apikey", self.remote.anon_key().to_string()),
            ("Content-Type", "application/json".to_string()),
        ];
        if let Some(token) = bearer {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            url: self.remote.auth_url(path),
            headers,
            body,
        }
    }

    /// POST without a bearer, retrying once with the anon key as bearer
    /// when the service answers 401 or 403
    fn post_with_fallback(&self, path: &str, body: Value) -> Result<HttpReply, AuthError> {
        let first = self
            .remote
            .send(self.request(Method::Post, path, None, Some(body.clone())))
            .map_err(AuthError::Network)?;
        if !matches!(first.status, 401 | 403) {
            return Ok(first);
        }
        tracing::debug!(path, status = first.status, "retrying with anon bearer");
        let anon = self.remote.anon_key();
        self.remote
            .send(self.request(Method::Post, path, Some(anon), Some(body)))
            .map_err(AuthError::Network)
    }

    /// Session carried by a successful reply, `None` when it holds none
    fn resolve(reply: HttpReply, fallback: &str) -> Result<Option<AuthSession>, AuthError> {
        let payload = reply.json();
        if !reply.is_success() {
            return Err(AuthError::Rejected(extract_error(&payload, fallback)));
        }
        Ok(extract_session(&payload))
    }

    pub(crate) fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        const FALLBACK: &str = "Unable to sign in.";
        let body = json!({ "email": credentials.email, "password": credentials.password });
        let reply = self.post_with_fallback("token?grant_type=password", body)?;
        Self::resolve(reply, FALLBACK)?.ok_or_else(|| AuthError::Rejected(FALLBACK.to_string()))
    }

    /// `Ok(None)` means the account exists but must be confirmed by e-mail
    pub(crate) fn sign_up(&self, form: &SignupForm) -> Result<Option<AuthSession>, AuthError> {
        let body = json!({
            "email": form.email,
            "password": form.password,
            "data": { "full_name": form.name },
        });
        let reply = self.post_with_fallback("signup", body)?;
        Self::resolve(reply, "Unable to sign up.")
    }

    pub(crate) fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        const FALLBACK: &str = "Unable to refresh session.";
        let body = json!({ "refresh_token": refresh_token });
        let reply = self.post_with_fallback("token?grant_type=refresh_token", body)?;
        Self::resolve(reply, FALLBACK)?.ok_or_else(|| AuthError::Rejected(FALLBACK.to_string()))
    }

    pub(crate) fn verify_recovery(&self, token_hash: &str) -> Result<AuthSession, AuthError> {
        const FALLBACK: &str = "Unable to verify recovery token.";
        let body = json!({ "type": "recovery", "token_hash": token_hash });
        let reply = self.post_with_fallback("verify", body)?;
        Self::resolve(reply, FALLBACK)?.ok_or_else(|| AuthError::Rejected(FALLBACK.to_string()))
    }

    /// User behind `access_token`, `None` when the token is not accepted
    pub(crate) fn fetch_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let reply = self
            .remote
            .send(self.request(Method::Get, "user", Some(access_token), None))
            .map_err(AuthError::Network)?;
        if !reply.is_success() {
            return Ok(None);
        }
        let payload = reply.json();
        Ok(non_empty_str(&payload, "id").map(|id| AuthUser {
            id: id.to_string(),
            email: non_empty_str(&payload, "email").map(str::to_string),
        }))
    }

    /// Best effort; a missing token or a failed call is ignored
    pub(crate) fn sign_out(&self, access_token: Option<&str>) {
        let Some(token) = access_token.filter(|t| !t.is_empty()) else {
            return;
        };
        if let Err(e) = self.remote.send(self.request(Method::Post, "logout", Some(token), None)) {
            tracing::debug!(error = %e, "sign out call failed");
        }
    }

    pub(crate) fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut body = json!({ "email": email });
        if let Some(target) = redirect_to {
            body["redirect_to"] = Value::from(target);
        }
        let reply = self.post_with_fallback("recover", body)?;
        if reply.is_success() {
            return Ok(());
        }
        Err(AuthError::Rejected(extract_error(
            &reply.json(),
            "Unable to send password reset email.",
        )))
    }

    pub(crate) fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let body = json!({ "password": password });
        let reply = self
            .remote
            .send(self.request(Method::Put, "user", Some(access_token), Some(body)))
            .map_err(AuthError::Network)?;
        if reply.is_success() {
            return Ok(());
        }
        Err(AuthError::Rejected(extract_error(&reply.json(), "Unable to update password.")))
    }
}
