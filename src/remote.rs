//! HTTP plumbing shared by the auth client and the table store
//!
//! Requests are plain values handed to a [`Transport`], so everything above
//! this module can be exercised against an in-process fake.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Project URL and public key of the hosted backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SupabaseEnv {
    pub(crate) url: String,
    pub(crate) anon_key: String,
}

impl SupabaseEnv {
    pub(crate) fn new(url: Option<&str>, anon_key: Option<&str>) -> Result<Self, AppError> {
        let url = url.map(str::trim).filter(|s| !s.is_empty());
        let anon_key = anon_key.map(str::trim).filter(|s| !s.is_empty());
        let (Some(url), Some(anon_key)) = (url, anon_key) else {
            return Err(AppError::MissingSupabaseConfig);
        };
        if url::Url::parse(url).is_err() {
            return Err(AppError::MissingSupabaseConfig);
        }
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HttpRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Vec<(&'static str, String)>,
    pub(crate) body: Option<Value>,
}

impl HttpRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpReply {
    pub(crate) status: u16,
    pub(crate) body: String,
}

impl HttpReply {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parsed body; anything that is not JSON reads as `Null`
    pub(crate) fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Sends one request. `Err` means the server was never reached; HTTP error
/// statuses come back as ordinary replies.
pub(crate) trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply, String>;
}

pub(crate) struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub(crate) fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply, String> {
        let url = request.url.as_str();
        let result = match request.method {
            Method::Get | Method::Delete => {
                let mut builder = if request.method == Method::Get {
                    self.agent.get(url)
                } else {
                    self.agent.delete(url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(*name, value.as_str());
                }
                builder.call()
            }
            Method::Post | Method::Patch | Method::Put => {
                let mut builder = match request.method {
                    Method::Post => self.agent.post(url),
                    Method::Patch => self.agent.patch(url),
                    _ => self.agent.put(url),
                };
                for (name, value) in &request.headers {
                    builder = builder.header(*name, value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| e.to_string())?;
        Ok(HttpReply { status, body })
    }
}

/// Backend endpoints plus the transport used to reach them
#[derive(Clone)]
pub(crate) struct Remote {
    env: SupabaseEnv,
    transport: Arc<dyn Transport>,
}

impl Remote {
    pub(crate) fn new(env: SupabaseEnv, transport: Arc<dyn Transport>) -> Self {
        Self { env, transport }
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.env.anon_key
    }

    /// `path` may carry its own query, e.g. `token?grant_type=password`
    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.env.url)
    }

    pub(crate) fn rest_url(&self, table: &str, query: &[(&str, &str)]) -> String {
        let base = format!("{}/rest/v1/{table}", self.env.url);
        if query.is_empty() {
            return base;
        }
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        format!("{base}?{encoded}")
    }

    /// Standard headers for a call made on behalf of `bearer`
    pub(crate) fn headers(&self, bearer: &str) -> Vec<(&'static str, String)> {
        vec![
            ("apikey", self.env.anon_key.clone()),
            ("Authorization", format!("Bearer {bearer}")),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    pub(crate) fn send(&self, request: HttpRequest) -> Result<HttpReply, String> {
        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let reply = self.transport.send(&request);
        match &reply {
            Ok(r) => tracing::debug!(status = r.status, url = %request.url, "received reply"),
            Err(e) => tracing::warn!(error = %e, url = %request.url, "request failed"),
        }
        reply
    }
}
