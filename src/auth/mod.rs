//! Authentication against the hosted backend and the local session file

mod client;
mod session;

pub(crate) use client::{AuthClient, AuthSession};
pub(crate) use session::{SessionState, SessionStore, resolve_session};
#[cfg(test)]
pub(crate) use session::StoredSession;
