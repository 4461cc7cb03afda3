use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Invalid date \"{input}\" (expected YYYYMMDD or YYYY-MM-DD)")]
    InvalidDate { input: String },

    #[error("Invalid timezone: {input}")]
    InvalidTimezone { input: String },

    #[error(
        "Missing Supabase configuration (set supabase_url and supabase_anon_key in config.toml, or SUPABASE_URL and SUPABASE_ANON_KEY)"
    )]
    MissingSupabaseConfig,

    #[error("Not signed in. Run `jobflow login`, or `jobflow demo` to browse sample data.")]
    NotSignedIn,

    #[error("Application not found: {id}. It might have been deleted or you do not have access to it.")]
    ApplicationNotFound { id: String },

    #[error("Refusing to delete application {id} without --yes")]
    DeleteNotConfirmed { id: String },

    #[error("Failed to read password from stdin: {0}")]
    Stdin(std::io::Error),

    #[error("{0}")]
    Form(#[from] FormError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Session(#[from] SessionError),
}

/// Rejected user input, reported before any remote call is made
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum FormError {
    #[error("{0}")]
    Missing(&'static str),

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Password must be at least 8 characters.")]
    WeakPassword,

    #[error("Reset link is missing or expired. Request a new one.")]
    InvalidResetLink,

    #[error("Invalid follow-up date \"{input}\" (expected YYYY-MM-DD)")]
    InvalidDueDate { input: String },

    #[error("Invalid {field} \"{input}\" (expected one of: {allowed})")]
    InvalidChoice {
        field: &'static str,
        input: String,
        allowed: &'static str,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum AuthError {
    #[error("Could not reach Supabase. Try again in a moment ({0}).")]
    Network(String),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("Could not reach Supabase while requesting {table} ({message})")]
    Transport { table: &'static str, message: String },

    #[error("{table} request failed with HTTP {status}")]
    Status { table: &'static str, status: u16 },

    #[error("Could not create or find the company record.")]
    Company,

    #[error("Application could not be saved. Try again.")]
    Save,

    #[error("Demo mode is read-only. Sign in to make changes.")]
    DemoReadOnly,

    #[error("Offline mode is read-only. Drop --offline to make changes.")]
    OfflineReadOnly,

    #[error("{0}")]
    Snapshot(#[from] CacheError),
}

#[derive(Debug, Error)]
pub(crate) enum CacheError {
    #[error("Snapshot cache error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Snapshot cache is corrupt: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No offline snapshot available. Run `jobflow list` online first.")]
    Missing,
}

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("Failed to write session file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove session file {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}
