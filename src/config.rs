use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::consts::DEFAULT_STALE_DAYS;
use crate::error::AppError;
use crate::remote::SupabaseEnv;

/// Overrides every other location for config, session and snapshot files
const HOME_ENV: &str = "JOBFLOW_HOME";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigSortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) supabase_url: Option<String>,
    #[serde(default)]
    pub(crate) supabase_anon_key: Option<String>,
    #[serde(default)]
    pub(crate) offline: bool,
    #[serde(default)]
    pub(crate) no_color: bool,
    #[serde(default)]
    pub(crate) order: Option<ConfigSortOrder>,
    #[serde(default)]
    pub(crate) color: Option<ConfigColorMode>,
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) stale_days: Option<i64>,
    /// Page the password reset e-mail links back to
    #[serde(default)]
    pub(crate) reset_redirect_url: Option<String>,
}

fn jobflow_home() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Config {
    /// First parseable config file, then environment overrides
    pub(crate) fn load() -> Self {
        Self::load_file().apply_env_with(|key| std::env::var(key).ok())
    }

    fn load_file() -> Self {
        for path in Self::get_config_paths() {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "loaded config");
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to parse config"
                        );
                    }
                }
            }
        }

        Self::default()
    }

    fn get_config_paths() -> Vec<PathBuf> {
        if let Some(home) = jobflow_home() {
            return vec![home.join("config.toml")];
        }

        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/jobflow/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("jobflow").join("config.toml"));
        }

        // 2. Platform config dir, e.g. ~/Library/Application Support/jobflow/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("jobflow").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.jobflow.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".jobflow.toml"));
        }

        paths
    }

    /// `JOBFLOW_*` variables win over the generic `SUPABASE_*` ones, and
    /// both win over the file
    pub(crate) fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |keys: [&str; 2]| {
            keys.into_iter()
                .filter_map(&lookup)
                .find(|v| !v.trim().is_empty())
        };
        if let Some(url) = pick(["JOBFLOW_SUPABASE_URL", "SUPABASE_URL"]) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = pick(["JOBFLOW_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"]) {
            self.supabase_anon_key = Some(key);
        }
        self
    }

    pub(crate) fn supabase_env(&self) -> Result<SupabaseEnv, AppError> {
        SupabaseEnv::new(
            self.supabase_url.as_deref(),
            self.supabase_anon_key.as_deref(),
        )
    }

    pub(crate) fn stale_days(&self) -> i64 {
        self.stale_days
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_STALE_DAYS)
    }
}

/// Where the session file and the offline snapshot live
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppPaths {
    pub(crate) session_file: PathBuf,
    pub(crate) snapshot_db: PathBuf,
}

impl AppPaths {
    pub(crate) fn resolve() -> Self {
        if let Some(home) = jobflow_home() {
            return Self::under(home);
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            session_file: home.join(".config").join("jobflow").join("session.json"),
            snapshot_db: home.join(".cache").join("jobflow").join("snapshot.db"),
        }
    }

    pub(crate) fn under(dir: PathBuf) -> Self {
        Self {
            session_file: dir.join("session.json"),
            snapshot_db: dir.join("snapshot.db"),
        }
    }
}
