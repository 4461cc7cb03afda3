use tracing_subscriber::{EnvFilter, fmt};

/// Filter variable, e.g. `JOBFLOW_LOG=jobflow=debug`
const LOG_ENV: &str = "JOBFLOW_LOG";

fn filter_directive(debug: bool, from_env: Option<String>) -> String {
    match from_env.filter(|v| !v.trim().is_empty()) {
        Some(directive) => directive,
        None if debug => "debug".to_string(),
        None => "warn".to_string(),
    }
}

/// Install the stderr subscriber; stdout stays reserved for command output
pub(crate) fn init(debug: bool) {
    let directive = filter_directive(debug, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init in the same process keeps the first subscriber
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
