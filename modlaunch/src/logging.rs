//! Structured logging setup, driven by the reserved `launcher.logging.*`
//! environment variables (§6 EXTERNAL INTERFACES).

use crate::config::{ENV_LOGGING_FILE, ENV_LOGGING_LEVEL};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. The returned guard must be kept
/// alive for the process lifetime when logging to a file sink -- dropping
/// it flushes the non-blocking writer.
pub fn init() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter()));

    match std::env::var(ENV_LOGGING_FILE).ok().as_deref() {
        Some("stdout") => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stdout).init();
            None
        }
        Some(path) if path != "stderr" && !path.is_empty() => {
            let path = std::path::Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_default();
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            None
        }
    }
}

/// Map `launcher.logging.level` to an `EnvFilter` directive. `FORCE` maps
/// to `trace` (the design's only requirement is that it be the most
/// verbose tier); an unrecognized or unset value defaults to `info`.
fn level_filter() -> String {
    match std::env::var(ENV_LOGGING_LEVEL).ok().as_deref() {
        Some("FORCE") => "trace".to_string(),
        Some("ERROR") => "error".to_string(),
        Some("WARN") => "warn".to_string(),
        Some("INFO") => "info".to_string(),
        Some("DEBUG") => "debug".to_string(),
        _ => "info".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_level_defaults_to_info() {
        std::env::remove_var(ENV_LOGGING_LEVEL);
        assert_eq!(level_filter(), "info");
    }
}
