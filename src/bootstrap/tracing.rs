//! Tracing configuration for voxpair
//!
//! - **Environment-aware**: debug builds log at debug, release builds at info
//! - **RUST_LOG** overrides the default directives
//! - **Sentry** is enabled only when `SENTRY_DSN` is set
//! - **File log** goes to `<data_dir>/voxpair/logs/voxpair.log` unless disabled

use std::path::{Path, PathBuf};
use std::{fs, io, sync::OnceLock};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static SENTRY_GUARD: OnceLock<sentry::ClientInitGuard> = OnceLock::new();

const LOG_FILE: &str = "voxpair.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
///
/// HTTP client internals stay at warn in every build.
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let level = if is_dev { "debug" } else { "info" };
    vec![
        level.to_string(),
        format!("vp_core={level}"),
        format!("vp_app={level}"),
        format!("vp_infra={level}"),
        "reqwest=warn".to_string(),
        "hyper=warn".to_string(),
        "hyper_util=warn".to_string(),
        "rustls=warn".to_string(),
    ]
}

/// Where the file log lives when `--log-dir` is not given.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("voxpair").join("logs"))
}

/// Initialize the global tracing subscriber
///
/// `log_dir` of `None` disables the file layer. A file layer that cannot be
/// created is reported on stderr and logging continues on stdout.
///
/// # Errors / 错误
///
/// Returns `Err` if a global subscriber is already registered.
pub fn init_tracing_subscriber(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(is_development());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    let sentry_layer = if let Ok(dsn) = std::env::var("SENTRY_DSN") {
        let guard = sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 1.0,
                ..Default::default()
            },
        ));
        if SENTRY_GUARD.set(guard).is_err() {
            eprintln!("Sentry guard already initialized");
        }
        Some(sentry_tracing::layer())
    } else {
        None
    };

    let stdout_writer: BoxMakeWriter = BoxMakeWriter::new(io::stdout);
    let file_writer = log_dir.and_then(|dir| match build_file_writer(dir) {
        Ok(writer) => Some(writer),
        Err(err) => {
            eprintln!("Failed to initialize file logging, falling back to stdout: {err}");
            None
        }
    });

    let stdout_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(stdout_writer);

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
    });

    let subscriber = registry()
        .with(env_filter)
        .with(sentry_layer)
        .with(stdout_layer);

    if let Some(layer) = file_layer {
        subscriber.with(layer).try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}

fn build_file_writer(log_dir: &Path) -> anyhow::Result<NonBlocking> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_directives() {
        let dev = build_filter_directives(true);
        assert_eq!(dev[0], "debug");
        assert!(dev.contains(&"vp_app=debug".to_string()));
        assert!(dev.contains(&"reqwest=warn".to_string()));

        let prod = build_filter_directives(false);
        assert_eq!(prod[0], "info");
        assert!(prod.contains(&"vp_infra=info".to_string()));
        assert!(prod.contains(&"hyper=warn".to_string()));
    }

    #[test]
    fn test_directives_parse_as_env_filter() {
        let joined = build_filter_directives(false).join(",");
        assert!(tracing_subscriber::EnvFilter::try_new(joined).is_ok());
    }

    #[test]
    fn test_default_log_dir_is_namespaced() {
        if let Some(dir) = default_log_dir() {
            assert!(dir.ends_with("voxpair/logs"));
        }
    }
}
