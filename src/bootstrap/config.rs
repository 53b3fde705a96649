//! # Configuration Loader / 配置加载器
//!
//! 读取 TOML 配置文件并映射为 [`Settings`]。缺失的字段由 `Settings` 的默认值补齐，
//! 缺失的文件等同于全部使用默认值。

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};
use vp_core::Settings;

/// Config file path override.
pub const CONFIG_ENV: &str = "VOXPAIR_CONFIG";
/// Backend URL override, applied after the file is loaded.
pub const BACKEND_URL_ENV: &str = "VOXPAIR_BACKEND_URL";

const CONFIG_FILE: &str = "config.toml";

/// Pick the config file: CLI flag, then `VOXPAIR_CONFIG`, then the platform config dir.
pub fn resolve_config_path(cli: Option<PathBuf>, env: Option<OsString>) -> Option<PathBuf> {
    cli.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|dir| dir.join("voxpair").join(CONFIG_FILE)))
}

/// Load settings from a TOML file
/// 从 TOML 文件加载配置
///
/// # Errors / 错误
///
/// - 无法读取文件（I/O 错误）
/// - 内容不是有效的 TOML，或字段类型不匹配
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load settings, falling back to defaults when the file does not exist.
///
/// `explicit` marks a path the user asked for; a missing explicit file is
/// worth a warning, a missing default one is not.
pub fn load_settings_or_default(path: Option<&Path>, explicit: bool) -> anyhow::Result<Settings> {
    let Some(path) = path else {
        info!("no config directory available, using default settings");
        return Ok(Settings::default());
    };

    if !path.exists() {
        if explicit {
            warn!(path = %path.display(), "config file not found, using default settings");
        } else {
            info!(path = %path.display(), "no config file, using default settings");
        }
        return Ok(Settings::default());
    }

    let settings = load_settings(path)?;
    info!(path = %path.display(), "config loaded");
    Ok(settings)
}

/// Replace the backend URL when an override is given and non-empty.
pub fn apply_backend_url_override(settings: &mut Settings, url: Option<String>) {
    if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
        info!(url = %url, "backend url overridden from environment");
        settings.backend.url = url;
    }
}

/// [`apply_backend_url_override`] with the value of `VOXPAIR_BACKEND_URL`.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_backend_url_override(settings, std::env::var(BACKEND_URL_ENV).ok());
}
