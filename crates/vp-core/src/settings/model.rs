use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL of the pairing backend.
    pub url: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
    /// Platform tag sent with activation requests.
    pub platform: String,
    pub core_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the identity file lives. Defaults to the platform data dir.
    pub identity_path: Option<PathBuf>,
}

/// Pairing timing and retry limits.
///
/// 所有时间单位均为秒。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingSettings {
    /// 激活轮询间隔
    pub poll_interval_secs: u64,
    /// 每 N 次未激活的轮询重新播报一次配对码
    pub code_repeat_every: u32,
    /// 配对码有效期上限
    pub code_lifetime_secs: u64,
    pub code_fetch_retry_delay_secs: u64,
    /// 首次请求之外的最大重试次数
    pub max_code_fetch_retries: u32,
    pub save_retry_delay_secs: u64,
    /// 保存身份的总尝试次数
    pub max_save_attempts: u32,
    /// 会话中止后重新开始前的等待
    pub restart_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: u32,
    pub backend: BackendSettings,
    pub storage: StorageSettings,
    pub pairing: PairingSettings,
}
