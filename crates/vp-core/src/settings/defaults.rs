use super::model::*;

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            api_version: "v1".to_string(),
            request_timeout_secs: 15,
            platform: std::env::consts::OS.to_string(),
            core_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            code_repeat_every: 6,
            code_lifetime_secs: 60 * 60 * 20, // 20 hours
            code_fetch_retry_delay_secs: 10,
            max_code_fetch_retries: 30,
            save_retry_delay_secs: 2,
            max_save_attempts: 2,
            restart_delay_secs: 5,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            backend: BackendSettings::default(),
            storage: StorageSettings::default(),
            pairing: PairingSettings::default(),
        }
    }
}
