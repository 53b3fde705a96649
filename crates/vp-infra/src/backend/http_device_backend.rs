use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vp_core::pairing::IssuedCode;
use vp_core::ports::{BackendError, DeviceBackendPort};
use vp_core::settings::model::BackendSettings;
use vp_core::{DeviceIdentity, SessionId};

/// Longest slice of an error body kept in `BackendError::Status`.
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub api_version: String,
    pub timeout: Duration,
    pub platform: String,
    pub core_version: String,
}

impl From<&BackendSettings> for HttpBackendConfig {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            api_version: settings.api_version.clone(),
            timeout: Duration::from_secs(settings.request_timeout_secs.max(1)),
            platform: settings.platform.clone(),
            core_version: settings.core_version.clone(),
        }
    }
}

#[derive(Deserialize)]
struct CodeResponse {
    code: String,
    token: String,
    #[serde(default)]
    expiration: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivateRequest<'a> {
    state: &'a str,
    token: &'a str,
    core_version: &'a str,
    platform: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateResponse {
    uuid: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expiration: Option<u64>,
}

/// Pairing backend reached over its REST API.
///
/// - `GET  {url}/{ver}/device/code?state=..` issues a code
/// - `POST {url}/{ver}/device/activate` returns the identity once the code was entered
pub struct HttpDeviceBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpDeviceBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Connectivity(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version.trim_matches('/'),
            path
        )
    }
}

fn transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Connectivity(format!("request timed out: {error}"))
    } else if error.is_decode() {
        BackendError::Malformed(error.to_string())
    } else {
        BackendError::Connectivity(error.to_string())
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> BackendError {
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    BackendError::Status {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl DeviceBackendPort for HttpDeviceBackend {
    async fn request_code(&self, session_id: &SessionId) -> Result<IssuedCode, BackendError> {
        let url = self.endpoint("device/code");
        debug!(%session_id, url = %url, "requesting pairing code");

        let response = self
            .client
            .get(&url)
            .query(&[("state", session_id.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let body: CodeResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("code response: {e}")))?;
        if body.code.is_empty() || body.token.is_empty() {
            return Err(BackendError::Malformed(
                "code response missing code or token".to_string(),
            ));
        }

        Ok(IssuedCode {
            code: body.code,
            access_token: body.token,
            expires_in_secs: body.expiration,
        })
    }

    async fn check_activation(
        &self,
        session_id: &SessionId,
        access_token: &str,
    ) -> Result<DeviceIdentity, BackendError> {
        let url = self.endpoint("device/activate");
        let request = ActivateRequest {
            state: session_id.as_str(),
            token: access_token,
            core_version: &self.config.core_version,
            platform: &self.config.platform,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_client_error() {
            debug!(%session_id, status = status.as_u16(), "activation not completed yet");
            return Err(BackendError::Pending);
        }
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let body: ActivateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("activation response: {e}")))?;
        if body.uuid.is_empty() || body.access_token.is_empty() {
            return Err(BackendError::Malformed(
                "activation response missing uuid or access token".to_string(),
            ));
        }

        Ok(DeviceIdentity {
            uuid: body.uuid,
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in_secs: body.expiration,
        })
    }
}
