mod http_device_backend;

pub use http_device_backend::{HttpBackendConfig, HttpDeviceBackend};
