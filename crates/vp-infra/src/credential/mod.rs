mod file_credential_store;

pub use file_credential_store::{default_identity_path, FileCredentialStore};
