//! Credential discovery and resolution

pub mod discovery;
pub mod resolve;

pub use discovery::{CredentialDiscoverer, CredentialRequirement, DefaultCredentialDiscoverer};
pub use resolve::{
    resolve_credentials, write_env_file, CredentialPrompter, CredentialWarning,
    ResolvedCredentials, TerminalPrompter,
};
