//! Tool and connector module discovery and validation

pub mod loader;
pub mod parser;
pub mod types;
pub mod validator;

pub use loader::{FsModuleLoader, ModuleLoader};
pub use parser::{parse_module, ParseError};
pub use types::{CredentialSpec, LoadedModules, Module, ModuleKind, ModuleLanguage, ToolParam};
pub use validator::{DefaultValidator, ModuleValidator, ValidationReport, ValidationRule};
