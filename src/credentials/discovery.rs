//! Aggregates credential declarations across modules

use crate::modules::Module;
use serde::Serialize;
use std::collections::BTreeMap;

/// A credential the assembled server needs, merged across all modules declaring it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRequirement {
    /// Environment variable name
    pub name: String,
    pub description: String,
    pub required: bool,
    /// Modules that declare this credential
    pub modules: Vec<String>,
}

pub trait CredentialDiscoverer: Send + Sync {
    fn discover(&self, modules: &[Module]) -> Vec<CredentialRequirement>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCredentialDiscoverer;

impl CredentialDiscoverer for DefaultCredentialDiscoverer {
    fn discover(&self, modules: &[Module]) -> Vec<CredentialRequirement> {
        let mut merged: BTreeMap<&str, CredentialRequirement> = BTreeMap::new();

        for module in modules {
            for spec in &module.credentials {
                let entry = merged
                    .entry(spec.name.as_str())
                    .or_insert_with(|| CredentialRequirement {
                        name: spec.name.clone(),
                        description: String::new(),
                        required: false,
                        modules: Vec::new(),
                    });
                entry.required |= spec.required;
                if entry.description.is_empty() {
                    entry.description = spec.description.clone();
                }
                if !entry.modules.contains(&module.name) {
                    entry.modules.push(module.name.clone());
                }
            }
        }

        merged.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ModuleKind, ModuleLanguage};

    #[test]
    fn test_merges_by_name_and_promotes_required() {
        let a = Module::new("a", ModuleKind::Tool, ModuleLanguage::Python, "tools/a.py")
            .with_credential("API_KEY", false);
        let b = Module::new("b", ModuleKind::Connector, ModuleLanguage::Python, "connectors/b.py")
            .with_credential("API_KEY", true)
            .with_credential("DB_URL", true);

        let reqs = DefaultCredentialDiscoverer.discover(&[a, b]);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].name, "API_KEY");
        assert!(reqs[0].required);
        assert_eq!(reqs[0].modules, vec!["a", "b"]);
        assert_eq!(reqs[1].name, "DB_URL");
    }

    #[test]
    fn test_no_credentials() {
        let a = Module::new("a", ModuleKind::Tool, ModuleLanguage::Python, "tools/a.py");
        assert!(DefaultCredentialDiscoverer.discover(&[a]).is_empty());
    }
}
