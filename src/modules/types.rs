//! Module metadata types shared by discovery, validation and generation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Whether a module contributes a tool or a connector to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Tool,
    Connector,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Tool => "tool",
            ModuleKind::Connector => "connector",
        }
    }

    /// Directory under the workspace root that holds modules of this kind
    pub fn directory(&self) -> &'static str {
        match self {
            ModuleKind::Tool => "tools",
            ModuleKind::Connector => "connectors",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source language of a module file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleLanguage {
    Python,
    JavaScript,
    TypeScript,
}

impl ModuleLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "py" => Some(ModuleLanguage::Python),
            "js" | "mjs" | "cjs" => Some(ModuleLanguage::JavaScript),
            "ts" | "mts" => Some(ModuleLanguage::TypeScript),
            _ => None,
        }
    }

    /// Runtime the module needs inside the image
    pub fn runtime(&self) -> &'static str {
        match self {
            ModuleLanguage::Python => "python",
            ModuleLanguage::JavaScript | ModuleLanguage::TypeScript => "node",
        }
    }
}

/// A parameter accepted by a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A credential a module needs at runtime, identified by its environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
}

/// A discovered tool or connector definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub language: ModuleLanguage,
    /// Path relative to the workspace root
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ToolParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    /// Connector category such as `database`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialSpec>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        kind: ModuleKind,
        language: ModuleLanguage,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            version: None,
            language,
            path: path.into(),
            params: Vec::new(),
            returns: None,
            connector_type: None,
            methods: Vec::new(),
            credentials: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_credential(mut self, name: impl Into<String>, required: bool) -> Self {
        self.credentials.push(CredentialSpec {
            name: name.into(),
            description: String::new(),
            required,
        });
        self
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_tool(&self) -> bool {
        self.kind == ModuleKind::Tool
    }

    pub fn is_connector(&self) -> bool {
        self.kind == ModuleKind::Connector
    }

    /// Identifier used to compare module sets across runs, e.g. `tool:summarizer`
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

/// Result of scanning a workspace: the modules found plus per-file problems
#[derive(Debug, Clone, Default)]
pub struct LoadedModules {
    pub modules: Vec<Module>,
    pub warnings: Vec<String>,
}

impl LoadedModules {
    pub fn new(modules: Vec<Module>) -> Self {
        Self {
            modules,
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(
            ModuleLanguage::from_path(Path::new("tools/a.py")),
            Some(ModuleLanguage::Python)
        );
        assert_eq!(
            ModuleLanguage::from_path(Path::new("tools/a.mjs")),
            Some(ModuleLanguage::JavaScript)
        );
        assert_eq!(
            ModuleLanguage::from_path(Path::new("tools/a.ts")),
            Some(ModuleLanguage::TypeScript)
        );
        assert_eq!(ModuleLanguage::from_path(Path::new("tools/README.md")), None);
    }

    #[test]
    fn test_identifier_includes_kind() {
        let tool = Module::new("search", ModuleKind::Tool, ModuleLanguage::Python, "tools/search.py");
        let connector = Module::new(
            "search",
            ModuleKind::Connector,
            ModuleLanguage::Python,
            "connectors/search.py",
        );
        assert_eq!(tool.identifier(), "tool:search");
        assert_ne!(tool.identifier(), connector.identifier());
    }

    #[test]
    fn test_module_serializes_lowercase_kind() {
        let module = Module::new("db", ModuleKind::Connector, ModuleLanguage::TypeScript, "connectors/db.ts");
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["kind"], "connector");
        assert_eq!(json["language"], "typescript");
        assert!(json.get("params").is_none());
    }
}
