//! Extracts module metadata from source files
//!
//! Two declaration styles are recognised:
//!
//! - doc tags inside a docstring or comment block (`@tool summarizer`,
//!   `@param text string The text to summarize`, `@credential API_KEY required ...`)
//! - a `metadata = { ... }` literal (Python dict or JS/TS object) with
//!   `name`, `description`, `version`, `type`, `methods` and `credentials` keys
//!
//! Tags win over the literal when both declare the same field.

use super::types::{CredentialSpec, Module, ModuleKind, ModuleLanguage, ToolParam};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported file type")]
    UnsupportedLanguage,

    #[error("no @{0} tag or metadata block found")]
    NoMetadata(&'static str),

    #[error("metadata does not declare a module name")]
    MissingName,
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:#+|//+|/?\*+)?[ \t]*@([A-Za-z_]+)[ \t]*(.*?)[ \t]*$")
            .expect("valid tag regex")
    })
}

fn metadata_start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmetadata\s*(?::[^=]*)?=\s*\{").expect("valid metadata regex"))
}

fn string_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']?([A-Za-z_]+)["']?\s*:\s*["']([^"']*)["']"#).expect("valid field regex")
    })
}

fn list_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']?([A-Za-z_]+)["']?\s*:\s*\[([^\]]*)\]"#).expect("valid list regex")
    })
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']([^"']*)["']"#).expect("valid quoted regex"))
}

/// Parses one module file. `relative_path` is recorded on the module as-is.
pub fn parse_module(
    content: &str,
    kind: ModuleKind,
    relative_path: &Path,
) -> Result<Module, ParseError> {
    let language =
        ModuleLanguage::from_path(relative_path).ok_or(ParseError::UnsupportedLanguage)?;

    let tags = collect_tags(content);
    let literal = extract_metadata_block(content).map(parse_metadata_block);

    let name_tag = match kind {
        ModuleKind::Tool => "tool",
        ModuleKind::Connector => "connector",
    };

    if !tags.iter().any(|(k, _)| k == name_tag || k == "name") && literal.is_none() {
        return Err(ParseError::NoMetadata(name_tag));
    }

    let literal = literal.unwrap_or_default();

    let name = first_tag(&tags, name_tag)
        .or_else(|| first_tag(&tags, "name"))
        .map(|value| value.split_whitespace().next().unwrap_or_default().to_string())
        .or_else(|| literal.strings.get("name").cloned())
        .filter(|n| !n.is_empty())
        .ok_or(ParseError::MissingName)?;

    let mut module = Module::new(name, kind, language, relative_path);

    module.description = first_tag(&tags, "description")
        .map(str::to_string)
        .or_else(|| literal.strings.get("description").cloned())
        .unwrap_or_default();
    module.version = first_tag(&tags, "version")
        .map(str::to_string)
        .or_else(|| literal.strings.get("version").cloned());
    module.connector_type = first_tag(&tags, "type")
        .map(str::to_string)
        .or_else(|| literal.strings.get("type").cloned());
    module.returns = first_tag(&tags, "returns").map(str::to_string);

    module.params = tags
        .iter()
        .filter(|(k, _)| k == "param")
        .filter_map(|(_, v)| parse_param(v))
        .collect();

    let tagged_methods: Vec<String> = tags
        .iter()
        .filter(|(k, _)| k == "method")
        .filter_map(|(_, v)| v.split_whitespace().next().map(str::to_string))
        .collect();
    module.methods = if tagged_methods.is_empty() {
        literal.lists.get("methods").cloned().unwrap_or_default()
    } else {
        tagged_methods
    };

    module.credentials = tags
        .iter()
        .filter(|(k, _)| k == "credential")
        .filter_map(|(_, v)| parse_credential(v))
        .collect();
    if let Some(names) = literal.lists.get("credentials") {
        for name in names {
            if !module.credentials.iter().any(|c| &c.name == name) {
                module.credentials.push(CredentialSpec {
                    name: name.clone(),
                    description: String::new(),
                    required: true,
                });
            }
        }
    }

    Ok(module)
}

fn collect_tags(content: &str) -> Vec<(String, String)> {
    tag_regex()
        .captures_iter(content)
        .map(|c| (c[1].to_lowercase(), c[2].trim().to_string()))
        .collect()
}

fn first_tag<'a>(tags: &'a [(String, String)], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.as_str())
}

/// `<name> <type> <description...>`
fn parse_param(value: &str) -> Option<ToolParam> {
    let mut parts = value.splitn(3, char::is_whitespace);
    let name = parts.next().filter(|s| !s.is_empty())?;
    let param_type = parts.next().unwrap_or("string");
    let description = parts.next().unwrap_or_default().trim();
    Some(ToolParam {
        name: name.to_string(),
        param_type: param_type.to_string(),
        description: description.to_string(),
    })
}

/// `<ENV_NAME> [required|optional] <description...>`; required when unspecified
fn parse_credential(value: &str) -> Option<CredentialSpec> {
    let mut parts = value.split_whitespace();
    let name = parts.next()?.to_string();
    let rest: Vec<&str> = parts.collect();
    let (required, description) = match rest.first().map(|s| s.to_lowercase()) {
        Some(flag) if flag == "optional" => (false, rest[1..].join(" ")),
        Some(flag) if flag == "required" => (true, rest[1..].join(" ")),
        _ => (true, rest.join(" ")),
    };
    Some(CredentialSpec {
        name,
        description,
        required,
    })
}

#[derive(Debug, Default)]
struct MetadataLiteral {
    strings: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
}

/// Returns the body between the braces of the first `metadata = {` literal
fn extract_metadata_block(content: &str) -> Option<&str> {
    let start = metadata_start_regex().find(content)?.end();
    let mut depth = 1usize;
    for (offset, ch) in content[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_metadata_block(block: &str) -> MetadataLiteral {
    let mut literal = MetadataLiteral::default();

    for caps in list_field_regex().captures_iter(block) {
        let items = quoted_regex()
            .captures_iter(&caps[2])
            .map(|c| c[1].to_string())
            .collect();
        literal.lists.insert(caps[1].to_string(), items);
    }

    for caps in string_field_regex().captures_iter(block) {
        literal
            .strings
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].to_string());
    }

    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARIZER: &str = r#""""
Sample Summarizer Tool (Python)

@tool summarizer
@description Summarizes text to a shorter version
@param text string The text to summarize
@param max_length number Maximum length of summary (default: 100)
@returns string The summarized text
"""

def summarizer(text: str, max_length: int = 100) -> str:
    return text[:max_length]
"#;

    const DATABASE: &str = r#""""
Sample MCP Connector - Database
"""

metadata = {
    "name": "database-connector",
    "description": "Connects to databases for querying and data manipulation",
    "version": "1.0.0",
    "type": "database",
    "methods": ["query", "insert", "update", "delete"],
    "credentials": ["DATABASE_URL"]
}

class DatabaseConnector:
    def __init__(self, connection_string: str):
        self.connection_string = connection_string
"#;

    #[test]
    fn test_parse_python_tool_tags() {
        let module =
            parse_module(SUMMARIZER, ModuleKind::Tool, Path::new("tools/summarizer.py")).unwrap();
        assert_eq!(module.name, "summarizer");
        assert_eq!(module.description, "Summarizes text to a shorter version");
        assert_eq!(module.language, ModuleLanguage::Python);
        assert_eq!(module.params.len(), 2);
        assert_eq!(module.params[1].name, "max_length");
        assert_eq!(module.params[1].param_type, "number");
        assert_eq!(module.returns.as_deref(), Some("string The summarized text"));
    }

    #[test]
    fn test_parse_connector_metadata_literal() {
        let module = parse_module(
            DATABASE,
            ModuleKind::Connector,
            Path::new("connectors/database-connector.py"),
        )
        .unwrap();
        assert_eq!(module.name, "database-connector");
        assert_eq!(module.version.as_deref(), Some("1.0.0"));
        assert_eq!(module.connector_type.as_deref(), Some("database"));
        assert_eq!(module.methods, vec!["query", "insert", "update", "delete"]);
        assert_eq!(module.credentials.len(), 1);
        assert_eq!(module.credentials[0].name, "DATABASE_URL");
        assert!(module.credentials[0].required);
    }

    #[test]
    fn test_parse_typescript_comment_tags() {
        let content = r#"/**
 * @tool web-search
 * @description Searches the web
 * @param query string Search terms
 * @credential SEARCH_API_KEY required API key for the search provider
 * @credential SEARCH_REGION optional Preferred region
 */
export async function webSearch(query: string) {}
"#;
        let module =
            parse_module(content, ModuleKind::Tool, Path::new("tools/web-search.ts")).unwrap();
        assert_eq!(module.name, "web-search");
        assert_eq!(module.language, ModuleLanguage::TypeScript);
        assert_eq!(module.credentials.len(), 2);
        assert!(module.credentials[0].required);
        assert_eq!(module.credentials[0].description, "API key for the search provider");
        assert!(!module.credentials[1].required);
    }

    #[test]
    fn test_parse_js_object_literal_unquoted_keys() {
        let content = r#"
export const metadata = {
  name: 'slack',
  description: 'Posts messages to Slack',
  type: 'messaging',
  methods: ['post', 'react'],
};
"#;
        let module =
            parse_module(content, ModuleKind::Connector, Path::new("connectors/slack.js")).unwrap();
        assert_eq!(module.name, "slack");
        assert_eq!(module.connector_type.as_deref(), Some("messaging"));
        assert_eq!(module.methods, vec!["post", "react"]);
    }

    #[test]
    fn test_missing_metadata_is_rejected() {
        let err = parse_module("def helper():\n    pass\n", ModuleKind::Tool, Path::new("tools/helper.py"))
            .unwrap_err();
        assert_eq!(err, ParseError::NoMetadata("tool"));
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err = parse_module("@tool x", ModuleKind::Tool, Path::new("tools/x.rb")).unwrap_err();
        assert_eq!(err, ParseError::UnsupportedLanguage);
    }

    #[test]
    fn test_empty_name_in_literal_is_rejected() {
        let content = "metadata = {\"name\": \"\", \"description\": \"x\"}";
        let err = parse_module(content, ModuleKind::Connector, Path::new("connectors/x.py"))
            .unwrap_err();
        assert_eq!(err, ParseError::MissingName);
    }
}
