//! Rule-based validation of a discovered module set

use super::types::{Module, ModuleKind};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Outcome of validating a module set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Problems found by a single rule
#[derive(Debug, Default)]
pub struct RuleFindings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, modules: &[Module], findings: &mut RuleFindings);
}

pub trait ModuleValidator: Send + Sync {
    fn validate(&self, modules: &[Module]) -> ValidationReport;
}

pub struct UniqueNamesRule;

impl ValidationRule for UniqueNamesRule {
    fn name(&self) -> &'static str {
        "UniqueNames"
    }

    fn check(&self, modules: &[Module], findings: &mut RuleFindings) {
        let mut seen: HashMap<(ModuleKind, &str), &Module> = HashMap::new();
        for module in modules {
            if let Some(first) = seen.get(&(module.kind, module.name.as_str())) {
                findings.errors.push(format!(
                    "Duplicate {} name '{}' ({} and {})",
                    module.kind,
                    module.name,
                    first.path.display(),
                    module.path.display()
                ));
            } else {
                seen.insert((module.kind, module.name.as_str()), module);
            }
        }
    }
}

pub struct NameFormatRule;

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid name regex"))
}

impl ValidationRule for NameFormatRule {
    fn name(&self) -> &'static str {
        "NameFormat"
    }

    fn check(&self, modules: &[Module], findings: &mut RuleFindings) {
        for module in modules {
            if !name_regex().is_match(&module.name) {
                findings.errors.push(format!(
                    "Invalid {} name '{}' in {}: names must start with a letter and contain only letters, digits, '-' or '_'",
                    module.kind,
                    module.name,
                    module.path.display()
                ));
            }
        }
    }
}

pub struct DescriptionRule;

impl ValidationRule for DescriptionRule {
    fn name(&self) -> &'static str {
        "Description"
    }

    fn check(&self, modules: &[Module], findings: &mut RuleFindings) {
        for module in modules.iter().filter(|m| m.description.trim().is_empty()) {
            findings.warnings.push(format!(
                "{} '{}' has no description",
                capitalize(module.kind.as_str()),
                module.name
            ));
        }
    }
}

pub struct ConnectorMethodsRule;

impl ValidationRule for ConnectorMethodsRule {
    fn name(&self) -> &'static str {
        "ConnectorMethods"
    }

    fn check(&self, modules: &[Module], findings: &mut RuleFindings) {
        for module in modules
            .iter()
            .filter(|m| m.is_connector() && m.methods.is_empty())
        {
            findings
                .warnings
                .push(format!("Connector '{}' declares no methods", module.name));
        }
    }
}

pub struct UniqueParamsRule;

impl ValidationRule for UniqueParamsRule {
    fn name(&self) -> &'static str {
        "UniqueParams"
    }

    fn check(&self, modules: &[Module], findings: &mut RuleFindings) {
        for module in modules {
            let mut seen = HashSet::new();
            for param in &module.params {
                if !seen.insert(param.name.as_str()) {
                    findings.errors.push(format!(
                        "Tool '{}' declares parameter '{}' more than once",
                        module.name, param.name
                    ));
                }
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct DefaultValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl DefaultValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }
}

impl Default for DefaultValidator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(UniqueNamesRule),
                Box::new(NameFormatRule),
                Box::new(UniqueParamsRule),
                Box::new(DescriptionRule),
                Box::new(ConnectorMethodsRule),
            ],
        }
    }
}

impl ModuleValidator for DefaultValidator {
    fn validate(&self, modules: &[Module]) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            let mut findings = RuleFindings::default();
            rule.check(modules, &mut findings);
            report
                .errors
                .extend(findings.errors.into_iter().map(|e| format!("[{}] {}", rule.name(), e)));
            report.warnings.extend(findings.warnings);
        }
        report.valid = report.errors.is_empty();
        report
    }
}
