//! Workspace scanning for tool and connector modules

use super::parser::parse_module;
use super::types::{LoadedModules, ModuleKind, ModuleLanguage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directories never searched for modules
const SKIPPED_DIRS: &[&str] = &[
    "__tests__",
    "__pycache__",
    "node_modules",
    "tests",
    "test",
    "dist",
    "build",
];

const MAX_MODULE_DEPTH: usize = 4;

/// Discovers modules under a workspace root.
///
/// Implementations never fail on an individual bad file: such files are
/// reported through [`LoadedModules::warnings`] and skipped.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, base_path: &Path) -> Result<LoadedModules>;
}

/// Loads modules from `<base>/tools` and `<base>/connectors`
#[derive(Debug, Clone, Default)]
pub struct FsModuleLoader;

impl FsModuleLoader {
    pub fn new() -> Self {
        Self
    }

    fn scan(base_path: &Path) -> LoadedModules {
        let mut loaded = LoadedModules::default();

        for kind in [ModuleKind::Tool, ModuleKind::Connector] {
            let dir = base_path.join(kind.directory());
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "Module directory not present");
                continue;
            }

            for path in module_files(&dir) {
                let relative = path.strip_prefix(base_path).unwrap_or(&path).to_path_buf();
                let content = match fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(file = %relative.display(), error = %e, "Failed to read module file");
                        loaded
                            .warnings
                            .push(format!("Skipped {}: {}", relative.display(), e));
                        continue;
                    }
                };

                match parse_module(&content, kind, &relative) {
                    Ok(module) => {
                        debug!(module = %module.name, kind = %kind, "Discovered module");
                        loaded.modules.push(module);
                    }
                    Err(e) => {
                        warn!(file = %relative.display(), error = %e, "Skipping module file");
                        loaded
                            .warnings
                            .push(format!("Skipped {}: {}", relative.display(), e));
                    }
                }
            }
        }

        loaded
            .modules
            .sort_by(|a, b| (a.kind as u8, &a.path).cmp(&(b.kind as u8, &b.path)));
        loaded
    }
}

fn module_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .max_depth(Some(MAX_MODULE_DEPTH))
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !SKIPPED_DIRS.contains(&name))
                .unwrap_or(false)
        })
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| ModuleLanguage::from_path(path).is_some())
        .filter(|path| !is_support_file(path))
        .collect();
    files.sort();
    files
}

/// Package markers and test files that live next to modules
fn is_support_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name == "__init__.py"
        || name.starts_with("test_")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with(".d.ts")
}

#[async_trait]
impl ModuleLoader for FsModuleLoader {
    async fn load(&self, base_path: &Path) -> Result<LoadedModules> {
        let base = base_path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::scan(&base))
            .await
            .context("Module scan task panicked")
    }
}
