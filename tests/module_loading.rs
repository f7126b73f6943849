//! Module discovery and dry-run builds against the fixture workspace

use mcp_forge::modules::{FsModuleLoader, ModuleKind, ModuleLanguage, ModuleLoader};
use mcp_forge::progress::StepCallback;
use mcp_forge::{
    BuildOrchestrator, BuildStep, Collaborators, ForgeConfig, GeneratorOptions, StepStatus,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn fixture_workspace() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/workspace")
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// Copies the fixture so generated artifacts never land in the source tree
fn fixture_copy() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("demo-server");
    copy_dir(&fixture_workspace(), &workspace);
    (temp, workspace)
}

#[tokio::test]
async fn test_loads_fixture_modules() {
    let loaded = FsModuleLoader::new()
        .load(&fixture_workspace())
        .await
        .unwrap();

    let names: Vec<&str> = loaded.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["summarizer", "word-count", "database-connector"]);

    let summarizer = &loaded.modules[0];
    assert_eq!(summarizer.kind, ModuleKind::Tool);
    assert_eq!(summarizer.language, ModuleLanguage::Python);
    assert_eq!(summarizer.params.len(), 2);
    assert_eq!(summarizer.path, PathBuf::from("tools/summarizer.py"));

    assert_eq!(loaded.modules[1].language, ModuleLanguage::JavaScript);

    let connector = &loaded.modules[2];
    assert_eq!(connector.kind, ModuleKind::Connector);
    assert_eq!(connector.connector_type.as_deref(), Some("database"));
    assert_eq!(connector.methods.len(), 4);
    assert_eq!(connector.credentials.len(), 1);
    assert_eq!(connector.credentials[0].name, "DATABASE_URL");
    assert!(connector.credentials[0].required);

    assert_eq!(loaded.warnings.len(), 1, "warnings: {:?}", loaded.warnings);
    assert!(loaded.warnings[0].contains("helpers.py"));
}

#[tokio::test]
async fn test_missing_module_directories_yield_nothing() {
    let temp = TempDir::new().unwrap();
    let loaded = FsModuleLoader::new().load(temp.path()).await.unwrap();
    assert!(loaded.is_empty());
    assert!(loaded.warnings.is_empty());
}

#[tokio::test]
async fn test_dry_run_generates_artifacts_for_fixture() {
    let (_temp, workspace) = fixture_copy();
    let options = GeneratorOptions::new(&workspace)
        .with_dry_run(true)
        .with_skip_prompts(true)
        .with_environment("development");
    let collaborators = Collaborators::docker(&options, &ForgeConfig::default())
        .with_env(|name: &str| (name == "DATABASE_URL").then(|| "sqlite:///tmp/app.db".to_string()));

    let result = BuildOrchestrator::new(options, collaborators).run().await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.tool_count, 2);
    assert_eq!(result.connector_count, 1);
    assert_eq!(result.count_with_status(StepStatus::Completed), 6);
    assert_eq!(result.count_with_status(StepStatus::Skipped), 2);

    let artifacts = workspace.join(".mcp-forge");
    let manifest = fs::read_to_string(artifacts.join("manifest.yaml")).unwrap();
    assert!(manifest.contains("name: demo-server"));
    assert!(manifest.contains("summarizer"));
    assert!(manifest.contains("database-connector"));

    let config = fs::read_to_string(artifacts.join("config.yaml")).unwrap();
    assert!(config.contains("development"));

    let dockerfile = fs::read_to_string(artifacts.join("Dockerfile")).unwrap();
    assert!(dockerfile.contains("FROM"));

    let env_file = fs::read_to_string(artifacts.join(".env")).unwrap();
    assert!(env_file.contains("DATABASE_URL="));
    assert!(!artifacts.join("checkpoint.json").exists());
}

#[tokio::test]
async fn test_fixture_progress_is_reported() {
    let (_temp, workspace) = fixture_copy();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback = StepCallback(move |step: &BuildStep, _message: &str| {
        sink.lock().unwrap().push((step.number, step.status));
    });

    let options = GeneratorOptions::new(&workspace)
        .with_dry_run(true)
        .with_skip_prompts(true)
        .with_progress(Arc::new(callback));
    let collaborators = Collaborators::docker(&options, &ForgeConfig::default());
    let result = BuildOrchestrator::new(options, collaborators).run().await;
    assert!(result.success, "errors: {:?}", result.errors);

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&(1, StepStatus::Running)));
    assert!(seen.contains(&(6, StepStatus::Completed)));
    assert!(seen.contains(&(8, StepStatus::Skipped)));
}
