//! Build context archiving

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Name under which the generated Dockerfile is placed in the context
pub const CONTEXT_DOCKERFILE_NAME: &str = "mcp-forge.Dockerfile";

/// Creates a gzip-compressed tar of `context` plus the generated Dockerfile.
///
/// `.dockerignore` patterns are honoured, `.git` is never sent, and every
/// workspace-relative path in `excluded` is left out (secrets, checkpoint).
pub fn build_context_archive(
    context: &Path,
    dockerfile: &str,
    excluded: &[PathBuf],
) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut archive = tar::Builder::new(encoder);
    archive.follow_symlinks(false);

    let mut files = 0usize;
    let walker = WalkBuilder::new(context)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .add_custom_ignore_filename(".dockerignore")
        .build();

    for entry in walker {
        let entry = entry.context("Failed to walk build context")?;
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(context) else {
            continue;
        };
        if relative.as_os_str().is_empty() || !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if relative.starts_with(".git")
            || relative == Path::new(CONTEXT_DOCKERFILE_NAME)
            || excluded.iter().any(|ex| relative.starts_with(ex))
        {
            continue;
        }

        archive
            .append_path_with_name(path, relative)
            .with_context(|| format!("Failed to add {} to build context", relative.display()))?;
        files += 1;
    }

    let mut header = tar::Header::new_gnu();
    header.set_size(dockerfile.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    );
    header.set_cksum();
    archive
        .append_data(&mut header, CONTEXT_DOCKERFILE_NAME, dockerfile.as_bytes())
        .context("Failed to add Dockerfile to build context")?;

    let bytes = archive
        .into_inner()
        .context("Failed to finalize build context")?
        .finish()
        .context("Failed to compress build context")?;

    debug!(files, bytes = bytes.len(), "Build context archived");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use tempfile::TempDir;

    fn entries(bytes: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_archive_contains_sources_and_dockerfile() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("tools")).unwrap();
        fs::create_dir_all(temp.path().join(".mcp-forge")).unwrap();
        fs::write(temp.path().join("tools/echo.py"), "# @tool echo\n").unwrap();
        fs::write(temp.path().join(".mcp-forge/config.yaml"), "server: {}\n").unwrap();
        fs::write(temp.path().join(".mcp-forge/.env"), "SECRET=1\n").unwrap();
        fs::write(temp.path().join(".mcp-forge/checkpoint.json"), "{}").unwrap();

        let bytes = build_context_archive(
            temp.path(),
            "FROM scratch\n",
            &[
                PathBuf::from(".mcp-forge/.env"),
                PathBuf::from(".mcp-forge/checkpoint.json"),
            ],
        )
        .unwrap();

        assert_eq!(
            entries(&bytes),
            vec![".mcp-forge/config.yaml", CONTEXT_DOCKERFILE_NAME, "tools/echo.py"]
        );
    }

    #[test]
    fn test_dockerignore_is_honoured() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".dockerignore"), "*.log\n").unwrap();
        fs::write(temp.path().join("debug.log"), "noise").unwrap();
        fs::write(temp.path().join("keep.txt"), "data").unwrap();

        let bytes = build_context_archive(temp.path(), "FROM scratch\n", &[]).unwrap();
        let names = entries(&bytes);

        assert!(names.contains(&"keep.txt".to_string()));
        assert!(!names.contains(&"debug.log".to_string()));
    }
}
