// src/core/fs_ops.rs
//! File helpers shared by the config and override loaders

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

pub struct FsOps;

impl FsOps {
    /// Read a file to string, naming the path on failure
    pub fn read_file_safe(path: &Path) -> Result<String> {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        debug!("Read {} bytes from {}", content.len(), path.display());
        Ok(content)
    }

    /// Lowercased file extension, if any
    pub fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(FsOps::extension(Path::new("overrides.TOML")), Some("toml".to_string()));
        assert_eq!(FsOps::extension(Path::new("noext")), None);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let err = FsOps::read_file_safe(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
