//! Tool locator - find aligner executables and per-user directories
//!
//! Aligners are looked up on PATH first, then in the user's data directory
//! (`~/.local/share/rulelearn/bin` on Unix).

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

pub struct ToolLocator {
    /// Base directory for rulelearn data (e.g., ~/.local/share/rulelearn)
    data_dir: PathBuf,
}

impl ToolLocator {
    pub fn new() -> Result<Self> {
        let data_dir = Self::get_data_dir()?;
        Ok(Self { data_dir })
    }

    fn get_data_dir() -> Result<PathBuf> {
        #[cfg(windows)]
        {
            let base = dirs::data_local_dir()
                .ok_or_else(|| anyhow!("Could not determine local data directory"))?;
            Ok(base.join("rulelearn"))
        }

        #[cfg(not(windows))]
        {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow!("Could not determine home directory"))?;
            Ok(home.join(".local").join("share").join("rulelearn"))
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.data_dir.join("bin")
    }

    /// Per-user alignment cache, used when the config keeps the default
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("rulelearn"))
    }

    /// Resolve `program`: paths with a separator are taken as given, bare
    /// names are searched on PATH and then in [`Self::bin_dir`].
    pub fn find(&self, program: &Path) -> Result<PathBuf> {
        if program.components().count() > 1 {
            return if program.exists() {
                Ok(program.to_path_buf())
            } else {
                Err(anyhow!("{} does not exist", program.display()))
            };
        }

        let search: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        let bin_dir = self.bin_dir();

        for dir in search.iter().chain(std::iter::once(&bin_dir)) {
            let candidate = dir.join(program);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if cfg!(windows) {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Ok(exe);
                }
            }
        }

        Err(anyhow!(
            "Could not find {} on PATH or in {}",
            program.display(),
            bin_dir.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_must_exist() {
        let locator = ToolLocator::new().unwrap();
        assert!(locator.find(Path::new("/nonexistent/dir/eflomal")).is_err());

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("aligner");
        std::fs::write(&tool, "").unwrap();
        assert_eq!(locator.find(&tool).unwrap(), tool);
    }

    #[test]
    fn unknown_program_is_reported() {
        let locator = ToolLocator::new().unwrap();
        let err = locator
            .find(Path::new("rulelearn-no-such-tool"))
            .unwrap_err();
        assert!(err.to_string().contains("rulelearn-no-such-tool"));
    }

    #[test]
    fn data_dir_is_named_after_the_tool() {
        let locator = ToolLocator::new().unwrap();
        assert!(locator.bin_dir().ends_with("rulelearn/bin"));
    }
}
