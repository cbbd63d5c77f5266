use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::parsers::open_file;

/// Finds family genotype files among the paths given on the command line
pub struct FileDiscovery {
    recursive: bool,
}

impl FileDiscovery {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// Expand files and directories into a de-duplicated list of family files
    pub fn discover(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in inputs {
            if path.is_file() {
                files.push(path.clone());
            } else if path.is_dir() {
                files.extend(self.discover_in_directory(path)?);
            } else {
                debug!("Ignoring missing input {}", path.display());
            }
        }

        // Remove duplicates while preserving order
        let mut seen = HashSet::new();
        files.retain(|path| seen.insert(path.clone()));

        Ok(files)
    }

    fn discover_in_directory(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if self.recursive {
            for entry in WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && self.is_potential_family_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            let entries = fs::read_dir(dir)
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

            let mut paths = Vec::new();
            for entry in entries {
                let entry = entry.with_context(|| {
                    format!("Failed to read directory entry in: {}", dir.display())
                })?;
                paths.push(entry.path());
            }
            paths.sort();

            files.extend(
                paths
                    .into_iter()
                    .filter(|path| path.is_file() && self.is_potential_family_file(path)),
            );
        }

        Ok(files)
    }

    fn is_potential_family_file(&self, path: &Path) -> bool {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "tsv" | "csv" | "gz" | "bz2" | "xz" => true,
            _ => self.has_family_rows(path),
        }
    }

    /// Look for a seven-column row with a numeric position in the first lines
    fn has_family_rows(&self, path: &Path) -> bool {
        let Ok(reader) = open_file(path) else {
            return false;
        };

        reader
            .lines()
            .take(20)
            .map_while(|line| line.ok())
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .any(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                parts.len() >= 7 && parts[2].parse::<u64>().is_ok()
            })
    }
}
