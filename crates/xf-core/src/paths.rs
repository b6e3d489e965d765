//! On-disk layout of the data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// `root/servers.json`, `root/output/`, `root/debug/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn servers_file(&self) -> PathBuf {
        self.root.join("servers.json")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.root.join("debug")
    }

    /// Create the directories and seed an empty server list if missing.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.output_dir())?;
        fs::create_dir_all(self.debug_dir())?;
        let servers = self.servers_file();
        if !servers.exists() {
            fs::write(&servers, "[]")?;
        }
        Ok(())
    }
}
