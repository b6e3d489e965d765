//! Raw dumps of responses that could not be used, kept for inspection.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::warn;
use xf_backend::DebugSink;

use crate::store::epoch_secs;

pub struct DebugStore {
    dir: PathBuf,
    cap_bytes: usize,
}

impl DebugStore {
    pub fn new(dir: impl Into<PathBuf>, cap_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            cap_bytes,
        }
    }

    /// Write `{ts}_{label}_debug.txt`. Bodies longer than the cap are cut on a
    /// character boundary.
    pub fn write(&self, label: &str, endpoint: &str, body: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let name = format!("{}_{label}_debug.txt", epoch_secs()).replace(' ', "_");
        let path = self.dir.join(name);
        let body = truncate_on_char_boundary(body, self.cap_bytes);
        fs::write(&path, format!("Endpoint: {endpoint}\n\n{body}"))?;
        Ok(path)
    }

    /// Dump file names, newest first.
    pub fn list(&self) -> io::Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    pub fn read(&self, name: &str) -> io::Result<String> {
        let bytes = fs::read(self.dir.join(name))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl DebugSink for DebugStore {
    fn save(&self, label: &str, endpoint: &str, body: &str) -> Option<PathBuf> {
        match self.write(label, endpoint, body) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(label, error = %e, "failed to write debug file");
                None
            }
        }
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
