//! Playlist files in the output directory: raw M3U downloads, parsed JSON
//! channel lists, and filtered exports.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use xf_protocol::Channel;

use crate::error::{CoreError, Result};
use crate::m3u;

pub struct PlaylistStore {
    dir: PathBuf,
}

impl PlaylistStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a bare file name inside the output directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Resolve `name` and fail if it does not exist.
    pub fn existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.path(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(CoreError::NoSuchFile(name.to_string()))
        }
    }

    /// `{safe_name}_{username}_playlist.m3u`
    pub fn save_m3u(&self, safe_name: &str, username: &str, text: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{safe_name}_{username}_playlist.m3u"));
        fs::write(&path, text)?;
        debug!(path = %path.display(), "saved playlist");
        Ok(path)
    }

    /// `{safe_name}_{username}_playlist.json`
    pub fn json_path(&self, safe_name: &str, username: &str) -> PathBuf {
        self.dir.join(format!("{safe_name}_{username}_playlist.json"))
    }

    /// Write channels as a JSON array, one indented object per element.
    /// `progress(done, total)` runs after each element.
    pub fn save_json(
        &self,
        path: &Path,
        channels: &[Channel],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut out = BufWriter::new(File::create(path)?);
        let total = channels.len();

        out.write_all(b"[\n")?;
        for (idx, channel) in channels.iter().enumerate() {
            let dumped = serde_json::to_string_pretty(channel)?;
            let indented: Vec<String> = dumped.lines().map(|l| format!("  {l}")).collect();
            out.write_all(indented.join("\n").as_bytes())?;
            let separator: &[u8] = if idx + 1 < total { b",\n" } else { b"\n" };
            out.write_all(separator)?;
            progress(idx + 1, total);
        }
        out.write_all(b"]\n")?;
        out.flush()?;
        debug!(path = %path.display(), channels = total, "saved channel list");
        Ok(())
    }

    pub fn load_json(&self, path: &Path) -> Result<Vec<Channel>> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the `#EXTM3U` playlist for `channels`.
    pub fn write_m3u(
        &self,
        path: &Path,
        channels: &[Channel],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(b"#EXTM3U\n")?;
        for (idx, channel) in channels.iter().enumerate() {
            writeln!(out, "{}", m3u::extinf_line(channel))?;
            writeln!(out, "{}", channel.url)?;
            progress(idx + 1, channels.len());
        }
        out.flush()?;
        Ok(())
    }

    /// `.m3u` and `.json` file names in the output directory, sorted.
    pub fn list(&self) -> Result<(Vec<String>, Vec<String>)> {
        if !self.dir.is_dir() {
            return Ok((Vec::new(), Vec::new()));
        }
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        let m3us = names
            .iter()
            .filter(|n| n.to_lowercase().ends_with(".m3u"))
            .cloned()
            .collect();
        let jsons = names
            .iter()
            .filter(|n| n.to_lowercase().ends_with(".json"))
            .cloned()
            .collect();
        Ok((m3us, jsons))
    }
}

/// JSON file name for a parsed M3U file stem.
///
/// Downloads are named `{name}_{user}_playlist`, so that stem maps straight
/// to `{stem}.json`. Other stems are read as `{name}_{user}_...`.
pub fn json_name_for_m3u_stem(stem: &str) -> String {
    if stem.ends_with("_playlist") {
        return format!("{stem}.json");
    }
    let parts: Vec<&str> = stem.split('_').collect();
    let (name, user) = if parts.len() >= 2 {
        (parts[0], parts[1])
    } else {
        (stem, "user")
    };
    format!("{name}_{user}_playlist.json")
}

/// Default output stem for a filtered export.
pub fn filtered_stem(json_stem: &str, field: &str, keyword: &str) -> String {
    let keyword = if keyword.is_empty() {
        "all".to_string()
    } else {
        keyword.replace(' ', "_")
    };
    format!("{json_stem}_{field}-{keyword}_filtered")
}

/// File name without its extension.
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}
