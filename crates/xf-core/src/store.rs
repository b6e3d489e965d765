//! Saved accounts, persisted as a pretty-printed JSON array.
//!
//! Every operation re-reads the file so edits made by another instance (or
//! by hand) are picked up.

use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, warn};
use xf_protocol::ServerRecord;

use crate::error::{CoreError, Result};
use crate::paths::DataDir;

/// Seconds since Unix epoch.
pub fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub struct ServerStore {
    dir: DataDir,
}

impl ServerStore {
    pub fn new(dir: DataDir) -> Self {
        Self { dir }
    }

    /// All saved servers. A file that is not valid JSON reads as an empty
    /// list. Valid JSON holding records that cannot be mapped is an error,
    /// so the next save does not overwrite it.
    pub fn load(&self) -> Result<Vec<ServerRecord>> {
        self.dir.ensure()?;
        let path = self.dir.servers_file();
        let contents = fs::read_to_string(&path)?;
        let value: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "server list unreadable, treating as empty");
                return Ok(Vec::new());
            }
        };
        let Value::Array(entries) = value else {
            return Err(CoreError::UnreadableServers(format!(
                "{} does not hold a JSON array",
                path.display()
            )));
        };
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                serde_json::from_value(entry).map_err(|e| {
                    CoreError::UnreadableServers(format!("{} entry #{}: {e}", path.display(), i + 1))
                })
            })
            .collect()
    }

    pub fn save(&self, servers: &[ServerRecord]) -> Result<()> {
        self.dir.ensure()?;
        let json = serde_json::to_string_pretty(servers)?;
        fs::write(self.dir.servers_file(), json)?;
        debug!(count = servers.len(), "saved server list");
        Ok(())
    }

    pub fn get(&self, idx: usize) -> Result<ServerRecord> {
        self.load()?
            .into_iter()
            .nth(idx)
            .ok_or(CoreError::NoSuchServer(idx + 1))
    }

    pub fn add(&self, record: ServerRecord) -> Result<usize> {
        let mut servers = self.load()?;
        servers.push(record);
        self.save(&servers)?;
        Ok(servers.len() - 1)
    }

    /// Apply `f` to the record at `idx` and persist. Returns the updated record.
    pub fn update(&self, idx: usize, f: impl FnOnce(&mut ServerRecord)) -> Result<ServerRecord> {
        let mut servers = self.load()?;
        let record = servers
            .get_mut(idx)
            .ok_or(CoreError::NoSuchServer(idx + 1))?;
        f(record);
        let updated = record.clone();
        self.save(&servers)?;
        Ok(updated)
    }

    pub fn remove(&self, idx: usize) -> Result<ServerRecord> {
        let mut servers = self.load()?;
        if idx >= servers.len() {
            return Err(CoreError::NoSuchServer(idx + 1));
        }
        let removed = servers.remove(idx);
        self.save(&servers)?;
        Ok(removed)
    }
}
