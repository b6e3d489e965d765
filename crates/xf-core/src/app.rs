//! Account and playlist operations shared by the menus and batch commands.
//!
//! Operations report progress on the console they are given and return
//! their outcome; callers decide how to present failures.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tracing::info;
use xf_backend::{DebugSink, ProbeEvent, ProbeFailure, XtreamClient, CLIENT_TAG};
use xf_protocol::{Channel, PlaylistEvent, ServerRecord};

use crate::config::Config;
use crate::console::Console;
use crate::debug_store::DebugStore;
use crate::error::{CoreError, Result};
use crate::m3u::{self, FilterField};
use crate::paths::DataDir;
use crate::playlists::{file_stem, filtered_stem, json_name_for_m3u_stem, PlaylistStore};
use crate::progress::ProgressBar;
use crate::store::{epoch_secs, ServerStore};

/// Result of a `player_api` refresh. Both cases are persisted.
#[derive(Debug)]
pub enum RefreshOutcome {
    Refreshed(ServerRecord),
    Unreachable(ProbeFailure),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub ok: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistFetch {
    pub m3u_path: PathBuf,
    /// Absent when the playlist held no channels.
    pub json_path: Option<PathBuf>,
    pub channels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPlaylist {
    pub json_path: PathBuf,
    pub channels: usize,
}

pub struct App {
    data: DataDir,
    store: ServerStore,
    playlists: PlaylistStore,
    debug: Arc<DebugStore>,
    client: XtreamClient,
}

impl App {
    pub fn new(config: &Config, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data = DataDir::new(data_dir);
        data.ensure()?;
        Ok(Self {
            store: ServerStore::new(data.clone()),
            playlists: PlaylistStore::new(data.output_dir()),
            debug: Arc::new(DebugStore::new(
                data.debug_dir(),
                config.storage.debug_cap_bytes,
            )),
            client: XtreamClient::new(config.client_options())?,
            data,
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.data.root()
    }

    pub fn store(&self) -> &ServerStore {
        &self.store
    }

    pub fn playlists(&self) -> &PlaylistStore {
        &self.playlists
    }

    pub fn debug_store(&self) -> &DebugStore {
        &self.debug
    }

    /// Save a new account. Returns its index.
    pub fn add_server(
        &self,
        name: &str,
        server_url: &str,
        username: &str,
        password: &str,
    ) -> Result<usize> {
        if server_url.trim().is_empty() {
            return Err(CoreError::InvalidInput("server URL is empty".to_string()));
        }
        let record = ServerRecord::new(name, server_url, username, password, epoch_secs());
        let idx = self.store.add(record)?;
        info!(idx, "server added");
        Ok(idx)
    }

    /// Probe the account's panel and store what it reports.
    pub async fn refresh_server<W: Write>(
        &self,
        idx: usize,
        con: &mut Console<W>,
        verbose: bool,
    ) -> Result<RefreshOutcome> {
        let record = self.store.get(idx)?;
        let result = self.probe(&record, con, verbose).await;
        let now = epoch_secs();

        match result {
            Ok(success) => {
                let updated = self.store.update(idx, |r| {
                    r.apply_probe_success(&success.data, success.endpoint, success.client, now)
                })?;
                Ok(RefreshOutcome::Refreshed(updated))
            }
            Err(failure) => {
                self.store.update(idx, |r| r.apply_probe_failure(now))?;
                Ok(RefreshOutcome::Unreachable(failure))
            }
        }
    }

    /// Refresh every saved account in order, printing one status per account.
    pub async fn refresh_all<W: Write>(&self, con: &mut Console<W>) -> Result<RefreshSummary> {
        let mut servers = self.store.load()?;
        let mut summary = RefreshSummary::default();

        for (i, record) in servers.iter_mut().enumerate() {
            con.blank();
            con.line(format!(
                "{}. {} — {}",
                i + 1,
                record.display_name(),
                record.server_url
            ));
            let now = epoch_secs();
            match self.probe(record, con, false).await {
                Ok(success) => {
                    record.apply_probe_success(&success.data, success.endpoint, success.client, now);
                    con.ok("  OK");
                    summary.ok += 1;
                }
                Err(_) => {
                    record.apply_probe_failure(now);
                    con.error("  Failed.");
                    summary.failed += 1;
                }
            }
        }

        self.store.save(&servers)?;
        Ok(summary)
    }

    async fn probe<W: Write>(
        &self,
        record: &ServerRecord,
        con: &mut Console<W>,
        verbose: bool,
    ) -> std::result::Result<xf_backend::ApiSuccess, ProbeFailure> {
        self.client
            .fetch_player_api(
                &record.server_url,
                &record.username,
                &record.password,
                self.debug.as_ref(),
                |event| {
                    if !verbose {
                        return;
                    }
                    match event {
                        ProbeEvent::Trying(url) => {
                            let label = con.style.warn("Trying endpoint:");
                            con.line(format!("{label} {url}"));
                        }
                        ProbeEvent::Failed(attempt) => con.attempt_failed(attempt, CLIENT_TAG),
                    }
                },
            )
            .await
    }

    /// Download, store and parse the account's playlist.
    pub async fn fetch_playlist<W: Write>(
        &self,
        idx: usize,
        con: &mut Console<W>,
    ) -> Result<PlaylistFetch> {
        let record = self.store.get(idx)?;
        let sink: Arc<dyn DebugSink> = self.debug.clone();
        let mut events = Box::pin(self.client.fetch_playlist(
            &record.server_url,
            &record.username,
            &record.password,
            sink,
        ));

        let mut bar: Option<ProgressBar> = None;
        let mut completed = None;
        while let Some(event) = events.next().await {
            match event {
                PlaylistEvent::Trying { url } => {
                    let label = con.style.warn("Trying playlist endpoint:");
                    con.line(format!("{label} {url}"));
                }
                PlaylistEvent::Started { total, .. } => {
                    bar = Some(match total {
                        Some(n) => {
                            con.note(&format!("  Content-Length: {n} bytes. Starting download..."));
                            con.progress("  Downloading")
                        }
                        None => {
                            con.note("  Content-Length unknown. Starting download...");
                            con.progress_with_width("  Downloading", 20)
                        }
                    });
                }
                PlaylistEvent::Progress { downloaded, total } => {
                    if let Some(bar) = bar.as_mut() {
                        bar.update(con.out(), downloaded, total);
                    }
                }
                PlaylistEvent::Failed(attempt) => {
                    if let Some(mut bar) = bar.take() {
                        bar.finish(con.out());
                    }
                    con.attempt_failed(&attempt, CLIENT_TAG);
                }
                PlaylistEvent::Completed {
                    endpoint,
                    client,
                    text,
                } => {
                    if let Some(mut bar) = bar.take() {
                        bar.finish(con.out());
                    }
                    completed = Some((endpoint, client, text));
                }
                PlaylistEvent::Exhausted => {}
            }
        }

        let Some((endpoint, client, text)) = completed else {
            return Err(CoreError::PlaylistUnavailable);
        };

        let safe_name = record.safe_name();
        let m3u_path = self
            .playlists
            .save_m3u(&safe_name, &record.username, &text)?;
        let channels = parse_with_bar(&text, con);
        let json_path = if channels.is_empty() {
            None
        } else {
            let path = self.playlists.json_path(&safe_name, &record.username);
            save_json_with_bar(&self.playlists, &path, &channels, con)?;
            Some(path)
        };

        let now = epoch_secs();
        self.store
            .update(idx, |r| r.apply_playlist_success(endpoint, client, now))?;
        info!(idx, channels = channels.len(), "playlist stored");

        Ok(PlaylistFetch {
            m3u_path,
            json_path,
            channels: channels.len(),
        })
    }

    /// Parse a stored `.m3u` into its JSON channel list.
    pub fn parse_m3u_file<W: Write>(
        &self,
        name: &str,
        con: &mut Console<W>,
    ) -> Result<ParsedPlaylist> {
        let path = self.playlists.existing(name)?;
        let bytes = fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes);
        let channels = parse_with_bar(&text, con);

        let json_path = self
            .playlists
            .path(&json_name_for_m3u_stem(file_stem(name)));
        save_json_with_bar(&self.playlists, &json_path, &channels, con)?;
        Ok(ParsedPlaylist {
            json_path,
            channels: channels.len(),
        })
    }

    /// Channels from a stored JSON list.
    pub fn load_channels(&self, name: &str) -> Result<Vec<Channel>> {
        let path = self.playlists.existing(name)?;
        self.playlists.load_json(&path)
    }

    /// Channels of a stored JSON list that match `query`.
    pub fn filter_channels(&self, query: &FilterQuery) -> Result<Vec<Channel>> {
        let channels = self.load_channels(&query.json_name)?;
        Ok(m3u::filter(&channels, &query.field, &query.keyword))
    }

    /// Write `channels` as `{stem}.m3u` and `{stem}.json`. Returns both paths.
    pub fn export_channels<W: Write>(
        &self,
        channels: &[Channel],
        stem: &str,
        con: &mut Console<W>,
    ) -> Result<(PathBuf, PathBuf)> {
        let m3u_path = self.playlists.path(&format!("{stem}.m3u"));
        let mut bar = con.progress("  Building M3U");
        self.playlists.write_m3u(&m3u_path, channels, |done, total| {
            bar.update(con.out(), done as u64, Some(total as u64))
        })?;
        bar.finish(con.out());

        let json_path = self.playlists.path(&format!("{stem}.json"));
        save_json_with_bar(&self.playlists, &json_path, channels, con)?;
        info!(stem, channels = channels.len(), "filtered playlist exported");
        Ok((m3u_path, json_path))
    }
}

/// A keyword filter over one stored JSON channel list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub json_name: String,
    pub field: FilterField,
    pub keyword: String,
}

impl FilterQuery {
    /// A blank `field` means `title`.
    pub fn new(json_name: &str, field: &str, keyword: &str) -> Self {
        Self {
            json_name: json_name.to_string(),
            field: FilterField::parse(field),
            keyword: keyword.trim().to_string(),
        }
    }

    /// `{json stem}_{field}-{keyword}_filtered`
    pub fn default_stem(&self) -> String {
        filtered_stem(file_stem(&self.json_name), self.field.name(), &self.keyword)
    }

    /// The requested output stem, or the default when blank.
    pub fn output_stem(&self, requested: Option<&str>) -> Result<String> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) if s.contains(['/', '\\']) => Err(CoreError::InvalidInput(format!(
                "output name must not contain a path: {s}"
            ))),
            Some(s) => Ok(s.to_string()),
            None => Ok(self.default_stem()),
        }
    }
}

fn parse_with_bar<W: Write>(text: &str, con: &mut Console<W>) -> Vec<Channel> {
    let mut bar = con.progress_with_width("  Parsing lines", 30);
    let channels = m3u::parse_with_progress(text, |done, total| {
        if total > 0 {
            bar.update(con.out(), done as u64, Some(total as u64));
        }
    });
    bar.finish(con.out());
    con.ok(&format!("  Parsed {} channels.", channels.len()));
    channels
}

fn save_json_with_bar<W: Write>(
    playlists: &PlaylistStore,
    path: &Path,
    channels: &[Channel],
    con: &mut Console<W>,
) -> Result<()> {
    let mut bar = con.progress("  Saving JSON");
    playlists.save_json(path, channels, |done, total| {
        bar.update(con.out(), done as u64, Some(total as u64))
    })?;
    bar.finish(con.out());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_field_filters_by_title() {
        let q = FilterQuery::new("p_u_playlist.json", "  ", " news ");
        assert_eq!(q.field, FilterField::Title);
        assert_eq!(q.keyword, "news");
        assert_eq!(q.default_stem(), "p_u_playlist_title-news_filtered");
    }

    #[test]
    fn output_stem_choice() {
        let q = FilterQuery::new("a.json", "group", "");
        assert_eq!(q.output_stem(None).unwrap(), "a_group-all_filtered");
        assert_eq!(q.output_stem(Some("  ")).unwrap(), "a_group-all_filtered");
        assert_eq!(q.output_stem(Some(" mine ")).unwrap(), "mine");
        assert!(matches!(
            q.output_stem(Some("../escape")),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn add_server_requires_url() {
        let tmp = tempfile::tempdir().unwrap();
        let app = App::new(&Config::default(), tmp.path()).unwrap();
        assert!(matches!(
            app.add_server("x", "  ", "u", "p"),
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(app.add_server("", "example.com", "u", "p").unwrap(), 0);
        assert_eq!(app.store().get(0).unwrap().name, "example.com");
    }
}
