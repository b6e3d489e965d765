//! Non-interactive subcommands.
//!
//! Each command runs one operation from the menus, prints plain progress
//! and results, and maps the outcome to an exit code: 0 on success, 1 when
//! the operation could not do its job (unreachable panel, no playlist).

use std::io::Write;

use crate::app::{App, FilterQuery, RefreshOutcome};
use crate::console::Console;
use crate::error::{CoreError, Result};
use crate::style::{format_last_check, format_timestamp};

const DEFAULT_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    One(usize),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCommand {
    List,
    Refresh(RefreshTarget),
    Fetch(usize),
    Parse(String),
    Filter {
        file: String,
        field: String,
        keyword: String,
        out: Option<String>,
    },
    Samples {
        file: String,
        count: usize,
    },
    Debug(Option<String>),
}

pub const USAGE: &str = "\
Commands:
  list                                   List saved servers
  refresh <n> | --all                    Refresh account info
  fetch <n>                              Download and parse a server's playlist
  parse <file.m3u>                       Parse a stored M3U into JSON
  filter <file.json> <field> [keyword] [--out name]
                                         Export matching channels as M3U + JSON
  samples <file.json> [count]            Show the first channels of a JSON list
  debug [name]                           List debug dumps, or print one";

impl BatchCommand {
    /// Parse the words after the global flags. Server numbers are 1-based.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((command, rest)) = args.split_first() else {
            return Err(invalid("missing command"));
        };
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

        match (command.as_str(), rest.as_slice()) {
            ("list", []) => Ok(BatchCommand::List),
            ("refresh", ["--all"]) => Ok(BatchCommand::Refresh(RefreshTarget::All)),
            ("refresh", [n]) => Ok(BatchCommand::Refresh(RefreshTarget::One(server_index(n)?))),
            ("fetch", [n]) => Ok(BatchCommand::Fetch(server_index(n)?)),
            ("parse", [file]) => Ok(BatchCommand::Parse(file.to_string())),
            ("filter", [file, field, tail @ ..]) => parse_filter(file, field, tail),
            ("samples", [file]) => Ok(BatchCommand::Samples {
                file: file.to_string(),
                count: DEFAULT_SAMPLES,
            }),
            ("samples", [file, n]) => Ok(BatchCommand::Samples {
                file: file.to_string(),
                count: n
                    .parse()
                    .map_err(|_| invalid(&format!("not a number: {n}")))?,
            }),
            ("debug", []) => Ok(BatchCommand::Debug(None)),
            ("debug", [name]) => Ok(BatchCommand::Debug(Some(name.to_string()))),
            (
                "list" | "refresh" | "fetch" | "parse" | "filter" | "samples" | "debug",
                _,
            ) => Err(invalid(&format!("wrong arguments for '{command}'"))),
            _ => Err(invalid(&format!("unknown command '{command}'"))),
        }
    }
}

fn invalid(msg: &str) -> CoreError {
    CoreError::InvalidInput(msg.to_string())
}

fn server_index(arg: &str) -> Result<usize> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(invalid(&format!("server number must be 1 or more: {arg}"))),
    }
}

fn parse_filter(file: &str, field: &str, tail: &[&str]) -> Result<BatchCommand> {
    let mut keyword = String::new();
    let mut out = None;
    let mut words = tail.iter();
    while let Some(word) = words.next() {
        if *word == "--out" {
            let name = words.next().ok_or_else(|| invalid("--out needs a name"))?;
            out = Some(name.to_string());
        } else if keyword.is_empty() {
            keyword = word.to_string();
        } else {
            return Err(invalid(&format!("unexpected argument '{word}'")));
        }
    }
    Ok(BatchCommand::Filter {
        file: file.to_string(),
        field: field.to_string(),
        keyword,
        out,
    })
}

/// Run one command. `Err` is reserved for errors the caller reports.
pub async fn run_batch<W: Write>(
    app: &App,
    command: BatchCommand,
    con: &mut Console<W>,
) -> Result<i32> {
    match command {
        BatchCommand::List => {
            list_servers(app, con)?;
            Ok(0)
        }
        BatchCommand::Refresh(RefreshTarget::One(idx)) => {
            match app.refresh_server(idx, con, true).await? {
                RefreshOutcome::Refreshed(record) => {
                    con.ok(&format!("Refreshed {}: status {}", record.display_name(), record.status()));
                    Ok(0)
                }
                RefreshOutcome::Unreachable(failure) => {
                    con.error(&format!("No valid player_api response ({failure}). See debug files."));
                    Ok(1)
                }
            }
        }
        BatchCommand::Refresh(RefreshTarget::All) => {
            if app.store().load()?.is_empty() {
                con.warn("No servers to refresh.");
                return Ok(0);
            }
            let summary = app.refresh_all(con).await?;
            con.line(format!("{} OK, {} failed.", summary.ok, summary.failed));
            Ok(if summary.failed == 0 { 0 } else { 1 })
        }
        BatchCommand::Fetch(idx) => match app.fetch_playlist(idx, con).await {
            Ok(fetch) => {
                con.ok(&format!("Playlist saved: {}", fetch.m3u_path.display()));
                match fetch.json_path {
                    Some(path) => con.ok(&format!(
                        "Parsed JSON saved: {} ({} channels)",
                        path.display(),
                        fetch.channels
                    )),
                    None => con.warn("Playlist holds no channels."),
                }
                Ok(0)
            }
            Err(CoreError::PlaylistUnavailable) => {
                con.error("Failed to fetch a valid M3U playlist. Check debug files.");
                Ok(1)
            }
            Err(e) => Err(e),
        },
        BatchCommand::Parse(file) => {
            let parsed = app.parse_m3u_file(&file, con)?;
            con.ok(&format!(
                "Saved JSON: {} ({} channels)",
                parsed.json_path.display(),
                parsed.channels
            ));
            Ok(0)
        }
        BatchCommand::Filter {
            file,
            field,
            keyword,
            out,
        } => {
            let query = FilterQuery::new(&file, &field, &keyword);
            let stem = query.output_stem(out.as_deref())?;
            let filtered = app.filter_channels(&query)?;
            con.line(format!("Found {} matching channels.", filtered.len()));
            if filtered.is_empty() {
                return Ok(0);
            }
            let (m3u_path, json_path) = app.export_channels(&filtered, &stem, con)?;
            con.ok(&format!("Created filtered M3U: {}", m3u_path.display()));
            con.ok(&format!("Also saved JSON: {}", json_path.display()));
            Ok(0)
        }
        BatchCommand::Samples { file, count } => {
            let channels = app.load_channels(&file)?;
            con.line(format!("Loaded {} channels from {file}", channels.len()));
            for (i, channel) in channels.iter().take(count).enumerate() {
                con.line(format!("[{}] {}", i + 1, channel.title));
                con.line(format!("     URL: {}", channel.url));
                con.line(format!("     Group: {}", channel.group()));
            }
            Ok(0)
        }
        BatchCommand::Debug(None) => {
            let files = app.debug_store().list()?;
            if files.is_empty() {
                con.line("No debug files.");
            }
            for name in files {
                con.line(name);
            }
            Ok(0)
        }
        BatchCommand::Debug(Some(name)) => {
            let content = app
                .debug_store()
                .read(&name)
                .map_err(|_| CoreError::NoSuchFile(name.clone()))?;
            con.line(content);
            Ok(0)
        }
    }
}

fn list_servers<W: Write>(app: &App, con: &mut Console<W>) -> Result<()> {
    let servers = app.store().load()?;
    if servers.is_empty() {
        con.line("No servers saved yet.");
        return Ok(());
    }
    for (i, s) in servers.iter().enumerate() {
        con.line(format!("{}. {} — {}", i + 1, s.display_name(), s.server_url));
        let expires = s
            .expiry()
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        con.line(format!(
            "    status: {}    expires: {}    last_check: {}",
            s.status(),
            expires,
            format_last_check(s.last_check)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn parses_server_commands() {
        assert_eq!(BatchCommand::parse(&args(&["list"])).unwrap(), BatchCommand::List);
        assert_eq!(
            BatchCommand::parse(&args(&["refresh", "2"])).unwrap(),
            BatchCommand::Refresh(RefreshTarget::One(1))
        );
        assert_eq!(
            BatchCommand::parse(&args(&["refresh", "--all"])).unwrap(),
            BatchCommand::Refresh(RefreshTarget::All)
        );
        assert_eq!(
            BatchCommand::parse(&args(&["fetch", "1"])).unwrap(),
            BatchCommand::Fetch(0)
        );
    }

    #[test]
    fn server_numbers_are_one_based() {
        assert!(BatchCommand::parse(&args(&["fetch", "0"])).is_err());
        assert!(BatchCommand::parse(&args(&["refresh", "x"])).is_err());
    }

    #[test]
    fn parses_filter_variants() {
        assert_eq!(
            BatchCommand::parse(&args(&["filter", "a.json", "group"])).unwrap(),
            BatchCommand::Filter {
                file: "a.json".into(),
                field: "group".into(),
                keyword: String::new(),
                out: None,
            }
        );
        assert_eq!(
            BatchCommand::parse(&args(&["filter", "a.json", "title", "news", "--out", "mine"]))
                .unwrap(),
            BatchCommand::Filter {
                file: "a.json".into(),
                field: "title".into(),
                keyword: "news".into(),
                out: Some("mine".into()),
            }
        );
        assert!(BatchCommand::parse(&args(&["filter", "a.json", "title", "--out"])).is_err());
        assert!(BatchCommand::parse(&args(&["filter", "a.json", "title", "a", "b"])).is_err());
    }

    #[test]
    fn parses_file_commands() {
        assert_eq!(
            BatchCommand::parse(&args(&["samples", "a.json"])).unwrap(),
            BatchCommand::Samples {
                file: "a.json".into(),
                count: DEFAULT_SAMPLES,
            }
        );
        assert_eq!(
            BatchCommand::parse(&args(&["debug", "x.txt"])).unwrap(),
            BatchCommand::Debug(Some("x.txt".into()))
        );
        assert_eq!(
            BatchCommand::parse(&args(&["parse", "p.m3u"])).unwrap(),
            BatchCommand::Parse("p.m3u".into())
        );
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        let err = BatchCommand::parse(&args(&["play", "1"])).unwrap_err();
        assert!(err.to_string().contains("unknown command 'play'"));
        let err = BatchCommand::parse(&args(&["list", "extra"])).unwrap_err();
        assert!(err.to_string().contains("wrong arguments for 'list'"));
        assert!(BatchCommand::parse(&[]).is_err());
    }
}
