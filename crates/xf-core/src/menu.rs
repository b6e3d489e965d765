//! Interactive menus.
//!
//! Every screen reads its answers through a [`Prompter`], so whole sessions
//! can be replayed in tests. Running out of input ends the session cleanly.

use std::io::{self, Write};
use std::time::Duration;

use tokio::runtime::Handle;
use xf_protocol::ServerRecord;

use crate::app::{App, FilterQuery, RefreshOutcome};
use crate::console::Console;
use crate::error::{CoreError, Result};
use crate::prompt::Prompter;
use crate::style::{format_last_check, format_timestamp};

const PAUSE: &str = "Press ENTER ...";

enum Flow {
    Continue,
    Exit,
}

pub struct Menu<'a, P: Prompter, W: Write> {
    app: &'a App,
    prompter: P,
    con: Console<W>,
    rt: Handle,
}

impl<'a, P: Prompter, W: Write> Menu<'a, P, W> {
    pub fn new(app: &'a App, prompter: P, con: Console<W>, rt: Handle) -> Self {
        Self {
            app,
            prompter,
            con,
            rt,
        }
    }

    pub fn into_parts(self) -> (P, Console<W>) {
        (self.prompter, self.con)
    }

    /// Run the main menu until the user exits or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let step = self.main_screen();
            match self.report(step) {
                Ok(Some(Flow::Exit)) => return Ok(()),
                Ok(_) => {}
                Err(e) if is_end_of_input(&e) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Print a failed action and carry on. End of input is passed through.
    fn report<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_end_of_input(&e) => Err(e),
            Err(e) => {
                self.con.error(&format!("❌ {e}"));
                self.pause()?;
                Ok(None)
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        Ok(self.prompter.read_line(prompt)?.trim().to_string())
    }

    fn pause(&mut self) -> Result<()> {
        self.prompter.read_line(PAUSE)?;
        Ok(())
    }

    fn main_screen(&mut self) -> Result<Flow> {
        self.con.clear();
        self.con.title("╔════════════════════════════════════════╗");
        self.con.title("║      Xfitcher PRO - Xtream Manager     ║");
        self.con.title("╚════════════════════════════════════════╝");
        self.con.hr();
        for (key, label) in [
            ("1", "Add New Server"),
            ("2", "View Saved Servers"),
            ("3", "Refresh Server Info (single)"),
            ("4", "Fetch Playlist for a Server"),
            ("5", "Refresh All Servers"),
            ("6", "View Debug Files"),
            ("7", "Manage Playlists (parse/search/create)"),
            ("8", "Exit"),
        ] {
            let key = self.con.style.ok(&format!("[{key}]"));
            self.con.line(format!("{key} {label}"));
        }
        self.con.hr();

        match self.ask("Select option: ")?.as_str() {
            "1" => self.add_server()?,
            "2" => self.view_servers()?,
            "3" => {
                if let Some(idx) = self.select_server("refresh")? {
                    self.refresh_screen(idx)?;
                }
            }
            "4" => {
                if let Some(idx) = self.select_server("fetch playlist for")? {
                    self.fetch_screen(idx)?;
                }
            }
            "5" => self.refresh_all_screen()?,
            "6" => {
                self.debug_screen()?;
                self.pause()?;
            }
            "7" => self.playlist_manager()?,
            "8" => {
                self.con.ok("Goodbye 👋");
                return Ok(Flow::Exit);
            }
            _ => {
                self.con.error("Invalid choice.");
                if self.con.is_interactive() {
                    std::thread::sleep(Duration::from_secs(1));
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// List servers and read a 1-based choice. `None` after "Wrong Input".
    fn select_server(&mut self, purpose: &str) -> Result<Option<usize>> {
        let servers = self.app.store().load()?;
        if servers.is_empty() {
            self.con.error("⚠️ No Saved File");
            return Ok(None);
        }
        for (i, s) in servers.iter().enumerate() {
            let name = self.con.style.warn(s.display_name());
            self.con.line(format!(
                " {}. {name} — status: {} — last_check: {}",
                i + 1,
                s.status(),
                format_last_check(s.last_check)
            ));
        }

        let answer = self.ask(&format!("\n👉 {purpose} Select Server Id: "))?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=servers.len()).contains(&n) => Ok(Some(n - 1)),
            _ => {
                self.con.error("⚠️ Wrong Input!");
                Ok(None)
            }
        }
    }

    fn add_server(&mut self) -> Result<()> {
        self.con.clear();
        self.con.title("➕ Add a new Server");
        let name = self.ask("Name (label): ")?;
        let url = self.ask("Server URL (e.g., example.com or http://example.com:8080): ")?;
        let username = self.ask("Username: ")?;
        let password = self.prompter.read_secret("Password (hidden): ")?;
        self.app
            .add_server(&name, &url, &username, password.trim())?;
        self.con.ok("✅ Server has been Saved");
        self.pause()
    }

    fn view_servers(&mut self) -> Result<()> {
        self.con.clear();
        self.con.title("📁 Saved Servers");
        let servers = self.app.store().load()?;
        if servers.is_empty() {
            self.con.warn("No servers saved yet.");
            return self.pause();
        }
        for (i, s) in servers.iter().enumerate() {
            let name = self.con.style.warn(s.display_name());
            self.con
                .line(format!("{}. {name} — {}", i + 1, s.server_url));
            self.con.line(format!(
                "    status: {}    last_check: {}",
                s.status(),
                format_last_check(s.last_check)
            ));
        }
        self.con.hr();
        self.con
            .line("Options: [v]iew details  [e]dit  [d]elete  [b]ack");

        match self.ask("Choose: ")?.to_lowercase().as_str() {
            "v" => {
                if let Some(idx) = self.select_server("view")? {
                    self.details_screen(idx)?;
                }
            }
            "e" => {
                if let Some(idx) = self.select_server("edit")? {
                    self.edit_screen(idx)?;
                }
            }
            "d" => {
                if let Some(idx) = self.select_server("delete")? {
                    self.delete_screen(idx)?;
                }
            }
            _ => {}
        }
        self.pause()
    }

    fn details_screen(&mut self, idx: usize) -> Result<()> {
        let s = self.app.store().get(idx)?;
        self.con.clear();
        self.con.title(&format!("🔎 Details — {}", s.display_name()));
        self.con.line(format!("URL: {}", s.server_url));
        self.con.line(format!("Username: {}", s.username));
        self.con
            .line(format!("Created: {}", format_timestamp(s.created_at)));
        self.con
            .line(format!("Last check: {}", format_last_check(s.last_check)));
        if let Some(endpoint) = &s.last_endpoint {
            self.con.line(format!(
                "Last endpoint used: {endpoint} (client: {})",
                s.last_client.as_deref().unwrap_or("-")
            ));
        }
        self.con.hr();
        self.print_account_info(&s);
        self.con.hr();
        self.con
            .line("Actions: [r]efresh info   [p]laylist fetch   [d]ebug view   [b]ack");

        match self.ask("choose: ")?.to_lowercase().as_str() {
            "r" => self.refresh_screen(idx),
            "p" => self.fetch_screen(idx),
            "d" => self.debug_screen(),
            _ => Ok(()),
        }
    }

    fn print_account_info(&mut self, s: &ServerRecord) {
        let field = |key: &str| s.user_field(key).unwrap_or_else(|| "None".to_string());

        if s.user_info.is_empty() {
            self.con.warn("No user_info fetched yet.");
        } else {
            self.con.ok("User Info:");
            self.con.line(format!("  username: {}", field("username")));
            self.con.line(format!("  status: {}", field("status")));
            match (s.expiry(), s.user_field("exp_date")) {
                (Some(ts), _) => self.con.line(format!("  expire: {}", format_timestamp(ts))),
                (None, Some(raw)) if !raw.is_empty() => {
                    self.con.line(format!("  expire: {raw}"))
                }
                _ => {}
            }
            self.con
                .line(format!("  active_cons: {}", field("active_cons")));
            self.con
                .line(format!("  max_connections: {}", field("max_connections")));
            self.con.blank();
        }

        if s.server_info.is_empty() {
            self.con.warn("No server_info fetched yet.");
        } else {
            self.con.ok("Server Info:");
            for (key, value) in &s.server_info {
                let value = match value {
                    serde_json::Value::String(v) => v.clone(),
                    other => other.to_string(),
                };
                self.con.line(format!("  {key}: {value}"));
            }
        }
    }

    fn edit_screen(&mut self, idx: usize) -> Result<()> {
        let s = self.app.store().get(idx)?;
        self.con.clear();
        self.con.title(&format!("✏️ Edit — {}", s.display_name()));

        let name = self.ask(&format!("Name [{}]: ", s.name))?;
        let url = self.ask(&format!("Server URL [{}]: ", s.server_url))?;
        let username = self.ask(&format!("Username [{}]: ", s.username))?;
        let password = if self.ask("Change password? (y/N): ")?.eq_ignore_ascii_case("y") {
            self.prompter.read_secret("New Password: ")?.trim().to_string()
        } else {
            String::new()
        };

        self.app.store().update(idx, |r| {
            if !name.is_empty() {
                r.name = name;
            }
            if !url.is_empty() {
                r.server_url = url;
            }
            if !username.is_empty() {
                r.username = username;
            }
            if !password.is_empty() {
                r.password = password;
            }
        })?;
        self.con.ok("✅ Updated.");
        Ok(())
    }

    fn delete_screen(&mut self, idx: usize) -> Result<()> {
        let s = self.app.store().get(idx)?;
        let prompt = self
            .con
            .style
            .error(&format!("Are you sure delete '{}'? (y/N): ", s.display_name()));
        if self.ask(&prompt)?.eq_ignore_ascii_case("y") {
            self.app.store().remove(idx)?;
            self.con.ok("Deleted.");
        } else {
            self.con.line("Cancelled.");
        }
        Ok(())
    }

    fn refresh_screen(&mut self, idx: usize) -> Result<()> {
        let s = self.app.store().get(idx)?;
        self.con.clear();
        self.con
            .title(&format!("🔁 Refreshing — {}", s.display_name()));

        let outcome = self
            .rt
            .block_on(self.app.refresh_server(idx, &mut self.con, true))?;
        match outcome {
            RefreshOutcome::Refreshed(_) => self.con.ok("✅ Refreshed & saved."),
            RefreshOutcome::Unreachable(_) => self
                .con
                .error("❌ No valid player_api response found. See debug files."),
        }
        self.pause()
    }

    fn fetch_screen(&mut self, idx: usize) -> Result<()> {
        let s = self.app.store().get(idx)?;
        self.con.clear();
        self.con
            .title(&format!("🎵 Fetch Playlist — {}", s.display_name()));

        match self
            .rt
            .block_on(self.app.fetch_playlist(idx, &mut self.con))
        {
            Ok(fetch) => {
                self.con
                    .ok(&format!("✅ Playlist saved: {}", fetch.m3u_path.display()));
                if let Some(json_path) = fetch.json_path {
                    self.con
                        .ok(&format!("✅ Parsed JSON saved: {}", json_path.display()));
                    self.con
                        .note(&format!("Parsed {} channels.", fetch.channels));
                }
            }
            Err(CoreError::PlaylistUnavailable) => self
                .con
                .error("❌ Failed to fetch a valid M3U playlist. Check debug files."),
            Err(e) => return Err(e),
        }
        self.pause()
    }

    fn refresh_all_screen(&mut self) -> Result<()> {
        if self.app.store().load()?.is_empty() {
            self.con.warn("No servers to refresh.");
            return self.pause();
        }
        self.con.clear();
        self.con.title("🔄 Refreshing all saved servers...");
        let summary = self
            .rt
            .block_on(self.app.refresh_all(&mut self.con))?;
        self.con.blank();
        self.con.ok(&format!(
            "✅ All done. {} OK, {} failed.",
            summary.ok, summary.failed
        ));
        self.pause()
    }

    fn debug_screen(&mut self) -> Result<()> {
        let files = self.app.debug_store().list()?;
        if files.is_empty() {
            self.con.warn("No debug files.");
            return Ok(());
        }
        self.con.blank();
        self.con.note("Debug files:");
        self.con.blank();
        for (i, name) in files.iter().enumerate() {
            self.con.line(format!(" {}. {name}", i + 1));
        }

        let answer = self.ask("\nOpen file number (0 to cancel): ")?;
        let name = match answer.parse::<usize>() {
            Ok(0) => return Ok(()),
            Ok(n) if n <= files.len() => &files[n - 1],
            _ => {
                self.con.error("Invalid choice.");
                return Ok(());
            }
        };
        let content = self.app.debug_store().read(name)?;
        self.con.clear();
        self.con.title(&format!("--- DEBUG: {name} ---"));
        self.con.line(content);
        self.con.blank();
        self.con.note("--- end ---");
        Ok(())
    }

    fn playlist_manager(&mut self) -> Result<()> {
        loop {
            self.con.clear();
            self.con.title("🎛️ Playlist Manager");
            let (m3us, jsons) = self.app.playlists().list()?;
            self.print_file_list("M3U files:", &m3us);
            self.con.blank();
            self.print_file_list("Parsed JSON playlists:", &jsons);
            self.con.hr();
            self.con.line("Options:");
            self.con.line(" [1] Parse an existing M3U -> JSON");
            self.con
                .line(" [2] Search / Filter a parsed JSON and create new M3U");
            self.con
                .line(" [3] List parsed JSON and view sample entries");
            self.con.line(" [4] Back");

            let step = match self.ask("Choose: ")?.as_str() {
                "1" => self.parse_action(&m3us),
                "2" => self.filter_action(&jsons),
                "3" => self.samples_action(&jsons),
                "4" => return Ok(()),
                _ => {
                    self.con.error("Invalid choice.");
                    Ok(())
                }
            };
            self.report(step)?;
        }
    }

    fn print_file_list(&mut self, heading: &str, files: &[String]) {
        self.con.ok(heading);
        if files.is_empty() {
            self.con.line("  (none)");
        }
        for (i, name) in files.iter().enumerate() {
            self.con.line(format!(" {}. {name}", i + 1));
        }
    }

    fn select_file(&mut self, kind: &str, files: &[String]) -> Result<Option<String>> {
        let answer = self.ask(&format!(
            "Select {kind} file number (1-{}): ",
            files.len()
        ))?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=files.len()).contains(&n) => Ok(Some(files[n - 1].clone())),
            _ => {
                self.con.error("Invalid choice.");
                Ok(None)
            }
        }
    }

    fn parse_action(&mut self, m3us: &[String]) -> Result<()> {
        if m3us.is_empty() {
            self.con.warn("No M3U files to parse.");
            return self.pause();
        }
        if let Some(name) = self.select_file("M3U", m3us)? {
            let parsed = self.app.parse_m3u_file(&name, &mut self.con)?;
            self.con.ok(&format!(
                "Saved JSON: {} ({} channels)",
                parsed.json_path.display(),
                parsed.channels
            ));
        }
        self.pause()
    }

    fn filter_action(&mut self, jsons: &[String]) -> Result<()> {
        if jsons.is_empty() {
            self.con
                .warn("No parsed JSON files available. Parse an M3U first.");
            return self.pause();
        }
        let Some(name) = self.select_file("JSON", jsons)? else {
            return self.pause();
        };

        self.con.line(
            "Filter fields: [title] [group] [tvg-name] [tvg-id] (leave blank to skip)",
        );
        let field = self.ask("Field to filter by (e.g., title/group): ")?;
        let keyword = self.ask("Keyword (substring, case-insensitive): ")?;
        let query = FilterQuery::new(&name, &field, &keyword);

        let filtered = self.app.filter_channels(&query)?;
        self.con
            .note(&format!("Found {} matching channels.", filtered.len()));
        if filtered.is_empty() {
            return self.pause();
        }

        let requested = self.ask("Output M3U filename (no extension, press ENTER for auto): ")?;
        let stem = query.output_stem(Some(&requested))?;
        let (m3u_path, json_path) = self.app.export_channels(&filtered, &stem, &mut self.con)?;
        self.con
            .ok(&format!("✅ Created filtered M3U: {}", m3u_path.display()));
        self.con
            .ok(&format!("✅ Also saved JSON: {}", json_path.display()));
        self.pause()
    }

    fn samples_action(&mut self, jsons: &[String]) -> Result<()> {
        if jsons.is_empty() {
            self.con.warn("No parsed JSON files available.");
            return self.pause();
        }
        let Some(name) = self.select_file("JSON", jsons)? else {
            return self.pause();
        };

        let channels = self.app.load_channels(&name)?;
        self.con
            .note(&format!("Loaded {} channels from {name}", channels.len()));
        let answer = self.ask("How many sample entries to show? (0 to cancel): ")?;
        let count = if answer.is_empty() {
            0
        } else {
            answer
                .parse::<usize>()
                .map_err(|_| CoreError::InvalidInput(format!("not a number: {answer}")))?
        };

        for (i, channel) in channels.iter().take(count).enumerate() {
            self.con.blank();
            self.con
                .line(format!("[{}] Title: {}", i + 1, channel.title));
            self.con.line(format!("     URL: {}", channel.url));
            self.con.line(format!("     Group: {}", channel.group()));
            self.con
                .line(format!("     tvg-name: {}", channel.attr("tvg-name")));
        }
        self.pause()
    }
}

fn is_end_of_input(e: &CoreError) -> bool {
    matches!(e, CoreError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof)
}
