//! Interactive sessions replayed through a scripted prompter.

use tokio::runtime::Runtime;
use xf_backend::{MockRoute, MockServer};
use xf_core::app::App;
use xf_core::config::Config;
use xf_core::console::Console;
use xf_core::menu::Menu;
use xf_core::prompt::ScriptedPrompter;
use xf_core::style::Style;

struct Session {
    _tmp: tempfile::TempDir,
    rt: Runtime,
    app: App,
}

impl Session {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let app = App::new(&Config::default(), tmp.path()).unwrap();
        Self {
            _tmp: tmp,
            rt: Runtime::new().unwrap(),
            app,
        }
    }

    /// Run the menu over `answers`. Returns the console text and the prompter.
    fn run(&self, answers: &[&str]) -> (String, ScriptedPrompter) {
        let con = Console::new(Vec::new(), Style::disabled(), false, 40);
        let prompter = ScriptedPrompter::new(answers.iter().copied());
        let mut menu = Menu::new(&self.app, prompter, con, self.rt.handle().clone());
        menu.run().unwrap();
        let (prompter, con) = menu.into_parts();
        (String::from_utf8(con.into_inner()).unwrap(), prompter)
    }
}

#[test]
fn add_server_then_exit() {
    let s = Session::new();
    let (out, prompter) = s.run(&["1", "Panel", "example.com", "alice", "pw", "", "8"]);

    assert!(out.contains("✅ Server has been Saved"));
    assert!(out.contains("Goodbye"));
    assert_eq!(prompter.remaining(), 0);

    let saved = s.app.store().get(0).unwrap();
    assert_eq!(saved.name, "Panel");
    assert_eq!(saved.server_url, "example.com");
    assert_eq!(saved.password, "pw");
}

#[test]
fn end_of_input_leaves_cleanly() {
    let s = Session::new();
    let (out, _) = s.run(&[]);
    assert!(out.contains("Xfitcher PRO - Xtream Manager"));
}

#[test]
fn unknown_option_is_rejected() {
    let s = Session::new();
    let (out, _) = s.run(&["9", "8"]);
    assert!(out.contains("Invalid choice."));
}

#[test]
fn wrong_server_number_does_nothing() {
    let s = Session::new();
    s.app.add_server("Panel", "example.com", "alice", "pw").unwrap();
    let (out, _) = s.run(&["3", "5", "8"]);

    assert!(out.contains("⚠️ Wrong Input!"));
    assert!(!out.contains("Refreshing"));
    assert!(s.app.store().get(0).unwrap().last_check.is_none());
}

#[test]
fn selection_without_servers() {
    let s = Session::new();
    let (out, _) = s.run(&["4", "8"]);
    assert!(out.contains("⚠️ No Saved File"));
}

#[test]
fn edit_keeps_blank_fields() {
    let s = Session::new();
    s.app.add_server("Panel", "example.com", "alice", "pw").unwrap();
    let (out, prompter) = s.run(&[
        "2", "e", "1", "", "new.example", "", "y", "", "", "8",
    ]);

    assert!(out.contains("✅ Updated."));
    assert!(prompter.asked.contains(&"Name [Panel]: ".to_string()));
    let saved = s.app.store().get(0).unwrap();
    assert_eq!(saved.name, "Panel");
    assert_eq!(saved.server_url, "new.example");
    assert_eq!(saved.username, "alice");
    assert_eq!(saved.password, "pw");
}

#[test]
fn edit_changes_password_only_when_confirmed() {
    let s = Session::new();
    s.app.add_server("Panel", "example.com", "alice", "pw").unwrap();
    s.run(&["2", "e", "1", "", "", "", "n", "", "8"]);
    assert_eq!(s.app.store().get(0).unwrap().password, "pw");

    s.run(&["2", "e", "1", "", "", "", "Y", "fresh", "", "8"]);
    assert_eq!(s.app.store().get(0).unwrap().password, "fresh");
}

#[test]
fn delete_requires_confirmation() {
    let s = Session::new();
    s.app.add_server("Panel", "example.com", "alice", "pw").unwrap();

    let (out, _) = s.run(&["2", "d", "1", "n", "", "8"]);
    assert!(out.contains("Cancelled."));
    assert_eq!(s.app.store().load().unwrap().len(), 1);

    let (out, _) = s.run(&["2", "d", "1", "y", "", "8"]);
    assert!(out.contains("Deleted."));
    assert!(s.app.store().load().unwrap().is_empty());
}

#[test]
fn details_screen_shows_unfetched_account() {
    let s = Session::new();
    s.app.add_server("Panel", "example.com", "alice", "pw").unwrap();
    let (out, _) = s.run(&["2", "v", "1", "b", "", "8"]);

    assert!(out.contains("🔎 Details — Panel"));
    assert!(out.contains("Last check: Never"));
    assert!(out.contains("No user_info fetched yet."));
    assert!(out.contains("No server_info fetched yet."));
}

#[test]
fn refresh_from_menu_against_panel() {
    let s = Session::new();
    let server = s
        .rt
        .block_on(MockServer::start(vec![(
            "/player_api.php",
            MockRoute::json(r#"{"user_info": {"status": "Active", "max_connections": "2"}, "server_info": {"timezone": "UTC"}}"#),
        )]))
        .unwrap();
    s.app.add_server("Panel", &server.host(), "alice", "pw").unwrap();

    let (out, _) = s.run(&["3", "1", "", "2", "v", "1", "b", "", "8"]);
    assert!(out.contains("✅ Refreshed & saved."));
    assert!(out.contains("status: Active"));
    assert!(out.contains("  max_connections: 2"));
    assert!(out.contains("  timezone: UTC"));
}

#[test]
fn debug_viewer_opens_a_dump() {
    let s = Session::new();
    let name = s
        .app
        .debug_store()
        .write("playlist_nonm3u", "http://h/get.php", "<html>")
        .unwrap();
    let (out, _) = s.run(&["6", "1", "", "8"]);

    let file = name.file_name().unwrap().to_str().unwrap();
    assert!(out.contains(&format!("--- DEBUG: {file} ---")));
    assert!(out.contains("Endpoint: http://h/get.php"));
    assert!(out.contains("--- end ---"));
}

#[test]
fn playlist_manager_filters_into_new_files() {
    let s = Session::new();
    s.app
        .playlists()
        .save_m3u(
            "Panel",
            "alice",
            "#EXTM3U\n#EXTINF:-1 group-title=\"News\",One\nhttp://h/1\n#EXTINF:-1 group-title=\"Kids\",Two\nhttp://h/2\n",
        )
        .unwrap();

    let (out, _) = s.run(&[
        "7", "1", "1", "", // parse the M3U
        "2", "1", "group", "news", "", "", // filter with an automatic name
        "3", "1", "5", "", // samples
        "4", "8",
    ]);

    assert!(out.contains("(2 channels)"));
    assert!(out.contains("Found 1 matching channels."));
    assert!(out.contains("Panel_alice_playlist_group-news_filtered.m3u"));
    assert!(out.contains("[1] Title: One"));
    assert!(out.contains("     Group: News"));

    let (m3us, jsons) = s.app.playlists().list().unwrap();
    assert_eq!(
        m3us,
        vec![
            "Panel_alice_playlist.m3u",
            "Panel_alice_playlist_group-news_filtered.m3u"
        ]
    );
    assert_eq!(jsons.len(), 2);
}
