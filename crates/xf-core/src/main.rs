use std::io::{self, IsTerminal};

use crossterm::terminal;
use xf_core::app::App;
use xf_core::batch::{run_batch, BatchCommand, USAGE};
use xf_core::config::Config;
use xf_core::console::Console;
use xf_core::logging::init_tracing;
use xf_core::menu::Menu;
use xf_core::prompt::TerminalPrompter;
use xf_core::style::Style;

fn print_help() {
    println!("xfitcher — Xtream account and playlist manager");
    println!();
    println!("Usage:");
    println!("  xfitcher [options]              Interactive menu");
    println!("  xfitcher [options] <command>    Run one command and exit");
    println!();
    println!("{USAGE}");
    println!();
    println!("Options:");
    println!("  --data-dir <path>  Data directory (default: xtream_data32)");
    println!("  --version          Print version");
    println!("  --help             Print this help");
}

fn main() {
    // Restore the terminal if a panic hits while reading a hidden password
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = terminal::disable_raw_mode();
        default_hook(info);
    }));

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("xfitcher {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let data_dir_override = match take_flag_value(&mut args, "--data-dir") {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let config = Config::load_or_default();
    init_tracing(&config.log.filter);

    let command = if args.is_empty() {
        None
    } else {
        match BatchCommand::parse(&args) {
            Ok(c) => Some(c),
            Err(e) => {
                eprintln!("error: {e}");
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        }
    };

    let app = match App::new(&config, config.resolve_data_dir(data_dir_override.as_deref())) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    let interactive = io::stdout().is_terminal();
    let console = Console::new(
        io::stdout(),
        Style::with_config(config.ui.color && interactive),
        interactive,
        config.ui.progress_width,
    );

    // Batch mode
    if let Some(command) = command {
        let mut console = console;
        let code = match runtime.block_on(run_batch(&app, command, &mut console)) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        };
        std::process::exit(code);
    }

    // Menu mode
    let mut menu = Menu::new(&app, TerminalPrompter, console, runtime.handle().clone());
    if let Err(e) = menu.run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Remove `flag <value>` from `args`, returning the value.
fn take_flag_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, String> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        return Err(format!("{flag} needs a value"));
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}
