// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

use cashback_tracker::{
    add_cashback, best_cashback_message, clear_cashbacks, confirmation_message, get_all_cashbacks,
    get_best_cashback, import_entries, init_logging, list_message, load_csv, open_database,
    parse_payload, CashbackEntry, Config, FormFields, HandlerOutcome, HostMessage, LocalHost,
    MainButtonStyle, RecordingBridge, WebApp, START_MESSAGE,
};

const USAGE: &str = "Usage:
  cashback init
  cashback start
  cashback form <user_id>
  cashback add <user_id> <bank> <category> <percent>
  cashback submit <user_id> <json>
  cashback preview <bank> <category> <percent>
  cashback best <user_id> <query>
  cashback list <user_id>
  cashback clear <user_id>
  cashback import <user_id> <csv>";

fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.log_level);

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] => run_ui_mode(&config, 0),
        ["form", user_id] => run_ui_mode(&config, parse_user_id(user_id)?),
        ["init"] => run_init(&config),
        ["start"] => {
            println!("{}\n\n📱 {}", START_MESSAGE, config.webapp_url);
            Ok(())
        }
        ["add", user_id, bank, category, percent] => {
            run_add(&config, parse_user_id(user_id)?, FormFields::new(*bank, *category, *percent))
        }
        ["submit", user_id, payload] => run_submit(&config, parse_user_id(user_id)?, payload),
        ["preview", bank, category, percent] => {
            run_preview(FormFields::new(*bank, *category, *percent));
            Ok(())
        }
        ["best", user_id, query] => {
            let conn = open(&config)?;
            let entries = get_best_cashback(&conn, parse_user_id(user_id)?, query)?;
            println!("{}", best_cashback_message(query, &entries));
            Ok(())
        }
        ["list", user_id] => {
            let conn = open(&config)?;
            let entries = get_all_cashbacks(&conn, parse_user_id(user_id)?)?;
            println!("{}", list_message(&entries));
            Ok(())
        }
        ["clear", user_id] => {
            let conn = open(&config)?;
            let deleted = clear_cashbacks(&conn, parse_user_id(user_id)?)?;
            println!("🗑  Removed {} cashbacks", deleted);
            Ok(())
        }
        ["import", user_id, csv_path] => run_import(&config, parse_user_id(user_id)?, Path::new(csv_path)),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn parse_user_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| anyhow!("Invalid user id: '{}'", raw))
}

fn open(config: &Config) -> Result<Connection> {
    open_database(&config.db_path)
}

fn run_init(config: &Config) -> Result<()> {
    println!("🔧 Setting up database...");
    open(config)?;
    println!("✓ Database initialized with WAL mode: {:?}", config.db_path);
    Ok(())
}

/// Fill the form and press send, with the bot on the other end
fn run_add(config: &Config, user_id: i64, form: FormFields) -> Result<()> {
    let conn = open(config)?;
    let webapp = WebApp::init(LocalHost::new(&conn, user_id), &MainButtonStyle::default());

    webapp.send_data(&form);

    let mut stored = false;
    for message in webapp.bridge().take_messages() {
        match message {
            HostMessage::Alert(text) => eprintln!("⚠️  {}", text),
            HostMessage::Rejected(text) => eprintln!("❌ {}", text),
            HostMessage::Reply(text) => {
                println!("{}", text);
                stored = true;
            }
        }
    }

    if !stored {
        std::process::exit(1);
    }
    Ok(())
}

/// Process a raw Mini App payload as the bot receives it
fn run_submit(config: &Config, user_id: i64, payload: &str) -> Result<()> {
    let submission = parse_payload(payload).context("Rejected web app data")?;
    let entry = CashbackEntry::from_submission(&submission).context("Rejected web app data")?;

    let conn = open(config)?;
    add_cashback(&conn, user_id, &entry)?;

    println!("{}", confirmation_message(&entry));
    Ok(())
}

fn run_preview(form: FormFields) {
    let webapp = WebApp::init(RecordingBridge::new(), &MainButtonStyle::default());

    match webapp.send_data(&form) {
        HandlerOutcome::Sent(payload) => println!("send_data: {}", payload),
        HandlerOutcome::Alerted(errors) => {
            for error in errors {
                println!("invalid: {}", error);
            }
        }
    }

    println!("\nBridge calls:");
    for call in webapp.bridge().calls() {
        println!("  {:?}", call);
    }
}

fn run_import(config: &Config, user_id: i64, csv_path: &Path) -> Result<()> {
    println!("📂 Loading CSV...");
    let entries = load_csv(csv_path)?;
    println!("✓ Loaded {} cashbacks from CSV", entries.len());

    let conn = open(config)?;
    let inserted = import_entries(&conn, user_id, &entries)?;
    println!("✓ Inserted: {} cashbacks", inserted);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config, user_id: i64) -> Result<()> {
    let conn = open(config)?;

    let host = LocalHost::new(&conn, user_id);
    let mut app = ui::App::new(host, MainButtonStyle::default())?;
    ui::run_ui(&mut app)?;

    println!("\n✅ Form closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config, _user_id: i64) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: cashback add <user_id> <bank> <category> <percent>");
    std::process::exit(1);
}
