use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use simplelog::{Config, LevelFilter, WriteLogger};

use folio::app::{run_app, App};
use folio::event_source::TerminalEventSource;
use folio::panic_handler;
use folio::session::JsonSessionStore;
use folio::settings::{sessions_path, Settings};

#[derive(Parser, Debug)]
#[command(name = "folio", about = "A terminal document reader", version)]
struct Cli {
    /// Document to open (.pdf, .epub, .docx, or plain text)
    path: PathBuf,

    /// Log level for folio.log
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Config file override
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page to open at, overriding the remembered position
    #[arg(long)]
    page: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(cli.log_level, Config::default(), File::create("folio.log")?)?;
    info!("Starting folio");

    panic_handler::initialize_panic_handler();

    let settings = Settings::load(cli.config.as_deref());
    let store = JsonSessionStore::load_or_ephemeral(sessions_path().as_deref());

    let mut app = App::open(&cli.path, settings, store)?;
    if let Some(page) = cli.page {
        app.go_to_page_now(page);
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let mut events = TerminalEventSource;
    let res = run_app(&mut terminal, &mut app, &mut events);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down folio");
    Ok(())
}
