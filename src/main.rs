use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use dashdeck::{App, AppConfig, AppEvent, Args, ConfigManager, ImportOptions, Theme, APP_NAME};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::Path;
use std::sync::mpsc::channel;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn import_options(args: &Args, config: &AppConfig) -> ImportOptions {
    let mut opts = ImportOptions::new();
    if let Some(format) = args.format {
        opts = opts.with_format(format);
    }
    if let Some(delimiter) = config.file_loading.delimiter {
        opts = opts.with_delimiter(delimiter);
    }
    if let Some(has_header) = config.file_loading.has_header {
        opts = opts.with_has_header(has_header);
    }
    opts
}

/// Log to a file only; anything written to the terminal would corrupt the UI.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match AppConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}. Using default configuration.", e);
            AppConfig::default()
        }
    };
    config.apply_cli(args);
    config.validate()?;
    Ok(config)
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: &AppConfig, theme: Theme) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(config, theme);
    render(&mut terminal, &mut app)?;
    if let Some(path) = &args.path {
        tx.send(AppEvent::Open(path.clone(), import_options(args, config)))?;
    }

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(AppEvent::Exit) => break,
            Ok(event) => {
                if let Some(event) = app.event(&event) {
                    tx.send(event)?;
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = load_config(&args)?;
    let theme = Theme::from_config(&config.theme)?;

    let terminal = ratatui::init();
    let result = run(terminal, &args, &config, theme);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
