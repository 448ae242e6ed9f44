//! Steel Scheme REPL for scripting spidev devices
//!
//! This crate exposes spidev handles to a Scheme environment. Devices are
//! opened by bus and chip-select number and referred to by an integer
//! handle; byte data is passed as lists of integers.
//!
//! # Features
//!
//! - All three transfer styles (`spi-xfer`, `spi-xfer2`, `spi-xfer3`)
//! - Mode, word size and speed getters and setters
//! - Mode bit constants in `rspidev/consts`
//! - Syntax highlighting, completion and command history
//!
//! # Example Session
//!
//! ```scheme
//! λ > (define h (spi-open 0 0))
//! λ > (spi-set-max-speed-hz! h 1000000)
//! λ > (spi-xfer2 h (list #x9f 0 0 0))
//! => (255 239 64 24)
//!
//! λ > (spi-set-mode! h SPI_MODE_3)
//! λ > (bytes->hex (spi-read h 4))
//! => "ff ff ff ff"
//! ```

mod error;
pub mod highlight;
mod spi_module;

pub use error::ReplError;
pub use spi_module::{
    bytes_to_steel, create_constants_module, create_spi_module, parse_hex, steel_to_bytes,
    Registry, SharedRegistry, CONSTANT_NAMES, CONSTS_MODULE, FUNCTION_NAMES, SPI_MODULE,
};

use crate::highlight::ReplHelper;
use colored::Colorize;
use directories::ProjectDirs;
use rspidev_core::Connector;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use steel::rvals::SteelVal;
use steel::steel_vm::engine::Engine;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scheme forms worth completing besides our own functions
const SCHEME_FORMS: &[&str] = &[
    "define", "lambda", "let", "if", "begin", "list", "map", "for-each", "display",
    "displayln", "quit", "exit",
];

fn get_banner() -> String {
    format!(
        r#"
                _     _
   _ _ ____ __ (_)__| |_____ __
  | '_(_-< '_ \| / _` / -_) V /     Version {}
  |_| /__/ .__/|_\__,_\___|\_/      :? for help
         |_|
"#,
        VERSION
    )
    .bright_yellow()
    .bold()
    .to_string()
}

fn get_history_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rspidev") {
        let mut path = proj_dirs.data_dir().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&path) {
            log::debug!("repl: Cannot create {}: {}", path.display(), e);
        }
        path.push("repl_history");
        path
    } else {
        PathBuf::from(".rspidev_history")
    }
}

/// Names offered for completion and highlighted as known
fn known_names() -> BTreeSet<String> {
    FUNCTION_NAMES
        .iter()
        .chain(CONSTANT_NAMES)
        .chain(SCHEME_FORMS)
        .map(|name| name.to_string())
        .collect()
}

/// Create an engine with the spidev modules loaded
///
/// Devices opened by scripts go through `connector`.
pub fn create_engine<C>(connector: C) -> Result<Engine, ReplError>
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let mut engine = Engine::new();

    let registry = Registry::shared(connector);
    engine.register_module(create_spi_module(registry));
    engine.register_module(create_constants_module());

    engine
        .run(format!(
            "(require-builtin {})\n(require-builtin {})",
            SPI_MODULE, CONSTS_MODULE
        ))
        .map_err(|e| ReplError::SteelError(e.to_string()))?;

    Ok(engine)
}

fn print_results(results: Vec<SteelVal>) {
    for result in results {
        if !matches!(result, SteelVal::Void) {
            print!("{} ", "=>".bright_blue().bold());
            println!("{}", result);
        }
    }
}

/// Run the interactive REPL
pub fn run_repl<C>(connector: C) -> Result<(), ReplError>
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let mut engine = create_engine(connector)?;

    let helper = ReplHelper::new(Arc::new(known_names()));
    let mut rl = Editor::<ReplHelper, FileHistory>::new()?;
    rl.set_helper(Some(helper));
    rl.set_check_cursor_position(true);

    let history_path = get_history_path();
    if let Err(e) = rl.load_history(&history_path) {
        // Missing on first run
        log::debug!("repl: No history loaded: {}", e);
    }

    println!("{}", get_banner());
    println!(
        "Type {} for available commands, {} or {} to exit.",
        "(spidev-help)".bright_cyan(),
        "(quit)".bright_cyan(),
        ":q".bright_cyan()
    );
    println!();

    let prompt = format!("{} ", "λ >".bright_green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.as_str());

                match input {
                    "(quit)" | "(exit)" | ":q" | ":quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    ":?" | ":help" => {
                        print_help();
                        continue;
                    }
                    _ => {}
                }

                match engine.run(line.clone()) {
                    Ok(results) => print_results(results),
                    Err(e) => eprintln!("{}: {}", "Error".bright_red().bold(), e),
                }

                let _ = std::io::stdout().flush();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "Error".bright_red().bold(), err);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        eprintln!(
            "{}: Failed to save history: {}",
            "Warning".bright_yellow(),
            e
        );
    }

    Ok(())
}

fn print_help() {
    println!(
        "
    {} -- displays help dialog
    {}    -- exits the REPL

    {}      -- show spidev functions
    ",
        ":? | :help".bright_cyan(),
        ":q | :quit".bright_cyan(),
        "(spidev-help)".bright_cyan(),
    );
}

/// Evaluate a script, printing every non-void result
pub fn run_script<C>(connector: C, script: String) -> Result<(), ReplError>
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let mut engine = create_engine(connector)?;
    let results = engine
        .run(script)
        .map_err(|e| ReplError::SteelError(e.to_string()))?;
    print_results(results);
    Ok(())
}

/// Evaluate the script in `path`
pub fn run_script_file<C>(connector: C, path: &Path) -> Result<(), ReplError>
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    log::info!("Running script {}", path.display());
    let script = std::fs::read_to_string(path)?;
    run_script(connector, script)
}
