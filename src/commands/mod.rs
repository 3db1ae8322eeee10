//! Command handlers for the CLI application.
//!
//! - `ids`: match tables and board listing (ids, board)
//! - `probe`: bind the board and report
//! - `read`: raw sample readout
//! - `pm`: suspend/resume cycle

pub mod ids;
pub mod pm;
pub mod probe;
pub mod read;

use akm_driver::{attach_all, default_registry, instantiate, Attach, BoardConfig, DriverRegistry};
use anyhow::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::Cli;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Board named by `--config`, the demo board when simulating without one,
/// otherwise the system board file.
pub fn load_board(cli: &Cli) -> anyhow::Result<BoardConfig> {
    match &cli.config {
        Some(path) => Ok(BoardConfig::load(path)?),
        None if cli.simulate => Ok(BoardConfig::demo()),
        None => {
            let path = BoardConfig::default_path();
            BoardConfig::load(&path)
                .with_context(|| format!("no --config given, tried {}", path.display()))
        }
    }
}

/// Create every configured device and bind the AKM drivers to them
pub fn bind_board(cli: &Cli) -> anyhow::Result<(DriverRegistry, Vec<Attach>)> {
    let board = load_board(cli)?;
    let devices = instantiate(&board, cli.simulate).context("creating bus clients")?;
    let mut registry = default_registry();
    let attached = attach_all(&mut registry, devices);
    Ok((registry, attached))
}

/// Like [`bind_board`], but fails when nothing bound
pub fn bind_board_nonempty(cli: &Cli) -> anyhow::Result<DriverRegistry> {
    let (registry, attached) = bind_board(cli)?;
    if registry.is_empty() {
        let tried = attached.len();
        anyhow::bail!("no device bound ({tried} configured)");
    }
    Ok(registry)
}

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
/// Returns the Arc<AtomicBool> for use in the main loop.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}
