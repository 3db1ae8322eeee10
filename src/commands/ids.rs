//! Match table and board listing commands.

use akm_driver::default_registry;

use super::{load_board, CommandResult};
use crate::cli::Cli;

/// Print every registered driver's match tables
pub fn run(json: bool) -> CommandResult {
    let registry = default_registry();
    let drivers = registry.drivers();

    if json {
        println!("{}", serde_json::to_string_pretty(&drivers)?);
        return Ok(());
    }

    for driver in &drivers {
        println!("{} driver \"{}\"", driver.bus, driver.name);
        let ids: Vec<_> = driver.tables.ids.iter().map(|id| id.name).collect();
        println!("  id table: {}", ids.join(", "));
        if !driver.tables.of.is_empty() {
            println!("  of:");
            for of in driver.tables.of {
                println!("    {}", of.compatible);
            }
        }
        if !driver.tables.acpi.is_empty() {
            let acpi: Vec<_> = driver.tables.acpi.iter().map(|a| a.id).collect();
            println!("  acpi: {}", acpi.join(", "));
        }
    }
    Ok(())
}

/// Print the board configuration as TOML
pub fn board(cli: &Cli) -> CommandResult {
    let board = load_board(cli)?;
    print!("{}", board.to_toml_string()?);
    Ok(())
}
