//! Settings scaffolding.

use std::path::Path;

use anyhow::Result;
use herald_config::SettingsStore;
use herald_dispatch::{DispatchEngine, HelpCommand};

/// Create a settings file holding the engine defaults, plus the permission
/// entry for the built-in `/help` command.
pub fn run(path: &Path) -> Result<()> {
    let store = SettingsStore::load(path)?;
    let mut engine = DispatchEngine::server(store);
    engine.register_handler::<HelpCommand>("chat");
    engine.settings().save()?;
    println!("Wrote settings to {}", path.display());
    Ok(())
}
