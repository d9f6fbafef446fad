//! Configuration management commands.

use std::path::Path;

use cliweave_core::Config;

use crate::{AppContext, ConfigAction};

fn describe(path: &Path) -> String {
    let marker = if path.exists() { "✓" } else { "✗" };
    format!("  {} {}", marker, path.display())
}

pub fn handle(action: ConfigAction, ctx: &AppContext) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", ctx.config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("Configuration files (later entries override earlier ones):");
            println!("{}", describe(&Config::config_dir().join("config.toml")));
            println!("{}", describe(Path::new(".cliweave/config.toml")));
            println!("{}", describe(Path::new(".cliweave/config.local.toml")));
            println!("  Environment: CLIWEAVE_<SECTION>__<KEY>");
            println!();
            println!("Data directory:");
            println!("{}", describe(&ctx.config.data_dir()));
        }
    }
    Ok(())
}
