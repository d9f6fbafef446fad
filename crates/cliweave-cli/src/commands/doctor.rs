//! Diagnostic command to check installation.

use cliweave_core::{Config, Tool};
use cliweave_exec::ToolProber;

use crate::AppContext;

pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    // Check config directory
    let config_dir = Config::config_dir();
    println!("Config directory: {:?}", config_dir);
    if config_dir.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (defaults are used)");
    }

    // Check data directory
    let data_dir = ctx.config.data_dir();
    println!("\nData directory: {:?}", data_dir);
    if data_dir.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (will be created on first use)");
    }

    // Check configuration warnings
    let validation = ctx.config.validate();
    let warnings = validation.warnings();
    if !warnings.is_empty() {
        println!("\nConfiguration warnings:");
        for warning in warnings {
            println!("  ✗ {}: {}", warning.field, warning.message);
        }
    }

    // Check tools
    println!("\nTools:");
    let prober = ToolProber::new(&ctx.config.prober);
    let mut available = 0;
    for tool in Tool::ALL {
        let tool_config = ctx.config.tools.get(tool);
        let executable = tool_config.executable_for(tool);

        if !tool_config.enabled {
            println!("  - {} (disabled)", tool);
            continue;
        }

        let availability = prober.probe_tool(tool, &ctx.config.tools).await;
        match availability.path {
            Some(path) if availability.available => {
                available += 1;
                println!("  ✓ {} ({})", tool, path.display());
            }
            _ => {
                println!("  ✗ {} ('{}' not found on PATH)", tool, executable);
            }
        }
    }

    if available == 0 {
        println!("\n  No tools found. Install at least one of: gemini, qwen, codex, claude");
    }

    println!("\nDiagnostics complete.");
    Ok(())
}
