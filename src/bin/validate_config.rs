use clap::Parser;
use std::process::ExitCode;

use numu_takeaway::config::{Ctx, Env};

fn main() -> ExitCode {
    let env = Env::parse();
    match Ctx::load_files(&env.config, env.secrets.as_deref()) {
        Ok(ctx) => {
            eprintln!(
                "Config validation passed: {} vaults, slippage {}",
                ctx.registry.vaults().len(),
                ctx.slippage
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config validation failed: {}", e.kind());
            ExitCode::FAILURE
        }
    }
}
