//! Command-line interface for YO vault quotes, balances, deposits and
//! withdrawals.

use numu_takeaway::cli;
use numu_takeaway::setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (ctx, command) = cli::CliEnv::parse_and_convert()?;
    setup_tracing(&ctx.log_level);

    cli::run_command(ctx, command).await?;
    Ok(())
}
