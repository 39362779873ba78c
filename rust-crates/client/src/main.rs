use clap::Parser;
use color_eyre::eyre::Result;
use slot_machine_client::{
    cli::Cli,
    commands,
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _guard = logging::init_tracing(cli.log_dir.as_deref())?;
    tracing::info!("starting slot-machine client");
    commands::run(cli).await
}
