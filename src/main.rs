use clap::Parser;

use drivify::cli;
use drivify::cli::Args;
use drivify::config::load_drive_config;
use drivify::drive::DriveClient;
use drivify::drive::gdrive::GoogleDrive;
use drivify::error::Result;

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run_app(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = load_drive_config()?;
    let port = GoogleDrive::new(&config).await?;
    let client = DriveClient::new(&config, port)?;
    cli::run(args, client).await
}
