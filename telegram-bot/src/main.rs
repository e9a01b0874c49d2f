//! Binary: loads `.env`, parses the CLI and runs the bot.

use anyhow::Result;
use clap::Parser;
use telegram_bot::setup::run_setup;
use telegram_bot::{config_summary, load_config, run_bot, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = load_config(token)?;
            run_bot(config).await
        }
        Commands::CheckConfig { token } => {
            let config = load_config(token)?;
            config.validate()?;
            println!("{}", config_summary(&config));
            println!("Configuration OK");
            Ok(())
        }
        Commands::Init { path, force } => {
            let stdin = std::io::stdin();
            run_setup(&mut stdin.lock(), &mut std::io::stdout(), &path, force)
        }
    }
}
