mod cli;
mod commands;
mod util;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Encrypt(args) => commands::encrypt::run_encrypt(args, cli.quiet)?,
        Commands::Decrypt(args) => commands::decrypt::run_decrypt(args, cli.quiet)?,
        Commands::Keygen(args) => commands::keygen::run_keygen(args)?,
        Commands::Inspect(args) => commands::inspect::run_inspect(args)?,
    }

    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
