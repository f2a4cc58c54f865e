use clap::Parser;
use gophr::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Get(args) => cli::get::run(args).await,
        Command::List(args) => cli::list::run(args).await,
        Command::Cursor(args) => cli::cursor::run(args),
        Command::Serve => cli::serve::run().await,
    }
}
