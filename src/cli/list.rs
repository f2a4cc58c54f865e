//! List command - one page of users in registration order

use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use super::get::{render, write_output};
use crate::api::v1::users::DEFAULT_PAGE_SIZE;
use crate::config::AppConfig;
use crate::domain::{Cursor, Page, User};
use crate::infrastructure::logging;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Cursor printed by the previous page; omit to start from the beginning
    #[arg(long, default_value = "")]
    pub cursor: String,

    /// Number of users per page
    #[arg(short = 'n', long = "num", default_value_t = DEFAULT_PAGE_SIZE)]
    pub num: usize,

    /// Write the JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read through a running API instead of the configured backend
    #[arg(long)]
    pub api_url: Option<String>,
}

/// Prints the next cursor, if any, followed by the page as indented JSON
pub async fn run(args: ListArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_cli_logging(&config.logging.level);

    let service = crate::create_cli_user_service(&config, args.api_url.as_deref()).await?;
    let ctx = super::interruptible_context();

    let cursor = Cursor::from_wire(&args.cursor);
    debug!(cursor = ?cursor, num = args.num, "Listing users");

    let page = service.list(&ctx, cursor.as_ref(), args.num).await?;

    if let Some(line) = next_cursor_line(&page) {
        println!("{}", line);
    }

    let payload = render(&page.items)?;
    write_output(args.output.as_deref(), &payload)
}

fn next_cursor_line(page: &Page<User>) -> Option<String> {
    page.next_cursor
        .as_ref()
        .map(|cursor| format!("Next Cursor: {}", cursor))
}
