//! Get command - batch user lookup

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::api::v1::users::UserResponse;
use crate::config::AppConfig;
use crate::domain::User;
use crate::infrastructure::logging;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// User IDs to look up
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Write the JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read through a running API instead of the configured backend
    #[arg(long)]
    pub api_url: Option<String>,
}

/// Looks up every ID concurrently, printing resolved users and reporting misses on stderr
pub async fn run(args: GetArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_cli_logging(&config.logging.level);

    let service = crate::create_cli_user_service(&config, args.api_url.as_deref()).await?;
    let ctx = super::interruptible_context();

    let (users, error) = service.get_by_user_ids(&ctx, &args.ids).await?;

    if let Some(error) = error {
        eprintln!("{}", error);
    }

    if users.is_empty() {
        return Ok(());
    }

    let payload = render(&users)?;
    write_output(args.output.as_deref(), &payload)
}

pub(crate) fn render(users: &[User]) -> anyhow::Result<String> {
    let views: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

pub(crate) fn write_output(path: Option<&Path>, payload: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Writing users to file");
            std::fs::write(path, payload)?;
        }
        None => println!("{}", payload),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user(id: &str) -> User {
        let created = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        User::with_id(id, "gopher", "g@example.com", "hash", created)
    }

    #[test]
    fn test_render_is_indented_and_hides_hash() {
        let payload = render(&[user("u1"), user("u2")]).unwrap();

        assert!(payload.starts_with("[\n  {"));
        assert!(payload.contains("\"user_id\": \"u1\""));
        assert!(!payload.contains("hash\""));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        write_output(Some(&path), "[]").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
