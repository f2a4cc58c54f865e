//! CLI module for gophr
//!
//! Subcommands:
//! - `get`: batch user lookup
//! - `list`: one page of users, with the cursor for the next one
//! - `cursor`: encode or decode pagination cursors
//! - `serve`: HTTP API server

pub mod cursor;
pub mod get;
pub mod list;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::domain::CallContext;

/// Gophr - users, sessions and cursor-paginated listings
#[derive(Parser)]
#[command(name = "gophr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up users by ID and print them as JSON
    Get(get::GetArgs),

    /// Print one page of users; pass the printed cursor back for the next page
    List(list::ListArgs),

    /// Encode timestamps into cursors, or decode cursors with --decode
    Cursor(cursor::CursorArgs),

    /// Run the HTTP API server
    Serve,
}

/// A background context cancelled by Ctrl-C
pub(crate) fn interruptible_context() -> CallContext {
    let ctx = CallContext::background();
    let interrupt = ctx.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        let cli =
            Cli::try_parse_from(["gophr", "get", "u1", "u2", "--output", "out.json"]).unwrap();

        match cli.command {
            Command::Get(args) => {
                assert_eq!(args.ids, vec!["u1", "u2"]);
                assert_eq!(args.output.unwrap().to_str(), Some("out.json"));
            }
            _ => panic!("Expected get command"),
        }
    }

    #[test]
    fn test_parse_get_with_api_url() {
        let cli =
            Cli::try_parse_from(["gophr", "get", "u1", "--api-url", "http://10.0.0.5:8080"])
                .unwrap();

        match cli.command {
            Command::Get(args) => {
                assert_eq!(args.api_url.as_deref(), Some("http://10.0.0.5:8080"));
            }
            _ => panic!("Expected get command"),
        }
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["gophr", "list", "--cursor", "abc", "-n", "5"]).unwrap();

        match cli.command {
            Command::List(args) => {
                assert_eq!(args.cursor, "abc");
                assert_eq!(args.num, 5);
                assert!(args.output.is_none());
            }
            _ => panic!("Expected list command"),
        }
    }

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::try_parse_from(["gophr", "list"]).unwrap();

        match cli.command {
            Command::List(args) => {
                assert!(args.cursor.is_empty());
                assert_eq!(args.num, 20);
            }
            _ => panic!("Expected list command"),
        }
    }

    #[test]
    fn test_get_requires_ids() {
        assert!(Cli::try_parse_from(["gophr", "get"]).is_err());
    }

    #[test]
    fn test_parse_cursor_decode() {
        let cli = Cli::try_parse_from(["gophr", "cursor", "--decode", "abc"]).unwrap();

        match cli.command {
            Command::Cursor(args) => {
                assert!(args.decode);
                assert_eq!(args.values, vec!["abc"]);
            }
            _ => panic!("Expected cursor command"),
        }
    }
}
