//! Cursor command - converts between timestamps and pagination cursors

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;

use crate::domain::{Cursor, CursorCodec, DomainError};

#[derive(Args, Debug)]
pub struct CursorArgs {
    /// RFC 3339 timestamps to encode (or cursors, with --decode)
    #[arg(required = true)]
    pub values: Vec<String>,

    /// Decode cursors back into timestamps
    #[arg(long)]
    pub decode: bool,
}

/// Prints one converted value per input; bad inputs are reported and skipped
pub fn run(args: CursorArgs) -> anyhow::Result<()> {
    let mut failed = 0;

    for value in &args.values {
        match convert(value, args.decode) {
            Ok(converted) => println!("{}", converted),
            Err(e) => {
                eprintln!("{}: {}", value, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} inputs could not be converted", failed, args.values.len());
    }

    Ok(())
}

fn convert(value: &str, decode: bool) -> Result<String, DomainError> {
    if decode {
        let t = CursorCodec::decode(&Cursor::new(value.trim()))?;
        return Ok(t.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    let t = DateTime::parse_from_rfc3339(value.trim())
        .map_err(|e| DomainError::validation(format!("invalid timestamp: {}", e)))?;

    Ok(CursorCodec::encode(t.with_timezone(&Utc)).into_inner())
}
