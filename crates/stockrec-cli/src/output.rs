use std::io::{self, Write};

use serde_json::Value;

use crate::error::CliError;

/// Write `data` to stdout as one JSON document.
pub fn render(data: &Value, pretty: bool) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, data)?;
    } else {
        serde_json::to_writer(&mut stdout, data)?;
    }
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
