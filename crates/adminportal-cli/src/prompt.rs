//! Line-oriented terminal input.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Read one line. `None` on end of input.
pub fn read_line(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read a value, falling back to `default` on an empty answer.
pub fn ask(label: &str, default: Option<&str>) -> Result<String> {
    let label = match default {
        Some(d) if !d.is_empty() => format!("{} [{}]: ", label, d),
        _ => format!("{}: ", label),
    };
    let answer = read_line(&label)?.unwrap_or_default();
    if answer.trim().is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(answer.trim().to_string())
    }
}

pub fn ask_password(label: &str) -> Result<String> {
    rpassword::prompt_password(format!("{}: ", label)).context("Failed to read password")
}

pub fn confirm(label: &str, default: bool) -> Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    let answer = read_line(&format!("{} [{}]: ", label, hint))?.unwrap_or_default();
    Ok(match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    })
}
