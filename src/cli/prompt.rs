use anyhow::{bail, Result};
use std::io::{self, BufRead, IsTerminal, Write};

/// Asks a y/N question. Only `y`/`yes` count as agreement; anything else,
/// including EOF, is a no.
pub fn confirm_with<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;

    let mut response = String::new();
    input.read_line(&mut response)?;

    let response = response.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Terminal version of [`confirm_with`]. Without an interactive stdin the
/// answer is always no.
pub fn confirm(question: &str) -> bool {
    if !io::stdin().is_terminal() {
        tracing::info!("Non-interactive stdin, answering no to: {}", question);
        return false;
    }
    confirm_with(question, &mut io::stdin().lock(), &mut io::stdout()).unwrap_or_else(|e| {
        tracing::warn!("Prompt failed: {}", e);
        false
    })
}

pub fn ask_with<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<String> {
    write!(output, "{}: ", question)?;
    output.flush()?;

    let mut response = String::new();
    if input.read_line(&mut response)? == 0 {
        bail!("No input provided");
    }
    Ok(response.trim().to_string())
}

pub fn ask(question: &str) -> Result<String> {
    ask_with(question, &mut io::stdin().lock(), &mut io::stdout())
}
