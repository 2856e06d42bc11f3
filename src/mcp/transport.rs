//! Newline-delimited JSON-RPC over stdio.
//!
//! One UTF-8 JSON message per line in each direction: requests arrive on
//! stdin, responses leave on stdout. Nothing else may be written to stdout,
//! which is why logging goes to stderr.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// The stdio end of an MCP connection.
pub struct StdioTransport {
    reader: BufReader<tokio::io::Stdin>,
    writer: tokio::io::Stdout,
}

impl StdioTransport {
    /// Wraps the process's stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }

    /// Reads the next line without its terminator.
    ///
    /// Returns `None` once stdin is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from stdin fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Serialises `message` onto one line of stdout and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = encode_line(message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact JSON plus the terminating newline.
fn encode_line<T: Serialize>(message: &T) -> io::Result<String> {
    let mut json =
        serde_json::to_string(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug_assert!(!json.contains('\n'), "compact JSON has no raw newlines");
    json.push('\n');
    Ok(json)
}
