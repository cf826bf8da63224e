//! Results of remote scripts

use crate::wsman::{attribute, current, walk, Node};

const CLIXML_MARKER: &str = "#< CLIXML";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerShellOutput {
    pub stdout: String,
    /// Error stream with any CLIXML serialization removed
    pub stderr: String,
    pub exit_code: i32,
}

impl PowerShellOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty stdout lines, trimmed
    pub fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Decode `_xHHHH_` escapes that CLIXML uses for control characters
fn decode_escapes(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("_x") {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let code = candidate
            .get(2..6)
            .filter(|_| candidate.get(6..7) == Some("_"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match code {
            Some(c) => {
                decoded.push(c);
                rest = &candidate[7..];
            }
            None => {
                decoded.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Plain text of a PowerShell error stream. Streams serialized as CLIXML
/// keep only their `Error` strings; anything else is returned unchanged.
pub fn clean_error_stream(stderr: &str) -> String {
    let Some(xml) = stderr.trim_start().strip_prefix(CLIXML_MARKER) else {
        return stderr.to_string();
    };
    let mut errors = String::new();
    let mut in_error = false;
    let parsed = walk(xml.trim_start(), |path, node| {
        match (current(path), node) {
            ("S", Node::Start(e)) => in_error = attribute(e, "S")?.as_deref() == Some("Error"),
            ("S", Node::Text(text)) if in_error => errors.push_str(&decode_escapes(&text)),
            _ => {}
        }
        Ok(())
    });
    match parsed {
        Ok(()) => errors.trim_end().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "Error stream is not valid CLIXML");
            stderr.to_string()
        }
    }
}
