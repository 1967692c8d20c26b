use std::path::Path;

use crate::error::{EvasionError, Result};

/// One payload per line; blank lines and `#` comments are skipped.
/// Payload text is otherwise kept verbatim (no trimming of inner
/// whitespace, trailing `\r` removed).
pub fn parse_payloads(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn load_payload_file(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EvasionError::PayloadFile {
            path: path.to_path_buf(),
            source,
        })?;
    let payloads = parse_payloads(&content);
    tracing::debug!(path = %path.display(), count = payloads.len(), "payload file loaded");
    Ok(payloads)
}
