use std::path::Path;

use anyhow::Context;

/// Read tracked wallet addresses, one per line.
pub async fn load_addresses(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read address list {}", path.display()))?;

    let addresses = parse_addresses(&text);
    tracing::info!(
        count = addresses.len(),
        path = %path.display(),
        "Loaded tracked addresses"
    );
    Ok(addresses)
}

/// Trimmed non-empty lines; lines starting with `#` are comments.
pub fn parse_addresses(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
