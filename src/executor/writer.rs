use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use petname::petname;
use tokio::fs;
use uuid::Uuid;

/// Saves a response body as `<dir>/<endpoint>/<NNN>-<petname><ext>`, or into
/// the system temp dir when no output directory is configured.
pub(super) async fn write_response_body(
    bytes: &[u8],
    content_type: Option<&str>,
    response_dir: Option<&Path>,
    endpoint: &str,
) -> Result<PathBuf> {
    let extension = extension_for_content_type(content_type);

    let path = match response_dir {
        Some(base_dir) => {
            let endpoint_dir = base_dir.join(sanitize_component(endpoint));
            fs::create_dir_all(&endpoint_dir).await.with_context(|| {
                format!("creating response directory {}", endpoint_dir.display())
            })?;
            let index = next_index(&endpoint_dir).await?;
            let file_name = format!("{:03}-{}{}", index, petname(2, "-"), extension);
            endpoint_dir.join(file_name)
        }
        None => std::env::temp_dir().join(format!("apiharness-{}{}", Uuid::new_v4(), extension)),
    };

    fs::write(&path, bytes)
        .await
        .with_context(|| format!("writing response body to {}", path.display()))?;
    Ok(path)
}

/// Text for display: UTF-8 as-is, anything else hex encoded.
///
/// A text preview is cut back to the last whole character within `limit`.
pub(crate) fn create_preview(bytes: &[u8], limit: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let mut end = text.len().min(limit);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text[..end].to_string()
        }
        Err(_) => hex::encode(&bytes[..bytes.len().min(limit)]),
    }
}

pub(super) fn sanitize_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '-',
        })
        .collect();
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(super) fn is_json_content_type(content_type: Option<&str>) -> bool {
    let essence = essence(content_type);
    essence == "application/json" || essence.ends_with("+json")
}

fn essence(content_type: Option<&str>) -> &str {
    content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
}

pub(super) fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    match essence(content_type) {
        "application/json" => ".json",
        "text/html" => ".html",
        "text/plain" => ".txt",
        "text/csv" => ".csv",
        "application/xml" | "text/xml" => ".xml",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "application/pdf" => ".pdf",
        _ => ".bin",
    }
}

/// MIME type for an upload, guessed from its extension.
pub(super) fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

async fn next_index(dir: &Path) -> Result<u32> {
    let mut max_index = 0;
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("reading directory {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(prefix) = entry.file_name().to_str().and_then(|name| name.get(0..3)) {
            if let Ok(value) = prefix.parse::<u32>() {
                max_index = max_index.max(value + 1);
            }
        }
    }
    Ok(max_index)
}
