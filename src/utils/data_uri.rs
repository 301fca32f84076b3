use std::path::Path;

use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use tracing::debug;

use crate::error::{AppError, AppResult};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Reads a file and encodes it as `data:{mime};base64,{payload}`.
pub fn file_to_data_uri(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path)?;
    let mime = sniff_mime(&bytes)
        .or_else(|| mime_from_extension(path))
        .unwrap_or(FALLBACK_MIME);

    debug!(
        target: "app::export",
        path = %path.display(),
        mime,
        bytes = bytes.len(),
        "file converted to data URI"
    );
    Ok(bytes_to_data_uri(mime, &bytes))
}

pub fn bytes_to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", Base64.encode(bytes))
}

/// Splits a base64 data URI into its MIME type and decoded payload.
pub fn decode_data_uri(uri: &str) -> AppResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| AppError::validation("not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::validation("data URI has no payload"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::validation("only base64 data URIs are supported"))?;
    let bytes = Base64
        .decode(payload.trim())
        .map_err(|err| AppError::validation_with_source("data URI payload is not valid base64", err))?;
    Ok((mime.to_string(), bytes))
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).to_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some("image/svg+xml");
    }
    None
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
