use url::Url;

use crate::error::ToolError;

pub fn is_http_reference(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    trimmed.starts_with("http://") || trimmed.starts_with("https://")
}

pub fn validate_http_url(raw: &str) -> Result<Url, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation("Image URL cannot be empty."));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| ToolError::validation(format!("Invalid image URL {trimmed}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ToolError::validation(format!(
            "Only http or https image URLs are allowed, got {scheme}."
        ))),
    }
}
