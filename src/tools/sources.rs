use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{
    error::ToolError,
    image_processing::{detect_mime_type, extension_for_mime},
    openai::UploadImage,
    options::MAX_SOURCE_IMAGE_BYTES,
    tools::url_validation::{is_http_reference, validate_http_url},
};

const MIB: usize = 1024 * 1024;

/// Reads a source image or mask into memory. `reference` is either an
/// http(s) URL or a path inside `input_dir`; relative paths are resolved
/// against it. Without an `input_dir` only URLs are accepted. The file or
/// response body is fully consumed and released before this returns.
pub async fn load_image(
    http: &reqwest::Client,
    input_dir: Option<&Path>,
    reference: &str,
    fallback_stem: &str,
) -> Result<UploadImage, ToolError> {
    let reference = reference.trim();
    let (bytes, name_hint) = if is_http_reference(reference) {
        let url = validate_http_url(reference)?;
        let name_hint = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);
        (download(http, url.as_str(), MAX_SOURCE_IMAGE_BYTES).await?, name_hint)
    } else {
        let path = resolve_local(input_dir, reference).await?;
        let name_hint = Path::new(reference)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        (read_local(&path).await?, name_hint)
    };

    let mime_type = detect_mime_type(&bytes).unwrap_or("image/png");
    let file_name = name_hint
        .filter(|name| name.contains('.'))
        .unwrap_or_else(|| format!("{fallback_stem}.{}", extension_for_mime(mime_type)));
    Ok(UploadImage {
        file_name,
        mime_type,
        bytes,
    })
}

/// Maps a local reference to a file inside `input_dir`. Missing files and
/// files outside the directory get the same error, so callers learn nothing
/// about the rest of the filesystem.
async fn resolve_local(input_dir: Option<&Path>, reference: &str) -> Result<PathBuf, ToolError> {
    let Some(input_dir) = input_dir else {
        return Err(ToolError::validation(format!(
            "{reference} is not an http(s) URL, and local image paths are disabled on this server."
        )));
    };
    let root = fs::canonicalize(input_dir)
        .await
        .map_err(|err| ToolError::io("resolve input directory", input_dir, err))?;
    let rejected = || {
        ToolError::validation(format!(
            "{reference} is not an image file inside the server's input directory."
        ))
    };

    let resolved = fs::canonicalize(root.join(reference))
        .await
        .map_err(|_| rejected())?;
    if !resolved.starts_with(&root) {
        tracing::warn!(%reference, "local image path outside the input directory");
        return Err(rejected());
    }
    match fs::metadata(&resolved).await {
        Ok(metadata) if metadata.is_file() => Ok(resolved),
        _ => Err(rejected()),
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, ToolError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|err| ToolError::io("read", path, err))?;
    check_size(metadata.len() as usize, MAX_SOURCE_IMAGE_BYTES, &path.display().to_string())?;
    fs::read(path).await.map_err(|err| ToolError::io("read", path, err))
}

async fn download(http: &reqwest::Client, url: &str, limit: usize) -> Result<Vec<u8>, ToolError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| ToolError::Remote(anyhow::anyhow!("fetch image {url} failed: {err}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::Remote(anyhow::anyhow!("fetch image {url} failed: HTTP {status}")));
    }
    if let Some(length) = response.content_length() {
        check_size(length as usize, limit, url)?;
    }
    read_capped(response, limit, url).await
}

/// Reads the body chunk by chunk, stopping as soon as it exceeds `limit`.
/// Content-Length is not trusted here; chunked bodies carry none.
async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
    url: &str,
) -> Result<Vec<u8>, ToolError> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| ToolError::Remote(anyhow::anyhow!("read image {url} failed: {err}")))?
    {
        check_size(body.len() + chunk.len(), limit, url)?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn check_size(len: usize, limit: usize, label: &str) -> Result<(), ToolError> {
    if len > limit {
        let limit = if limit >= MIB {
            format!("{}MB", limit / MIB)
        } else {
            format!("{limit} bytes")
        };
        return Err(ToolError::validation(format!("{label} is larger than {limit}.")));
    }
    Ok(())
}
