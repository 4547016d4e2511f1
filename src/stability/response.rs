use super::transport::ApiResponse;
use crate::{
    error::{Result, StudioError},
    models::{ImageResult, JobAccepted, OutputFormat},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

/// Shape of an `application/json` image answer.
#[derive(Debug, Deserialize)]
struct JsonImage {
    image: Option<String>,
    finish_reason: Option<String>,
    seed: Option<u64>,
}

pub fn api_error(response: &ApiResponse) -> StudioError {
    StudioError::ApiError {
        status: response.status,
        body: response.body_text(),
    }
}

/// Turns a 200 image answer into an [`ImageResult`]. The content type is
/// checked before anything is decoded.
pub fn expect_image(response: ApiResponse) -> Result<ImageResult> {
    if response.status != 200 {
        return Err(api_error(&response));
    }

    let content_type = response.content_type().to_ascii_lowercase();
    let (bytes, seed, finish_reason) = if content_type.starts_with("image/") {
        let seed = response.header("seed").and_then(|s| s.trim().parse().ok());
        let finish_reason = response.header("finish-reason").map(String::from);
        (response.body, seed, finish_reason)
    } else if content_type.starts_with("application/json") {
        let payload: JsonImage = serde_json::from_slice(&response.body)
            .map_err(|e| StudioError::ResponseError(format!("invalid JSON body: {}", e)))?;
        let encoded = payload.image.ok_or_else(|| {
            StudioError::ResponseError("JSON response did not contain an image".into())
        })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| StudioError::ResponseError(format!("invalid base64 image: {}", e)))?;
        (bytes, payload.seed, payload.finish_reason)
    } else {
        return Err(StudioError::ResponseError(format!(
            "expected an image but got content type '{}'",
            response.content_type()
        )));
    };

    let decoded = image::load_from_memory(&bytes)?;
    let format = OutputFormat::from_mime(&content_type)
        .or_else(|| match image::guess_format(&bytes).ok()? {
            image::ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            image::ImageFormat::WebP => Some(OutputFormat::Webp),
            _ => Some(OutputFormat::Png),
        })
        .unwrap_or_default();

    if finish_reason.as_deref() == Some("CONTENT_FILTERED") {
        log::warn!("Result was flagged by the content filter and may be blurred");
    }

    Ok(ImageResult {
        width: decoded.width(),
        height: decoded.height(),
        bytes,
        format,
        seed,
        finish_reason,
    })
}

/// Reads the job id out of an accepted asynchronous request.
pub fn expect_job(response: ApiResponse) -> Result<JobAccepted> {
    if response.status != 200 {
        return Err(api_error(&response));
    }
    let job: JobAccepted = serde_json::from_slice(&response.body)
        .map_err(|e| StudioError::ResponseError(format!("invalid job response: {}", e)))?;
    if job.id.trim().is_empty() {
        return Err(StudioError::ResponseError("job response had an empty id".into()));
    }
    Ok(job)
}
