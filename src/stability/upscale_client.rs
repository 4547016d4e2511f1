use super::{response, transport::FormData, Api, ACCEPT_IMAGE, ACCEPT_JSON};
use crate::{
    error::{Result, StudioError},
    models::{non_blank, ImageResult, JobStatus, UpscaleRequest},
};

#[derive(Clone)]
pub struct UpscaleClient {
    api: Api,
}

impl UpscaleClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn build_form(&self, request: &UpscaleRequest) -> FormData {
        let image = &request.image;
        let mut form = FormData::new()
            .file(
                "image",
                &image.file_name("image"),
                image.format.mime(),
                image.bytes.clone(),
            )
            .text("output_format", self.api.config().output_format);

        if request.mode.needs_prompt() {
            form = form.text("prompt", request.prompt.trim());
            if let Some(negative) = non_blank(&request.negative_prompt) {
                form = form.text("negative_prompt", negative);
            }
        }
        form.text_opt("creativity", request.creativity)
            .text_opt("seed", request.seed)
    }

    pub async fn upscale(&self, request: UpscaleRequest) -> Result<ImageResult> {
        request.validate()?;
        log::info!(
            "Upscaling {}x{} image ({})",
            request.image.width,
            request.image.height,
            request.mode
        );

        let form = self.build_form(&request);
        if request.mode.is_async() {
            let response = self
                .api
                .post_form(request.mode.path(), form, ACCEPT_JSON)
                .await?;
            let job = response::expect_job(response)?;
            log::info!("Creative upscale accepted as job {}", job.id);
            await_result(&self.api, &job.id).await
        } else {
            let response = self
                .api
                .post_form(request.mode.path(), form, ACCEPT_IMAGE)
                .await?;
            response::expect_image(response)
        }
    }
}

/// Polls `results/{id}` until the job yields an image. Waits
/// `poll_interval` before each attempt and gives up after
/// `max_poll_attempts` with [`StudioError::PollTimeout`].
pub(crate) async fn await_result(api: &Api, job_id: &str) -> Result<ImageResult> {
    let interval = api.config().poll_interval;
    let max_attempts = api.config().max_poll_attempts;
    let path = format!("results/{}", job_id);

    for attempt in 1..=max_attempts {
        tokio::time::sleep(interval).await;

        let response = api.get(&path, ACCEPT_IMAGE).await?;
        match response.status {
            202 => {
                let status = serde_json::from_slice::<JobStatus>(&response.body)
                    .ok()
                    .and_then(|s| s.status)
                    .unwrap_or_else(|| "in-progress".to_string());
                log::debug!(
                    "Job {} {} ({}/{})",
                    job_id,
                    status,
                    attempt,
                    max_attempts
                );
            }
            200 => {
                log::info!("Job {} finished after {} poll(s)", job_id, attempt);
                return response::expect_image(response);
            }
            _ => return Err(response::api_error(&response)),
        }
    }

    log::error!("Job {} timed out after {} attempts", job_id, max_attempts);
    Err(StudioError::PollTimeout {
        job_id: job_id.to_string(),
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use crate::imaging::{self, tests::png_bytes};
    use crate::models::{UpscaleMode, UpscaleRequest};
    use crate::stability::tests::client_with;
    use crate::stability::transport::{testing::ScriptedTransport, ApiResponse, Method};
    use crate::StudioError;
    use std::sync::Arc;

    fn accepted(id: &str) -> ApiResponse {
        ApiResponse::new(200, "application/json", format!(r#"{{"id":"{}"}}"#, id))
    }

    fn in_progress(id: &str) -> ApiResponse {
        ApiResponse::new(
            202,
            "application/json",
            format!(r#"{{"id":"{}","status":"in-progress"}}"#, id),
        )
    }

    fn request(mode: UpscaleMode, prompt: &str) -> UpscaleRequest {
        let image = imaging::load_image(png_bytes(8, 8)).unwrap();
        UpscaleRequest::new(image, mode, prompt)
    }

    #[tokio::test]
    async fn conservative_upscale_is_a_single_call() {
        let transport = Arc::new(ScriptedTransport::new(vec![ApiResponse::new(
            200,
            "image/png",
            png_bytes(32, 32),
        )]));
        let client = client_with(transport.clone());

        let result = client
            .upscale()
            .upscale(request(UpscaleMode::Conservative, "a sharp photo"))
            .await
            .unwrap();
        assert_eq!(result.width, 32);
        assert_eq!(transport.request_count(), 1);

        let sent = transport.request(0);
        assert!(sent.url.ends_with("/upscale/conservative"));
        let form = sent.form.unwrap();
        assert!(form.has("image"));
        assert_eq!(form.get_text("prompt"), Some("a sharp photo"));
    }

    #[tokio::test]
    async fn fast_upscale_sends_no_prompt() {
        let transport = Arc::new(ScriptedTransport::new(vec![ApiResponse::new(
            200,
            "image/png",
            png_bytes(32, 32),
        )]));
        let client = client_with(transport.clone());

        client
            .upscale()
            .upscale(request(UpscaleMode::Fast, ""))
            .await
            .unwrap();
        assert!(!transport.request(0).form.unwrap().has("prompt"));
    }

    #[tokio::test]
    async fn creative_upscale_polls_until_the_image_arrives() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            accepted("job-1"),
            in_progress("job-1"),
            ApiResponse::new(200, "image/png", png_bytes(64, 64)),
        ]));
        let client = client_with(transport.clone());

        let result = client
            .upscale()
            .upscale(request(UpscaleMode::Creative, "crisp details"))
            .await
            .unwrap();
        assert_eq!((result.width, result.height), (64, 64));
        assert_eq!(transport.request_count(), 3);

        let poll = transport.request(1);
        assert_eq!(poll.method, Method::Get);
        assert!(poll.url.ends_with("/v2beta/stable-image/results/job-1"));
        assert_eq!(poll.header("authorization"), Some("Bearer sk-test-key"));
    }

    #[tokio::test]
    async fn creative_upscale_gives_up_after_attempt_cap() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![accepted("job-2")]).with_fallback(in_progress("job-2")),
        );
        let client = client_with(transport.clone());

        let err = client
            .upscale()
            .upscale(request(UpscaleMode::Creative, "crisp details"))
            .await
            .unwrap_err();
        match err {
            StudioError::PollTimeout { job_id, attempts } => {
                assert_eq!(job_id, "job-2");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        // one submit plus exactly three polls
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn poll_error_stops_immediately() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            accepted("job-3"),
            ApiResponse::new(404, "application/json", r#"{"name":"not_found"}"#),
        ]));
        let client = client_with(transport.clone());

        let err = client
            .upscale()
            .upscale(request(UpscaleMode::Creative, "crisp details"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn creative_without_prompt_is_rejected_locally() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = client_with(transport.clone());
        let err = client
            .upscale()
            .upscale(request(UpscaleMode::Creative, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::ValidationError(_)));
        assert_eq!(transport.request_count(), 0);
    }
}
