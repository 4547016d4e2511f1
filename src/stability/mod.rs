pub mod edit_client;
pub mod generate_client;
pub mod response;
pub mod transport;
pub mod upscale_client;

use crate::{config::StabilityConfig, error::Result, logger};
use std::sync::Arc;
use transport::{ApiRequest, ApiResponse, FormData, Method, ReqwestTransport, Transport};

pub use edit_client::EditClient;
pub use generate_client::GenerateClient;
pub use upscale_client::UpscaleClient;

pub const ACCEPT_IMAGE: &str = "image/*";
pub const ACCEPT_JSON: &str = "application/json";
const CLIENT_ID: &str = "imagestudio";

/// Shared handle the per-feature clients use to reach the API.
#[derive(Clone)]
pub struct Api {
    config: Arc<StabilityConfig>,
    transport: Arc<dyn Transport>,
}

impl Api {
    pub fn new(config: StabilityConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    fn headers(&self, accept: &str) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            ),
            ("Accept".to_string(), accept.to_string()),
            ("Stability-Client-Id".to_string(), CLIENT_ID.to_string()),
        ]
    }

    pub async fn post_form(&self, path: &str, form: FormData, accept: &str) -> Result<ApiResponse> {
        let url = self.config.endpoint(path);
        log::debug!(
            "POST {} with fields [{}]",
            url,
            form.parts()
                .iter()
                .map(|part| part.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let timer = logger::timer(path);
        let response = self
            .transport
            .send(ApiRequest {
                method: Method::Post,
                url,
                headers: self.headers(accept),
                form: Some(form),
            })
            .await;
        drop(timer);

        let response = response?;
        if response.status != 200 {
            log::error!("{} answered {}: {}", path, response.status, response.body_text());
        }
        Ok(response)
    }

    pub async fn get(&self, path: &str, accept: &str) -> Result<ApiResponse> {
        let url = self.config.endpoint(path);
        log::debug!("GET {}", url);
        self.transport
            .send(ApiRequest {
                method: Method::Get,
                url,
                headers: self.headers(accept),
                form: None,
            })
            .await
    }
}

#[derive(Clone)]
pub struct StabilityClient {
    generate_client: GenerateClient,
    upscale_client: UpscaleClient,
    edit_client: EditClient,
}

impl StabilityClient {
    pub fn new(config: StabilityConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: StabilityConfig, transport: Arc<dyn Transport>) -> Self {
        let api = Api::new(config, transport);
        Self {
            generate_client: GenerateClient::new(api.clone()),
            upscale_client: UpscaleClient::new(api.clone()),
            edit_client: EditClient::new(api),
        }
    }

    pub fn generate(&self) -> &GenerateClient {
        &self.generate_client
    }

    pub fn upscale(&self) -> &UpscaleClient {
        &self.upscale_client
    }

    pub fn edit(&self) -> &EditClient {
        &self.edit_client
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::transport::testing::ScriptedTransport;
    use super::*;
    use std::time::Duration;

    pub(crate) fn client_with(transport: Arc<ScriptedTransport>) -> StabilityClient {
        let config = StabilityConfig::new("sk-test-key")
            .with_api_host("http://stability.test")
            .with_polling(Duration::from_millis(1), 3);
        StabilityClient::with_transport(config, transport)
    }

    #[tokio::test]
    async fn every_request_carries_bearer_token_and_accept() {
        let transport = Arc::new(ScriptedTransport::new(vec![ApiResponse::new(
            200,
            "application/json",
            "{}",
        )]));
        let api = Api::new(
            StabilityConfig::new("sk-test-key").with_api_host("http://stability.test"),
            transport.clone(),
        );

        api.post_form("edit/erase", FormData::new(), ACCEPT_IMAGE)
            .await
            .unwrap();

        let sent = transport.request(0);
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "http://stability.test/v2beta/stable-image/edit/erase");
        assert_eq!(sent.header("authorization"), Some("Bearer sk-test-key"));
        assert_eq!(sent.header("accept"), Some("image/*"));
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let transport = Arc::new(ScriptedTransport::failing(
            crate::error::StudioError::RequestError("connection refused".into()),
        ));
        let api = Api::new(StabilityConfig::new("sk-test-key"), transport);
        let err = api
            .get("results/abc", ACCEPT_IMAGE)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
