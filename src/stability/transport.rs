use crate::error::{Result, StudioError};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Multipart form body, kept transport-agnostic so requests can be inspected.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<FormPart>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl ToString) -> Self {
        self.parts.push(FormPart::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn text_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub fn file(mut self, name: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        self.parts.push(FormPart::File {
            name: name.to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|part| part.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Option<FormData>,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are stored lowercase.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        ApiResponse {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StudioError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn build_form(form: FormData) -> Result<multipart::Form> {
        let mut multipart_form = multipart::Form::new();
        for part in form.parts {
            multipart_form = match part {
                FormPart::Text { name, value } => multipart_form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file_part = multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|e| {
                            StudioError::RequestError(format!("invalid mime type {}: {}", mime, e))
                        })?;
                    multipart_form.part(name, file_part)
                }
            };
        }
        Ok(multipart_form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(form) = request.form {
            builder = builder.multipart(Self::build_form(form)?);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StudioError::RequestError(format!("{} timed out", request.url))
            } else {
                StudioError::RequestError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| StudioError::RequestError(format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in order and records every request it sees.
    /// Once the script runs out, `fallback` is answered forever.
    pub(crate) struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ApiResponse>>>,
        fallback: Option<ApiResponse>,
        pub(crate) requests: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<ApiResponse>) -> Self {
            ScriptedTransport {
                script: Mutex::new(responses.into_iter().map(Ok).collect()),
                fallback: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(error: StudioError) -> Self {
            ScriptedTransport {
                script: Mutex::new(VecDeque::from(vec![Err(error)])),
                fallback: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_fallback(mut self, response: ApiResponse) -> Self {
            self.fallback = Some(response);
            self
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub(crate) fn request(&self, index: usize) -> ApiRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => self.fallback.clone().ok_or_else(|| {
                    StudioError::RequestError("scripted transport ran out of responses".into())
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_lookup_by_name() {
        let form = FormData::new()
            .text("prompt", "a lighthouse")
            .text_opt::<u64>("seed", None)
            .file("image", "image.png", "image/png", vec![1, 2, 3]);
        assert_eq!(form.get_text("prompt"), Some("a lighthouse"));
        assert!(!form.has("seed"));
        assert!(form.has("image"));
        assert_eq!(form.get_text("image"), None);
    }

    #[test]
    fn response_headers_are_case_insensitive() {
        let response =
            ApiResponse::new(200, "image/png", vec![]).with_header("Finish-Reason", "SUCCESS");
        assert_eq!(response.header("finish-reason"), Some("SUCCESS"));
        assert_eq!(response.content_type(), "image/png");
    }
}
