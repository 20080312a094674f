use diffuse_core::{GenerateRequest, ImageMetadata};
use reqwest::StatusCode;
use url::Url;

use crate::error::AdapterError;

/// HTTP client for the image service
///
/// No request timeout is set: a generation holds the connection for the
/// whole inference.
#[derive(Debug, Clone)]
pub struct ImageServiceClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ImageServiceClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Ask the image service to generate an image
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Upstream`] when the service answers with a
    /// non-200 status and [`AdapterError::Request`] when it cannot be reached
    /// or its answer is not valid metadata
    pub async fn generate(&self, prompt: &str) -> Result<ImageMetadata, AdapterError> {
        let url = self.endpoint("generate");

        tracing::debug!(%url, "forwarding prompt to image service");

        let response = self
            .client
            .post(url)
            .json(&GenerateRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ImageMetadata>()
            .await
            .map_err(|e| AdapterError::Request(e.to_string()))
    }

    /// Download the bytes behind an `image_url`
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Request`] if the download fails for any reason
    pub async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_to_base_path() {
        let client = ImageServiceClient::new(Url::parse("http://localhost:5000").unwrap());
        assert_eq!(client.endpoint("generate"), "http://localhost:5000/generate");

        let client = ImageServiceClient::new(Url::parse("http://gateway/imagegen/").unwrap());
        assert_eq!(client.endpoint("generate"), "http://gateway/imagegen/generate");
    }
}
