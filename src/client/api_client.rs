//! Typed HTTP client for the Smart Link REST API.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::api::{
    DescriptionRequest, DescriptionResponse, ErrorBody, ImageUploadResponse, MessageResponse,
};
use crate::db::{
    CreateSiteRequest, LoginRequest, LoginResponse, SessionUser, SignupRequest, SignupResponse,
    Site, UpdateSiteRequest,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to server: {0}")]
    Connection(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error("Invalid response from server: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// An image file attached to a multipart request
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageFile {
    fn into_part(self) -> Result<Part, ClientError> {
        Ok(Part::bytes(self.data)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

/// Text fields plus the optional `image` file of a with-image request
fn site_form(fields: [(&str, Option<&str>); 5], image: Option<ImageFile>) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for (name, value) in fields {
        if let Some(value) = value {
            form = form.text(name.to_string(), value.to_string());
        }
    }
    if let Some(image) = image {
        form = form.part("image", image.into_part()?);
    }
    Ok(form)
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        // Single attempt, no client-side timeout
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map non-success responses to `ClientError::Api` using the body's `message`.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                if text.is_empty() {
                    format!("Request failed with status {}", status)
                } else {
                    text
                }
            });

        Err(ClientError::Api { status, message })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(builder.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        Self::send(self.request(method, path).json(body)).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, ClientError> {
        self.send_json(Method::POST, "/api/auth/signup", request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(Method::POST, "/api/auth/login", &request).await
    }

    pub async fn me(&self) -> Result<SessionUser, ClientError> {
        Self::send(self.request(Method::GET, "/api/auth/me")).await
    }

    pub async fn list_sites(&self) -> Result<Vec<Site>, ClientError> {
        Self::send(self.request(Method::GET, "/api/sites")).await
    }

    pub async fn get_site(&self, id: i64) -> Result<Site, ClientError> {
        Self::send(self.request(Method::GET, &format!("/api/sites/{}", id))).await
    }

    pub async fn create_site(&self, request: &CreateSiteRequest) -> Result<Site, ClientError> {
        self.send_json(Method::POST, "/api/sites", request).await
    }

    pub async fn update_site(
        &self,
        id: i64,
        request: &UpdateSiteRequest,
    ) -> Result<Site, ClientError> {
        self.send_json(Method::PUT, &format!("/api/sites/{}", id), request)
            .await
    }

    pub async fn delete_site(&self, id: i64) -> Result<MessageResponse, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/api/sites/{}", id))).await
    }

    pub async fn upload_image(&self, image: ImageFile) -> Result<ImageUploadResponse, ClientError> {
        let form = Form::new().part("image", image.into_part()?);
        Self::send(
            self.request(Method::POST, "/api/sites/upload-image")
                .multipart(form),
        )
        .await
    }

    pub async fn create_site_with_image(
        &self,
        request: &CreateSiteRequest,
        image: Option<ImageFile>,
    ) -> Result<Site, ClientError> {
        let form = site_form(
            [
                ("title", Some(request.title.as_str())),
                ("site_url", Some(request.site_url.as_str())),
                ("category", Some(request.category.as_str())),
                ("description", request.description.as_deref()),
                ("cover_image", request.cover_image.as_deref()),
            ],
            image,
        )?;
        Self::send(self.request(Method::POST, "/api/sites/with-image").multipart(form)).await
    }

    pub async fn update_site_with_image(
        &self,
        id: i64,
        request: &UpdateSiteRequest,
        image: Option<ImageFile>,
    ) -> Result<Site, ClientError> {
        let form = site_form(
            [
                ("title", request.title.as_deref()),
                ("site_url", request.site_url.as_deref()),
                ("category", request.category.as_deref()),
                ("description", request.description.as_deref()),
                ("cover_image", request.cover_image.as_deref()),
            ],
            image,
        )?;
        Self::send(
            self.request(Method::PUT, &format!("/api/sites/{}/with-image", id))
                .multipart(form),
        )
        .await
    }

    pub async fn generate_description(
        &self,
        request: &DescriptionRequest,
    ) -> Result<DescriptionResponse, ClientError> {
        self.send_json(Method::POST, "/api/ai/generate-description", request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert!(client.token().is_none());

        let client = client.with_token(Some("abc".to_string()));
        assert_eq!(client.token(), Some("abc"));
    }

    #[test]
    fn test_image_file_rejects_invalid_mime() {
        let image = ImageFile {
            file_name: "cover.png".to_string(),
            content_type: "not a mime type".to_string(),
            data: vec![1, 2, 3],
        };
        assert!(matches!(image.into_part(), Err(ClientError::Connection(_))));
    }

    #[test]
    fn test_api_error_displays_message() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            message: "Site not found".to_string(),
        };
        assert_eq!(err.to_string(), "Site not found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
