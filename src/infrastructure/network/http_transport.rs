use crate::application::ports::{RemoteRequest, RemoteResponse, RemoteTransport};
use crate::domain::value_objects::HttpMethod;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// `RemoteTransport` over HTTP. Cancellation is left to the client timeout.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    default_headers: BTreeMap<String, String>,
}

impl HttpTransport {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| {
            AppError::ConfigurationError(format!("invalid remote base url {base_url}: {err}"))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
            default_headers: config.default_headers.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &RemoteRequest) -> String {
        format!("{}{}", self.base_url, request.target)
    }

    /// Config defaults, then the bearer token, then the action's own headers.
    /// Each later source replaces a same-named header from an earlier one.
    fn headers_for(&self, request: &RemoteRequest) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            insert_header(&mut headers, name, value)?;
        }
        if let Some(token) = &self.auth_token {
            insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
        }
        for (name, value) in &request.headers {
            insert_header(&mut headers, name, value)?;
        }
        Ok(headers)
    }

    fn build(&self, request: &RemoteRequest) -> Result<reqwest::RequestBuilder, AppError> {
        let mut builder = self
            .client
            .request(request.method.into(), self.url_for(request))
            .headers(self.headers_for(request)?);
        if request.method.carries_body() {
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
        }
        Ok(builder)
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), AppError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| AppError::Transport(format!("invalid header name {name:?}: {err}")))?;
    let mut value = HeaderValue::from_str(value)
        .map_err(|err| AppError::Transport(format!("invalid value for header {name}: {err}")))?;
    if name == AUTHORIZATION {
        value.set_sensitive(true);
    }
    headers.insert(name, value);
    Ok(())
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError> {
        let response = self.build(&request)?.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(
            target: "offline::sync",
            method = %request.method,
            target_path = %request.target,
            status = status.as_u16(),
            "remote call completed"
        );
        Ok(RemoteResponse::new(status.as_u16(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::RemoteTarget;
    use serde_json::json;

    fn config() -> RemoteConfig {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("X-Client".to_string(), "planner".to_string());
        default_headers.insert("X-Locale".to_string(), "en".to_string());
        RemoteConfig {
            base_url: "https://api.example.test/".to_string(),
            timeout_secs: 5,
            auth_token: Some("secret".to_string()),
            default_headers,
        }
    }

    fn request(method: HttpMethod) -> RemoteRequest {
        let mut headers = BTreeMap::new();
        headers.insert("X-Locale".to_string(), "fr".to_string());
        RemoteRequest {
            method,
            target: RemoteTarget::new("/api/guests/g-1").unwrap(),
            headers,
            body: Some(json!({"checkedIn": true})),
        }
    }

    #[test]
    fn builds_request_with_headers_and_body() {
        let transport = HttpTransport::new(&config()).unwrap();
        let built = transport
            .build(&request(HttpMethod::Patch))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(built.method(), &Method::PATCH);
        assert_eq!(built.url().as_str(), "https://api.example.test/api/guests/g-1");
        assert_eq!(built.headers()["X-Client"], "planner");
        assert_eq!(built.headers()["X-Locale"], "fr");
        assert_eq!(built.headers().get_all("X-Locale").iter().count(), 1);
        assert_eq!(built.headers()["authorization"], "Bearer secret");
        let body = built.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(body).unwrap(),
            json!({"checkedIn": true})
        );
    }

    #[test]
    fn delete_sends_no_body() {
        let transport = HttpTransport::new(&config()).unwrap();
        let built = transport
            .build(&request(HttpMethod::Delete))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(built.method(), &Method::DELETE);
        assert!(built.body().is_none());
    }

    #[test]
    fn action_authorization_replaces_configured_token() {
        let transport = HttpTransport::new(&config()).unwrap();
        let mut req = request(HttpMethod::Post);
        req.headers
            .insert("Authorization".to_string(), "Bearer per-action".to_string());
        let built = transport.build(&req).unwrap().build().unwrap();

        let values: Vec<_> = built.headers().get_all("authorization").iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Bearer per-action");
        assert!(values[0].is_sensitive());
    }

    #[test]
    fn invalid_action_header_is_a_transport_error() {
        let transport = HttpTransport::new(&config()).unwrap();
        let mut req = request(HttpMethod::Post);
        req.headers
            .insert("X-Note".to_string(), "line\nbreak".to_string());
        assert!(matches!(transport.build(&req), Err(AppError::Transport(_))));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let mut cfg = config();
        cfg.base_url = "not a url".to_string();
        assert!(matches!(
            HttpTransport::new(&cfg),
            Err(AppError::ConfigurationError(_))
        ));
    }
}
