//! Typed Rust client for the ECloud ECS OpenAPI.
//!
//! Covers the subset needed for managing compute instances:
//! create, describe, batch start/stop/reboot, delete, and the flavor
//! catalog. Every request is signed with HMAC-SHA1 (see [`auth`]) and every
//! response arrives wrapped in the vendor envelope, which this crate unwraps
//! before handing the body to the caller.

mod auth;
mod types;

pub use types::*;

const DEFAULT_ENDPOINT: &str = "https://ecloud.10086.cn";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ecloud api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ecloud api {endpoint} returned {code}: {message}")]
    Api {
        endpoint: &'static str,
        code: String,
        message: String,
        request_id: Option<String>,
    },
}

impl Error {
    /// Vendor error code, or `NETWORK_ERROR` for transport failures.
    pub fn code(&self) -> &str {
        match self {
            Error::Request(_) => "NETWORK_ERROR",
            Error::Api { code, .. } => code,
        }
    }

    /// True when the vendor reports the instance id as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Api { code, .. }
                if code == "INSTANCE_NOT_FOUND" || code == "InvalidInstanceId"
        )
    }

    /// True when the vendor rejected the request for capacity/quota reasons.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(
            self,
            Error::Api { code, .. } if code.to_ascii_uppercase().contains("QUOTA")
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the ECloud ECS REST API.
#[derive(Debug, Clone)]
pub struct EcloudClient {
    access_key_id: String,
    access_key_secret: String,
    base_url: String,
    http: reqwest::Client,
}

impl EcloudClient {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self::with_endpoint(access_key_id, access_key_secret, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            base_url: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET with the signed auth parameters appended to the query string.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        endpoint: &'static str,
    ) -> Result<T> {
        let signed = auth::auth_params(&self.access_key_id, &self.access_key_secret);
        let resp = self
            .http
            .get(self.url(path))
            .query(query)
            .query(&signed)
            .send()
            .await?;

        Self::unwrap_envelope(resp, endpoint).await
    }

    /// POST with the signed auth parameters carried as headers.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        endpoint: &'static str,
    ) -> Result<T> {
        let signed = auth::auth_params(&self.access_key_id, &self.access_key_secret);
        let mut req = self.http.post(self.url(path));
        for (key, value) in &signed {
            req = req.header(*key, value.as_str());
        }

        let resp = req.json(body).send().await?;
        Self::unwrap_envelope(resp, endpoint).await
    }

    /// Unwrap the vendor envelope, turning any non-OK state into [`Error::Api`].
    async fn unwrap_envelope<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        endpoint: &'static str,
    ) -> Result<T> {
        let status = resp.status();
        let text = resp.text().await?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) => {
                return Err(Error::Api {
                    endpoint,
                    code: format!("HTTP_{}", status.as_u16()),
                    message: text,
                    request_id: None,
                });
            }
        };

        if envelope.state != ResponseState::Ok {
            return Err(Error::Api {
                endpoint,
                code: envelope
                    .error_code
                    .unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
                message: envelope
                    .error_message
                    .unwrap_or_else(|| "API request failed".to_string()),
                request_id: envelope.request_id,
            });
        }

        envelope.body.ok_or(Error::Api {
            endpoint,
            code: "EMPTY_BODY".to_string(),
            message: "response state was OK but carried no body".to_string(),
            request_id: envelope.request_id,
        })
    }

    // ── Instances ───────────────────────────────────────────────────

    pub async fn create_instances(
        &self,
        req: &CreateInstanceRequest,
    ) -> Result<CreateInstanceResponse> {
        self.post(
            "/api/openapi-instance/v4/create-instances",
            req,
            "create instances",
        )
        .await
    }

    pub async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDetails> {
        self.get(
            "/api/openapi-instance/v4/describe-instance",
            &[("instanceId", instance_id)],
            "describe instance",
        )
        .await
    }

    pub async fn start_instances(&self, instance_ids: &[String]) -> Result<BatchOperationResponse> {
        self.post(
            "/api/openapi-instance/v4/batch-start-instances",
            &BatchInstancesRequest {
                instance_ids: instance_ids.to_vec(),
            },
            "start instances",
        )
        .await
    }

    pub async fn stop_instances(&self, instance_ids: &[String]) -> Result<BatchOperationResponse> {
        self.post(
            "/api/openapi-instance/v4/batch-stop-instances",
            &BatchInstancesRequest {
                instance_ids: instance_ids.to_vec(),
            },
            "stop instances",
        )
        .await
    }

    pub async fn reboot_instances(
        &self,
        instance_ids: &[String],
    ) -> Result<BatchOperationResponse> {
        self.post(
            "/api/openapi-instance/v4/batch-reboot-instances",
            &BatchInstancesRequest {
                instance_ids: instance_ids.to_vec(),
            },
            "reboot instances",
        )
        .await
    }

    pub async fn delete_instances(
        &self,
        req: &DeleteInstancesRequest,
    ) -> Result<BatchOperationResponse> {
        self.post(
            "/api/openapi-instance/v4/delete-instances",
            req,
            "delete instances",
        )
        .await
    }

    // ── Flavors ─────────────────────────────────────────────────────

    pub async fn list_flavors(&self) -> Result<Vec<FlavorInfo>> {
        let resp: DescribeFlavorsResponse = self
            .get(
                "/api/openapi-instance/v4/describe-flavors",
                &[],
                "list flavors",
            )
            .await?;
        Ok(resp.flavors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_and_path() {
        let client = EcloudClient::with_endpoint("AK", "SK", "https://example.test");
        assert_eq!(
            client.url("/api/openapi-instance/v4/describe-instance"),
            "https://example.test/api/openapi-instance/v4/describe-instance"
        );
    }

    #[test]
    fn default_endpoint_is_used() {
        let client = EcloudClient::new("AK", "SK");
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn error_classifiers() {
        let not_found = Error::Api {
            endpoint: "describe instance",
            code: "INSTANCE_NOT_FOUND".into(),
            message: "gone".into(),
            request_id: None,
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_quota_exhausted());

        let quota = Error::Api {
            endpoint: "create instances",
            code: "InsufficientQuotaError".into(),
            message: "out of capacity".into(),
            request_id: Some("req-3".into()),
        };
        assert!(quota.is_quota_exhausted());
        assert_eq!(quota.code(), "InsufficientQuotaError");
    }
}
