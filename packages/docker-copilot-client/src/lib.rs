//! REST client for the DockerCopilot container-update helper.
//!
//! DockerCopilot manages Docker containers on a remote host and exposes a
//! small JSON API: list containers/images, trigger an image update (which
//! returns a task ID), query update progress, back up container definitions.
//!
//! Authentication is a short JWT signed locally with the service's secret
//! key; the `POST /api/auth` exchange exists as a fallback for deployments
//! where local signing is not wanted.
//!
//! # Example
//!
//! ```rust,ignore
//! use docker_copilot_client::DockerCopilotClient;
//! use secrecy::SecretString;
//!
//! let client = DockerCopilotClient::new("http://nas:12712", SecretString::from("key"));
//! for c in client.containers().await? {
//!     if c.have_update {
//!         println!("{} can be updated", c.name);
//!     }
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{DockerCopilotError, Result};
pub use types::{ApiEnvelope, AuthGrant, ContainerSummary, ImageSummary, UpdateTask};

use async_trait::async_trait;
use chrono::Utc;
use jobpoll::{JobHandle, JobStatusSource, PollStatus, QueryError};
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;

/// Lifetime of a locally-signed token. Matches the long-lived tokens the
/// DockerCopilot web UI issues.
const TOKEN_TTL_SECS: i64 = 28 * 24 * 60 * 60;

/// Exact progress strings from the DockerCopilot API. Upstream copy:
/// any wording change there must land here.
const UPDATE_SUCCEEDED: &str = "更新成功";
const UPDATE_FAILED: &str = "更新失败";

/// The update task reached terminal success.
pub fn is_update_succeeded(message: &str) -> bool {
    message == UPDATE_SUCCEEDED
}

/// The update task reached terminal failure.
pub fn is_update_failed(message: &str) -> bool {
    message == UPDATE_FAILED
}

#[derive(Debug, Serialize)]
struct Claims {
    exp: i64,
    iat: i64,
}

#[derive(Clone)]
pub struct DockerCopilotClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: SecretString,
}

impl DockerCopilotClient {
    pub fn new(base_url: impl Into<String>, secret_key: SecretString) -> Self {
        let mut base_url = base_url.into();
        if !base_url.starts_with("http") {
            base_url = format!("http://{base_url}");
        }
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    /// Sign a bearer token locally instead of round-tripping through
    /// `/api/auth` on every call.
    fn sign_token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            exp: now + TOKEN_TTL_SECS,
            iat: now,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
        )?;
        Ok(token)
    }

    /// Exchange the secret key for a server-issued JWT.
    pub async fn exchange_auth(&self) -> Result<String> {
        let url = format!("{}/api/auth", self.base_url);
        let env: ApiEnvelope<AuthGrant> = self
            .client
            .post(&url)
            .json(&json!({ "secretKey": self.secret_key.expose_secret() }))
            .send()
            .await?
            .json()
            .await?;

        match (env.code, env.data) {
            (201, Some(grant)) => Ok(grant.jwt),
            _ => Err(DockerCopilotError::Auth(env.msg)),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<ApiEnvelope<T>> {
        let env = self
            .client
            .get(url)
            .header("Authorization", self.sign_token()?)
            .send()
            .await?
            .json()
            .await?;
        Ok(env)
    }

    /// List managed containers.
    pub async fn containers(&self) -> Result<Vec<ContainerSummary>> {
        let url = format!("{}/api/containers", self.base_url);
        let env: ApiEnvelope<Vec<ContainerSummary>> = self.get(&url).await?;
        match (env.code, env.data) {
            (0, Some(containers)) => Ok(containers),
            (code, _) => Err(DockerCopilotError::Api {
                code,
                message: env.msg,
            }),
        }
    }

    /// List local images.
    pub async fn images(&self) -> Result<Vec<ImageSummary>> {
        let url = format!("{}/api/images", self.base_url);
        let env: ApiEnvelope<Vec<ImageSummary>> = self.get(&url).await?;
        match (env.code, env.data) {
            (200, Some(images)) => Ok(images),
            (code, _) => Err(DockerCopilotError::Api {
                code,
                message: env.msg,
            }),
        }
    }

    /// Trigger an image update for one container. Returns the handle of the
    /// update task the service spawned.
    pub async fn trigger_update(&self, container: &ContainerSummary) -> Result<UpdateTask> {
        let url = format!("{}/api/container/{}/update", self.base_url, container.id);
        let env: ApiEnvelope<UpdateTask> = self
            .client
            .post(&url)
            .header("Authorization", self.sign_token()?)
            .json(&json!({
                "containerName": container.name,
                "imageNameAndTag": container.using_image,
            }))
            .send()
            .await?
            .json()
            .await?;

        if env.code == 200 && env.msg == "success" {
            if let Some(task) = env.data {
                return Ok(task);
            }
        }
        Err(DockerCopilotError::Api {
            code: env.code,
            message: env.msg,
        })
    }

    /// One progress snapshot for an update task. Returns the raw status line.
    pub async fn update_progress(&self, task_id: &str) -> Result<String> {
        let url = format!("{}/api/progress/{}", self.base_url, task_id);
        let env: ApiEnvelope<serde_json::Value> = self.get(&url).await?;
        match env.code {
            200 => Ok(env.msg),
            code => Err(DockerCopilotError::Api {
                code,
                message: env.msg,
            }),
        }
    }

    /// Remove an image by digest. Never forces.
    pub async fn remove_image(&self, sha: &str) -> Result<()> {
        let url = format!("{}/api/images/{}?force=false", self.base_url, sha);
        let env: ApiEnvelope<serde_json::Value> = self.get(&url).await?;
        match env.code {
            200 => {
                tracing::info!(sha, "image removed");
                Ok(())
            }
            code => Err(DockerCopilotError::Api {
                code,
                message: env.msg,
            }),
        }
    }

    /// Trigger a backup of the container definitions.
    pub async fn backup(&self) -> Result<()> {
        let url = format!("{}/api/container/backup", self.base_url);
        let env: ApiEnvelope<serde_json::Value> = self.get(&url).await?;
        match env.code {
            200 => Ok(()),
            code => Err(DockerCopilotError::Api {
                code,
                message: env.msg,
            }),
        }
    }
}

/// Adapts `GET /api/progress/{taskId}` into a poller status source.
///
/// A bad envelope or transport error is a transient query failure; the
/// status line is matched against the upstream sentinels to decide
/// terminality.
pub struct UpdateProgressSource {
    client: DockerCopilotClient,
}

impl UpdateProgressSource {
    pub fn new(client: DockerCopilotClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobStatusSource for UpdateProgressSource {
    async fn query(&self, handle: &JobHandle) -> std::result::Result<PollStatus, QueryError> {
        let message = self
            .client
            .update_progress(handle.as_str())
            .await
            .map_err(|e| QueryError::new(e.to_string()))?;

        if is_update_succeeded(&message) {
            Ok(PollStatus::succeeded(message))
        } else if is_update_failed(&message) {
            Ok(PollStatus::failed(message))
        } else {
            Ok(PollStatus::in_progress(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_sentinel_is_exact_match_only() {
        assert!(is_update_succeeded("更新成功"));
        assert!(!is_update_succeeded("更新成功!"));
        assert!(!is_update_succeeded("拉取镜像中"));
        assert!(!is_update_failed("更新成功"));
        assert!(is_update_failed("更新失败"));
    }

    #[test]
    fn base_url_is_normalized() {
        let client =
            DockerCopilotClient::new("nas.local:12712/", SecretString::from("secret"));
        assert_eq!(client.base_url, "http://nas.local:12712");

        let client =
            DockerCopilotClient::new("https://nas.local", SecretString::from("secret"));
        assert_eq!(client.base_url, "https://nas.local");
    }

    #[test]
    fn signed_token_is_a_three_part_jwt() {
        let client = DockerCopilotClient::new("http://nas", SecretString::from("secret"));
        let token = client.sign_token().unwrap();
        assert_eq!(token.split('.').count(), 3);
    }
}
