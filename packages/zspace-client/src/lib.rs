//! Client for the ZSpace NAS web portal.
//!
//! The portal is the vendor's browser UI, not a documented API: requests
//! replay a copied session cookie, bodies are form-encoded, and every URL
//! carries a `rnd` cache-busting salt plus `webagent=v2`. This crate covers
//! the endpoints the plugins need: media-library categories, triggering and
//! tracking a library rescan, and the system-message feed.
//!
//! Rescans are asynchronous on the NAS; [`RescanStatusSource`] adapts the
//! rescan-result endpoint into a `jobpoll` status source.

pub mod cookie;
pub mod error;
pub mod types;

pub use cookie::ZspaceCookie;
pub use error::{Result, ZspaceError};
pub use types::{Category, MessagePage, PortalEnvelope, RescanResult, RescanTask, SystemMessage};

use async_trait::async_trait;
use chrono::Utc;
use jobpoll::{JobHandle, JobStatusSource, PollStatus, QueryError};

/// Codes the portal uses for "request accepted". `N120024` shows up on
/// rescan-result queries for tasks the portal has already rotated out.
const OK_CODES: [&str; 2] = ["200", "N120024"];

/// `task_status` value while a rescan is still running.
const RESCAN_RUNNING: i64 = 4;

/// Device fields the portal expects on form endpoints. Upstream copy from
/// the web UI.
const DEVICE_NAME: &str = "PC电脑";
const PLATFORM: &str = "web";

pub fn is_code_ok(code: &str) -> bool {
    OK_CODES.contains(&code)
}

/// The rescan task is still in progress.
pub fn is_rescan_running(code: &str, task_status: i64) -> bool {
    is_code_ok(code) && task_status == RESCAN_RUNNING
}

/// Cache-busting salt carried by every portal URL.
fn request_salt() -> String {
    format!("{}_{}", Utc::now().timestamp(), fastrand::u32(1000..=9999))
}

#[derive(Clone)]
pub struct ZspaceClient {
    client: reqwest::Client,
    base_url: String,
    cookie: ZspaceCookie,
}

impl ZspaceClient {
    pub fn new(base_url: impl Into<String>, cookie: ZspaceCookie) -> Self {
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
            cookie,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?rnd={}&webagent=v2",
            self.base_url,
            path,
            request_salt()
        )
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<PortalEnvelope<T>> {
        let env = self
            .client
            .post(self.url(path))
            .header("Cookie", self.cookie.raw())
            .form(form)
            .send()
            .await?
            .json()
            .await?;
        Ok(env)
    }

    /// List media-library categories.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let env: PortalEnvelope<Vec<Category>> =
            self.post_form("/zvideo/classification/list", &[]).await?;
        match (is_code_ok(&env.code), env.data) {
            (true, Some(categories)) => Ok(categories),
            _ => Err(ZspaceError::Api {
                code: env.code,
                message: env.msg,
            }),
        }
    }

    /// Trigger a rescan of one category. Returns the rescan task handle.
    pub async fn trigger_rescan(&self, category_id: &str) -> Result<RescanTask> {
        let device_id = self.cookie.device_id()?.to_string();
        let form = [
            ("classification_id", category_id),
            ("device_id", device_id.as_str()),
            ("token", self.cookie.token()),
            ("device", DEVICE_NAME),
            ("plat", PLATFORM),
        ];
        let env: PortalEnvelope<RescanTask> =
            self.post_form("/zvideo/classification/rescan", &form).await?;
        if env.code == "200" {
            if let Some(task) = env.data {
                tracing::info!(category_id, task_id = %task.task_id, "rescan started");
                return Ok(task);
            }
        }
        Err(ZspaceError::Api {
            code: env.code,
            message: env.msg,
        })
    }

    /// One status snapshot for a rescan task. Returns the raw envelope so
    /// callers can apply the running/finished predicates themselves.
    pub async fn rescan_result(
        &self,
        category_id: &str,
        task_id: &str,
    ) -> Result<PortalEnvelope<RescanResult>> {
        let device_id = self.cookie.device_id()?.to_string();
        let form = [
            ("classification_id", category_id),
            ("device_id", device_id.as_str()),
            ("token", self.cookie.token()),
            ("device", DEVICE_NAME),
            ("plat", PLATFORM),
            ("task_id", task_id),
        ];
        self.post_form("/zvideo/classification/rescan/result", &form)
            .await
    }

    /// Fetch the newest system messages of the `notify` type.
    pub async fn system_messages(&self, num: u32) -> Result<Vec<SystemMessage>> {
        let num = num.to_string();
        let form = [
            ("type", "notify"),
            ("start_id", "0"),
            ("num", num.as_str()),
            ("token", self.cookie.token()),
        ];
        let env: PortalEnvelope<MessagePage> = self.post_form("/action/list", &form).await?;
        if env.code == "200" {
            if let Some(page) = env.data {
                return Ok(page.list);
            }
        }
        Err(ZspaceError::Api {
            code: env.code,
            message: env.msg,
        })
    }
}

/// Adapts the rescan-result endpoint into a poller status source.
///
/// Status 4 with an OK code means the rescan is still running; any other
/// status is terminal, successful iff the code is OK.
pub struct RescanStatusSource {
    client: ZspaceClient,
    category_id: String,
}

impl RescanStatusSource {
    pub fn new(client: ZspaceClient, category_id: impl Into<String>) -> Self {
        Self {
            client,
            category_id: category_id.into(),
        }
    }
}

#[async_trait]
impl JobStatusSource for RescanStatusSource {
    async fn query(&self, handle: &JobHandle) -> std::result::Result<PollStatus, QueryError> {
        let env = self
            .client
            .rescan_result(&self.category_id, handle.as_str())
            .await
            .map_err(|e| QueryError::new(e.to_string()))?;

        let Some(result) = env.data else {
            return Err(QueryError::new(format!(
                "rescan result without payload (code {})",
                env.code
            )));
        };

        if is_rescan_running(&env.code, result.task_status) {
            Ok(PollStatus::in_progress("library rescan running"))
        } else if is_code_ok(&env.code) {
            Ok(PollStatus::succeeded(format!(
                "library rescan finished (status {})",
                result.task_status
            )))
        } else {
            Ok(PollStatus::failed(format!(
                "library rescan failed (code {}): {}",
                env.code, env.msg
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_codes_cover_the_rotated_task_code() {
        assert!(is_code_ok("200"));
        assert!(is_code_ok("N120024"));
        assert!(!is_code_ok("500"));
    }

    #[test]
    fn running_predicate_requires_ok_code_and_status_four() {
        assert!(is_rescan_running("200", 4));
        assert!(is_rescan_running("N120024", 4));
        assert!(!is_rescan_running("200", 0));
        assert!(!is_rescan_running("E500", 4));
    }

    #[test]
    fn base_url_is_normalized() {
        let cookie = ZspaceCookie::parse("token=t; device_id=d").unwrap();
        let client = ZspaceClient::new("nas.local:5055/", cookie);
        assert_eq!(client.base_url, "http://nas.local:5055");
    }

    #[test]
    fn salt_has_timestamp_and_suffix() {
        let salt = request_salt();
        let (ts, suffix) = salt.split_once('_').unwrap();
        assert!(ts.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 4);
    }
}
