//! Parsing of the browser cookie the user copies out of a ZSpace session.
//!
//! The portal has no API tokens; callers authenticate by replaying the raw
//! cookie header, and a few form endpoints additionally want the `token`
//! and `device_id` values extracted from it.

use crate::error::{Result, ZspaceError};

/// A parsed ZSpace session cookie.
#[derive(Debug, Clone)]
pub struct ZspaceCookie {
    raw: String,
    token: String,
    device_id: Option<String>,
}

impl ZspaceCookie {
    /// Parse a raw `Cookie` header value.
    ///
    /// `token` is mandatory; `device_id` is only needed by the rescan
    /// endpoints and may be absent.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let mut token = None;
        let mut device_id = None;

        for pair in raw.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            match name.trim() {
                "token" => token = Some(value.trim().to_string()),
                "device_id" => device_id = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ZspaceError::Cookie("no token value".into()))?;

        Ok(Self {
            raw,
            token,
            device_id,
        })
    }

    /// The full header value, replayed on every request.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `device_id`, required by the rescan endpoints.
    pub fn device_id(&self) -> Result<&str> {
        self.device_id
            .as_deref()
            .ok_or_else(|| ZspaceError::Cookie("no device_id value".into()))
    }
}
