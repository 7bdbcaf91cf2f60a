//! WeChat mini-program session exchange
//!
//! Turns the one-time `code` a mini-program obtains from `wx.login` into the
//! user's `openid` through the platform's `jscode2session` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::WechatConfig;

/// Errors from the code-to-session exchange
#[derive(Error, Debug)]
pub enum WechatError {
    #[error("login code is empty")]
    EmptyCode,

    #[error("wechat app_id/secret not configured")]
    NotConfigured,

    #[error("wechat API request timed out")]
    Timeout,

    #[error("wechat API unavailable")]
    Unavailable,

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("wechat API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("wechat API returned no openid")]
    MissingOpenId,
}

/// Identity returned by a successful exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WechatSession {
    pub openid: String,
    pub session_key: Option<String>,
    pub unionid: Option<String>,
}

/// Anything that can turn a login code into a platform identity
#[async_trait]
pub trait SessionExchange: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<WechatSession, WechatError>;
}

#[derive(Debug, Deserialize)]
struct Code2SessionResponse {
    #[serde(default)]
    openid: Option<String>,
    #[serde(default)]
    session_key: Option<String>,
    #[serde(default)]
    unionid: Option<String>,
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl Code2SessionResponse {
    fn into_session(self) -> Result<WechatSession, WechatError> {
        if self.errcode != 0 {
            return Err(WechatError::Api {
                code: self.errcode,
                message: self.errmsg,
            });
        }
        let openid = self
            .openid
            .filter(|o| !o.is_empty())
            .ok_or(WechatError::MissingOpenId)?;
        Ok(WechatSession {
            openid,
            session_key: self.session_key,
            unionid: self.unionid,
        })
    }
}

/// `jscode2session` client
pub struct WechatClient {
    client: Client,
    config: WechatConfig,
}

impl WechatClient {
    pub fn new(config: WechatConfig) -> Result<Self, WechatError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WechatConfig {
        &self.config
    }
}

#[async_trait]
impl SessionExchange for WechatClient {
    async fn exchange(&self, code: &str) -> Result<WechatSession, WechatError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(WechatError::EmptyCode);
        }
        if self.config.app_id.is_empty() || self.config.secret.is_empty() {
            return Err(WechatError::NotConfigured);
        }

        let url = format!(
            "{}/sns/jscode2session",
            self.config.api_base.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("appid", self.config.app_id.as_str()),
                ("secret", self.config.secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WechatError::Timeout
                } else if e.is_connect() {
                    WechatError::Unavailable
                } else {
                    WechatError::Request(e)
                }
            })?;

        // The endpoint answers 200 with an errcode on failure, sometimes as text/plain
        let body: Code2SessionResponse = serde_json::from_slice(&response.error_for_status()?.bytes().await?)
            .map_err(|e| WechatError::Api {
                code: -1,
                message: format!("unreadable response: {e}"),
            })?;

        let session = body.into_session()?;
        tracing::debug!(has_unionid = session.unionid.is_some(), "Exchanged wechat login code");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let body: Code2SessionResponse = serde_json::from_str(
            r#"{"openid":"o-abc","session_key":"sk","unionid":"u-1"}"#,
        )
        .unwrap();
        let session = body.into_session().unwrap();
        assert_eq!(session.openid, "o-abc");
        assert_eq!(session.unionid.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_errcode_response() {
        let body: Code2SessionResponse =
            serde_json::from_str(r#"{"errcode":40029,"errmsg":"invalid code"}"#).unwrap();
        match body.into_session() {
            Err(WechatError::Api { code, message }) => {
                assert_eq!(code, 40029);
                assert_eq!(message, "invalid code");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_openid() {
        let body: Code2SessionResponse = serde_json::from_str(r#"{"session_key":"sk"}"#).unwrap();
        assert!(matches!(body.into_session(), Err(WechatError::MissingOpenId)));
    }

    #[tokio::test]
    async fn test_rejects_before_network() {
        let client = WechatClient::new(WechatConfig::default()).unwrap();
        assert!(matches!(client.exchange("  ").await, Err(WechatError::EmptyCode)));
        assert!(matches!(client.exchange("code").await, Err(WechatError::NotConfigured)));
    }
}
