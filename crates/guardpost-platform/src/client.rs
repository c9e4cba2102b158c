//! The proxied HTTP client and its wire types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, COOKIE};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use guardpost_core::config::PlatformConfig;
use guardpost_core::error::{GuardPostError, Result};
use guardpost_core::traits::CommentApi;
use guardpost_core::types::{Comment, CredentialBundle, Proxy, SubAccount};

/// One client per (account, proxy) pair. The socks tunnel, bearer
/// token, cookie header, and user-agent are fixed at construction.
#[derive(Debug)]
pub struct PlatformClient {
    client: reqwest::Client,
    api_base: String,
    /// Elevated-privilege token, substituted only for hide calls.
    page_token: Option<String>,
}

impl PlatformClient {
    pub fn new(bundle: &CredentialBundle, proxy: &Proxy, config: &PlatformConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bundle.bearer_token))
                .map_err(|e| GuardPostError::InvalidCredential(format!("bad token: {e}")))?,
        );
        let cookie = bundle.cookie_header();
        if !cookie.is_empty() {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&cookie)
                    .map_err(|e| GuardPostError::InvalidCredential(format!("bad cookie: {e}")))?,
            );
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .proxy(
                reqwest::Proxy::all(proxy.socks_url())
                    .map_err(|e| GuardPostError::Validation(format!("bad proxy url: {e}")))?,
            )
            .user_agent(&bundle.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GuardPostError::ExternalApi(format!("client build: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            page_token: if config.page_token.is_empty() {
                None
            } else {
                Some(config.page_token.clone())
            },
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(self.url(path))
            .query(params)
            .send()
            .await
            .map_err(|e| GuardPostError::ExternalApi(format!("GET {path}: {e}")))?;
        Self::parse(path, resp).await
    }

    async fn parse<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GuardPostError::ExternalApi(format!(
                "{path} returned {status}: {body}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| GuardPostError::ExternalApi(format!("{path}: invalid response: {e}")))
    }

    /// Account identity, used during registration.
    pub async fn get_me(&self) -> Result<PlatformUser> {
        self.get_json("/me", &[]).await
    }

    /// Sub-accounts (ad accounts) visible to this account.
    pub async fn get_sub_accounts(&self) -> Result<Vec<SubAccount>> {
        let page: Page<WireSubAccount> = self
            .get_json(
                "/me/adaccounts",
                &[("fields", "id,name,account_status,business,currency,timezone_name")],
            )
            .await?;
        Ok(page.data.into_iter().map(WireSubAccount::into_sub_account).collect())
    }
}

#[async_trait]
impl CommentApi for PlatformClient {
    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let page: Page<Comment> = self
            .get_json(
                &format!("/{post_id}/comments"),
                &[("fields", "id,message,from")],
            )
            .await?;
        Ok(page.data)
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        let path = format!("/{comment_id}");
        let resp = self
            .client
            .delete(self.url(&path))
            .send()
            .await
            .map_err(|e| GuardPostError::ExternalApi(format!("DELETE {path}: {e}")))?;
        let _: serde_json::Value = Self::parse(&path, resp).await?;
        Ok(())
    }

    async fn hide_comment(&self, comment_id: &str) -> Result<()> {
        // Hiding needs page-level privileges the user token does not
        // carry; the elevated token rides as a query parameter and
        // overrides the bearer header for this one call.
        let page_token = self.page_token.as_deref().ok_or_else(|| {
            GuardPostError::Validation("no elevated page token configured for hide".into())
        })?;
        let path = format!("/{comment_id}");
        let resp = self
            .client
            .post(self.url(&path))
            .query(&[("is_hidden", "true"), ("access_token", page_token)])
            .send()
            .await
            .map_err(|e| GuardPostError::ExternalApi(format!("POST {path}: {e}")))?;
        let _: serde_json::Value = Self::parse(&path, resp).await?;
        Ok(())
    }
}

// --- Wire types ---

/// Paged list envelope used by every platform list endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct WireSubAccount {
    id: String,
    name: String,
    #[serde(default)]
    account_status: Option<i64>,
    #[serde(default)]
    business: Option<WireBusiness>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBusiness {
    id: String,
}

impl WireSubAccount {
    fn into_sub_account(self) -> SubAccount {
        SubAccount {
            platform_id: self.id,
            name: self.name,
            status: map_status(self.account_status),
            currency: self.currency,
            timezone: self.timezone_name,
            business_id: self.business.map(|b| b.id),
        }
    }
}

/// Numeric platform statuses mapped to the stored vocabulary.
fn map_status(code: Option<i64>) -> String {
    match code {
        Some(1) => "ACTIVE".into(),
        Some(2) => "DISABLED".into(),
        Some(3) => "UNSETTLED".into(),
        Some(101) => "CLOSED".into(),
        Some(other) => format!("UNKNOWN_{other}"),
        None => "UNKNOWN".into(),
    }
}
