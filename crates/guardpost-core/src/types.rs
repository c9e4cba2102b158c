//! Domain types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyStatus {
    Active,
    Dead,
}

impl ProxyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyStatus::Active => "ACTIVE",
            ProxyStatus::Dead => "DEAD",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ACTIVE" => ProxyStatus::Active,
            _ => ProxyStatus::Dead,
        }
    }
}

/// A network relay giving one account its own egress path.
///
/// Invariant: a bound proxy serves exactly one account. `account_id`
/// is `Some` while bound; rebinding requires an explicit unbind first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    pub id: i64,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub status: ProxyStatus,
    /// Account currently bound to this proxy, if any.
    pub account_id: Option<i64>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl Proxy {
    /// socks5 tunnel URL, embedding credentials when present.
    pub fn socks_url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("socks5://{user}:{pass}@{}:{}", self.host, self.port)
            }
            _ => format!("socks5://{}:{}", self.host, self.port),
        }
    }

    /// Plain HTTP proxy URL, used by the health probe.
    pub fn http_url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("http://{user}:{pass}@{}:{}", self.host, self.port)
            }
            _ => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Result of a single proxy health check. Failures are captured in the
/// value — a health check itself never errors.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub proxy_id: i64,
    pub success: bool,
    /// Egress IP reported by the echo endpoint, on success.
    pub egress_ip: Option<String>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
    pub status: ProxyStatus,
}

/// A third-party platform account (collaborator record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Owner in the hosting system.
    pub user_id: i64,
    /// Identity on the external platform.
    pub platform_user_id: String,
    pub name: String,
    /// Opaque base64-encoded credential bundle, decoded on use.
    pub credential: String,
}

/// A sub-account (ad account) belonging to a platform account.
/// Upserted alongside the account inside the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAccount {
    pub platform_id: String,
    pub name: String,
    pub status: String,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub business_id: Option<String>,
}

/// What to do with a newly observed comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionMode {
    /// Record only.
    Track,
    /// Remove the comment from the post.
    Delete,
    /// Flip the comment's hidden flag.
    Hide,
}

impl ActionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMode::Track => "TRACK",
            ActionMode::Delete => "DELETE",
            ActionMode::Hide => "HIDE",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "DELETE" => ActionMode::Delete,
            "HIDE" => ActionMode::Hide,
            _ => ActionMode::Track,
        }
    }
}

/// A persistent pairing of one account, one target post, and a
/// moderation action. Unique per (account, post).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentTask {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub post_id: String,
    pub action: ActionMode,
    pub notification: bool,
    pub active: bool,
    /// Ids already observed for this post — the sole "already seen"
    /// record. Append-only and deduplicated.
    pub known_comment_ids: Vec<String>,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One comment as returned by the external platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub from: Option<CommentAuthor>,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        self.from
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// One cookie pair, order-preserving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePair {
    pub name: String,
    pub value: String,
}

/// Decoded credential bundle — validated shape of the opaque base64
/// payload stored on an account.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialBundle {
    /// Bearer token for the platform API.
    #[serde(rename = "token")]
    pub bearer_token: String,
    /// User-Agent the account was captured under.
    #[serde(rename = "ua")]
    pub user_agent: String,
    /// Ordered cookie pairs replayed on each request.
    #[serde(default)]
    pub cookies: Vec<CookiePair>,
}

impl CredentialBundle {
    /// Rebuild the `Cookie` header value from the stored pairs.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socks_url_with_and_without_credentials() {
        let mut proxy = Proxy {
            id: 1,
            host: "10.0.0.5".into(),
            port: 1080,
            username: Some("u".into()),
            password: Some("p".into()),
            status: ProxyStatus::Active,
            account_id: None,
            last_checked: None,
        };
        assert_eq!(proxy.socks_url(), "socks5://u:p@10.0.0.5:1080");

        proxy.username = None;
        proxy.password = None;
        assert_eq!(proxy.socks_url(), "socks5://10.0.0.5:1080");
    }

    #[test]
    fn cookie_header_preserves_order() {
        let bundle = CredentialBundle {
            bearer_token: "t".into(),
            user_agent: "ua".into(),
            cookies: vec![
                CookiePair { name: "c_user".into(), value: "1".into() },
                CookiePair { name: "xs".into(), value: "abc".into() },
            ],
        };
        assert_eq!(bundle.cookie_header(), "c_user=1; xs=abc");
    }

    #[test]
    fn action_mode_round_trip() {
        for mode in [ActionMode::Track, ActionMode::Delete, ActionMode::Hide] {
            assert_eq!(ActionMode::parse(mode.as_str()), mode);
        }
        // Unknown strings fall back to Track, matching the default.
        assert_eq!(ActionMode::parse("???"), ActionMode::Track);
    }
}
