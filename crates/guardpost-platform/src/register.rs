//! Account registration — identity fetch plus the atomic upsert.
//!
//! Registration already goes out through the proxy the account will
//! keep: the identity call is the first traffic the binding carries.

use std::sync::Arc;

use guardpost_core::config::PlatformConfig;
use guardpost_core::error::{GuardPostError, Result};
use guardpost_core::types::{Account, Proxy};
use guardpost_proxy::ProxyChoice;
use guardpost_store::Store;

use crate::client::PlatformClient;
use crate::credential::decode_bundle;

/// Resolve the proxy an account should be registered under.
fn resolve_proxy(store: &Store, choice: ProxyChoice) -> Result<Proxy> {
    match choice {
        ProxyChoice::Explicit(id) => {
            let proxy = store
                .get_proxy(id)?
                .ok_or_else(|| GuardPostError::NotFound(format!("proxy {id}")))?;
            if let Some(other) = proxy.account_id {
                return Err(GuardPostError::Conflict(format!(
                    "proxy {id} is already bound to account {other}"
                )));
            }
            Ok(proxy)
        }
        ProxyChoice::Auto => store
            .find_free_active_proxy()?
            .ok_or(GuardPostError::NoProxyAvailable),
    }
}

/// Register (or refresh) a platform account for `user_id`.
///
/// Decodes the credential bundle, picks a proxy, fetches the account's
/// identity and sub-accounts through that proxy, then persists account
/// + binding + sub-accounts as one transaction — both succeed or
/// neither does.
pub async fn register_account(
    store: &Arc<Store>,
    config: &PlatformConfig,
    user_id: i64,
    encoded_bundle: &str,
    choice: ProxyChoice,
) -> Result<Account> {
    let bundle = decode_bundle(encoded_bundle)?;
    let proxy = resolve_proxy(store, choice)?;
    let client = PlatformClient::new(&bundle, &proxy, config)?;

    let me = client.get_me().await?;
    let sub_accounts = client.get_sub_accounts().await?;

    let account = store.upsert_account_with_proxy(
        user_id,
        &me.id,
        &me.name,
        encoded_bundle,
        Some(proxy.id),
        &sub_accounts,
    )?;
    tracing::info!(
        "Registered account {} ({}) with {} sub-accounts via proxy {}",
        account.id,
        account.name,
        sub_accounts.len(),
        proxy.id
    );
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardpost_core::types::ProxyStatus;

    #[test]
    fn explicit_choice_validates_existence_and_binding() {
        let store = Store::open_in_memory().unwrap();
        let err = resolve_proxy(&store, ProxyChoice::Explicit(1)).unwrap_err();
        assert!(matches!(err, GuardPostError::NotFound(_)));

        let proxy = store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
            .unwrap();
        assert_eq!(
            resolve_proxy(&store, ProxyChoice::Explicit(proxy.id)).unwrap().id,
            proxy.id
        );

        let account = store
            .upsert_account_with_proxy(1, "fb-1", "a", "b", Some(proxy.id), &[])
            .unwrap();
        let err = resolve_proxy(&store, ProxyChoice::Explicit(proxy.id)).unwrap_err();
        assert!(matches!(err, GuardPostError::Conflict(_)));
        let _ = account;
    }

    #[test]
    fn auto_choice_requires_a_free_active_proxy() {
        let store = Store::open_in_memory().unwrap();
        store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Dead)
            .unwrap();
        let err = resolve_proxy(&store, ProxyChoice::Auto).unwrap_err();
        assert!(matches!(err, GuardPostError::NoProxyAvailable));

        let free = store
            .add_proxy("10.0.0.2", 1080, None, None, ProxyStatus::Active)
            .unwrap();
        assert_eq!(resolve_proxy(&store, ProxyChoice::Auto).unwrap().id, free.id);
    }
}
