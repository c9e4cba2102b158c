//! SQLite-backed persistence for proxies, accounts, and comment tasks.
//! Survives restarts — scheduling state is rebuilt from here on boot.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use guardpost_core::error::{GuardPostError, Result};
use guardpost_core::types::{
    Account, ActionMode, CommentTask, Proxy, ProxyStatus, SubAccount,
};

fn store_err(e: rusqlite::Error) -> GuardPostError {
    GuardPostError::Store(e.to_string())
}

/// Persistence store shared by the pool, dispatcher, and engine.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                platform_user_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                credential TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS proxies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                username TEXT,
                password TEXT,
                status TEXT NOT NULL DEFAULT 'DEAD',
                account_id INTEGER REFERENCES accounts(id),
                last_checked TEXT
            );

            -- Sub-accounts (ad accounts) owned by a platform account.
            CREATE TABLE IF NOT EXISTS sub_accounts (
                platform_id TEXT PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                currency TEXT,
                timezone TEXT,
                business_id TEXT
            );

            CREATE TABLE IF NOT EXISTS comment_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                post_id TEXT NOT NULL,
                action TEXT NOT NULL DEFAULT 'TRACK',
                notification INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                known_comment_ids TEXT NOT NULL DEFAULT '[]',
                last_checked TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (account_id, post_id)
            );
            ",
        )
        .map_err(store_err)?;
        Ok(())
    }

    // ─── Proxies ──────────────────────────────────────

    /// Insert a proxy with an initial status.
    pub fn add_proxy(
        &self,
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        status: ProxyStatus,
    ) -> Result<Proxy> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO proxies (host, port, username, password, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![host, port, username, password, status.as_str()],
        )
        .map_err(store_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_proxy(id)?
            .ok_or_else(|| GuardPostError::Store("proxy vanished after insert".into()))
    }

    pub fn get_proxy(&self, id: i64) -> Result<Option<Proxy>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, host, port, username, password, status, account_id, last_checked
             FROM proxies WHERE id = ?1",
            [id],
            row_to_proxy,
        )
        .optional()
        .map_err(store_err)
    }

    /// All proxies, optionally filtered by status.
    pub fn list_proxies(&self, status: Option<ProxyStatus>) -> Result<Vec<Proxy>> {
        let conn = self.conn.lock().unwrap();
        let mut out = Vec::new();
        match status {
            Some(s) => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, host, port, username, password, status, account_id, last_checked
                         FROM proxies WHERE status = ?1 ORDER BY id",
                    )
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map([s.as_str()], row_to_proxy)
                    .map_err(store_err)?;
                for row in rows {
                    out.push(row.map_err(store_err)?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, host, port, username, password, status, account_id, last_checked
                         FROM proxies ORDER BY id",
                    )
                    .map_err(store_err)?;
                let rows = stmt.query_map([], row_to_proxy).map_err(store_err)?;
                for row in rows {
                    out.push(row.map_err(store_err)?);
                }
            }
        }
        Ok(out)
    }

    /// Record a health-check outcome: status plus last_checked.
    pub fn record_check(&self, id: i64, status: ProxyStatus, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE proxies SET status = ?1, last_checked = ?2 WHERE id = ?3",
            rusqlite::params![status.as_str(), at.to_rfc3339(), id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    /// Arbitrary unbound ACTIVE proxy, if one exists.
    pub fn find_free_active_proxy(&self) -> Result<Option<Proxy>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, host, port, username, password, status, account_id, last_checked
             FROM proxies WHERE account_id IS NULL AND status = 'ACTIVE' LIMIT 1",
            [],
            row_to_proxy,
        )
        .optional()
        .map_err(store_err)
    }

    /// Bind a proxy to an existing account. Atomic: the unbound check
    /// and the bind happen inside one transaction, so no reader can
    /// observe a half-updated binding.
    pub fn bind_proxy(&self, proxy_id: i64, account_id: i64) -> Result<Proxy> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;

        let bound_to: Option<Option<i64>> = tx
            .query_row(
                "SELECT account_id FROM proxies WHERE id = ?1",
                [proxy_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        let bound_to = bound_to
            .ok_or_else(|| GuardPostError::NotFound(format!("proxy {proxy_id}")))?;
        if let Some(other) = bound_to {
            if other != account_id {
                return Err(GuardPostError::Conflict(format!(
                    "proxy {proxy_id} is already bound to account {other}"
                )));
            }
        }

        let account_exists: Option<i64> = tx
            .query_row("SELECT id FROM accounts WHERE id = ?1", [account_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(store_err)?;
        if account_exists.is_none() {
            return Err(GuardPostError::NotFound(format!("account {account_id}")));
        }

        tx.execute(
            "UPDATE proxies SET account_id = ?1 WHERE id = ?2",
            rusqlite::params![account_id, proxy_id],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        drop(conn);

        self.get_proxy(proxy_id)?
            .ok_or_else(|| GuardPostError::NotFound(format!("proxy {proxy_id}")))
    }

    /// Release a proxy from whatever account holds it.
    pub fn unbind_proxy(&self, proxy_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("UPDATE proxies SET account_id = NULL WHERE id = ?1", [proxy_id])
            .map_err(store_err)?;
        if changed == 0 {
            return Err(GuardPostError::NotFound(format!("proxy {proxy_id}")));
        }
        Ok(())
    }

    pub fn delete_proxy(&self, proxy_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM proxies WHERE id = ?1", [proxy_id])
            .map_err(store_err)?;
        if changed == 0 {
            return Err(GuardPostError::NotFound(format!("proxy {proxy_id}")));
        }
        Ok(())
    }

    // ─── Accounts ──────────────────────────────────────

    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, platform_user_id, name, credential
             FROM accounts WHERE id = ?1",
            [id],
            row_to_account,
        )
        .optional()
        .map_err(store_err)
    }

    /// The proxy currently bound to an account, if any.
    pub fn proxy_for_account(&self, account_id: i64) -> Result<Option<Proxy>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, host, port, username, password, status, account_id, last_checked
             FROM proxies WHERE account_id = ?1",
            [account_id],
            row_to_proxy,
        )
        .optional()
        .map_err(store_err)
    }

    /// Upsert an account by platform id, bind the chosen proxy, and
    /// upsert its sub-accounts — all in one transaction. No reader can
    /// observe the account without its binding or sub-accounts.
    pub fn upsert_account_with_proxy(
        &self,
        user_id: i64,
        platform_user_id: &str,
        name: &str,
        credential: &str,
        proxy_id: Option<i64>,
        sub_accounts: &[SubAccount],
    ) -> Result<Account> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;

        tx.execute(
            "INSERT INTO accounts (user_id, platform_user_id, name, credential)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(platform_user_id)
             DO UPDATE SET name = excluded.name, credential = excluded.credential",
            rusqlite::params![user_id, platform_user_id, name, credential],
        )
        .map_err(store_err)?;

        let account_id: i64 = tx
            .query_row(
                "SELECT id FROM accounts WHERE platform_user_id = ?1",
                [platform_user_id],
                |row| row.get(0),
            )
            .map_err(store_err)?;

        if let Some(proxy_id) = proxy_id {
            let changed = tx
                .execute(
                    "UPDATE proxies SET account_id = ?1
                     WHERE id = ?2 AND (account_id IS NULL OR account_id = ?1)",
                    rusqlite::params![account_id, proxy_id],
                )
                .map_err(store_err)?;
            if changed == 0 {
                // Rolls back the whole upsert on drop.
                return Err(GuardPostError::Conflict(format!(
                    "proxy {proxy_id} is bound to another account"
                )));
            }
        }

        for sub in sub_accounts {
            tx.execute(
                "INSERT INTO sub_accounts
                     (platform_id, account_id, name, status, currency, timezone, business_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(platform_id) DO UPDATE SET
                     name = excluded.name,
                     status = excluded.status,
                     currency = excluded.currency,
                     timezone = excluded.timezone,
                     business_id = excluded.business_id",
                rusqlite::params![
                    sub.platform_id,
                    account_id,
                    sub.name,
                    sub.status,
                    sub.currency,
                    sub.timezone,
                    sub.business_id,
                ],
            )
            .map_err(store_err)?;
        }

        tx.commit().map_err(store_err)?;
        drop(conn);

        self.get_account(account_id)?
            .ok_or_else(|| GuardPostError::Store("account vanished after upsert".into()))
    }

    // ─── Comment tasks ──────────────────────────────────────

    /// Create a tracking task. One task per (account, post) pair —
    /// a duplicate is a Conflict.
    pub fn create_task(
        &self,
        account_id: i64,
        post_id: &str,
        action: ActionMode,
        notification: bool,
    ) -> Result<CommentTask> {
        let conn = self.conn.lock().unwrap();
        let user_id: Option<i64> = conn
            .query_row("SELECT user_id FROM accounts WHERE id = ?1", [account_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(store_err)?;
        let user_id =
            user_id.ok_or_else(|| GuardPostError::NotFound(format!("account {account_id}")))?;

        let result = conn.execute(
            "INSERT INTO comment_tasks
                 (user_id, account_id, post_id, action, notification, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                user_id,
                account_id,
                post_id,
                action.as_str(),
                notification as i32,
                Utc::now().to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(GuardPostError::Conflict(format!(
                    "task for account {account_id} and post {post_id} already exists"
                )));
            }
            Err(e) => return Err(store_err(e)),
        }
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_task(id)?
            .ok_or_else(|| GuardPostError::Store("task vanished after insert".into()))
    }

    pub fn get_task(&self, id: i64) -> Result<Option<CommentTask>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, account_id, post_id, action, notification, active,
                    known_comment_ids, last_checked, created_at
             FROM comment_tasks WHERE id = ?1",
            [id],
            row_to_task,
        )
        .optional()
        .map_err(store_err)
    }

    /// All active tasks — the bootstrap set.
    pub fn list_active_tasks(&self) -> Result<Vec<CommentTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, account_id, post_id, action, notification, active,
                        known_comment_ids, last_checked, created_at
                 FROM comment_tasks WHERE active = 1 ORDER BY id",
            )
            .map_err(store_err)?;
        let rows = stmt.query_map([], row_to_task).map_err(store_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err)?);
        }
        Ok(out)
    }

    pub fn set_task_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE comment_tasks SET active = ?1 WHERE id = ?2",
                rusqlite::params![active as i32, id],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(GuardPostError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    /// Enlarge the known set by `new_ids` (idempotent union — the set
    /// never shrinks) and advance the checkpoint, atomically.
    pub fn append_known_comments(&self, id: i64, new_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT known_comment_ids FROM comment_tasks WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        let stored = stored.ok_or_else(|| GuardPostError::NotFound(format!("task {id}")))?;

        let mut known: Vec<String> = serde_json::from_str(&stored).unwrap_or_default();
        for new_id in new_ids {
            if !known.iter().any(|k| k == new_id) {
                known.push(new_id.clone());
            }
        }

        tx.execute(
            "UPDATE comment_tasks SET known_comment_ids = ?1, last_checked = ?2 WHERE id = ?3",
            rusqlite::params![
                serde_json::to_string(&known).unwrap_or_else(|_| "[]".into()),
                Utc::now().to_rfc3339(),
                id,
            ],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        Ok(())
    }

    /// Advance the checkpoint without touching the known set.
    pub fn touch_task(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE comment_tasks SET last_checked = ?1 WHERE id = ?2",
                rusqlite::params![Utc::now().to_rfc3339(), id],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(GuardPostError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM comment_tasks WHERE id = ?1", [id])
            .map_err(store_err)?;
        if changed == 0 {
            return Err(GuardPostError::NotFound(format!("task {id}")));
        }
        Ok(())
    }
}

fn row_to_proxy(row: &rusqlite::Row<'_>) -> rusqlite::Result<Proxy> {
    let status: String = row.get(5)?;
    let last_checked: Option<String> = row.get(7)?;
    Ok(Proxy {
        id: row.get(0)?,
        host: row.get(1)?,
        port: row.get(2)?,
        username: row.get(3)?,
        password: row.get(4)?,
        status: ProxyStatus::parse(&status),
        account_id: row.get(6)?,
        last_checked: last_checked
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
    })
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        platform_user_id: row.get(2)?,
        name: row.get(3)?,
        credential: row.get(4)?,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentTask> {
    let action: String = row.get(4)?;
    let known: String = row.get(7)?;
    let last_checked: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    Ok(CommentTask {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        post_id: row.get(3)?,
        action: ActionMode::parse(&action),
        notification: row.get::<_, i32>(5)? != 0,
        active: row.get::<_, i32>(6)? != 0,
        known_comment_ids: serde_json::from_str(&known).unwrap_or_default(),
        last_checked: last_checked
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_account(store: &Store, platform_id: &str) -> Account {
        store
            .upsert_account_with_proxy(1, platform_id, "Test Account", "bundle", None, &[])
            .unwrap()
    }

    #[test]
    fn proxy_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let proxy = store
            .add_proxy("10.0.0.1", 1080, Some("u"), Some("p"), ProxyStatus::Active)
            .unwrap();
        let loaded = store.get_proxy(proxy.id).unwrap().unwrap();
        assert_eq!(loaded.host, "10.0.0.1");
        assert_eq!(loaded.status, ProxyStatus::Active);
        assert!(loaded.account_id.is_none());
    }

    #[test]
    fn bind_conflict_leaves_prior_binding_intact() {
        let store = Store::open_in_memory().unwrap();
        let a1 = seed_account(&store, "fb-1");
        let a2 = seed_account(&store, "fb-2");
        let proxy = store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
            .unwrap();

        store.bind_proxy(proxy.id, a1.id).unwrap();
        let err = store.bind_proxy(proxy.id, a2.id).unwrap_err();
        assert!(matches!(err, GuardPostError::Conflict(_)));

        let loaded = store.get_proxy(proxy.id).unwrap().unwrap();
        assert_eq!(loaded.account_id, Some(a1.id));
    }

    #[test]
    fn bind_missing_proxy_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let account = seed_account(&store, "fb-1");
        let err = store.bind_proxy(999, account.id).unwrap_err();
        assert!(matches!(err, GuardPostError::NotFound(_)));
    }

    #[test]
    fn upsert_account_binds_proxy_and_sub_accounts_atomically() {
        let store = Store::open_in_memory().unwrap();
        let proxy = store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
            .unwrap();
        let subs = vec![SubAccount {
            platform_id: "act_1".into(),
            name: "Main".into(),
            status: "ACTIVE".into(),
            currency: Some("USD".into()),
            timezone: Some("UTC".into()),
            business_id: None,
        }];
        let account = store
            .upsert_account_with_proxy(7, "fb-9", "Niner", "bundle", Some(proxy.id), &subs)
            .unwrap();

        let bound = store.proxy_for_account(account.id).unwrap().unwrap();
        assert_eq!(bound.id, proxy.id);

        // Re-upsert with the proxy bound elsewhere must roll back the
        // whole unit — name stays from the first write.
        let other = seed_account(&store, "fb-other");
        let err = store
            .upsert_account_with_proxy(7, "fb-other", "Renamed", "bundle2", Some(proxy.id), &[])
            .unwrap_err();
        assert!(matches!(err, GuardPostError::Conflict(_)));
        let reloaded = store.get_account(other.id).unwrap().unwrap();
        assert_eq!(reloaded.name, "Test Account");
    }

    #[test]
    fn duplicate_task_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        let account = seed_account(&store, "fb-1");
        store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap();
        let err = store
            .create_task(account.id, "post-1", ActionMode::Delete, true)
            .unwrap_err();
        assert!(matches!(err, GuardPostError::Conflict(_)));
    }

    #[test]
    fn known_set_union_is_idempotent_and_monotonic() {
        let store = Store::open_in_memory().unwrap();
        let account = seed_account(&store, "fb-1");
        let task = store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap();

        store
            .append_known_comments(task.id, &["c1".into(), "c2".into()])
            .unwrap();
        store
            .append_known_comments(task.id, &["c2".into(), "c3".into()])
            .unwrap();

        let loaded = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded.known_comment_ids, vec!["c1", "c2", "c3"]);
        assert!(loaded.last_checked.is_some());
    }

    #[test]
    fn touch_advances_checkpoint_only() {
        let store = Store::open_in_memory().unwrap();
        let account = seed_account(&store, "fb-1");
        let task = store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap();
        store
            .append_known_comments(task.id, &["c1".into()])
            .unwrap();
        store.touch_task(task.id).unwrap();
        let loaded = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded.known_comment_ids, vec!["c1"]);
        assert!(loaded.last_checked.is_some());
    }

    #[test]
    fn delete_removes_the_record_and_missing_ids_are_not_found() {
        let store = Store::open_in_memory().unwrap();
        let account = seed_account(&store, "fb-1");
        let proxy = store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
            .unwrap();
        let task = store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap();

        store.delete_task(task.id).unwrap();
        assert!(store.get_task(task.id).unwrap().is_none());
        store.delete_proxy(proxy.id).unwrap();
        assert!(store.get_proxy(proxy.id).unwrap().is_none());

        assert!(matches!(
            store.delete_task(task.id).unwrap_err(),
            GuardPostError::NotFound(_)
        ));
        assert!(matches!(
            store.delete_proxy(proxy.id).unwrap_err(),
            GuardPostError::NotFound(_)
        ));
    }

    #[test]
    fn deactivated_task_leaves_bootstrap_set() {
        let store = Store::open_in_memory().unwrap();
        let account = seed_account(&store, "fb-1");
        let t1 = store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap();
        store
            .create_task(account.id, "post-2", ActionMode::Hide, false)
            .unwrap();

        store.set_task_active(t1.id, false).unwrap();
        let active = store.list_active_tasks().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].post_id, "post-2");
        // History survives deactivation.
        assert!(store.get_task(t1.id).unwrap().is_some());
    }
}
