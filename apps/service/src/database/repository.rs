use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Row, params};
use uuid::Uuid;

use super::models::{Owner, i64_to_timestamp, timestamp_to_i64};
use crate::monitoring::types::{Target, TargetStatus};
use crate::pool::{LibsqlManager, LibsqlPool};

/// Read/write contract the monitoring engine needs from persistence
///
/// Implementations must be safe to call from many workers at once; the engine
/// holds no locks of its own around these calls.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Every registered target, in no particular order
    async fn list_all(&self) -> Result<Vec<Target>>;

    /// Targets registered by one owner, newest first
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Target>>;

    /// Current stored state of one target
    async fn read_one(&self, id: Uuid) -> Result<Option<Target>>;

    /// Record a fresh status and stamp the last-checked time
    async fn write_status(&self, id: Uuid, status: TargetStatus) -> Result<()>;
}

/// Lookup used by notifiers to find where an owner wants alerts
#[async_trait]
pub trait OwnerStore: Send + Sync {
    async fn get_owner(&self, id: Uuid) -> Result<Option<Owner>>;
}

const TARGET_COLUMNS: &str = "id, url, owner_id, last_status, last_checked, created_at";

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        self.pool.get().await.map_err(|e| anyhow!("database pool checkout failed: {e}"))
    }

    async fn query_targets(&self, sql: &str, params: impl libsql::params::IntoParams + Send) -> Result<Vec<Target>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;
        let mut targets = Vec::new();

        while let Some(row) = rows.next().await? {
            targets.push(target_from_row(&row)?);
        }

        Ok(targets)
    }

    /// Register an owner
    pub async fn create_owner(&self, owner: &Owner) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO owners (id, username, telegram_chat_id, created_at) VALUES (?, ?, ?, ?)",
            params![
                owner.id.to_string(),
                owner.username.clone(),
                owner.telegram_chat_id,
                timestamp_to_i64(owner.created_at)
            ],
        )
        .await?;
        Ok(())
    }

    /// Link or unlink the chat an owner receives alerts in
    pub async fn link_telegram_chat(&self, owner_id: Uuid, chat_id: Option<i64>) -> Result<()> {
        let conn = self.get_conn().await?;
        let changed = conn
            .execute(
                "UPDATE owners SET telegram_chat_id = ? WHERE id = ?",
                params![chat_id, owner_id.to_string()],
            )
            .await?;

        if changed == 0 {
            return Err(anyhow!("owner {owner_id} not found"));
        }
        Ok(())
    }

    /// Register a target; its stored status starts as whatever the value holds
    pub async fn create_target(&self, target: &Target) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO targets (id, url, owner_id, last_status, last_checked, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                target.id.to_string(),
                target.url.clone(),
                target.owner_id.to_string(),
                target.status.as_str(),
                target.last_checked.map(timestamp_to_i64),
                timestamp_to_i64(target.created_at)
            ],
        )
        .await?;
        Ok(())
    }

    /// Delete a target if it belongs to `owner_id`; returns whether a row went away
    pub async fn delete_target(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM targets WHERE id = ? AND owner_id = ?",
                params![id.to_string(), owner_id.to_string()],
            )
            .await?;
        Ok(deleted > 0)
    }
}

fn target_from_row(row: &Row) -> Result<Target> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(2)?;
    let status: String = row.get(3)?;
    let last_checked: Option<i64> = row.get(4)?;
    let created_at: i64 = row.get(5)?;

    Ok(Target {
        id: Uuid::parse_str(&id)?,
        url: row.get(1)?,
        owner_id: Uuid::parse_str(&owner_id)?,
        status: status.parse()?,
        last_checked: last_checked.map(i64_to_timestamp),
        created_at: i64_to_timestamp(created_at),
    })
}

#[async_trait]
impl TargetStore for DatabaseImpl {
    async fn list_all(&self) -> Result<Vec<Target>> {
        self.query_targets(&format!("SELECT {TARGET_COLUMNS} FROM targets"), ()).await
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Target>> {
        self.query_targets(
            &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE owner_id = ? ORDER BY created_at DESC"),
            params![owner_id.to_string()],
        )
        .await
    }

    async fn read_one(&self, id: Uuid) -> Result<Option<Target>> {
        let mut targets = self
            .query_targets(
                &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?"),
                params![id.to_string()],
            )
            .await?;
        Ok(targets.pop())
    }

    async fn write_status(&self, id: Uuid, status: TargetStatus) -> Result<()> {
        let conn = self.get_conn().await?;
        let changed = conn
            .execute(
                "UPDATE targets SET last_status = ?, last_checked = ? WHERE id = ?",
                params![status.as_str(), Utc::now().timestamp(), id.to_string()],
            )
            .await?;

        if changed == 0 {
            return Err(anyhow!("target {id} not found"));
        }
        Ok(())
    }
}

#[async_trait]
impl OwnerStore for DatabaseImpl {
    async fn get_owner(&self, id: Uuid) -> Result<Option<Owner>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, username, telegram_chat_id, created_at FROM owners WHERE id = ?",
                params![id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let owner_id: String = row.get(0)?;
            let created_at: i64 = row.get(3)?;

            Ok(Some(Owner {
                id: Uuid::parse_str(&owner_id)?,
                username: row.get(1)?,
                telegram_chat_id: row.get(2)?,
                created_at: i64_to_timestamp(created_at),
            }))
        } else {
            Ok(None)
        }
    }
}
