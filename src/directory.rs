//! User directory: persistence keyed by wallet identity.
//!
//! The auth service only needs two operations, insert-if-absent and lookup.
//! Deployments provide a database-backed [`UserDirectory`]; the in-memory
//! implementation here backs tests and single-process setups.

use crate::error::DirectoryError;
use crate::identity::Identity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

/// A user row as stored by the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert a user for `identity` unless one exists; return the stored row
    /// either way. Must be idempotent on identity.
    async fn insert_if_absent(&self, identity: &Identity) -> Result<UserRecord, DirectoryError>;

    /// Look up a user by wallet address.
    async fn get_by_identity(&self, identity: &str) -> Result<UserRecord, DirectoryError>;
}

/// In-memory directory.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<String, UserRecord>,
    next_id: AtomicI64,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn insert_if_absent(&self, identity: &Identity) -> Result<UserRecord, DirectoryError> {
        // entry() holds the shard lock, so concurrent inserts see one row
        let record = self
            .users
            .entry(identity.as_str().to_string())
            .or_insert_with(|| {
                let now = Utc::now();
                UserRecord {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    wallet_address: identity.as_str().to_string(),
                    created_at: now,
                    updated_at: now,
                }
            })
            .value()
            .clone();
        Ok(record)
    }

    async fn get_by_identity(&self, identity: &str) -> Result<UserRecord, DirectoryError> {
        self.users
            .get(identity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DirectoryError::NotFound(identity.to_string()))
    }
}
