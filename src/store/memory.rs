// Copyright 2026 Grzegorz Blach
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory collaborators backed by `DashMap`.
//!
//! Per-key operations run under the map's shard lock, which gives `take`
//! and the counter compare-and-set their atomicity.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{CredentialRepository, SessionStore, UserDirectory};
use crate::error::{Error, Result};
use crate::types::{CredentialRecord, User};

/// Default lifetime of a session value (5 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

struct SessionEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Session store whose values expire after a fixed lifetime.
pub struct MemorySessionStore {
    entries: DashMap<(String, String), SessionEntry>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Drops every expired value.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "purged expired session values");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(session_id: &str, key: &str) -> (String, String) {
        (session_id.to_string(), key.to_string())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(&Self::key(session_id, key))
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(
            Self::key(session_id, key),
            SessionEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        self.entries.remove(&Self::key(session_id, key));
        Ok(())
    }

    fn take(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(&Self::key(session_id, key))
            .map(|(_, entry)| entry)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }
}

/// Credential repository held in memory.
#[derive(Default)]
pub struct MemoryCredentialRepository {
    records: DashMap<Vec<u8>, CredentialRecord>,
}

impl MemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialRepository for MemoryCredentialRepository {
    fn persist_new_credential(&self, record: CredentialRecord) -> Result<()> {
        match self.records.entry(record.credential_id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateCredentialId),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn lookup_by_credential_id(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>> {
        Ok(self
            .records
            .get(credential_id)
            .map(|entry| entry.value().clone()))
    }

    fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        new_count: u32,
    ) -> Result<()> {
        let mut record = self
            .records
            .get_mut(credential_id)
            .ok_or(Error::UnknownCredential)?;
        if record.sign_count != expected {
            return Err(Error::SignCountRegression {
                stored: record.sign_count,
                reported: new_count,
            });
        }
        record.sign_count = new_count;
        Ok(())
    }

    fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<CredentialRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.owner_user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// User directory held in memory.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<Uuid, User>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn create(&self, username: &str) -> Result<User> {
        let user = User::new(username);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }
}
