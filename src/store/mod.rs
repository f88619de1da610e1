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

//! Collaborator contracts: session storage, credential records and users.
//!
//! The ceremony code only talks to these traits. [`memory`] provides
//! implementations suitable for tests and single-process deployments.

pub mod memory;

pub use memory::{MemoryCredentialRepository, MemorySessionStore, MemoryUserDirectory};

use uuid::Uuid;

use crate::error::Result;
use crate::types::{CredentialRecord, User};

/// Session key holding a pending registration challenge.
pub const REGISTRATION_KEY: &str = "registration";

/// Session key holding a pending authentication challenge.
pub const AUTHENTICATION_KEY: &str = "authentication";

/// Per-session key-value storage that outlives a single request.
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<()>;

    fn delete(&self, session_id: &str, key: &str) -> Result<()>;

    /// Reads and removes a value in one atomic step.
    ///
    /// Two concurrent calls for the same session and key must not both
    /// observe the value.
    fn take(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Durable storage of credential records, keyed by credential ID.
pub trait CredentialRepository: Send + Sync {
    /// Inserts a new record.
    ///
    /// Fails with [`Error::DuplicateCredentialId`](crate::Error::DuplicateCredentialId)
    /// instead of overwriting an existing record.
    fn persist_new_credential(&self, record: CredentialRecord) -> Result<()>;

    fn lookup_by_credential_id(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>>;

    /// Replaces the stored counter with `new_count` only if it still equals
    /// `expected`.
    ///
    /// This is the serialization point for concurrent authentications of
    /// one credential: the loser gets
    /// [`Error::SignCountRegression`](crate::Error::SignCountRegression).
    /// An unknown ID gives [`Error::UnknownCredential`](crate::Error::UnknownCredential).
    fn update_sign_count(&self, credential_id: &[u8], expected: u32, new_count: u32)
    -> Result<()>;

    /// All credentials owned by `user_id`.
    fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<CredentialRecord>>;
}

/// User accounts.
pub trait UserDirectory: Send + Sync {
    fn create(&self, username: &str) -> Result<User>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Answers whether a credential ID is still free during registration.
///
/// Any `Fn(&[u8]) -> bool` closure qualifies; [`Unregistered`] adapts a
/// [`CredentialRepository`].
pub trait CredentialIdCheck {
    fn is_unregistered(&self, credential_id: &[u8]) -> Result<bool>;
}

impl<F> CredentialIdCheck for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_unregistered(&self, credential_id: &[u8]) -> Result<bool> {
        Ok(self(credential_id))
    }
}

/// [`CredentialIdCheck`] backed by a repository lookup.
pub struct Unregistered<'a, R: ?Sized>(pub &'a R);

impl<R: CredentialRepository + ?Sized> CredentialIdCheck for Unregistered<'_, R> {
    fn is_unregistered(&self, credential_id: &[u8]) -> Result<bool> {
        Ok(self.0.lookup_by_credential_id(credential_id)?.is_none())
    }
}
