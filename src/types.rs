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

//! Records, policy enums and descriptors shared by both ceremonies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encoding::Base64UrlBytes;

/// Credential type string used on the wire.
pub const PUBLIC_KEY_TYPE: &str = "public-key";

/// Attestation conveyance preference for registration.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    /// No attestation information is requested.
    None,
    /// Attestation information may be provided if available.
    Indirect,
    /// Direct attestation from the authenticator is requested.
    Direct,
    /// Enterprise attestation is requested (for managed devices).
    Enterprise,
}

/// Whether the authenticator should create a discoverable credential.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    Required,
}

/// User verification policy (PIN, biometric) for both ceremonies.
///
/// Only `Required` is enforced server side; the other values are hints to
/// the client.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    Preferred,
    Discouraged,
}

/// A minimal user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable unique identifier.
    pub id: Uuid,

    /// Display name. Uniqueness is up to the user directory.
    pub username: String,
}

impl User {
    pub fn new(username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    /// The protocol-level user ID handed to authenticators.
    pub fn handle(&self) -> UserHandle {
        UserHandle::from(self.id)
    }
}

/// Opaque protocol user ID, derived from the user's UUID bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserHandle(Vec<u8>);

impl UserHandle {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Uuid> for UserHandle {
    fn from(id: Uuid) -> Self {
        Self(id.as_bytes().to_vec())
    }
}

/// A persisted credential.
///
/// `owner_user_id` is fixed at creation. Only `sign_count` changes afterwards.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Authenticator-assigned identifier, unique across the repository.
    pub credential_id: Vec<u8>,

    /// The public key in COSE format; it carries its own algorithm label.
    pub public_key: Vec<u8>,

    /// Last accepted signature counter.
    pub sign_count: u32,

    /// The user this credential belongs to.
    pub owner_user_id: Uuid,
}

/// Relying party descriptor sent in registration options.
#[derive(Serialize, Debug)]
pub struct RpEntity {
    pub id: String,
    pub name: String,
}

/// User descriptor sent in registration options.
#[derive(Clone, Serialize, Debug)]
pub struct UserEntity {
    /// The user handle.
    pub id: Base64UrlBytes,

    pub name: String,

    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// An acceptable public key algorithm.
#[derive(Serialize, Debug)]
pub struct PubKeyCredParam {
    /// COSE algorithm identifier (e.g., -7 for ES256).
    pub alg: i64,

    #[serde(rename = "type")]
    pub type_: &'static str,
}

/// Authenticator selection criteria for registration.
#[derive(Serialize, Debug)]
pub struct AuthenticatorSelection {
    #[serde(rename = "residentKey")]
    pub resident_key: ResidentKeyRequirement,

    #[serde(rename = "userVerification")]
    pub user_verification: UserVerificationRequirement,
}

/// A credential named in `excludeCredentials` or `allowCredentials`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub id: Base64UrlBytes,

    #[serde(rename = "type")]
    pub type_: &'static str,
}

impl CredentialDescriptor {
    pub fn public_key(id: &[u8]) -> Self {
        Self {
            id: Base64UrlBytes::from(id),
            type_: PUBLIC_KEY_TYPE,
        }
    }
}
