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

//! Client data parsing and verification for WebAuthn operations.

use std::fmt;

use aws_lc_rs::digest::{self, SHA256};
use serde::Deserialize;

use crate::encoding;
use crate::error::{Error, Result};

/// The ceremony a client data structure was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataType {
    /// Registration ("webauthn.create").
    Create,
    /// Authentication ("webauthn.get").
    Get,
}

impl ClientDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientDataType::Create => "webauthn.create",
            ClientDataType::Get => "webauthn.get",
        }
    }
}

impl fmt::Display for ClientDataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Deserialize)]
struct RawClientData {
    #[serde(rename = "type")]
    type_: String,
    challenge: String,
    origin: String,
    #[serde(rename = "crossOrigin", default)]
    cross_origin: bool,
}

/// Parsed `clientDataJSON`.
///
/// The `type_` field is kept as the raw string so that a foreign value
/// (say, "payment.get") is reported as a wrong ceremony type rather than a
/// parse error.
#[derive(Debug)]
pub struct ClientData {
    pub type_: String,

    /// The signed challenge, base64url-encoded.
    pub challenge: String,

    pub origin: String,

    pub cross_origin: bool,

    /// SHA-256 of the raw JSON, which is what the authenticator signs over.
    pub hash: [u8; 32],
}

impl ClientData {
    /// Parses client data from the raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the JSON does not parse or a
    /// required field is missing.
    pub fn from_bytes(bytes: &[u8]) -> Result<ClientData> {
        let raw: RawClientData = serde_json::from_slice(bytes)
            .map_err(|e| Error::malformed(format!("invalid client data JSON: {}", e)))?;

        let mut hash = [0u8; 32];
        hash.copy_from_slice(digest::digest(&SHA256, bytes).as_ref());

        Ok(ClientData {
            type_: raw.type_,
            challenge: raw.challenge,
            origin: raw.origin,
            cross_origin: raw.cross_origin,
            hash,
        })
    }

    /// Decodes and parses a base64url `clientDataJSON` field.
    #[inline]
    pub fn from_base64(client_data_json: &str) -> Result<ClientData> {
        let bytes = encoding::decode(client_data_json)?;
        Self::from_bytes(&bytes)
    }

    /// Applies the type, challenge and origin gates, in that order.
    ///
    /// `crossOrigin: true` fails the origin gate even when `origin` matches.
    ///
    /// # Errors
    ///
    /// * [`Error::WrongCeremonyType`] if `type` is not `expected_type`
    /// * [`Error::MalformedInput`] if the embedded challenge is not base64url
    /// * [`Error::ChallengeMismatch`] if the challenge differs
    /// * [`Error::OriginMismatch`] if the origin differs or the client reports
    ///   a cross-origin call
    pub fn verify(
        &self,
        expected_type: ClientDataType,
        expected_challenge: &[u8],
        expected_origin: &str,
    ) -> Result<()> {
        if self.type_ != expected_type.as_str() {
            return Err(Error::WrongCeremonyType {
                expected: expected_type.as_str(),
                actual: self.type_.clone(),
            });
        }

        let challenge = encoding::decode(&self.challenge)?;
        if challenge != expected_challenge {
            return Err(Error::ChallengeMismatch);
        }

        if self.origin != expected_origin {
            return Err(Error::OriginMismatch {
                expected: expected_origin.to_string(),
                actual: self.origin.clone(),
            });
        }

        // Ceremonies run from a page embedded by another origin are not accepted.
        if self.cross_origin {
            return Err(Error::OriginMismatch {
                expected: expected_origin.to_string(),
                actual: format!("{} (cross-origin)", self.origin),
            });
        }

        Ok(())
    }
}
