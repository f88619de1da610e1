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

//! Authenticator data parsing.
//!
//! Layout: rpIdHash (32) | flags (1) | signCount (4, big endian) |
//! [aaguid (16) | credIdLen (2) | credId | COSE key] | [extensions].

use aws_lc_rs::digest::{self, SHA256};

use crate::error::{Error, Result};

/// User present.
pub const FLAG_UP: u8 = 0x01;
/// User verified.
pub const FLAG_UV: u8 = 0x04;
/// Attested credential data included.
pub const FLAG_AT: u8 = 0x40;
/// Extension data included.
pub const FLAG_ED: u8 = 0x80;

const HEADER_LEN: usize = 37;
const AAGUID_LEN: usize = 16;

/// Credential material from a registration response.
#[derive(Debug, Clone)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    /// The COSE-encoded public key, exactly as the authenticator sent it.
    pub public_key: Vec<u8>,
}

/// Parsed authenticator data.
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parses raw authenticator data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the data is truncated, if the AT
    /// flag promises credential data that is not there, or if bytes remain
    /// after the declared sections.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::malformed("authenticator data too short"));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let flags = bytes[32];
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let mut rest = &bytes[HEADER_LEN..];

        let attested_credential = if flags & FLAG_AT != 0 {
            Some(Self::parse_attested_credential(&mut rest)?)
        } else {
            None
        };

        if flags & FLAG_ED != 0 {
            // Extension outputs are not interpreted, only skipped.
            let _: ciborium::Value = ciborium::from_reader(&mut rest)
                .map_err(|e| Error::malformed(format!("invalid extension data: {}", e)))?;
        }

        if !rest.is_empty() {
            return Err(Error::malformed("trailing bytes in authenticator data"));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }

    fn parse_attested_credential(rest: &mut &[u8]) -> Result<AttestedCredentialData> {
        if rest.len() < AAGUID_LEN + 2 {
            return Err(Error::malformed("attested credential data too short"));
        }

        let mut aaguid = [0u8; AAGUID_LEN];
        aaguid.copy_from_slice(&rest[..AAGUID_LEN]);
        let cred_id_len = u16::from_be_bytes([rest[AAGUID_LEN], rest[AAGUID_LEN + 1]]) as usize;
        *rest = &rest[AAGUID_LEN + 2..];

        if cred_id_len == 0 || rest.len() < cred_id_len {
            return Err(Error::malformed("invalid credential ID length"));
        }
        let credential_id = rest[..cred_id_len].to_vec();
        *rest = &rest[cred_id_len..];

        // The COSE key has no length prefix; decoding it tells us where it ends.
        let before = *rest;
        let _: ciborium::Value = ciborium::from_reader(&mut *rest)
            .map_err(|e| Error::malformed(format!("failed to parse COSE key: {}", e)))?;
        let consumed = before.len() - rest.len();
        let public_key = before[..consumed].to_vec();

        Ok(AttestedCredentialData {
            aaguid,
            credential_id,
            public_key,
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_UP != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_UV != 0
    }

    /// Checks that this data was produced for `rp_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RelyingPartyIdMismatch`] if the embedded hash is not
    /// SHA-256 of `rp_id`.
    pub fn verify_rp_id(&self, rp_id: &str) -> Result<()> {
        let expected = digest::digest(&SHA256, rp_id.as_bytes());
        if expected.as_ref() != self.rp_id_hash {
            return Err(Error::RelyingPartyIdMismatch);
        }
        Ok(())
    }

    /// Checks the presence flag and, when `require_uv` is set, the
    /// verification flag.
    pub fn verify_user(&self, require_uv: bool) -> Result<()> {
        if !self.user_present() {
            return Err(Error::UserNotPresent);
        }
        if require_uv && !self.user_verified() {
            return Err(Error::UserNotVerified);
        }
        Ok(())
    }
}
