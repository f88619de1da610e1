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

//! Passkey authentication functionality.

use serde::{Deserialize, Serialize};

use crate::Passgate;
use crate::authenticator_data::AuthenticatorData;
use crate::challenge::Challenge;
use crate::client_data::{ClientData, ClientDataType};
use crate::cose::CoseKey;
use crate::encoding::Base64UrlBytes;
use crate::error::{Error, Result};
use crate::registration::check_credential_envelope;
use crate::types::*;

/// Authentication options sent to the client, ready for
/// `navigator.credentials.get()`.
#[derive(Serialize, Debug)]
pub struct AuthenticationOptions {
    #[serde(rename = "publicKey")]
    pub public_key: PublicKeyCredentialRequestOptions,
}

/// The `publicKey` member of [`AuthenticationOptions`].
#[derive(Serialize, Debug)]
pub struct PublicKeyCredentialRequestOptions {
    pub challenge: Base64UrlBytes,

    /// Timeout in milliseconds.
    pub timeout: u64,

    #[serde(rename = "rpId")]
    pub rp_id: String,

    /// Credentials the client may use. Left out of the JSON when empty,
    /// which lets the browser offer any discoverable credential.
    #[serde(rename = "allowCredentials", skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<CredentialDescriptor>,

    #[serde(rename = "userVerification")]
    pub user_verification: UserVerificationRequirement,
}

/// Credential returned by `navigator.credentials.get()`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthenticationCredential {
    /// The credential ID, base64url-encoded.
    pub id: String,

    #[serde(rename = "rawId")]
    pub raw_id: Base64UrlBytes,

    pub response: AuthenticatorAssertionResponse,

    #[serde(rename = "type")]
    pub type_: String,
}

/// The `response` member of an [`AuthenticationCredential`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,

    #[serde(rename = "authenticatorData")]
    pub authenticator_data: Base64UrlBytes,

    /// Signature over `authenticatorData || SHA-256(clientDataJSON)`.
    pub signature: Base64UrlBytes,

    /// Present for discoverable credentials.
    #[serde(rename = "userHandle", default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Base64UrlBytes>,
}

impl AuthenticatorAssertionResponse {
    /// The returned user handle, treating an empty value as absent.
    pub fn user_handle(&self) -> Option<&[u8]> {
        self.user_handle
            .as_deref()
            .filter(|handle| !handle.is_empty())
    }
}

impl Passgate {
    /// Starts an authentication ceremony.
    ///
    /// An empty `allowed_credential_ids` produces discoverable mode: no
    /// allow-list is sent and the client may present any credential it
    /// holds for this relying party.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if no challenge could be generated.
    pub fn begin_authentication(
        &self,
        allowed_credential_ids: &[Vec<u8>],
    ) -> Result<(AuthenticationOptions, Challenge)> {
        let challenge = Challenge::generate()?;

        let options = PublicKeyCredentialRequestOptions {
            challenge: Base64UrlBytes::from(challenge.as_bytes()),
            timeout: self.timeout,
            rp_id: self.rp.id().to_string(),
            allow_credentials: allowed_credential_ids
                .iter()
                .map(|id| CredentialDescriptor::public_key(id))
                .collect(),
            user_verification: self.user_verification,
        };

        Ok((
            AuthenticationOptions {
                public_key: options,
            },
            challenge,
        ))
    }

    /// Completes an authentication ceremony.
    ///
    /// Applies the same client data, RP ID and user presence gates as
    /// registration, then verifies the assertion signature with
    /// `stored_public_key` and enforces the counter rule against
    /// `stored_sign_count`.
    ///
    /// # Returns
    ///
    /// The counter to store for this credential. The caller persists it; that
    /// write ends a successful ceremony.
    ///
    /// # Errors
    ///
    /// Any failed gate aborts the ceremony; see [`Error`]. A counter that did
    /// not increase is always [`Error::SignCountRegression`].
    pub fn finish_authentication(
        &self,
        expected_challenge: &Challenge,
        credential: &AuthenticationCredential,
        stored_public_key: &[u8],
        stored_sign_count: u32,
    ) -> Result<u32> {
        check_credential_envelope(&credential.id, &credential.raw_id, &credential.type_)?;

        let response = &credential.response;
        let client_data = ClientData::from_bytes(&response.client_data_json)?;
        client_data.verify(
            ClientDataType::Get,
            expected_challenge.as_bytes(),
            self.rp.origin(),
        )?;

        let auth_data = AuthenticatorData::from_bytes(&response.authenticator_data)?;
        auth_data.verify_rp_id(self.rp.id())?;
        auth_data.verify_user(self.requires_user_verification())?;

        let key = CoseKey::from_bytes(stored_public_key)?;
        let mut signed_data = response.authenticator_data.to_vec();
        signed_data.extend_from_slice(&client_data.hash);
        key.verify(&signed_data, &response.signature)?;

        next_sign_count(stored_sign_count, auth_data.sign_count)
    }
}

/// Applies the anti-replay rule.
///
/// Two zero counters mean the authenticator does not count and are
/// accepted. Otherwise the reported counter must be strictly greater than
/// the stored one.
pub fn next_sign_count(stored: u32, reported: u32) -> Result<u32> {
    if stored == 0 && reported == 0 {
        return Ok(0);
    }
    if reported <= stored {
        return Err(Error::SignCountRegression { stored, reported });
    }
    Ok(reported)
}
