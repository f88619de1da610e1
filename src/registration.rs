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

//! Passkey registration functionality.

use serde::{Deserialize, Serialize};

use crate::Passgate;
use crate::authenticator_data::AuthenticatorData;
use crate::challenge::Challenge;
use crate::client_data::{ClientData, ClientDataType};
use crate::cose::CoseKey;
use crate::encoding::{self, Base64UrlBytes};
use crate::error::{Error, Result};
use crate::store::CredentialIdCheck;
use crate::types::*;

/// Registration options sent to the client, ready for
/// `navigator.credentials.create()`.
#[derive(Serialize, Debug)]
pub struct RegistrationOptions {
    #[serde(rename = "publicKey")]
    pub public_key: PublicKeyCredentialCreationOptions,
}

/// The `publicKey` member of [`RegistrationOptions`].
#[derive(Serialize, Debug)]
pub struct PublicKeyCredentialCreationOptions {
    pub rp: RpEntity,

    pub user: UserEntity,

    pub challenge: Base64UrlBytes,

    /// Acceptable algorithms, in order of preference.
    #[serde(rename = "pubKeyCredParams")]
    pub pub_key_cred_params: Vec<PubKeyCredParam>,

    /// Timeout in milliseconds.
    pub timeout: u64,

    pub attestation: AttestationConveyancePreference,

    #[serde(rename = "authenticatorSelection")]
    pub authenticator_selection: AuthenticatorSelection,

    /// Credentials the user already owns; the authenticator refuses to
    /// register a second time if it holds one of them.
    #[serde(rename = "excludeCredentials")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
}

/// Credential returned by `navigator.credentials.create()`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegistrationCredential {
    /// The credential ID, base64url-encoded.
    pub id: String,

    #[serde(rename = "rawId")]
    pub raw_id: Base64UrlBytes,

    pub response: AuthenticatorAttestationResponse,

    /// Always "public-key".
    #[serde(rename = "type")]
    pub type_: String,
}

/// The `response` member of a [`RegistrationCredential`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,

    #[serde(rename = "attestationObject")]
    pub attestation_object: Base64UrlBytes,
}

impl Passgate {
    /// Starts a registration ceremony for `user`.
    ///
    /// `existing` lists credentials the user already owns; they are sent as
    /// `excludeCredentials`. The returned challenge must be kept in the
    /// session store before the options are sent to the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if no challenge could be generated.
    pub fn begin_registration(
        &self,
        user: &User,
        existing: &[CredentialRecord],
    ) -> Result<(RegistrationOptions, Challenge)> {
        let challenge = Challenge::generate()?;

        let exclude_credentials = existing
            .iter()
            .map(|record| CredentialDescriptor::public_key(&record.credential_id))
            .collect();

        let options = PublicKeyCredentialCreationOptions {
            rp: RpEntity {
                id: self.rp.id().to_string(),
                name: self.rp.name().to_string(),
            },
            user: UserEntity {
                id: Base64UrlBytes::from(user.handle().as_bytes()),
                name: user.username.clone(),
                display_name: user.username.clone(),
            },
            challenge: Base64UrlBytes::from(challenge.as_bytes()),
            pub_key_cred_params: self
                .algorithms
                .iter()
                .map(|alg| PubKeyCredParam {
                    alg: alg.id(),
                    type_: PUBLIC_KEY_TYPE,
                })
                .collect(),
            timeout: self.timeout,
            attestation: self.attestation,
            authenticator_selection: AuthenticatorSelection {
                resident_key: self.resident_key,
                user_verification: self.user_verification,
            },
            exclude_credentials,
        };

        Ok((
            RegistrationOptions {
                public_key: options,
            },
            challenge,
        ))
    }

    /// Completes a registration ceremony.
    ///
    /// Each check is a hard gate, applied in this order: client data type,
    /// challenge, origin, RP ID hash, user presence (and verification if
    /// required), credential ID availability, algorithm.
    ///
    /// `registry` answers whether the new credential ID is still free, so
    /// that an authenticator already bound to one account cannot be claimed
    /// by another.
    ///
    /// # Returns
    ///
    /// A [`CredentialRecord`] owned by `owner`, with the counter the
    /// authenticator reported (often 0).
    pub fn finish_registration(
        &self,
        expected_challenge: &Challenge,
        credential: &RegistrationCredential,
        owner: &User,
        registry: &impl CredentialIdCheck,
    ) -> Result<CredentialRecord> {
        check_credential_envelope(&credential.id, &credential.raw_id, &credential.type_)?;

        let client_data = ClientData::from_bytes(&credential.response.client_data_json)?;
        client_data.verify(
            ClientDataType::Create,
            expected_challenge.as_bytes(),
            self.rp.origin(),
        )?;

        let (fmt, auth_data_bytes) =
            Self::parse_attestation_object(&credential.response.attestation_object)?;
        tracing::debug!(fmt = %fmt, "attestation statement not verified");

        let auth_data = AuthenticatorData::from_bytes(&auth_data_bytes)?;
        auth_data.verify_rp_id(self.rp.id())?;
        auth_data.verify_user(self.requires_user_verification())?;

        let attested = auth_data
            .attested_credential
            .ok_or_else(|| Error::malformed("no attested credential data present"))?;
        if attested.credential_id != credential.raw_id.as_bytes() {
            return Err(Error::malformed(
                "attested credential ID does not match rawId",
            ));
        }

        if !registry.is_unregistered(&attested.credential_id)? {
            return Err(Error::CredentialAlreadyRegistered);
        }

        let key = CoseKey::from_bytes(&attested.public_key)?;
        if !self.algorithms.contains(&key.algorithm()) {
            return Err(Error::UnsupportedAlgorithm(key.algorithm().id()));
        }

        Ok(CredentialRecord {
            credential_id: attested.credential_id,
            public_key: attested.public_key,
            sign_count: auth_data.sign_count,
            owner_user_id: owner.id,
        })
    }

    /// Splits a CBOR attestation object into its format name and
    /// authenticator data.
    pub(crate) fn parse_attestation_object(attestation_bytes: &[u8]) -> Result<(String, Vec<u8>)> {
        let attestation: ciborium::Value = ciborium::from_reader(attestation_bytes)
            .map_err(|e| Error::malformed(format!("failed to parse attestation object: {}", e)))?;

        let map = attestation
            .as_map()
            .ok_or_else(|| Error::malformed("attestation object is not a map"))?;
        let field = |name: &str| {
            map.iter()
                .find(|(k, _)| k.as_text() == Some(name))
                .map(|(_, v)| v)
        };

        let fmt = field("fmt")
            .and_then(|v| v.as_text())
            .ok_or_else(|| Error::malformed("missing fmt in attestation"))?
            .to_string();

        let auth_data = field("authData")
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| Error::malformed("missing authData in attestation"))?
            .clone();

        Ok((fmt, auth_data))
    }
}

/// Checks the outer `{id, rawId, type}` fields shared by both ceremonies.
pub(crate) fn check_credential_envelope(id: &str, raw_id: &[u8], type_: &str) -> Result<()> {
    if type_ != PUBLIC_KEY_TYPE {
        return Err(Error::malformed(format!("invalid credential type: {}", type_)));
    }
    if raw_id.is_empty() {
        return Err(Error::malformed("empty credential ID"));
    }
    if encoding::decode(id)? != raw_id {
        return Err(Error::malformed("credential id does not match rawId"));
    }
    Ok(())
}
