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

//! Passgate - passwordless sign-in with passkeys (WebAuthn)
//!
//! Passgate runs the relying-party side of the two WebAuthn ceremonies:
//! registration, which binds a new public key credential to a user, and
//! authentication, which proves possession of that credential. Each ceremony
//! is a begin/finish pair around a fresh, single-use challenge.
//!
//! The crate is split in two layers:
//!
//! - [`Passgate`] builds ceremony options and verifies client responses. It
//!   holds no state beyond the relying party configuration and policy.
//! - [`Ceremonies`] sequences begin/finish across requests using three
//!   collaborators: a [`SessionStore`], a [`CredentialRepository`] and a
//!   [`UserDirectory`]. In-memory versions live in [`store::memory`].
//!
//! # Example
//!
//! ```rust
//! use passgate::{
//!     Ceremonies, MemoryCredentialRepository, MemorySessionStore, MemoryUserDirectory,
//!     Passgate, RelyingParty,
//! };
//!
//! let rp = RelyingParty::new("example.com", "Example Corp", "https://example.com")?;
//! let ceremonies = Ceremonies::new(
//!     Passgate::new(rp),
//!     MemorySessionStore::new(),
//!     MemoryCredentialRepository::new(),
//!     MemoryUserDirectory::new(),
//! );
//!
//! // Registration, first request: send `options` to the browser as JSON and
//! // keep `session` with the browser session.
//! let (options, session) = ceremonies.start_registration("session-1", "alice")?;
//! assert_eq!(options.public_key.rp.id, "example.com");
//!
//! // Second request: the browser posts the created credential.
//! # /*
//! let record = ceremonies.finish_registration_json(&session, &body)?;
//! # */
//!
//! // Authentication, discoverable mode.
//! let options = ceremonies.start_authentication("session-2", None)?;
//! assert!(options.public_key.allow_credentials.is_empty());
//! # /*
//! let signed_in = ceremonies.finish_authentication_json("session-2", &body)?;
//! # */
//! # let _ = session;
//! # Ok::<(), passgate::Error>(())
//! ```
//!
//! # Security Considerations
//!
//! - A challenge is consumed by the first finish attempt, successful or not.
//! - Report every verification error to end users as
//!   [`Error::public_message`]; log the specific kind instead.
//! - Sign counter updates must be serialized per credential; the repository
//!   contract is a compare-and-set.
//! - Serve the relying party over HTTPS; transport security is out of scope.

mod authentication;
mod authenticator_data;
mod ceremony;
mod challenge;
mod client_data;
mod config;
mod cose;
pub mod encoding;
mod error;
mod registration;
pub mod store;
mod types;

#[cfg(test)]
mod tests;

pub use authentication::{
    AuthenticationCredential, AuthenticationOptions, AuthenticatorAssertionResponse,
    PublicKeyCredentialRequestOptions, next_sign_count,
};
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData};
pub use ceremony::{AuthenticatedSession, Ceremonies};
pub use challenge::{CHALLENGE_LEN, Challenge, MIN_CHALLENGE_LEN};
pub use client_data::{ClientData, ClientDataType};
pub use config::{ConfigError, RelyingParty};
pub use cose::{CoseAlgorithm, CoseKey};
pub use encoding::Base64UrlBytes;
pub use error::{Error, GENERIC_FAILURE_MESSAGE, Result};
pub use registration::{
    AuthenticatorAttestationResponse, PublicKeyCredentialCreationOptions, RegistrationCredential,
    RegistrationOptions,
};
pub use store::{
    CredentialIdCheck, CredentialRepository, MemoryCredentialRepository, MemorySessionStore,
    MemoryUserDirectory, SessionStore, Unregistered, UserDirectory,
};
pub use types::*;

/// Default ceremony timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Relying party configuration plus ceremony policy.
///
/// Cheap to share: every method takes `&self` and keeps no state between
/// calls.
#[derive(Clone, Debug)]
pub struct Passgate {
    /// The relying party every ceremony is bound to.
    pub rp: RelyingParty,

    /// Timeout hint sent to the client, in milliseconds.
    pub timeout: u64,

    pub attestation: AttestationConveyancePreference,

    pub resident_key: ResidentKeyRequirement,

    /// `Required` makes both ceremonies reject responses without the UV flag.
    pub user_verification: UserVerificationRequirement,

    /// Accepted algorithms, advertised in this order.
    pub algorithms: Vec<CoseAlgorithm>,
}

impl Passgate {
    /// Creates a `Passgate` with default policy: 60 s timeout, no
    /// attestation, resident key and user verification preferred, and
    /// EdDSA, ES256 and RS256 accepted.
    ///
    /// # Example
    ///
    /// ```
    /// # use passgate::{Passgate, RelyingParty};
    /// let rp = RelyingParty::new("example.com", "Example Corp", "https://example.com").unwrap();
    /// let passgate = Passgate::new(rp);
    /// assert_eq!(passgate.timeout, 60_000);
    /// ```
    pub fn new(rp: RelyingParty) -> Self {
        Self {
            rp,
            timeout: DEFAULT_TIMEOUT_MS,
            attestation: AttestationConveyancePreference::None,
            resident_key: ResidentKeyRequirement::Preferred,
            user_verification: UserVerificationRequirement::Preferred,
            algorithms: vec![
                CoseAlgorithm::EdDsa,
                CoseAlgorithm::Es256,
                CoseAlgorithm::Rs256,
            ],
        }
    }

    /// Creates a `Passgate` from `WEBAUTHN_RP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RelyingParty::from_env()?))
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attestation(mut self, attestation: AttestationConveyancePreference) -> Self {
        self.attestation = attestation;
        self
    }

    pub fn with_resident_key(mut self, resident_key: ResidentKeyRequirement) -> Self {
        self.resident_key = resident_key;
        self
    }

    pub fn with_user_verification(mut self, user_verification: UserVerificationRequirement) -> Self {
        self.user_verification = user_verification;
        self
    }

    /// Restricts the accepted algorithms. Registration rejects keys using
    /// any other algorithm with [`Error::UnsupportedAlgorithm`].
    pub fn with_algorithms(mut self, algorithms: &[CoseAlgorithm]) -> Self {
        self.algorithms = algorithms.to_vec();
        self
    }

    pub(crate) fn requires_user_verification(&self) -> bool {
        self.user_verification == UserVerificationRequirement::Required
    }
}
