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

//! Error taxonomy for ceremony operations.
//!
//! Every variant is terminal to the ceremony attempt that produced it. Nothing
//! in this crate retries internally; the caller restarts from a `begin_*` call.

use thiserror::Error;

use crate::config::ConfigError;

/// Message shown to end users for every verification failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "authentication failed";

/// Errors produced while running a registration or authentication ceremony.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload did not parse or used the wrong encoding.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The client data `type` did not match the ceremony being finished.
    #[error("wrong ceremony type: expected {expected}, got {actual}")]
    WrongCeremonyType {
        expected: &'static str,
        actual: String,
    },

    /// The signed challenge differs from the one issued for this session.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The client page origin differs from the relying party origin.
    #[error("origin mismatch: expected {expected}, got {actual}")]
    OriginMismatch { expected: String, actual: String },

    /// The authenticator data is bound to another relying party ID.
    #[error("relying party ID hash mismatch")]
    RelyingPartyIdMismatch,

    /// The authenticator did not report a user presence test.
    #[error("user presence flag not set")]
    UserNotPresent,

    /// User verification was required but the authenticator did not perform it.
    #[error("user verification flag not set")]
    UserNotVerified,

    /// The credential ID is already bound to an account.
    #[error("credential already registered")]
    CredentialAlreadyRegistered,

    /// The public key uses an algorithm this relying party does not accept.
    #[error("unsupported public key algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    /// The assertion signature did not verify against the stored key.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The authenticator counter did not increase; the credential may be cloned.
    #[error("signature counter regression: stored {stored}, reported {reported}")]
    SignCountRegression { stored: u32, reported: u32 },

    /// No credential record exists for the presented credential ID.
    #[error("unknown credential")]
    UnknownCredential,

    /// The presented credential was not in the allow-list issued with the challenge.
    #[error("credential not allowed for this ceremony")]
    CredentialNotAllowed,

    /// The returned user handle does not belong to the credential owner.
    #[error("user handle does not match credential owner")]
    UserHandleMismatch,

    /// The pending registration challenge was issued for a different user.
    #[error("pending challenge was issued for another user")]
    SessionUserMismatch,

    /// No challenge is pending for this session, or it was already consumed.
    #[error("missing or expired challenge")]
    MissingOrExpiredChallenge,

    /// A credential record with this ID already exists in the repository.
    #[error("duplicate credential ID")]
    DuplicateCredentialId,

    /// The session refers to a user the directory does not know.
    #[error("unknown user")]
    UnknownUser,

    /// The system random source failed.
    #[error("random source failure")]
    RandomSource,

    /// A collaborator store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The relying party configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Returns true for errors that reject a client's ceremony response.
    ///
    /// These all collapse to [`GENERIC_FAILURE_MESSAGE`] when surfaced to an
    /// end user, so a caller cannot tell an unknown credential from a bad
    /// signature.
    pub fn is_verification_failure(&self) -> bool {
        !matches!(
            self,
            Error::RandomSource | Error::Storage(_) | Error::Config(_)
        )
    }

    /// The message to show to an end user.
    pub fn public_message(&self) -> &'static str {
        if self.is_verification_failure() {
            GENERIC_FAILURE_MESSAGE
        } else {
            "internal error"
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedInput(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
