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

//! Request-level sequencing of both ceremonies.
//!
//! Each ceremony spans two requests. The only state carried between them is
//! the pending challenge kept in the [`SessionStore`] under the ceremony's
//! key. A finish call takes that challenge out before doing anything else,
//! so a challenge is consumed exactly once whatever the outcome.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Passgate;
use crate::authentication::{AuthenticationCredential, AuthenticationOptions};
use crate::challenge::Challenge;
use crate::encoding::{self, Base64UrlBytes};
use crate::error::{Error, Result};
use crate::registration::{RegistrationCredential, RegistrationOptions};
use crate::store::{
    AUTHENTICATION_KEY, CredentialRepository, REGISTRATION_KEY, SessionStore, Unregistered,
    UserDirectory,
};
use crate::types::{CredentialRecord, User, UserHandle};

/// The signed-in user of one browser session.
///
/// Operations that act on behalf of a user take this explicitly; nothing is
/// read from ambient state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub session_id: String,
    pub user_id: Uuid,
}

/// What the session store holds between begin and finish.
#[derive(Serialize, Deserialize)]
struct PendingChallenge {
    challenge: Base64UrlBytes,
    /// The user a registration challenge was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    allowed: Vec<Base64UrlBytes>,
}

/// Runs registration and authentication against the three collaborators.
pub struct Ceremonies<S, C, U> {
    passgate: Passgate,
    sessions: S,
    credentials: C,
    users: U,
}

impl<S, C, U> Ceremonies<S, C, U>
where
    S: SessionStore,
    C: CredentialRepository,
    U: UserDirectory,
{
    pub fn new(passgate: Passgate, sessions: S, credentials: C, users: U) -> Self {
        Self {
            passgate,
            sessions,
            credentials,
            users,
        }
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Creates a user, binds it to `session_id` and issues registration
    /// options for it.
    pub fn start_registration(
        &self,
        session_id: &str,
        username: &str,
    ) -> Result<(RegistrationOptions, AuthenticatedSession)> {
        let user = self.users.create(username)?;
        let options = self.issue_registration(session_id, &user, &[])?;

        Ok((
            options,
            AuthenticatedSession {
                session_id: session_id.to_string(),
                user_id: user.id,
            },
        ))
    }

    /// Issues registration options for another credential of an
    /// already signed-in user. Their current credentials are excluded.
    pub fn start_additional_registration(
        &self,
        session: &AuthenticatedSession,
    ) -> Result<RegistrationOptions> {
        let user = self.require_user(session.user_id)?;
        let existing = self.credentials.list_by_owner(user.id)?;
        self.issue_registration(&session.session_id, &user, &existing)
    }

    fn issue_registration(
        &self,
        session_id: &str,
        user: &User,
        existing: &[CredentialRecord],
    ) -> Result<RegistrationOptions> {
        let (options, challenge) = self.passgate.begin_registration(user, existing)?;
        self.store_pending(session_id, REGISTRATION_KEY, &challenge, Some(user.id), &[])?;

        tracing::info!(session_id = %session_id, user_id = %user.id, "registration started");
        Ok(options)
    }

    /// Completes registration for the session's user and persists the new
    /// credential.
    ///
    /// The session's user must be the one the challenge was issued for;
    /// otherwise the attempt fails with [`Error::SessionUserMismatch`] and
    /// the challenge is gone.
    pub fn finish_registration(
        &self,
        session: &AuthenticatedSession,
        credential: &RegistrationCredential,
    ) -> Result<CredentialRecord> {
        let pending = self.consume(&session.session_id, REGISTRATION_KEY)?;
        self.complete_registration(session, pending, credential)
    }

    /// Same as [`Ceremonies::finish_registration`], taking the raw JSON
    /// request body. The challenge is consumed even if the body is invalid.
    pub fn finish_registration_json(
        &self,
        session: &AuthenticatedSession,
        body: &[u8],
    ) -> Result<CredentialRecord> {
        let pending = self.consume(&session.session_id, REGISTRATION_KEY)?;
        let credential: RegistrationCredential =
            serde_json::from_slice(body).inspect_err(|e| log_rejected("registration", e))?;
        self.complete_registration(session, pending, &credential)
    }

    fn complete_registration(
        &self,
        session: &AuthenticatedSession,
        pending: PendingChallenge,
        credential: &RegistrationCredential,
    ) -> Result<CredentialRecord> {
        if pending.user_id != Some(session.user_id) {
            let err = Error::SessionUserMismatch;
            log_rejected("registration", &err);
            return Err(err);
        }

        let challenge = Challenge::from_bytes(pending.challenge.into_inner())?;
        let user = self.require_user(session.user_id)?;

        let record = self
            .passgate
            .finish_registration(&challenge, credential, &user, &Unregistered(&self.credentials))
            .inspect_err(|e| log_rejected("registration", e))?;

        self.credentials.persist_new_credential(record.clone())?;

        tracing::info!(
            session_id = %session.session_id,
            user_id = %user.id,
            credential_id = %encoding::encode(&record.credential_id),
            "registration completed"
        );
        Ok(record)
    }

    /// Issues authentication options.
    ///
    /// With `user_id` the client is told which credentials to use; without it
    /// any discoverable credential may answer. An unknown user is reported as
    /// [`Error::UnknownCredential`] so that the response does not reveal
    /// which accounts exist.
    pub fn start_authentication(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
    ) -> Result<AuthenticationOptions> {
        let allowed: Vec<Vec<u8>> = match user_id {
            Some(id) => {
                if self.users.find_by_id(id)?.is_none() {
                    return Err(Error::UnknownCredential);
                }
                let ids: Vec<Vec<u8>> = self
                    .credentials
                    .list_by_owner(id)?
                    .into_iter()
                    .map(|record| record.credential_id)
                    .collect();
                // An empty list would silently switch to discoverable mode.
                if ids.is_empty() {
                    return Err(Error::UnknownCredential);
                }
                ids
            }
            None => Vec::new(),
        };

        let (options, challenge) = self.passgate.begin_authentication(&allowed)?;
        self.store_pending(session_id, AUTHENTICATION_KEY, &challenge, None, &allowed)?;

        tracing::info!(
            session_id = %session_id,
            allowed = allowed.len(),
            "authentication started"
        );
        Ok(options)
    }

    /// Verifies an assertion and, on success, records the new counter and
    /// returns the signed-in session.
    pub fn finish_authentication(
        &self,
        session_id: &str,
        credential: &AuthenticationCredential,
    ) -> Result<AuthenticatedSession> {
        let pending = self.consume(session_id, AUTHENTICATION_KEY)?;
        self.complete_authentication(session_id, pending, credential)
    }

    /// Same as [`Ceremonies::finish_authentication`], taking the raw JSON
    /// request body. The challenge is consumed even if the body is invalid.
    pub fn finish_authentication_json(
        &self,
        session_id: &str,
        body: &[u8],
    ) -> Result<AuthenticatedSession> {
        let pending = self.consume(session_id, AUTHENTICATION_KEY)?;
        let credential: AuthenticationCredential =
            serde_json::from_slice(body).inspect_err(|e| log_rejected("authentication", e))?;
        self.complete_authentication(session_id, pending, &credential)
    }

    fn complete_authentication(
        &self,
        session_id: &str,
        pending: PendingChallenge,
        credential: &AuthenticationCredential,
    ) -> Result<AuthenticatedSession> {
        self.verify_assertion(pending, credential)
            .inspect_err(|e| log_rejected("authentication", e))
            .map(|user_id| {
                tracing::info!(
                    session_id = %session_id,
                    user_id = %user_id,
                    credential_id = %credential.raw_id,
                    "authentication completed"
                );
                AuthenticatedSession {
                    session_id: session_id.to_string(),
                    user_id,
                }
            })
    }

    fn verify_assertion(
        &self,
        pending: PendingChallenge,
        credential: &AuthenticationCredential,
    ) -> Result<Uuid> {
        let challenge = Challenge::from_bytes(pending.challenge.into_inner())?;
        let credential_id = credential.raw_id.as_bytes();

        if !pending.allowed.is_empty()
            && !pending.allowed.iter().any(|id| id.as_bytes() == credential_id)
        {
            return Err(Error::CredentialNotAllowed);
        }

        let record = self
            .credentials
            .lookup_by_credential_id(credential_id)?
            .ok_or(Error::UnknownCredential)?;

        if let Some(handle) = credential.response.user_handle() {
            if handle != UserHandle::from(record.owner_user_id).as_bytes() {
                return Err(Error::UserHandleMismatch);
            }
        }

        let new_count = self.passgate.finish_authentication(
            &challenge,
            credential,
            &record.public_key,
            record.sign_count,
        )?;

        self.credentials
            .update_sign_count(credential_id, record.sign_count, new_count)?;

        Ok(record.owner_user_id)
    }

    fn store_pending(
        &self,
        session_id: &str,
        key: &str,
        challenge: &Challenge,
        user_id: Option<Uuid>,
        allowed: &[Vec<u8>],
    ) -> Result<()> {
        let pending = PendingChallenge {
            challenge: Base64UrlBytes::from(challenge.as_bytes()),
            user_id,
            allowed: allowed.iter().map(|id| Base64UrlBytes::from(id.as_slice())).collect(),
        };
        let bytes = serde_json::to_vec(&pending).map_err(|e| Error::Storage(e.to_string()))?;
        self.sessions.set(session_id, key, bytes)
    }

    /// Moves the ceremony from pending to consumed.
    fn consume(&self, session_id: &str, key: &str) -> Result<PendingChallenge> {
        let bytes = self.sessions.take(session_id, key)?.ok_or_else(|| {
            tracing::warn!(session_id = %session_id, ceremony = key, "no pending challenge");
            Error::MissingOrExpiredChallenge
        })?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Storage(e.to_string()))
    }

    fn require_user(&self, id: Uuid) -> Result<User> {
        self.users.find_by_id(id)?.ok_or(Error::UnknownUser)
    }
}

fn log_rejected(ceremony: &'static str, err: &dyn std::fmt::Display) {
    tracing::warn!(ceremony, error = %err, "ceremony rejected");
}
