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

//! Single-use ceremony challenges.

use std::fmt;

use aws_lc_rs::rand::{SecureRandom, SystemRandom};

use crate::encoding;
use crate::error::{Error, Result};

/// Length of generated challenges in bytes.
pub const CHALLENGE_LEN: usize = 32;

/// Shortest challenge accepted when one is restored from a session.
pub const MIN_CHALLENGE_LEN: usize = 16;

/// An unpredictable byte string the authenticator must sign.
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge(Vec<u8>);

impl Challenge {
    /// Draws a fresh challenge from the system CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if the random source fails. There is
    /// no fallback source.
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let mut bytes = vec![0u8; CHALLENGE_LEN];
        rng.fill(&mut bytes).map_err(|_| Error::RandomSource)?;
        Ok(Self(bytes))
    }

    /// Wraps previously issued challenge bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `bytes` is shorter than
    /// [`MIN_CHALLENGE_LEN`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_CHALLENGE_LEN {
            return Err(Error::malformed(format!(
                "challenge must be at least {} bytes",
                MIN_CHALLENGE_LEN
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The base64url form sent to the client.
    pub fn to_base64url(&self) -> String {
        encoding::encode(&self.0)
    }
}

impl AsRef<[u8]> for Challenge {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Challenge({})", self.to_base64url())
    }
}
