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

//! Relying party configuration.

use thiserror::Error;
use url::Url;

const DEFAULT_RP_ID: &str = "localhost";
const DEFAULT_RP_NAME: &str = "Passgate";
const DEFAULT_RP_ORIGIN: &str = "http://localhost:8080";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("relying party ID {rp_id} is not a suffix of origin host {host}")]
    RpIdNotInOrigin { rp_id: String, host: String },

    #[error("relying party ID must not be empty")]
    EmptyRpId,
}

/// The relying party identity every ceremony is bound to.
///
/// Immutable once built. [`origin`](Self::origin) is compared byte-for-byte
/// against the origin the browser reports, and [`id`](Self::id) is the domain
/// whose SHA-256 hash the authenticator embeds in its data.
///
/// The only way to get one is through a validating constructor:
///
/// ```compile_fail
/// let rp = passgate::RelyingParty {
///     id: "example.com".to_string(),
///     name: "Example".to_string(),
///     origin: "https://evil.test".to_string(),
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelyingParty {
    id: String,
    name: String,
    origin: String,
}

impl RelyingParty {
    /// Builds a relying party after validating that `origin` is a bare
    /// scheme-host-port origin whose host falls under `id`.
    ///
    /// # Example
    ///
    /// ```
    /// # use passgate::RelyingParty;
    /// let rp = RelyingParty::new("example.com", "Example Corp", "https://login.example.com").unwrap();
    /// assert_eq!(rp.origin(), "https://login.example.com");
    /// ```
    pub fn new(id: &str, name: &str, origin: &str) -> Result<Self, ConfigError> {
        if id.is_empty() {
            return Err(ConfigError::EmptyRpId);
        }

        let url = Url::parse(origin).map_err(|e| ConfigError::InvalidOrigin(e.to_string()))?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::InvalidOrigin(format!(
                "{} must not carry a path, query or fragment",
                origin
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidOrigin(format!("{} has no host", origin)))?;

        let within = host == id || host.ends_with(&format!(".{}", id));
        if !within {
            return Err(ConfigError::RpIdNotInOrigin {
                rp_id: id.to_string(),
                host: host.to_string(),
            });
        }

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            // Serialized origins never carry the trailing slash Url adds.
            origin: url.origin().ascii_serialization(),
        })
    }

    /// Relying party ID, a domain such as `example.com`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name shown by authenticators.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact origin of the client page, such as `https://example.com`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Reads the configuration from the environment.
    ///
    /// Environment variables:
    /// - `WEBAUTHN_RP_ID` - Relying Party ID (default: "localhost")
    /// - `WEBAUTHN_RP_NAME` - display name (default: "Passgate")
    /// - `WEBAUTHN_RP_ORIGIN` - origin URL (default: "http://localhost:8080")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RelyingParty::from_env`] with a caller-supplied variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let rp_id = read("WEBAUTHN_RP_ID", DEFAULT_RP_ID);
        let rp_name = read("WEBAUTHN_RP_NAME", DEFAULT_RP_NAME);
        let rp_origin = read("WEBAUTHN_RP_ORIGIN", DEFAULT_RP_ORIGIN);

        tracing::debug!(rp_id = %rp_id, rp_origin = %rp_origin, "loaded relying party configuration");
        Self::new(&rp_id, &rp_name, &rp_origin)
    }
}
