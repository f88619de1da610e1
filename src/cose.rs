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

//! COSE public keys and signature verification.

use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_ASN1, ED25519, RSA_PKCS1_2048_8192_SHA256, RsaPublicKeyComponents,
    UnparsedPublicKey,
};
use ciborium::Value;

use crate::error::{Error, Result};

// COSE map labels and values (RFC 9053).
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV_OR_N: i64 = -1;
const LABEL_X_OR_E: i64 = -2;
const LABEL_Y: i64 = -3;

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

const CRV_P256: i64 = 1;
const CRV_ED25519: i64 = 6;

/// Signature algorithms a relying party can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseAlgorithm {
    /// EdDSA over Ed25519.
    EdDsa,
    /// ECDSA over P-256 with SHA-256.
    Es256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
}

impl CoseAlgorithm {
    /// The COSE algorithm identifier.
    pub fn id(&self) -> i64 {
        match self {
            CoseAlgorithm::EdDsa => -8,
            CoseAlgorithm::Es256 => -7,
            CoseAlgorithm::Rs256 => -257,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            -8 => Some(CoseAlgorithm::EdDsa),
            -7 => Some(CoseAlgorithm::Es256),
            -257 => Some(CoseAlgorithm::Rs256),
            _ => None,
        }
    }
}

/// A decoded credential public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    Ed25519 { x: Vec<u8> },
    P256 { x: Vec<u8>, y: Vec<u8> },
    Rsa { n: Vec<u8>, e: Vec<u8> },
}

impl CoseKey {
    /// Decodes a COSE key and checks that its key type, curve and
    /// coordinates agree with its declared algorithm.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] if the bytes are not a COSE key map or a
    ///   parameter is missing or the wrong size
    /// * [`Error::UnsupportedAlgorithm`] if the algorithm is not one of
    ///   [`CoseAlgorithm`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|e| Error::malformed(format!("failed to parse COSE key: {}", e)))?;
        let map = value
            .as_map()
            .ok_or_else(|| Error::malformed("COSE key is not a map"))?;

        let alg_id = int_param(map, LABEL_ALG)
            .ok_or_else(|| Error::malformed("missing algorithm in COSE key"))?;
        let alg = CoseAlgorithm::from_id(alg_id).ok_or(Error::UnsupportedAlgorithm(alg_id))?;
        let kty = int_param(map, LABEL_KTY)
            .ok_or_else(|| Error::malformed("missing key type in COSE key"))?;

        match alg {
            CoseAlgorithm::EdDsa => {
                if kty != KTY_OKP || int_param(map, LABEL_CRV_OR_N) != Some(CRV_ED25519) {
                    return Err(Error::UnsupportedAlgorithm(alg_id));
                }
                let x = bytes_param(map, LABEL_X_OR_E, "x")?;
                if x.len() != 32 {
                    return Err(Error::malformed("invalid Ed25519 public key length"));
                }
                Ok(CoseKey::Ed25519 { x })
            }
            CoseAlgorithm::Es256 => {
                if kty != KTY_EC2 || int_param(map, LABEL_CRV_OR_N) != Some(CRV_P256) {
                    return Err(Error::UnsupportedAlgorithm(alg_id));
                }
                let x = bytes_param(map, LABEL_X_OR_E, "x")?;
                let y = bytes_param(map, LABEL_Y, "y")?;
                if x.len() != 32 || y.len() != 32 {
                    return Err(Error::malformed("invalid P-256 coordinate length"));
                }
                Ok(CoseKey::P256 { x, y })
            }
            CoseAlgorithm::Rs256 => {
                if kty != KTY_RSA {
                    return Err(Error::UnsupportedAlgorithm(alg_id));
                }
                let n = bytes_param(map, LABEL_CRV_OR_N, "n (modulus)")?;
                let e = bytes_param(map, LABEL_X_OR_E, "e (exponent)")?;
                Ok(CoseKey::Rsa { n, e })
            }
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            CoseKey::Ed25519 { .. } => CoseAlgorithm::EdDsa,
            CoseKey::P256 { .. } => CoseAlgorithm::Es256,
            CoseKey::Rsa { .. } => CoseAlgorithm::Rs256,
        }
    }

    /// Verifies `signature` over `signed_data` with the algorithm this key
    /// declares.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureInvalid`] for any signature that does not
    /// verify, including one that is malformed for the algorithm.
    pub fn verify(&self, signed_data: &[u8], signature: &[u8]) -> Result<()> {
        let outcome = match self {
            CoseKey::Ed25519 { x } => {
                UnparsedPublicKey::new(&ED25519, x).verify(signed_data, signature)
            }
            CoseKey::P256 { x, y } => {
                // Uncompressed SEC1 point: 0x04 || x || y
                let mut point = Vec::with_capacity(65);
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, &point)
                    .verify(signed_data, signature)
            }
            CoseKey::Rsa { n, e } => RsaPublicKeyComponents { n, e }.verify(
                &RSA_PKCS1_2048_8192_SHA256,
                signed_data,
                signature,
            ),
        };

        outcome.map_err(|_| {
            tracing::debug!(algorithm = ?self.algorithm(), "signature rejected");
            Error::SignatureInvalid
        })
    }
}

fn find(map: &[(Value, Value)], label: i64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| k.as_integer() == Some(label.into()))
        .map(|(_, v)| v)
}

fn int_param(map: &[(Value, Value)], label: i64) -> Option<i64> {
    find(map, label)
        .and_then(|v| v.as_integer())
        .and_then(|i| i64::try_from(i).ok())
}

fn bytes_param(map: &[(Value, Value)], label: i64, name: &str) -> Result<Vec<u8>> {
    find(map, label)
        .and_then(|v| v.as_bytes())
        .cloned()
        .ok_or_else(|| Error::malformed(format!("missing {} in COSE key", name)))
}
