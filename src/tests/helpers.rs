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

use aws_lc_rs::digest::{self, SHA256};
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::rsa::KeySize;
use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, Ed25519KeyPair, KeyPair, RSA_PKCS1_SHA256,
    RsaKeyPair,
};
use ciborium::Value;

use crate::authenticator_data::{FLAG_AT, FLAG_UP};
use crate::encoding::{self, Base64UrlBytes};
use crate::*;

pub const RP_ID: &str = "example.test";
pub const ORIGIN: &str = "https://example.test";
pub const EVIL_ORIGIN: &str = "https://evil.test";

pub fn test_rp() -> RelyingParty {
    RelyingParty::new(RP_ID, "Example Test", ORIGIN).unwrap()
}

pub fn test_passgate() -> Passgate {
    Passgate::new(test_rp())
}

pub fn test_user() -> User {
    User::new("alice")
}

/// Authenticator data with optional attested credential data.
pub fn build_authenticator_data(
    rp_id: &str,
    flags: u8,
    counter: u32,
    attested: Option<(&[u8], &[u8])>,
) -> Vec<u8> {
    let mut auth_data = Vec::new();
    auth_data.extend_from_slice(digest::digest(&SHA256, rp_id.as_bytes()).as_ref());
    auth_data.push(flags);
    auth_data.extend_from_slice(&counter.to_be_bytes());
    if let Some((credential_id, cose_key)) = attested {
        auth_data.extend_from_slice(&[0u8; 16]); // aaguid
        auth_data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(credential_id);
        auth_data.extend_from_slice(cose_key);
    }
    auth_data
}

pub fn build_client_data_json(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    let client_data = serde_json::json!({
        "type": type_,
        "challenge": encoding::encode(challenge),
        "origin": origin,
        "crossOrigin": false
    });
    serde_json::to_vec(&client_data).unwrap()
}

/// A "none" attestation object wrapping `auth_data`.
pub fn build_attestation_object(auth_data: Vec<u8>) -> Vec<u8> {
    let att_obj = vec![
        (Value::Text("fmt".to_string()), Value::Text("none".to_string())),
        (Value::Text("attStmt".to_string()), Value::Map(Vec::new())),
        (Value::Text("authData".to_string()), Value::Bytes(auth_data)),
    ];

    let mut result = Vec::new();
    ciborium::into_writer(&Value::Map(att_obj), &mut result).unwrap();
    result
}

fn encode_cose(entries: Vec<(Value, Value)>) -> Vec<u8> {
    let mut result = Vec::new();
    ciborium::into_writer(&Value::Map(entries), &mut result).unwrap();
    result
}

pub fn eddsa_cose_key(public_key: &[u8]) -> Vec<u8> {
    encode_cose(vec![
        (Value::Integer(1.into()), Value::Integer(1.into())), // kty: OKP
        (Value::Integer(3.into()), Value::Integer((-8).into())), // alg: EdDSA
        (Value::Integer((-1).into()), Value::Integer(6.into())), // crv: Ed25519
        (Value::Integer((-2).into()), Value::Bytes(public_key.to_vec())),
    ])
}

pub fn es256_cose_key(x: &[u8], y: &[u8]) -> Vec<u8> {
    encode_cose(vec![
        (Value::Integer(1.into()), Value::Integer(2.into())), // kty: EC2
        (Value::Integer(3.into()), Value::Integer((-7).into())), // alg: ES256
        (Value::Integer((-1).into()), Value::Integer(1.into())), // crv: P-256
        (Value::Integer((-2).into()), Value::Bytes(x.to_vec())),
        (Value::Integer((-3).into()), Value::Bytes(y.to_vec())),
    ])
}

pub fn rs256_cose_key(n: &[u8], e: &[u8]) -> Vec<u8> {
    encode_cose(vec![
        (Value::Integer(1.into()), Value::Integer(3.into())), // kty: RSA
        (Value::Integer(3.into()), Value::Integer((-257).into())), // alg: RS256
        (Value::Integer((-1).into()), Value::Bytes(n.to_vec())),
        (Value::Integer((-2).into()), Value::Bytes(e.to_vec())),
    ])
}

enum Signer {
    Ed25519(Ed25519KeyPair),
    P256(EcdsaKeyPair),
    Rsa(RsaKeyPair),
}

/// A software authenticator producing real attestation and assertion
/// responses.
pub struct TestAuthenticator {
    pub credential_id: Vec<u8>,
    signer: Signer,
    rng: SystemRandom,
}

impl TestAuthenticator {
    pub fn ed25519() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        Self::with_signer(Signer::Ed25519(key_pair), rng)
    }

    pub fn p256() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref()).unwrap();
        Self::with_signer(Signer::P256(key_pair), rng)
    }

    pub fn rsa() -> Self {
        let key_pair = RsaKeyPair::generate(KeySize::Rsa2048).unwrap();
        Self::with_signer(Signer::Rsa(key_pair), SystemRandom::new())
    }

    fn with_signer(signer: Signer, rng: SystemRandom) -> Self {
        let mut credential_id = vec![0u8; 16];
        aws_lc_rs::rand::fill(&mut credential_id).unwrap();
        Self {
            credential_id,
            signer,
            rng,
        }
    }

    pub fn cose_key(&self) -> Vec<u8> {
        match &self.signer {
            Signer::Ed25519(key_pair) => eddsa_cose_key(key_pair.public_key().as_ref()),
            Signer::P256(key_pair) => {
                // Uncompressed point: 0x04 || x || y
                let point = key_pair.public_key().as_ref();
                es256_cose_key(&point[1..33], &point[33..65])
            }
            Signer::Rsa(key_pair) => {
                let (n, e) = parse_rsa_public_key(key_pair.public_key().as_ref());
                rs256_cose_key(&n, &e)
            }
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.signer {
            Signer::Ed25519(key_pair) => key_pair.sign(message).as_ref().to_vec(),
            Signer::P256(key_pair) => key_pair.sign(&self.rng, message).unwrap().as_ref().to_vec(),
            Signer::Rsa(key_pair) => {
                let mut signature = vec![0u8; key_pair.public_modulus_len()];
                key_pair
                    .sign(&RSA_PKCS1_SHA256, &self.rng, message, &mut signature)
                    .unwrap();
                signature
            }
        }
    }

    /// Answers `navigator.credentials.create()` with a "none" attestation.
    pub fn register(&self, challenge: &[u8], origin: &str, rp_id: &str) -> RegistrationCredential {
        let cose_key = self.cose_key();
        let auth_data = build_authenticator_data(
            rp_id,
            FLAG_UP | FLAG_AT,
            0,
            Some((self.credential_id.as_slice(), cose_key.as_slice())),
        );
        self.registration_credential(
            build_client_data_json("webauthn.create", challenge, origin),
            build_attestation_object(auth_data),
        )
    }

    pub fn registration_credential(
        &self,
        client_data_json: Vec<u8>,
        attestation_object: Vec<u8>,
    ) -> RegistrationCredential {
        RegistrationCredential {
            id: encoding::encode(&self.credential_id),
            raw_id: Base64UrlBytes::from(self.credential_id.as_slice()),
            response: AuthenticatorAttestationResponse {
                client_data_json: Base64UrlBytes(client_data_json),
                attestation_object: Base64UrlBytes(attestation_object),
            },
            type_: PUBLIC_KEY_TYPE.to_string(),
        }
    }

    /// Answers `navigator.credentials.get()` with a signed assertion.
    pub fn assert(
        &self,
        challenge: &[u8],
        origin: &str,
        rp_id: &str,
        counter: u32,
    ) -> AuthenticationCredential {
        let auth_data = build_authenticator_data(rp_id, FLAG_UP, counter, None);
        let client_data = build_client_data_json("webauthn.get", challenge, origin);
        self.assertion(auth_data, client_data)
    }

    /// Signs arbitrary authenticator and client data.
    pub fn assertion(&self, auth_data: Vec<u8>, client_data: Vec<u8>) -> AuthenticationCredential {
        let mut signed = auth_data.clone();
        signed.extend_from_slice(digest::digest(&SHA256, &client_data).as_ref());
        let signature = self.sign(&signed);

        AuthenticationCredential {
            id: encoding::encode(&self.credential_id),
            raw_id: Base64UrlBytes::from(self.credential_id.as_slice()),
            response: AuthenticatorAssertionResponse {
                client_data_json: Base64UrlBytes(client_data),
                authenticator_data: Base64UrlBytes(auth_data),
                signature: Base64UrlBytes(signature),
                user_handle: None,
            },
            type_: PUBLIC_KEY_TYPE.to_string(),
        }
    }
}

/// Parse RSA public key bytes to extract n (modulus) and e (exponent)
fn parse_rsa_public_key(pub_key_bytes: &[u8]) -> (Vec<u8>, Vec<u8>) {
    // DER: SEQUENCE { INTEGER n, INTEGER e }
    let mut pos = 0;

    assert_eq!(pub_key_bytes[pos], 0x30);
    pos += 1;
    let (_, len_bytes) = read_der_length(&pub_key_bytes[pos..]);
    pos += len_bytes;

    let (n, consumed) = read_der_integer(&pub_key_bytes[pos..]);
    pos += consumed;
    let (e, _) = read_der_integer(&pub_key_bytes[pos..]);

    (n, e)
}

fn read_der_integer(data: &[u8]) -> (Vec<u8>, usize) {
    assert_eq!(data[0], 0x02);
    let (len, len_bytes) = read_der_length(&data[1..]);
    let start = 1 + len_bytes;
    let mut value = data[start..start + len].to_vec();
    // Leading zero only marks a positive sign in DER.
    if value.first() == Some(&0x00) {
        value.remove(0);
    }
    (value, start + len)
}

/// Read DER length encoding, returns (length, bytes_consumed)
fn read_der_length(data: &[u8]) -> (usize, usize) {
    if data[0] < 0x80 {
        (data[0] as usize, 1)
    } else {
        let num_bytes = (data[0] & 0x7F) as usize;
        let mut len = 0usize;
        for i in 0..num_bytes {
            len = (len << 8) | (data[1 + i] as usize);
        }
        (len, 1 + num_bytes)
    }
}
