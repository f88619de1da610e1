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

use crate::encoding;
use crate::{Challenge, ClientData, ClientDataType, Error};

fn client_data(type_: &str, challenge: &[u8], origin: &str) -> ClientData {
    let json = serde_json::json!({
        "type": type_,
        "challenge": encoding::encode(challenge),
        "origin": origin,
        "crossOrigin": false
    });
    ClientData::from_bytes(&serde_json::to_vec(&json).unwrap()).unwrap()
}

#[test]
fn test_verify_valid_create() {
    let challenge = Challenge::generate().unwrap();
    let origin = "http://localhost:3000";

    let client_data = client_data("webauthn.create", challenge.as_bytes(), origin);
    let result = client_data.verify(ClientDataType::Create, challenge.as_bytes(), origin);

    assert!(result.is_ok(), "Valid client data should verify successfully");
}

#[test]
fn test_verify_valid_get() {
    let challenge = Challenge::generate().unwrap();
    let origin = "https://example.com";

    let client_data = client_data("webauthn.get", challenge.as_bytes(), origin);
    assert!(client_data
        .verify(ClientDataType::Get, challenge.as_bytes(), origin)
        .is_ok());
}

#[test]
fn test_verify_wrong_type() {
    let challenge = Challenge::generate().unwrap();
    let origin = "http://localhost:3000";

    let client_data = client_data("webauthn.get", challenge.as_bytes(), origin);
    let result = client_data.verify(ClientDataType::Create, challenge.as_bytes(), origin);

    assert!(matches!(
        result,
        Err(Error::WrongCeremonyType { expected: "webauthn.create", ref actual }) if actual == "webauthn.get"
    ));
}

#[test]
fn test_verify_foreign_type_is_wrong_ceremony() {
    let challenge = Challenge::generate().unwrap();
    let client_data = client_data("payment.get", challenge.as_bytes(), "https://example.com");

    let result = client_data.verify(ClientDataType::Get, challenge.as_bytes(), "https://example.com");
    assert!(matches!(result, Err(Error::WrongCeremonyType { .. })));
}

#[test]
fn test_verify_type_case_sensitive() {
    let challenge = Challenge::generate().unwrap();
    let client_data = client_data("WebAuthn.Create", challenge.as_bytes(), "https://example.com");

    let result =
        client_data.verify(ClientDataType::Create, challenge.as_bytes(), "https://example.com");
    assert!(matches!(result, Err(Error::WrongCeremonyType { .. })));
}

#[test]
fn test_verify_wrong_challenge() {
    let challenge = Challenge::generate().unwrap();
    let other = Challenge::generate().unwrap();
    let origin = "http://localhost:3000";

    let client_data = client_data("webauthn.create", other.as_bytes(), origin);
    let result = client_data.verify(ClientDataType::Create, challenge.as_bytes(), origin);

    assert!(matches!(result, Err(Error::ChallengeMismatch)));
}

#[test]
fn test_verify_invalid_base64_challenge() {
    let json = serde_json::json!({
        "type": "webauthn.create",
        "challenge": "not+valid/base64==",
        "origin": "http://localhost:3000",
    });
    let client_data = ClientData::from_bytes(&serde_json::to_vec(&json).unwrap()).unwrap();

    let result = client_data.verify(ClientDataType::Create, &[0u8; 32], "http://localhost:3000");
    assert!(matches!(result, Err(Error::MalformedInput(_))));
}

#[test]
fn test_verify_wrong_origin() {
    let challenge = Challenge::generate().unwrap();

    let client_data = client_data("webauthn.create", challenge.as_bytes(), "https://evil.com");
    let result = client_data.verify(
        ClientDataType::Create,
        challenge.as_bytes(),
        "http://localhost:3000",
    );

    match result {
        Err(Error::OriginMismatch { expected, actual }) => {
            assert_eq!(expected, "http://localhost:3000");
            assert_eq!(actual, "https://evil.com");
        }
        other => panic!("expected OriginMismatch, got {:?}", other),
    }
}

#[test]
fn test_verify_origin_exact_match_only() {
    let challenge = Challenge::generate().unwrap();
    let expected = "https://example.com";

    for origin in [
        "https://Example.com",
        "https://example.com/",
        "https://example.com:8443",
        "http://example.com",
        "https://sub.example.com",
    ] {
        let client_data = client_data("webauthn.get", challenge.as_bytes(), origin);
        let result = client_data.verify(ClientDataType::Get, challenge.as_bytes(), expected);
        assert!(
            matches!(result, Err(Error::OriginMismatch { .. })),
            "{} should not match {}",
            origin,
            expected
        );
    }
}

#[test]
fn test_verify_rejects_cross_origin() {
    let challenge = Challenge::generate().unwrap();
    let origin = "https://example.com";
    let json = serde_json::json!({
        "type": "webauthn.get",
        "challenge": encoding::encode(challenge.as_bytes()),
        "origin": origin,
        "crossOrigin": true
    });
    let client_data = ClientData::from_bytes(&serde_json::to_vec(&json).unwrap()).unwrap();
    assert!(client_data.cross_origin);

    let result = client_data.verify(ClientDataType::Get, challenge.as_bytes(), origin);
    assert!(matches!(result, Err(Error::OriginMismatch { .. })));
}

#[test]
fn test_from_bytes_missing_fields() {
    for json in [
        serde_json::json!({"challenge": "AAAA", "origin": "https://example.com"}),
        serde_json::json!({"type": "webauthn.get", "origin": "https://example.com"}),
        serde_json::json!({"type": "webauthn.get", "challenge": "AAAA"}),
    ] {
        let result = ClientData::from_bytes(&serde_json::to_vec(&json).unwrap());
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }
}

#[test]
fn test_from_bytes_invalid_json() {
    assert!(matches!(
        ClientData::from_bytes(b"{not json"),
        Err(Error::MalformedInput(_))
    ));
    assert!(ClientData::from_bytes(b"").is_err());
}

#[test]
fn test_from_bytes_cross_origin_defaults_to_false() {
    let json = serde_json::json!({
        "type": "webauthn.get",
        "challenge": "AAAA",
        "origin": "https://example.com",
    });
    let client_data = ClientData::from_bytes(&serde_json::to_vec(&json).unwrap()).unwrap();
    assert!(!client_data.cross_origin);
}

#[test]
fn test_from_bytes_with_extra_fields() {
    let json = serde_json::json!({
        "type": "webauthn.get",
        "challenge": "AAAA",
        "origin": "https://example.com",
        "tokenBinding": {"status": "present"},
        "other_keys_can_be_added_here": "do not compare clientDataJSON against a template"
    });
    assert!(ClientData::from_bytes(&serde_json::to_vec(&json).unwrap()).is_ok());
}

#[test]
fn test_hash_is_sha256_of_raw_bytes() {
    use aws_lc_rs::digest::{self, SHA256};

    let raw = br#"{"type":"webauthn.get","challenge":"AAAA","origin":"https://example.com"}"#;
    let client_data = ClientData::from_bytes(raw).unwrap();
    assert_eq!(client_data.hash.as_slice(), digest::digest(&SHA256, raw).as_ref());
}

#[test]
fn test_from_base64() {
    let raw = br#"{"type":"webauthn.create","challenge":"AAAA","origin":"https://example.com"}"#;
    let client_data = ClientData::from_base64(&encoding::encode(raw)).unwrap();
    assert_eq!(client_data.type_, "webauthn.create");
    assert_eq!(client_data.origin, "https://example.com");

    assert!(ClientData::from_base64("!!!").is_err());
}
