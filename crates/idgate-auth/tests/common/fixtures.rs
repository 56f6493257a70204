//! Fixed RSA keys, their self-signed certificates, and an RS256 signer.
//!
//! Shared by the unit tests in `src/` and the integration tests here, so it
//! only depends on external crates.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use serde_json::Value;
use sha2::Sha256;

pub const K1_CERT: &str = include_str!("../fixtures/k1.crt");
pub const K1_KEY: &str = include_str!("../fixtures/k1.key");
pub const K2_CERT: &str = include_str!("../fixtures/k2.crt");
pub const K2_KEY: &str = include_str!("../fixtures/k2.key");

pub fn sign_rs256(private_key_pem: &str, message: &[u8]) -> Vec<u8> {
    let private_key = RsaPrivateKey::from_pkcs1_pem(private_key_pem).unwrap();
    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key);
    signing_key.sign(message).to_vec()
}

/// Signs `header.claims` with an RS256 key, whatever the header declares.
pub fn mint(header: &Value, claims: &Value, private_key_pem: &str) -> String {
    let signed = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap()),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap()),
    );
    let signature = sign_rs256(private_key_pem, signed.as_bytes());
    format!("{signed}.{}", URL_SAFE_NO_PAD.encode(signature))
}
