//! 값 서명/검증 (HMAC-SHA256)
//!
//! 포맷: `<value>:<base64url(mac)>` (padding 없음)
//! MAC 키: SHA-256(salt || secret key) 로 파생

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Result, SecretKeyError};
use crate::secrets::keygen::KeyMaterial;

type HmacSha256 = Hmac<Sha256>;

/// 값과 서명 사이 구분자
pub const SEPARATOR: char = ':';

const SALT: &[u8] = b"secretkey.signing.Signer";

/// 현재 키로 값을 서명하고 검증
pub struct Signer<'a> {
    key: &'a KeyMaterial,
}

impl<'a> Signer<'a> {
    pub fn new(key: &'a KeyMaterial) -> Self {
        Signer { key }
    }

    /// `value:signature` 반환
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{}{}{}", value, SEPARATOR, BASE64.encode(tag))
    }

    /// 서명 검증 후 원래 값 반환. 키가 다르면 `SignatureInvalid`.
    pub fn unsign(&self, signed: &str) -> Result<String> {
        let (value, signature) = signed
            .rsplit_once(SEPARATOR)
            .ok_or(SecretKeyError::SignatureInvalid)?;
        let tag = BASE64
            .decode(signature)
            .map_err(|_| SecretKeyError::SignatureInvalid)?;

        let mut mac = self.mac();
        mac.update(value.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| SecretKeyError::SignatureInvalid)?;

        Ok(value.to_string())
    }

    /// 파생 키(32바이트)를 HMAC 블록(64바이트)에 0-패딩해 초기화
    fn mac(&self) -> HmacSha256 {
        let mut hasher = Sha256::new();
        hasher.update(SALT);
        hasher.update(self.key.as_bytes());
        let derived = hasher.finalize();

        let mut block = Key::<HmacSha256>::default();
        block[..derived.len()].copy_from_slice(&derived);
        <HmacSha256 as KeyInit>::new(&block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_unsign() {
        let key = KeyMaterial::new("k".repeat(64));
        let signer = Signer::new(&key);

        let signed = signer.sign("NonceValue");
        assert!(signed.starts_with("NonceValue:"));
        assert_eq!(signer.unsign(&signed).unwrap(), "NonceValue");
    }

    #[test]
    fn test_unsign_with_other_key_fails() {
        let old_key = KeyMaterial::new("old-secret");
        let new_key = KeyMaterial::new("new-secret");

        let signed = Signer::new(&old_key).sign("abc");
        assert!(matches!(
            Signer::new(&new_key).unsign(&signed),
            Err(SecretKeyError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_unsign_tampered_value_fails() {
        let key = KeyMaterial::new("secret");
        let signer = Signer::new(&key);
        let signed = signer.sign("abc");
        let tampered = signed.replacen("abc", "abd", 1);

        assert!(matches!(
            signer.unsign(&tampered),
            Err(SecretKeyError::SignatureInvalid)
        ));
        assert!(matches!(
            signer.unsign("no-separator"),
            Err(SecretKeyError::SignatureInvalid)
        ));
        assert!(matches!(
            signer.unsign("abc:not*base64"),
            Err(SecretKeyError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_padded_key_matches_standard_hmac() {
        let key = KeyMaterial::new(vec![b'k', 0xff, 0x00, b'z']);
        let derived = Sha256::new()
            .chain_update(SALT)
            .chain_update(key.as_bytes())
            .finalize();
        let mut expected = <HmacSha256 as Mac>::new_from_slice(&derived).unwrap();
        expected.update(b"nonce");
        let tag = BASE64.encode(expected.finalize().into_bytes());

        assert_eq!(Signer::new(&key).sign("nonce"), format!("nonce:{}", tag));
    }
}
