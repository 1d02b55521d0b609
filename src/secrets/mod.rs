//! Secret Key 모듈
//!
//! 디스크의 SECRET_KEY 파일을 안전하게 생성/로드하고, 키로 값을 서명합니다.
//!
//! - `keygen`: CSPRNG 기반 키 생성 (OS 난수 소스가 없으면 재시드 PRNG)
//! - `keyfile`: 파일 lock + umask 제한으로 0600 키 파일을 멀티프로세스 안전하게 생성
//! - `signer`: HMAC-SHA256 서명 (키 변경 감지용 fingerprint)

pub mod keyfile;
pub mod keygen;
pub mod signer;

pub use keygen::{generate_secret_key, KeyMaterial, DEFAULT_KEY_LENGTH};
pub use signer::Signer;
