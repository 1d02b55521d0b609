//! secretkey - SECRET_KEY 파일 관리 및 키 변경 감지
//!
//! 웹 애플리케이션의 SECRET_KEY를 디스크의 키 파일(0600)에 두고, 특정 시점의 키로
//! 서명한 값(fingerprint)을 DB에 저장해 두었다가 나중에 키가 바뀌었는지 감지합니다.
//!
//! - `secrets`: 키 생성, 키 파일 생성/읽기, 서명
//! - `config`: 호스트 설정 + SECRET_KEY 지연 로드 래퍼 (`SecureConfig`)
//! - `signature`: 사이트별 현재 서명 저장소
//! - `checks`: 무결성 검사 (E001–E006, W004)
//! - `commands`: create-secret-key / update-signature / check / migrate

pub mod checks;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod secrets;
pub mod signature;

#[cfg(test)]
pub(crate) mod testutil;

pub use checks::IntegrityChecker;
pub use config::{SecureConfig, Settings};
pub use db::Database;
pub use error::{Result, SecretKeyError};
pub use models::{Diagnostic, Level, Signature, SiteId};
pub use secrets::{KeyMaterial, DEFAULT_KEY_LENGTH};
pub use signature::SignatureStore;

use tracing::info;

use crate::secrets::keyfile;

/// 호스트 시작 시 호출
///
/// `create_missing`이면 키 파일이 없을 때 기본 길이로 생성(여러 워커가 동시에 불러도 안전)한 뒤,
/// 설정을 완료 상태로 만든 `SecureConfig`를 돌려줍니다.
pub fn configure_secure(settings: Settings, create_missing: bool) -> Result<SecureConfig> {
    let mut config = SecureConfig::new(settings)?;

    if create_missing && keyfile::create_if_absent(config.secret_key_file(), DEFAULT_KEY_LENGTH)? {
        info!(path = %config.secret_key_file().display(), "Secret key file bootstrapped");
    }

    config.finalize();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serial, settings, write_key};
    use tempfile::tempdir;

    #[test]
    fn test_configure_secure_bootstraps_key() {
        let _guard = serial();
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let mut config = configure_secure(settings.clone(), true).unwrap();
        assert!(config.is_finalized());
        assert_eq!(config.secret_key().unwrap().len(), DEFAULT_KEY_LENGTH);
        assert!(matches!(
            config.set_secret_key("other"),
            Err(SecretKeyError::ReadOnlyAttribute(_))
        ));
    }

    #[test]
    fn test_configure_secure_keeps_existing_key() {
        let _guard = serial();
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        write_key(settings.secret_key_path(), "already-here", 0o600);

        let config = configure_secure(settings, true).unwrap();
        assert_eq!(config.secret_key().unwrap().as_bytes(), b"already-here");
    }

    #[test]
    fn test_configure_secure_without_creation() {
        let _guard = serial();
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let config = configure_secure(settings, false).unwrap();
        assert!(matches!(
            config.secret_key(),
            Err(SecretKeyError::NotFound(_))
        ));
        assert!(configure_secure(Settings::default(), true).is_err());
    }
}
