//! 설정
//!
//! - `Settings`: 호스트 애플리케이션 설정 (환경변수 / `.env`)
//! - `SecureConfig`: `Settings`를 감싸 SECRET_KEY를 키 파일에서만 지연 로드.
//!   SECRET_KEY를 코드/설정으로 직접 지정하는 것을 막습니다.

use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SecretKeyError};
use crate::models::SiteId;
use crate::secrets::keyfile;
use crate::secrets::KeyMaterial;

pub const ENV_SECRET_KEY_FILE: &str = "SECRET_KEY_FILE";
pub const ENV_STORE_SIGNATURE: &str = "SECRET_KEY_STORE_SIGNATURE";
pub const ENV_DATABASE: &str = "SECRET_KEY_DATABASE";
pub const ENV_SITE_ID: &str = "SECRET_KEY_SITE_ID";
pub const ENV_MIN_LENGTH: &str = "SECRET_KEY_MIN_LENGTH";

/// 과거 Django 기본 SECRET_KEY 길이 (W004 기준)
pub const DEFAULT_MIN_KEY_LENGTH: usize = 50;

fn default_database_path() -> PathBuf {
    PathBuf::from("secretkey.db")
}

/// 호스트 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SECRET_KEY 파일 경로 (필수, 비어 있으면 안 됨)
    #[serde(default)]
    pub secret_key_file: String,

    /// 서명 저장 사용 여부
    #[serde(default = "default_true")]
    pub store_signature: bool,

    /// 서명 저장용 SQLite 파일
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// 현재 사이트 (없으면 전역)
    #[serde(default)]
    pub site_id: Option<SiteId>,

    /// 이 길이 이하이면 W004 경고
    #[serde(default = "default_min_key_length")]
    pub min_key_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_min_key_length() -> usize {
    DEFAULT_MIN_KEY_LENGTH
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            secret_key_file: String::new(),
            store_signature: true,
            database_path: default_database_path(),
            site_id: None,
            min_key_length: DEFAULT_MIN_KEY_LENGTH,
        }
    }
}

impl Settings {
    /// `.env`(있으면) + 프로세스 환경변수에서 로드
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 이름 → 값 조회 함수로부터 로드 (값이 없으면 기본값)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(path) = lookup(ENV_SECRET_KEY_FILE) {
            settings.secret_key_file = path;
        }
        if let Some(value) = lookup(ENV_STORE_SIGNATURE) {
            settings.store_signature = parse_bool(ENV_STORE_SIGNATURE, &value)?;
        }
        if let Some(value) = lookup(ENV_DATABASE).filter(|v| !v.trim().is_empty()) {
            settings.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_SITE_ID).filter(|v| !v.trim().is_empty()) {
            let id = value.trim().parse::<i64>().map_err(|_| {
                SecretKeyError::MissingConfiguration(format!(
                    "{} must be an integer, got '{}'",
                    ENV_SITE_ID, value
                ))
            })?;
            settings.site_id = Some(SiteId(id));
        }
        if let Some(value) = lookup(ENV_MIN_LENGTH).filter(|v| !v.trim().is_empty()) {
            settings.min_key_length = value.trim().parse::<usize>().map_err(|_| {
                SecretKeyError::MissingConfiguration(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_MIN_LENGTH, value
                ))
            })?;
        }

        Ok(settings)
    }

    /// SECRET_KEY_FILE이 설정되어 있는지
    pub fn has_secret_key_file(&self) -> bool {
        !self.secret_key_file.trim().is_empty()
    }

    pub fn secret_key_path(&self) -> &Path {
        Path::new(&self.secret_key_file)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SecretKeyError::MissingConfiguration(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

/// SECRET_KEY를 키 파일에서만 읽어오는 설정 래퍼
///
/// - SECRET_KEY는 처음 접근할 때 읽어서 프로세스 수명 동안 캐시 (실패는 캐시하지 않음)
/// - `finalize()` 전의 `set_secret_key()`는 조용히 무시 (호스트 부트스트랩 중 탐색 허용)
/// - `finalize()` 후의 `set_secret_key()`는 `ReadOnlyAttribute`
pub struct SecureConfig {
    settings: Settings,
    secret_key: OnceCell<KeyMaterial>,
    finalized: bool,
}

impl SecureConfig {
    /// SECRET_KEY_FILE이 비어 있으면 `MissingConfiguration`
    pub fn new(settings: Settings) -> Result<Self> {
        if !settings.has_secret_key_file() {
            return Err(SecretKeyError::MissingConfiguration(format!(
                "The {} setting must not be empty",
                ENV_SECRET_KEY_FILE
            )));
        }
        Ok(SecureConfig {
            settings,
            secret_key: OnceCell::new(),
            finalized: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn secret_key_file(&self) -> &Path {
        self.settings.secret_key_path()
    }

    /// 활성 SECRET_KEY (지연 로드)
    pub fn secret_key(&self) -> Result<&KeyMaterial> {
        self.secret_key
            .get_or_try_init(|| keyfile::read(self.secret_key_file()))
    }

    /// SECRET_KEY 직접 지정 시도
    pub fn set_secret_key(&mut self, _value: &str) -> Result<()> {
        if !self.finalized {
            debug!("Ignoring SECRET_KEY assignment before configuration is finalized");
            return Ok(());
        }
        Err(SecretKeyError::ReadOnlyAttribute("SECRET_KEY"))
    }

    /// 설정 완료 표시. 이후 SECRET_KEY 지정은 에러.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl std::fmt::Debug for SecureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureConfig")
            .field("settings", &self.settings)
            .field("secret_key_loaded", &self.secret_key.get().is_some())
            .field("finalized", &self.finalized)
            .finish()
    }
}
