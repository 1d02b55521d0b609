//! SecretKey Data Models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SecureConfig;
use crate::error::{Result, SecretKeyError};
use crate::secrets::Signer;

/// 사이트(테넌트) 파티션 식별자. 호스트 쪽 값을 그대로 사용 (불투명).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(pub i64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site {}", self.0)
    }
}

/// 파티션 이름 (로그/에러 메시지용)
pub fn scope_name(site: Option<SiteId>) -> String {
    match site {
        Some(site) => site.to_string(),
        None => "the global scope".to_string(),
    }
}

/// 저장된 서명 (키 fingerprint)
///
/// 생성 당시 활성 키로 랜덤 nonce를 서명한 값. 한 번 저장되면 수정하지 않으며,
/// 유효성은 저장하지 않고 항상 현재 키로 다시 계산합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: String,
    pub site: Option<SiteId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "signedValue")]
    pub signed_value: String,
}

impl Signature {
    /// 현재 키로 서명 검증
    ///
    /// - 키가 바뀌었으면 `SignatureInvalid`
    /// - 키 파일이 없으면 `NotFound` (그 외 읽기 실패는 `Io`)
    pub fn verify(&self, config: &SecureConfig) -> Result<()> {
        let key = config.secret_key()?;
        Signer::new(key).unsign(&self.signed_value)?;
        Ok(())
    }

    /// `verify()`가 어떤 이유로든 실패하면 false
    pub fn is_valid(&self, config: &SecureConfig) -> bool {
        match self.verify(config) {
            Ok(()) => true,
            Err(SecretKeyError::SignatureInvalid) => false,
            Err(e) => {
                debug!(id = %self.id, error = %e, "Signature could not be verified");
                false
            }
        }
    }

    /// `site 3: 2026-10-18 (valid)` 형식 설명
    pub fn describe(&self, config: &SecureConfig) -> String {
        let status = if self.is_valid(config) { "valid" } else { "INVALID" };
        let date = self.created_at.format("%Y-%m-%d");
        match self.site {
            Some(site) => format!("{}: {} ({})", site, date, status),
            None => format!("{} ({})", date, status),
        }
    }
}

/// 진단 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Warning,
    Error,
}

/// 무결성 검사 결과 항목
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub code: &'static str,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: Level::Error,
            code,
            message: message.into(),
            hint: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: Level::Warning,
            code,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// `secretkey.E003`
    pub fn qualified_id(&self) -> String {
        format!("secretkey.{}", self.code)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
        };
        write!(f, "{} ({}): {}", self.qualified_id(), level, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n\tHINT: {}", hint)?;
        }
        Ok(())
    }
}
