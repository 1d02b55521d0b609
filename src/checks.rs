//! SECRET_KEY 무결성 검사
//!
//! 키 파일 상태와 저장된 서명을 검사해 진단 목록을 만듭니다.
//! 검사 자체는 읽기 전용이며, 실패 조건은 에러로 전파하지 않고 `Diagnostic`으로 보고합니다.
//!
//! | 코드 | 수준 | 조건 |
//! |------|------|------|
//! | E001 | Error | SECRET_KEY_FILE 비어 있음 (이후 검사 중단) |
//! | E002 | Error | 키 파일 없음 (이후 검사 중단) |
//! | E003 | Error | 권한이 0600이 아님 |
//! | W004 | Warning | 키 길이 ≤ 최소 길이(기본 50) |
//! | E005 | Error | 현재 사이트에 저장된 서명 없음 |
//! | E006 | Error | 현재 서명이 현재 키로 검증되지 않음 |

use std::ops::ControlFlow;

use tracing::warn;

use crate::config::{SecureConfig, Settings};
use crate::models::Diagnostic;
use crate::secrets::keyfile::{self, SECURE_FILE_MODE};
use crate::signature::SignatureStore;

pub const E001_EMPTY_SETTING: &str = "E001";
pub const E002_FILE_MISSING: &str = "E002";
pub const E003_INSECURE_PERMISSIONS: &str = "E003";
pub const W004_SHORT_KEY: &str = "W004";
pub const E005_NO_SIGNATURE: &str = "E005";
pub const E006_SIGNATURE_INVALID: &str = "E006";

/// 키 파일 관련 치명 코드 (update-signature 전 확인)
pub const KEY_FILE_ERRORS: [&str; 3] = [
    E001_EMPTY_SETTING,
    E002_FILE_MISSING,
    E003_INSECURE_PERMISSIONS,
];

/// 무결성 검사기
pub struct IntegrityChecker<'a> {
    settings: &'a Settings,
    store: &'a SignatureStore<'a>,
    config: Option<&'a SecureConfig>,
}

impl<'a> IntegrityChecker<'a> {
    pub fn new(settings: &'a Settings, store: &'a SignatureStore<'a>) -> Self {
        IntegrityChecker {
            settings,
            store,
            config: None,
        }
    }

    /// 실행 중인 설정의 활성 키로 서명을 검증하도록 지정
    pub fn with_config(mut self, config: &'a SecureConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 전체 검사 (순서대로, 중단 조건 포함)
    pub fn run(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if self.check_key_file_into(&mut diagnostics).is_continue() {
            self.check_signature_into(&mut diagnostics);
        }
        diagnostics
    }

    /// 키 파일 검사만 (E001–E003, W004)
    pub fn check_key_file(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let _ = self.check_key_file_into(&mut diagnostics);
        diagnostics
    }

    fn check_key_file_into(&self, out: &mut Vec<Diagnostic>) -> ControlFlow<()> {
        if !self.settings.has_secret_key_file() {
            out.push(Diagnostic::error(
                E001_EMPTY_SETTING,
                "The SECRET_KEY_FILE setting must not be empty.",
            ));
            return ControlFlow::Break(());
        }

        let path = self.settings.secret_key_path();
        match path.try_exists() {
            Ok(true) => {}
            Ok(false) => {
                out.push(
                    Diagnostic::error(
                        E002_FILE_MISSING,
                        format!("The secret key file '{}' does not exist.", path.display()),
                    )
                    .with_hint("Run the 'create-secret-key' command to create it."),
                );
                return ControlFlow::Break(());
            }
            Err(e) => {
                out.push(
                    Diagnostic::error(
                        E002_FILE_MISSING,
                        format!(
                            "The secret key file '{}' could not be accessed: {}",
                            path.display(),
                            e
                        ),
                    )
                    .with_hint("Run the 'create-secret-key' command to create it."),
                );
                return ControlFlow::Break(());
            }
        }

        match keyfile::file_mode(path) {
            Ok(mode) if mode == SECURE_FILE_MODE => {}
            Ok(mode) => out.push(
                Diagnostic::error(
                    E003_INSECURE_PERMISSIONS,
                    format!(
                        "The secret key file has insecure permissions ({:04o}).",
                        mode
                    ),
                )
                .with_hint(format!("Try running: chmod 0600 {}", path.display())),
            ),
            Err(e) => out.push(
                Diagnostic::error(
                    E003_INSECURE_PERMISSIONS,
                    format!("The secret key file permissions could not be read: {}", e),
                )
                .with_hint(format!("Try running: chmod 0600 {}", path.display())),
            ),
        }

        match keyfile::read(path) {
            Ok(key) if key.len() <= self.settings.min_key_length => out.push(Diagnostic::warning(
                W004_SHORT_KEY,
                format!(
                    "The secret key file is {} characters, which is not longer than the \
                     recommended key length of {}.",
                    key.len(),
                    self.settings.min_key_length
                ),
            )),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not read secret key file for length check"),
        }

        ControlFlow::Continue(())
    }

    fn check_signature_into(&self, out: &mut Vec<Diagnostic>) {
        // 스키마가 아직 없으면 서명 검사는 건너뜀
        if !self.store.is_ready() {
            return;
        }

        let current = match self.store.get_current_default() {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Could not load current signature");
                return;
            }
        };

        let Some(current) = current else {
            // 키 파일을 직접 만든 경우
            out.push(
                Diagnostic::error(
                    E005_NO_SIGNATURE,
                    "The current site does not yet have a stored signature, which is used to \
                     prevent accidental changes to the secret key.",
                )
                .with_hint("Run the 'update-signature' command to create a new signature."),
            );
            return;
        };

        let fresh;
        let config = match self.config {
            Some(config) => config,
            None => match SecureConfig::new(self.settings.clone()) {
                Ok(config) => {
                    fresh = config;
                    &fresh
                }
                Err(e) => {
                    warn!(error = %e, "Could not build configuration for signature check");
                    return;
                }
            },
        };

        if !current.is_valid(config) {
            out.push(
                Diagnostic::error(
                    E006_SIGNATURE_INVALID,
                    format!(
                        "It appears as if your SECRET_KEY has changed. The current signature \
                         is:\n\n  {}\n\nThe signature is invalid, which may be due to an \
                         unintentional change in the SECRET_KEY_FILE. Changing the secret key \
                         will result in the loss of any data that has been cryptographically \
                         signed by a previous key.",
                        current.describe(config)
                    ),
                )
                .with_hint(
                    "If you cannot restore the previous key, create a new signature using the \
                     'update-signature' command.",
                ),
            );
        }
    }
}
