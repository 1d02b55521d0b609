//! update-signature
//!
//! 저장된 서명을 현재 키로 다시 만듭니다. 현재 서명이 유효하면 아무것도 하지 않고 실패합니다.

use tracing::info;

use crate::checks::{IntegrityChecker, KEY_FILE_ERRORS};
use crate::commands::{overwrite_warning, Confirm, Outcome};
use crate::config::{SecureConfig, Settings};
use crate::db::Database;
use crate::error::{CommandError, CommandResult, SecretKeyError};
use crate::signature::SignatureStore;

#[derive(Debug, Clone, Default)]
pub struct UpdateSignatureArgs {
    /// 무효한 현재 서명을 확인 없이 교체
    pub force: bool,
}

pub fn update_signature(
    settings: &Settings,
    db: &Database,
    args: &UpdateSignatureArgs,
    prompt: &mut dyn Confirm,
) -> CommandResult<Outcome> {
    let store = SignatureStore::new(db, settings);

    // 키 파일 검사 중 E001–E003만 수동으로 확인
    let file_diagnostics = IntegrityChecker::new(settings, &store).check_key_file();
    if let Some(failure) = file_diagnostics
        .iter()
        .find(|d| KEY_FILE_ERRORS.contains(&d.code))
    {
        return Err(CommandError {
            code: failure.qualified_id(),
            message: failure.message.clone(),
            details: failure.hint.clone(),
        });
    }

    if !store.is_ready() {
        return Err(SecretKeyError::SchemaNotReady.into());
    }

    let config = SecureConfig::new(settings.clone())?;

    let mut force = false;
    if let Some(current) = store.get_current_default()? {
        let description = current.describe(&config);
        if current.is_valid(&config) {
            return Err(CommandError::new(
                "SIGNATURE_VALID",
                format!(
                    "The current signature is valid and does not need updating:\n\n  {}",
                    description
                ),
            ));
        }

        if !args.force {
            let message = overwrite_warning(&description, "");
            if !prompt.confirm(&message).map_err(SecretKeyError::from)? {
                info!("update-signature aborted by user");
                return Ok(Outcome::Aborted);
            }
        }
        force = true;
    }

    let signature = store.create_signature(store.default_site(), config.secret_key()?, force)?;
    Ok(Outcome::Completed(format!(
        "Created signature: {}",
        signature.describe(&config)
    )))
}
