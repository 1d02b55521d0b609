//! create-secret-key / ensure-secret-key
//!
//! 랜덤 SECRET_KEY를 생성해 SECRET_KEY_FILE에 저장하고, DB가 준비되어 있으면
//! 이후의 키 변경을 감지하기 위한 서명도 함께 저장합니다.

use tracing::info;

use crate::commands::{overwrite_warning, Confirm, Outcome};
use crate::config::{SecureConfig, Settings};
use crate::db::Database;
use crate::error::{CommandError, CommandResult, SecretKeyError};
use crate::secrets::keyfile;
use crate::secrets::keygen::validate_length;
use crate::signature::SignatureStore;

#[derive(Debug, Clone)]
pub struct CreateSecretKeyArgs {
    /// 키 길이 (문자 수)
    pub length: i64,
    /// 기존 서명 덮어쓰기 허용
    pub force: bool,
    /// 덮어쓰기 확인 프롬프트 생략
    pub no_input: bool,
}

/// 새 키 파일 생성. 파일이 이미 있으면 실패 (기존 키를 실수로 덮어쓰지 않음).
pub fn create_secret_key(
    settings: &Settings,
    db: &Database,
    args: &CreateSecretKeyArgs,
    prompt: &mut dyn Confirm,
) -> CommandResult<Outcome> {
    let length = validate_length(args.length)?;
    let config = SecureConfig::new(settings.clone())?;
    let path = config.secret_key_file();

    if path.exists() {
        return Err(SecretKeyError::AlreadyExists(path.to_path_buf()).into());
    }

    let store = SignatureStore::new(db, settings);

    // 기존 서명 확인 (DB가 아직 준비되지 않았으면 건너뜀)
    if store.is_ready() {
        if let Some(current) = store.get_current_default()? {
            let description = current.describe(&config);
            if !args.force {
                return Err(CommandError::new(
                    "SIGNATURE_EXISTS",
                    format!(
                        "An existing signature was found: {}.\nIf you are sure you want to \
                         create a new secret key, run this command with the --force option.",
                        description
                    ),
                ));
            }

            if !args.no_input {
                let message = overwrite_warning(
                    &description,
                    "Changing the secret key may result in data that is no longer usable. ",
                );
                if !prompt.confirm(&message).map_err(SecretKeyError::from)? {
                    info!("create-secret-key aborted by user");
                    return Ok(Outcome::Aborted);
                }
            }
        }
    }

    keyfile::create(path, length)?;
    let mut lines = vec![format!(
        "Successfully created secret key in '{}'",
        path.display()
    )];

    if store.is_ready() {
        let signature =
            store.create_signature(store.default_site(), config.secret_key()?, args.force)?;
        lines.push(format!("Created signature: {}", signature.describe(&config)));
    }

    Ok(Outcome::Completed(lines.join("\n")))
}

/// 키 파일이 없을 때만 생성 (워커 시작 시 동시 호출 가능)
pub fn ensure_secret_key(settings: &Settings, length: i64) -> CommandResult<Outcome> {
    let length = validate_length(length)?;
    let config = SecureConfig::new(settings.clone())?;
    let path = config.secret_key_file();

    let message = if keyfile::create_if_absent(path, length)? {
        format!("Created secret key in '{}'", path.display())
    } else {
        format!("Secret key already present in '{}'", path.display())
    };
    Ok(Outcome::Completed(message))
}
