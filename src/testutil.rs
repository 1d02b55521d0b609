//! 테스트 공용 유틸
//!
//! 키 파일 생성은 프로세스 umask를 잠시 바꾸므로, 같은 바이너리 안에서
//! 파일시스템을 건드리는 테스트는 `serial()`로 직렬화한다.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::Settings;

static FS_LOCK: Mutex<()> = Mutex::new(());

pub fn serial() -> MutexGuard<'static, ()> {
    FS_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 주어진 내용/권한으로 키 파일 작성
pub fn write_key(path: &Path, contents: &str, mode: u32) {
    write_key_bytes(path, contents.as_bytes(), mode);
}

pub fn write_key_bytes(path: &Path, contents: &[u8], mode: u32) {
    fs::write(path, contents).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }
    #[cfg(not(unix))]
    let _ = mode;
}

/// 테스트용 설정 (DB는 디렉토리 안의 sqlite 파일)
pub fn settings(dir: &Path) -> Settings {
    Settings {
        secret_key_file: dir.join("secret.key").to_string_lossy().into_owned(),
        database_path: dir.join("secretkey.db"),
        ..Settings::default()
    }
}
