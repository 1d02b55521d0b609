//! SECRET_KEY_FILE 생성/읽기
//!
//! - 생성은 `<path>.lock` 파일에 대한 배타적 lock(`File::lock`) 안에서 수행
//!   → 여러 워커 프로세스가 동시에 시작해도 한 프로세스만 키를 생성
//! - 파일 lock을 지원하지 않는 플랫폼에서는 생성이 `Unsupported` IO 에러로 실패
//! - 파일 생성 동안 umask를 `0o177`로 제한해 처음부터 0600으로 생성
//! - lock 파일은 삭제하지 않음 (삭제하면 다른 프로세스가 옛 inode를 잠글 수 있음)

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use tracing::{debug, info, warn};

use crate::error::{Result, SecretKeyError};
use crate::secrets::keygen::{generate_secret_key, KeyMaterial};

/// 키 파일의 기대 권한 (owner read/write)
pub const SECURE_FILE_MODE: u32 = 0o600;

/// 키 파일을 쓰는 동안 적용하는 umask
#[cfg(unix)]
const SECURE_UMASK: libc::mode_t = 0o177;

/// 키 파일이 없으면 생성. 생성했으면 `true`, 이미 있으면 `false`.
///
/// 동시에 여러 프로세스에서 호출해도 안전합니다.
pub fn create_if_absent(path: &Path, length: usize) -> Result<bool> {
    create_locked(path, length, OnExisting::Skip)
}

/// 키 파일을 새로 생성. 이미 있으면 `AlreadyExists`.
pub fn create(path: &Path, length: usize) -> Result<()> {
    create_locked(path, length, OnExisting::Fail).map(|_| ())
}

/// 키 파일 내용을 그대로 읽기 (인코딩 검사 없음)
pub fn read(path: &Path) -> Result<KeyMaterial> {
    match fs::read(path) {
        Ok(contents) => Ok(KeyMaterial::new(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(SecretKeyError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// 권한 비트 (하위 9비트)
#[cfg(unix)]
pub fn file_mode(path: &Path) -> io::Result<u32> {
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
pub fn file_mode(path: &Path) -> io::Result<u32> {
    fs::metadata(path)?;
    Ok(SECURE_FILE_MODE)
}

/// `<path>.lock`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OnExisting {
    Skip,
    Fail,
}

fn create_locked(path: &Path, length: usize, on_existing: OnExisting) -> Result<bool> {
    let _lock = KeyFileLock::acquire(path)?;

    if path.exists() {
        return match on_existing {
            OnExisting::Skip => {
                debug!(path = %path.display(), "Secret key file already exists, skipping");
                Ok(false)
            }
            OnExisting::Fail => Err(SecretKeyError::AlreadyExists(path.to_path_buf())),
        };
    }

    let key = generate_secret_key(length)?;
    write_key_file(path, &key)?;
    info!(path = %path.display(), length, "Created secret key file");
    Ok(true)
}

fn write_key_file(path: &Path, key: &KeyMaterial) -> io::Result<()> {
    let result = {
        #[cfg(unix)]
        let _umask = UmaskGuard::restrict(SECURE_UMASK);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(SECURE_FILE_MODE);

        options.open(path).and_then(|mut file| {
            file.write_all(key.as_bytes())?;
            file.sync_all()
        })
    };

    if let Err(e) = &result {
        if e.kind() != io::ErrorKind::AlreadyExists {
            // 부분적으로 쓰인 키가 남으면 다른 워커가 그대로 읽게 됨
            if let Err(remove_err) = fs::remove_file(path) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial key file");
                }
            }
        }
    }
    result
}

/// `<path>.lock`에 대한 배타적 lock. drop 시 해제.
struct KeyFileLock {
    file: File,
}

impl KeyFileLock {
    fn acquire(key_path: &Path) -> io::Result<Self> {
        let path = lock_path(key_path);

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        options.mode(SECURE_FILE_MODE);
        let file = options.open(&path)?;

        debug!(lock = %path.display(), "Waiting for key file lock");
        loop {
            match file.lock() {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        debug!(lock = %path.display(), "Acquired key file lock");

        Ok(KeyFileLock { file })
    }
}

impl Drop for KeyFileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            debug!(error = %e, "Failed to release key file lock");
        }
    }
}

/// 프로세스 umask를 잠시 바꾸고 drop 시 복구
#[cfg(unix)]
struct UmaskGuard {
    previous: libc::mode_t,
}

#[cfg(unix)]
impl UmaskGuard {
    fn restrict(mask: libc::mode_t) -> Self {
        let previous = unsafe { libc::umask(mask) };
        UmaskGuard { previous }
    }
}

#[cfg(unix)]
impl Drop for UmaskGuard {
    fn drop(&mut self) {
        unsafe {
            libc::umask(self.previous);
        }
    }
}
