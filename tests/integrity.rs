//! 무결성 검사 시나리오 (라이브러리 공개 API만 사용)

use std::fs;
use std::path::Path;

use secretkey::{Database, IntegrityChecker, Settings, SignatureStore};
use tempfile::tempdir;

fn write_key(path: &Path, contents: &str, mode: u32) {
    fs::write(path, contents).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }
    #[cfg(not(unix))]
    let _ = mode;
}

fn codes(settings: &Settings, db: &Database) -> Vec<String> {
    let store = SignatureStore::new(db, settings);
    IntegrityChecker::new(settings, &store)
        .run()
        .iter()
        .map(|d| d.code.to_string())
        .collect()
}

#[test]
fn empty_setting_reports_only_e001() {
    let settings = Settings::default();
    let db = Database::open_in_memory().unwrap();
    assert_eq!(codes(&settings, &db), vec!["E001"]);
}

#[test]
fn missing_file_reports_only_e002() {
    let dir = tempdir().unwrap();
    let settings = Settings {
        secret_key_file: dir.path().join("missing.key").to_string_lossy().into_owned(),
        ..Settings::default()
    };
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    assert_eq!(codes(&settings, &db), vec!["E002"]);
}

#[cfg(unix)]
#[test]
fn world_readable_file_reports_e003() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.key");
    write_key(&path, &"k".repeat(64), 0o644);
    let settings = Settings {
        secret_key_file: path.to_string_lossy().into_owned(),
        ..Settings::default()
    };

    // 스키마 없음: 서명 검사는 건너뜀
    let db = Database::open_in_memory().unwrap();
    assert_eq!(codes(&settings, &db), vec!["E003"]);
}

#[test]
fn short_key_without_signature_reports_w004_and_e005() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.key");
    write_key(&path, "0123456789", 0o600);
    let settings = Settings {
        secret_key_file: path.to_string_lossy().into_owned(),
        ..Settings::default()
    };

    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    assert_eq!(codes(&settings, &db), vec!["W004", "E005"]);
}

#[test]
fn signature_store_disabled_skips_signature_checks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.key");
    write_key(&path, &"k".repeat(64), 0o600);
    let settings = Settings {
        secret_key_file: path.to_string_lossy().into_owned(),
        store_signature: false,
        ..Settings::default()
    };

    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    assert!(codes(&settings, &db).is_empty());
}
