//! 바이너리 end-to-end: 여러 프로세스가 동시에 키 파일을 만들어도 하나만 생성

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn secretkey(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_secretkey"));
    cmd.current_dir(dir)
        .env("SECRET_KEY_FILE", dir.join("secret.key"))
        .env("SECRET_KEY_DATABASE", dir.join("secretkey.db"))
        .env_remove("SECRET_KEY_SITE_ID")
        .env_remove("SECRET_KEY_STORE_SIGNATURE")
        .env_remove("SECRET_KEY_MIN_LENGTH")
        .env("RUST_LOG", "secretkey=warn")
        .args(args);
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    secretkey(dir, args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[cfg(unix)]
#[test]
fn concurrent_ensure_creates_a_single_secure_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let children: Vec<_> = (0..8)
        .map(|_| secretkey(dir.path(), &["ensure-secret-key"]).spawn().unwrap())
        .collect();
    for child in children {
        let output = child.wait_with_output().unwrap();
        assert!(output.status.success());
    }

    let path = dir.path().join("secret.key");
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    assert_eq!(fs::read_to_string(&path).unwrap().chars().count(), 64);

    let keys: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".key"))
        .collect();
    assert_eq!(keys.len(), 1);
}

#[test]
fn create_then_check_then_update_workflow() {
    let dir = tempdir().unwrap();

    let migrate = run(dir.path(), &["migrate"]);
    assert!(migrate.status.success());

    let created = run(dir.path(), &["create-secret-key", "--length", "60"]);
    assert!(created.status.success());
    assert!(stdout(&created).contains("Created signature:"));

    let again = run(dir.path(), &["create-secret-key"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already exists"));

    let check = run(dir.path(), &["check"]);
    assert!(check.status.success());
    assert!(stdout(&check).contains("no issues"));

    // 키를 바꾸면 E006
    let path = dir.path().join("secret.key");
    fs::write(&path, "x".repeat(60)).unwrap();
    let check = run(dir.path(), &["check", "--json"]);
    assert_eq!(check.status.code(), Some(1));
    assert!(stdout(&check).contains("\"E006\""));

    let update = run(dir.path(), &["update-signature", "--force"]);
    assert!(update.status.success());
    assert!(stdout(&update).contains("(valid)"));

    let check = run(dir.path(), &["check"]);
    assert!(check.status.success());
}

#[test]
fn invalid_length_fails() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["create-secret-key", "--length", "-1"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("secret.key").exists());
}
