//! secretkey: SECRET_KEY 파일 관리 CLI
//!
//! - `create-secret-key`: 새 키 파일 생성 + 서명 저장
//! - `update-signature`: 키가 바뀐 뒤 서명 재생성
//! - `check`: 무결성 검사 (E001–E006, W004)
//! - `migrate`: 서명 테이블 생성
//! - `ensure-secret-key`: 키 파일이 없을 때만 생성 (워커 시작용)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use secretkey::commands::check::check;
use secretkey::commands::create_secret_key::{
    create_secret_key, ensure_secret_key, CreateSecretKeyArgs,
};
use secretkey::commands::migrate::migrate;
use secretkey::commands::update_signature::{update_signature, UpdateSignatureArgs};
use secretkey::commands::{Outcome, StdinConfirm};
use secretkey::error::CommandResult;
use secretkey::{Database, Settings, SiteId, DEFAULT_KEY_LENGTH};

#[derive(Parser)]
#[command(name = "secretkey")]
#[command(about = "Secure secret key management with key-change detection")]
struct Cli {
    /// Path to the secret key file (overrides SECRET_KEY_FILE)
    #[arg(long, env = "SECRET_KEY_FILE")]
    secret_key_file: Option<String>,

    /// SQLite database used to store signatures
    #[arg(long, env = "SECRET_KEY_DATABASE")]
    database: Option<PathBuf>,

    /// Current site id (overrides SECRET_KEY_SITE_ID)
    #[arg(long)]
    site_id: Option<i64>,

    /// Enable or disable signature storage (overrides SECRET_KEY_STORE_SIGNATURE)
    #[arg(long)]
    store_signature: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a randomized secret key and store a signature for it
    CreateSecretKey {
        /// The key length in characters
        #[arg(short, long, default_value_t = DEFAULT_KEY_LENGTH as i64, allow_hyphen_values = true)]
        length: i64,

        /// Replace the current signature used to prevent accidental key changes
        #[arg(long)]
        force: bool,

        /// Do not prompt before overwriting an existing signature
        #[arg(long)]
        no_input: bool,
    },

    /// Update the stored signature after an intended key change
    UpdateSignature {
        /// Replace an invalid signature without prompting
        #[arg(long)]
        force: bool,
    },

    /// Run the secret key integrity checks
    Check {
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the signature table
    Migrate,

    /// Create the secret key file only if it does not exist yet
    EnsureSecretKey {
        /// The key length in characters
        #[arg(short, long, default_value_t = DEFAULT_KEY_LENGTH as i64, allow_hyphen_values = true)]
        length: i64,
    },
}

fn main() -> anyhow::Result<()> {
    // 명령 출력(stdout)과 섞이지 않도록 로그는 stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("secretkey=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;

    // Apply CLI overrides
    if let Some(path) = cli.secret_key_file {
        settings.secret_key_file = path;
    }
    if let Some(database) = cli.database {
        settings.database_path = database;
    }
    if let Some(site_id) = cli.site_id {
        settings.site_id = Some(SiteId(site_id));
    }
    if let Some(store_signature) = cli.store_signature {
        settings.store_signature = store_signature;
    }
    debug!(?settings, "Resolved settings");

    let code = match run(cli.command, &settings) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("CommandError: {}", e);
            1
        }
    };
    std::process::exit(code)
}

fn run(command: Commands, settings: &Settings) -> CommandResult<i32> {
    match command {
        Commands::CreateSecretKey {
            length,
            force,
            no_input,
        } => {
            let db = Database::new(&settings.database_path)?;
            let args = CreateSecretKeyArgs {
                length,
                force,
                no_input,
            };
            report(create_secret_key(settings, &db, &args, &mut StdinConfirm)?)
        }
        Commands::UpdateSignature { force } => {
            let db = Database::new(&settings.database_path)?;
            let args = UpdateSignatureArgs { force };
            report(update_signature(settings, &db, &args, &mut StdinConfirm)?)
        }
        Commands::Check { json } => {
            // 검사는 읽기 전용: DB 파일이 없으면 만들지 않음
            let db = if settings.database_path.exists() {
                Database::new(&settings.database_path)?
            } else {
                Database::open_in_memory()?
            };
            let result = check(settings, &db);
            if json {
                println!("{}", result.to_json()?);
            } else {
                println!("{}", result.render());
            }
            Ok(if result.has_errors() { 1 } else { 0 })
        }
        Commands::Migrate => {
            let db = Database::new(&settings.database_path)?;
            report(migrate(&db)?)
        }
        Commands::EnsureSecretKey { length } => report(ensure_secret_key(settings, length)?),
    }
}

fn report(outcome: Outcome) -> CommandResult<i32> {
    match outcome {
        Outcome::Completed(message) => println!("{}", message),
        Outcome::Aborted => println!("Command aborted."),
    }
    Ok(0)
}
