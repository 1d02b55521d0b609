//! migrate
//!
//! 서명 테이블 생성 (이미 있으면 그대로)

use crate::commands::Outcome;
use crate::db::Database;
use crate::error::CommandResult;

pub fn migrate(db: &Database) -> CommandResult<Outcome> {
    db.initialize()?;
    Ok(Outcome::Completed(
        "Signature schema is up to date.".to_string(),
    ))
}
