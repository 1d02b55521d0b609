//! check
//!
//! 무결성 검사를 실행해 진단을 출력. Error가 하나라도 있으면 실패로 간주.

use serde::Serialize;

use crate::checks::IntegrityChecker;
use crate::config::Settings;
use crate::db::Database;
use crate::error::CommandResult;
use crate::models::{Diagnostic, Level};
use crate::signature::SignatureStore;

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn render(&self) -> String {
        if self.diagnostics.is_empty() {
            return "System check identified no issues.".to_string();
        }

        let mut lines = vec!["System check identified some issues:".to_string(), String::new()];
        for level in [Level::Error, Level::Warning] {
            for diagnostic in self.diagnostics.iter().filter(|d| d.level == level) {
                lines.push(diagnostic.to_string());
            }
        }
        lines.push(String::new());
        lines.push(format!(
            "System check identified {} issue(s).",
            self.diagnostics.len()
        ));
        lines.join("\n")
    }

    pub fn to_json(&self) -> CommandResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            crate::error::CommandError::new("SERIALIZATION_ERROR", e.to_string())
        })
    }
}

pub fn check(settings: &Settings, db: &Database) -> CheckReport {
    let store = SignatureStore::new(db, settings);
    CheckReport {
        diagnostics: IntegrityChecker::new(settings, &store).run(),
    }
}
