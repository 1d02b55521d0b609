//! Commands Module
//!
//! CLI에서 호출하는 명령 흐름 정의. 사용자 확인은 `Confirm`으로 주입합니다.
//! 사용자가 확인을 거절하면 에러가 아니라 `Outcome::Aborted` (정상 종료).

pub mod check;
pub mod create_secret_key;
pub mod migrate;
pub mod update_signature;

use std::io::{self, BufRead, Write};

/// 명령 실행 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 완료 (사용자에게 보여줄 메시지)
    Completed(String),
    /// 사용자가 확인을 거절
    Aborted,
}

/// 파괴적 작업 전 사용자 확인
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> io::Result<bool>;
}

/// 터미널에서 `yes` 입력을 받아 확인
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim() == "yes")
    }
}

/// 항상 같은 답을 돌려주는 확인 (비대화형/테스트용). 물어본 메시지를 기록.
#[derive(Debug, Default)]
pub struct FixedAnswer {
    pub answer: bool,
    pub asked: Vec<String>,
}

impl FixedAnswer {
    pub fn new(answer: bool) -> Self {
        FixedAnswer {
            answer,
            asked: Vec::new(),
        }
    }
}

impl Confirm for FixedAnswer {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        self.asked.push(message.to_string());
        Ok(self.answer)
    }
}

pub(crate) fn overwrite_warning(current: &str, extra: &str) -> String {
    format!(
        "WARNING:\nThis will overwrite the current signature:\n\n  {}\n\n\
         The signature is used to prevent accidental changes to the secret key. {}\
         Are you sure you want to do this?\n\nType 'yes' to continue: ",
        current, extra
    )
}
