// ABOUTME: Interactive approval on the controlling terminal.
// ABOUTME: Reads stdin on a detached thread so a timed-out prompt never blocks exit.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::{BufRead, Write};
use tokio::sync::mpsc;

use super::{ApprovalRequest, ApprovalResponse, ApprovalSource, SourceError};

/// Interpret one typed answer. `None` means ask again.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "approve" | "a" | "yes" => Some(true),
        "reject" | "r" | "no" => Some(false),
        _ => None,
    }
}

/// Prompts on stderr and reads the answer from stdin. The responder is `$USER`.
pub struct TerminalApprover {
    lines: Mutex<Option<mpsc::Receiver<String>>>,
}

impl TerminalApprover {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(None),
        }
    }

    fn take_lines(&self) -> mpsc::Receiver<String> {
        if let Some(rx) = self.lines.lock().take() {
            return rx;
        }

        let (tx, rx) = mpsc::channel(1);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

impl Default for TerminalApprover {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt(request: &ApprovalRequest) {
    let mut err = std::io::stderr();
    let _ = writeln!(
        err,
        "\n{} build {} is healthy on staging: {}",
        request.job, request.build, request.staging_link
    );
    let _ = write!(err, "Promote to production? [approve/reject] ");
    let _ = err.flush();
}

#[async_trait]
impl ApprovalSource for TerminalApprover {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalResponse, SourceError> {
        let mut lines = self.take_lines();
        prompt(request);

        let result = loop {
            let Some(line) = lines.recv().await else {
                break Err(SourceError::InputClosed);
            };
            match parse_answer(&line) {
                Some(approved) => {
                    break Ok(ApprovalResponse {
                        approved,
                        responder: std::env::var("USER").ok(),
                    });
                }
                None => {
                    let _ = write!(std::io::stderr(), "Please answer 'approve' or 'reject': ");
                    let _ = std::io::stderr().flush();
                }
            }
        };

        *self.lines.lock() = Some(lines);
        result
    }
}
