//! Human confirmation channels
//!
//! Three capabilities share the [`ConfirmationChannel`] contract:
//! - [`TerminalConfirmation`]: interactive prompt on a line-oriented stream
//! - [`ScriptedConfirmation`]: pre-recorded answers, for tests and replays
//! - [`AutoApprove`]: always picks the first option

use crate::error::GatewayError;
use crate::services::ConfirmationChannel;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::info;

/// Affirmative option
pub const YES: &str = "Yes";
/// Negative option
pub const NO: &str = "No";

/// The `[Yes, No]` option pair used at every checkpoint
#[must_use]
pub fn yes_no() -> Vec<String> {
    vec![YES.to_string(), NO.to_string()]
}

/// Operator's answer at a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Chosen option (or free text when no options were offered)
    Selected(String),
    /// Operator quit
    Cancelled,
}

impl Confirmation {
    /// Selected the affirmative option
    #[must_use]
    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Selected(choice) if choice == YES)
    }

    /// Operator quit
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Label for logs and history
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Selected(choice) => choice,
            Self::Cancelled => "cancelled",
        }
    }
}

const SEPARATOR: &str = "================================================================================";

/// Interactive prompt over a reader/writer pair
///
/// The pair sits behind an async mutex, so at most one checkpoint is pending
/// on a channel at any time even when several runs share it.
#[derive(Debug)]
pub struct TerminalConfirmation<R, W> {
    io: tokio::sync::Mutex<(R, W)>,
}

impl TerminalConfirmation<BufReader<Stdin>, Stdout> {
    /// Prompt on the process's stdin/stdout
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalConfirmation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Prompt over the given streams
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: tokio::sync::Mutex::new((reader, writer)),
        }
    }

    /// Recover the streams
    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }

    async fn prompt(&self, message: &str, options: &[String]) -> std::io::Result<Confirmation> {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        let mut banner = format!("\n{SEPARATOR}\n{message}\n");
        if !options.is_empty() {
            banner.push_str("\nOptions:\n");
            for (i, option) in options.iter().enumerate() {
                banner.push_str(&format!("{}. {option}\n", i + 1));
            }
        }
        writer.write_all(banner.as_bytes()).await?;

        loop {
            writer.write_all(b"\nYour response (or 'q' to quit): ").await?;
            writer.flush().await?;

            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(Confirmation::Cancelled);
            }
            let response = line.trim();

            if response.eq_ignore_ascii_case("q") {
                return Ok(Confirmation::Cancelled);
            }
            if options.is_empty() {
                return Ok(Confirmation::Selected(response.to_string()));
            }
            if let Ok(choice) = response.parse::<usize>() {
                if (1..=options.len()).contains(&choice) {
                    return Ok(Confirmation::Selected(options[choice - 1].clone()));
                }
            }
            writer.write_all(b"Please select a valid option\n").await?;
        }
    }
}

#[async_trait]
impl<R, W> ConfirmationChannel for TerminalConfirmation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, message: &str, options: &[String]) -> Result<Confirmation, GatewayError> {
        Ok(self.prompt(message, options).await?)
    }
}

/// Pre-recorded answers, consumed in order
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<Confirmation>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmation {
    /// Script from explicit answers
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = Confirmation>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Script from option labels; `"q"` stands for cancellation
    #[must_use]
    pub fn answers(labels: &[&str]) -> Self {
        Self::new(labels.iter().map(|label| {
            if label.eq_ignore_ascii_case("q") {
                Confirmation::Cancelled
            } else {
                Confirmation::Selected((*label).to_string())
            }
        }))
    }

    /// Messages presented so far
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Answers not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }
}

#[async_trait]
impl ConfirmationChannel for ScriptedConfirmation {
    async fn confirm(&self, message: &str, _options: &[String]) -> Result<Confirmation, GatewayError> {
        self.prompts.lock().push(message.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| GatewayError::Unavailable("confirmation script".to_string()))
    }
}

/// Approves every checkpoint with its first option
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ConfirmationChannel for AutoApprove {
    async fn confirm(&self, message: &str, options: &[String]) -> Result<Confirmation, GatewayError> {
        let choice = options.first().cloned().unwrap_or_else(|| YES.to_string());
        info!(choice = %choice, "auto-approving checkpoint: {}", message.lines().next().unwrap_or_default());
        Ok(Confirmation::Selected(choice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ask(input: &'static str, options: &[String]) -> (Confirmation, String) {
        let channel = TerminalConfirmation::new(input.as_bytes(), Vec::new());
        let answer = channel.confirm("Proceed with migration?", options).await.unwrap();
        let (_, written) = channel.into_inner();
        (answer, String::from_utf8(written).unwrap())
    }

    #[tokio::test]
    async fn terminal_selects_numbered_option() {
        let (answer, written) = ask("2\n", &yes_no()).await;
        assert_eq!(answer, Confirmation::Selected(NO.to_string()));
        assert!(written.contains("Proceed with migration?"));
        assert!(written.contains("1. Yes\n2. No\n"));
    }

    #[tokio::test]
    async fn terminal_reprompts_on_invalid_choice() {
        let (answer, written) = ask("7\nmaybe\n1\n", &yes_no()).await;
        assert!(answer.is_yes());
        assert_eq!(written.matches("Please select a valid option").count(), 2);
    }

    #[tokio::test]
    async fn terminal_quit_and_eof_cancel() {
        let (answer, _) = ask("Q\n", &yes_no()).await;
        assert!(answer.is_cancelled());

        let (answer, _) = ask("", &yes_no()).await;
        assert!(answer.is_cancelled());
    }

    #[tokio::test]
    async fn terminal_free_text_without_options() {
        let (answer, written) = ask("  /work/petclinic \n", &[]).await;
        assert_eq!(answer, Confirmation::Selected("/work/petclinic".to_string()));
        assert!(!written.contains("Options:"));
    }

    #[tokio::test]
    async fn scripted_answers_in_order_then_exhausts() {
        let channel = ScriptedConfirmation::answers(&["Yes", "q"]);

        assert!(channel.confirm("first", &yes_no()).await.unwrap().is_yes());
        assert!(channel.confirm("second", &yes_no()).await.unwrap().is_cancelled());
        assert!(matches!(
            channel.confirm("third", &yes_no()).await,
            Err(GatewayError::Unavailable(_))
        ));
        assert_eq!(channel.prompts(), vec!["first", "second", "third"]);
        assert_eq!(channel.remaining(), 0);
    }

    #[tokio::test]
    async fn auto_approve_takes_first_option() {
        let answer = AutoApprove.confirm("Build failed. Would you like to retry?", &yes_no()).await.unwrap();
        assert_eq!(answer.label(), YES);
        assert!(AutoApprove.confirm("anything", &[]).await.unwrap().is_yes());
    }
}
