//! Terminal front-end: coloured notifications, a status line while requests
//! are in flight, and the login prompt.

use async_trait::async_trait;
use colored::Colorize;
use mazewire_client::{AuthPrompt, Credentials, LoadingIndicator, NotifyKind, Notifier, PromptConfig};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};
use std::borrow::Cow;
use std::io::{IsTerminal, Write};

/// Prints notifications to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Info => eprintln!("{} {}", "info:".cyan(), message),
            NotifyKind::Error => eprintln!("{} {}", "error:".red().bold(), message),
        }
    }
}

/// Shows a status line on stderr while requests are in flight.
#[derive(Debug)]
pub struct TerminalLoader {
    interactive: bool,
}

impl TerminalLoader {
    pub fn new() -> Self {
        Self {
            interactive: std::io::stderr().is_terminal(),
        }
    }
}

impl Default for TerminalLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingIndicator for TerminalLoader {
    fn set_loading(&self, visible: bool) {
        tracing::trace!(visible, "loading indicator");
        if !self.interactive {
            return;
        }
        let mut stderr = std::io::stderr();
        if visible {
            let _ = write!(stderr, "{}\r", "working...".dimmed());
        } else {
            let _ = write!(stderr, "\r\x1b[2K");
        }
        let _ = stderr.flush();
    }
}

/// Asks for credentials on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Reads a password for `user` without echoing it.
    pub async fn read_password(user: &str) -> Result<String, ReadlineError> {
        let label = format!("password for {}: ", user);
        tokio::task::spawn_blocking(move || {
            let mut rl = masked_editor()?;
            rl.readline(&label)
        })
        .await
        .map_err(|e| ReadlineError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl AuthPrompt for TerminalPrompt {
    async fn credentials(
        &self,
        prompt: &PromptConfig,
        last_error: Option<&str>,
    ) -> Option<Credentials> {
        let title = prompt.title.clone();
        let accept = prompt.accept_text.clone();
        let last_error = last_error.map(str::to_string);

        let read = tokio::task::spawn_blocking(move || -> Result<Credentials, ReadlineError> {
            eprintln!("\r\x1b[2K{}", title.bold());
            if let Some(err) = last_error {
                eprintln!("{}", err.red());
            }

            let mut plain: Editor<(), DefaultHistory> = Editor::new()?;
            let user = plain.readline("user: ")?;
            let mut masked = masked_editor()?;
            let pass = masked.readline("password: ")?;
            eprintln!("{}", accept.dimmed());
            Ok(Credentials::new(user.trim(), pass))
        });

        match read.await {
            Ok(Ok(credentials)) => Some(credentials),
            Ok(Err(ReadlineError::Interrupted)) | Ok(Err(ReadlineError::Eof)) => None,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "login prompt failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "login prompt task failed");
                None
            }
        }
    }
}

/// Editor that renders every typed character as `*`.
fn masked_editor() -> Result<Editor<Mask, DefaultHistory>, ReadlineError> {
    let mut rl = Editor::new()?;
    rl.set_helper(Some(Mask));
    Ok(rl)
}

struct Mask;

impl Highlighter for Mask {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned("*".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize) -> bool {
        true
    }
}

impl Completer for Mask {
    type Candidate = String;
}

impl Hinter for Mask {
    type Hint = String;
}

impl Validator for Mask {}

impl Helper for Mask {}
