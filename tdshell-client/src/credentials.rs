//! Where login credentials come from.
//!
//! The authorization driver asks a [`CredentialPrompt`] whenever a step needs
//! input it does not already have from [`crate::Config`]: phone number, code,
//! password, registration names, or the database encryption key.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use parking_lot::Mutex;

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Synchronous source of answers to labelled prompts.
pub trait CredentialPrompt: Send + Sync {
    /// Answer the prompt `label`, without a trailing newline.
    fn prompt(&self, label: &str) -> io::Result<String>;
}

impl<F> CredentialPrompt for F
where
    F: Fn(&str) -> io::Result<String> + Send + Sync,
{
    fn prompt(&self, label: &str) -> io::Result<String> { self(label) }
}

// ─── StdinPrompt ──────────────────────────────────────────────────────────────

/// Prints the label to stdout and reads one line from stdin.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinPrompt;

impl CredentialPrompt for StdinPrompt {
    fn prompt(&self, label: &str) -> io::Result<String> {
        let mut out = io::stdout().lock();
        write!(out, "{label}")?;
        out.flush()?;
        drop(out);

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

// ─── ScriptedPrompt ───────────────────────────────────────────────────────────

/// Answers prompts from a fixed queue and records what it was asked.
///
/// Running out of answers is an [`io::ErrorKind::UnexpectedEof`] error.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked:   Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked:   Mutex::new(Vec::new()),
        }
    }

    /// Labels of every prompt so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }
}

impl CredentialPrompt for ScriptedPrompt {
    fn prompt(&self, label: &str) -> io::Result<String> {
        self.asked.lock().push(label.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, format!("no answer for {label:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_prompt_answers_in_order_then_eof() {
        let p = ScriptedPrompt::new(["+15550100", "12345"]);
        assert_eq!(p.prompt("phone: ").unwrap(), "+15550100");
        assert_eq!(p.prompt("code: ").unwrap(), "12345");
        let err = p.prompt("password: ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(p.asked(), ["phone: ", "code: ", "password: "]);
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn closures_are_prompts() {
        let p = |label: &str| -> io::Result<String> { Ok(format!("answer to {label}")) };
        assert_eq!(CredentialPrompt::prompt(&p, "x").unwrap(), "answer to x");
    }
}
