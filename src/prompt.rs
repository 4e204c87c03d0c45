use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use signal_hook::consts::SIGINT;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Accepted(char),
    /// The user hit ^C while the question was pending.
    Interrupted,
}

impl Answer {
    pub fn is(self, expected: char) -> bool {
        self == Answer::Accepted(expected)
    }
}

pub trait Prompt {
    /// Asks until the reply is one of `accepted`; an empty reply means `default`.
    fn confirm(&mut self, message: &str, accepted: &str, default: char) -> io::Result<Answer>;
}

/// Normalizes a raw reply: `None` when it is not one of `accepted`.
pub fn interpret(reply: &str, accepted: &str, default: char) -> Option<char> {
    let reply = reply.trim().to_lowercase();
    let mut chars = reply.chars();
    let answer = match (chars.next(), chars.next()) {
        (None, _) => default,
        (Some(c), None) => c,
        _ => return None,
    };
    accepted.contains(answer).then_some(answer)
}

/// Reads answers from stdin; SIGINT turns into [`Answer::Interrupted`].
///
/// Nothing is hooked until the first question: before that, ^C kills the
/// process as usual. Afterwards the first ^C only interrupts (a ^C during a
/// fetch surfaces at the next question) and a second one kills.
pub struct TerminalPrompt {
    interrupted: Arc<AtomicBool>,
    lines: Option<Receiver<io::Result<String>>>,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompt {
    pub fn new() -> Self {
        TerminalPrompt {
            interrupted: Arc::new(AtomicBool::new(false)),
            lines: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.lines.is_some()
    }

    fn arm(&mut self) -> io::Result<&Receiver<io::Result<String>>> {
        let lines = match self.lines.take() {
            Some(lines) => lines,
            None => {
                debug!("installing SIGINT handler");
                signal_hook::flag::register_conditional_shutdown(
                    SIGINT,
                    130,
                    Arc::clone(&self.interrupted),
                )?;
                signal_hook::flag::register(SIGINT, Arc::clone(&self.interrupted))?;

                // stdin reads cannot be interrupted, so they happen off the main thread.
                let (sender, lines) = mpsc::channel();
                thread::Builder::new()
                    .name("stdin".to_string())
                    .spawn(move || {
                        for line in io::stdin().lock().lines() {
                            if sender.send(line).is_err() {
                                break;
                            }
                        }
                    })?;
                lines
            }
        };
        Ok(self.lines.insert(lines))
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, message: &str, accepted: &str, default: char) -> io::Result<Answer> {
        let interrupted = Arc::clone(&self.interrupted);
        let lines = self.arm()?;
        loop {
            print!("{}", message);
            io::stdout().flush()?;

            let reply = loop {
                if interrupted.swap(false, Ordering::SeqCst) {
                    println!();
                    debug!("prompt interrupted");
                    return Ok(Answer::Interrupted);
                }
                match lines.recv_timeout(POLL_INTERVAL) {
                    Ok(line) => break line?,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        println!();
                        return Ok(Answer::Accepted(default));
                    }
                }
            };

            if let Some(answer) = interpret(&reply, accepted, default) {
                return Ok(Answer::Accepted(answer));
            }
        }
    }
}

/// Replays canned replies.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    replies: Vec<Option<String>>,
    pub questions: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    /// `None` stands for an interruption.
    pub fn new(replies: Vec<Option<&str>>) -> Self {
        ScriptedPrompt {
            replies: replies.into_iter().rev().map(|r| r.map(str::to_string)).collect(),
            questions: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, message: &str, accepted: &str, default: char) -> io::Result<Answer> {
        loop {
            self.questions.push(message.to_string());
            match self.replies.pop() {
                Some(Some(reply)) => {
                    if let Some(answer) = interpret(&reply, accepted, default) {
                        return Ok(Answer::Accepted(answer));
                    }
                }
                Some(None) => return Ok(Answer::Interrupted),
                None => return Ok(Answer::Accepted(default)),
            }
        }
    }
}
