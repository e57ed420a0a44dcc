use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};

use anyhow::{Context, Result};

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn ask(&mut self, question: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Unclear,
}

fn parse_answer(raw: &str) -> Answer {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" => Answer::Yes,
        "" | "n" | "no" => Answer::No,
        _ => Answer::Unclear,
    }
}

/// Line-based confirmation on any reader/writer pair. An empty line or end of
/// input counts as "no"; anything unrecognized asks again.
pub struct LineConfirm<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn ask(&mut self, question: &str) -> Result<bool> {
        loop {
            write!(self.writer, "{question} [y/N]: ")?;
            self.writer.flush()?;
            let mut input = String::new();
            let bytes = self
                .reader
                .read_line(&mut input)
                .context("reading confirmation")?;
            if bytes == 0 {
                writeln!(self.writer)?;
                return Ok(false);
            }
            match parse_answer(&input) {
                Answer::Yes => return Ok(true),
                Answer::No => return Ok(false),
                Answer::Unclear => writeln!(self.writer, "Please enter y or n.")?,
            }
        }
    }
}

#[cfg(not(windows))]
const TERMINAL_IN: &str = "/dev/tty";
#[cfg(not(windows))]
const TERMINAL_OUT: &str = "/dev/tty";
#[cfg(windows)]
const TERMINAL_IN: &str = "CONIN$";
#[cfg(windows)]
const TERMINAL_OUT: &str = "CONOUT$";

/// Confirmation on the controlling terminal rather than stdin, which may be
/// the piped input text. The terminal is opened on the first question.
#[derive(Default)]
pub struct TerminalConfirm {
    line: Option<LineConfirm<BufReader<File>, File>>,
}

impl TerminalConfirm {
    fn open() -> Result<LineConfirm<BufReader<File>, File>> {
        let reader = File::open(TERMINAL_IN)
            .with_context(|| format!("cannot open {TERMINAL_IN} for confirmation"))?;
        let writer = OpenOptions::new()
            .write(true)
            .open(TERMINAL_OUT)
            .with_context(|| format!("cannot open {TERMINAL_OUT} for confirmation"))?;
        Ok(LineConfirm::new(BufReader::new(reader), writer))
    }
}

impl Confirm for TerminalConfirm {
    fn ask(&mut self, question: &str) -> Result<bool> {
        let line = match self.line.take() {
            Some(line) => line,
            None => Self::open()?,
        };
        self.line.insert(line).ask(question)
    }
}

/// Replays prepared answers; used to drive the item state machine in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: std::collections::VecDeque<bool>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Confirm for ScriptedConfirm {
    fn ask(&mut self, question: &str) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask_with(input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let answer = LineConfirm::new(input.as_bytes(), &mut out)
            .ask("Continue?")
            .unwrap();
        (answer, String::from_utf8(out).unwrap())
    }

    #[test]
    fn yes_variants() {
        assert!(ask_with("y\n").0);
        assert!(ask_with("YES\n").0);
    }

    #[test]
    fn empty_line_declines() {
        assert!(!ask_with("\n").0);
    }

    #[test]
    fn eof_declines() {
        assert!(!ask_with("").0);
    }

    #[test]
    fn unclear_answer_reprompts() {
        let (answer, transcript) = ask_with("maybe\ny\n");
        assert!(answer);
        assert_eq!(transcript.matches("Continue? [y/N]: ").count(), 2);
        assert!(transcript.contains("Please enter y or n."));
    }

    #[test]
    fn unclear_then_eof_declines() {
        assert!(!ask_with("perhaps\n").0);
    }

    #[test]
    fn terminal_confirm_leaves_stdin_unlocked() {
        let confirm = TerminalConfirm::default();
        assert!(confirm.line.is_none());
        // Would deadlock if the confirmer held the stdin lock.
        let _stdin = std::io::stdin().lock();
    }

    #[test]
    fn scripted_answers_in_order() {
        let mut confirm = ScriptedConfirm::new([true, false]);
        assert!(confirm.ask("a").unwrap());
        assert!(!confirm.ask("b").unwrap());
        assert!(!confirm.ask("c").unwrap());
        assert_eq!(confirm.asked, vec!["a", "b", "c"]);
    }
}
