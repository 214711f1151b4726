use std::fmt;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Operator cancelled an interactive prompt (closed stdin or aborted a secret read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted by operator")
    }
}

impl std::error::Error for Interrupted {}

pub fn is_interrupted(error: &anyhow::Error) -> bool {
    error.downcast_ref::<Interrupted>().is_some()
}

pub trait Prompter {
    fn text(&mut self, label: &str, default: Option<&str>) -> Result<String>;
    fn secret(&mut self, label: &str) -> Result<String>;
    fn confirm(&mut self, label: &str, default: bool) -> Result<bool>;
}

/// Asks again until `validate` accepts the answer.
pub fn prompt_until<P, F>(
    prompter: &mut P,
    label: &str,
    default: Option<&str>,
    validate: F,
) -> Result<String>
where
    P: Prompter + ?Sized,
    F: Fn(&str) -> bool,
{
    loop {
        let answer = prompter.text(label, default)?;
        if validate(&answer) {
            return Ok(answer);
        }
    }
}

pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, rendered: &str) -> Result<String> {
        write!(self.output, "{rendered} ").context("write prompt")?;
        self.output.flush().context("flush prompt")?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("read prompt answer")?;
        if read == 0 {
            writeln!(self.output).ok();
            return Err(Interrupted.into());
        }
        Ok(line.trim().to_string())
    }

    fn finish_secret(&mut self, label: &str, read: io::Result<String>) -> Result<String> {
        match read {
            Ok(value) => Ok(value.trim().to_string()),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted
                ) =>
            {
                Err(Interrupted.into())
            }
            // No controlling terminal (piped input); fall back to a visible prompt.
            Err(error) => {
                writeln!(
                    self.output,
                    "[!] Cannot hide input ({error}); the answer will be visible"
                )
                .context("write prompt")?;
                self.text(label, None)
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn text(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        let rendered = match default {
            Some(default) => format!("[?] {label} [{default}]:"),
            None => format!("[?] {label}:"),
        };
        let answer = self.read_answer(&rendered)?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn secret(&mut self, label: &str) -> Result<String> {
        let read = rpassword::prompt_password(format!("[?] {label}: "));
        self.finish_secret(label, read)
    }

    fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.read_answer(&format!("[?] {label} ({hint})"))?;
            let normalized = answer.to_ascii_lowercase();
            if normalized.is_empty() {
                return Ok(default);
            }
            if let Some(value) = parse_yes_no_token(&normalized) {
                return Ok(value);
            }
            writeln!(self.output, "please answer y or n").context("write prompt")?;
        }
    }
}

fn parse_yes_no_token(token: &str) -> Option<bool> {
    match token {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::{Prompter, TerminalPrompter, is_interrupted, prompt_until};

    fn terminal(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn text_uses_default_for_empty_answer() {
        let mut prompter = terminal("\n  abc  \n");
        assert_eq!(
            prompter.text("Port", Some("2333")).expect("default"),
            "2333"
        );
        assert_eq!(prompter.text("Port", Some("2333")).expect("answer"), "abc");
        let shown = String::from_utf8(prompter.output.clone()).expect("utf8");
        assert!(shown.contains("[?] Port [2333]:"));
    }

    #[test]
    fn closed_input_is_an_interrupt() {
        let mut prompter = terminal("");
        let err = prompter.text("TOKEN", None).expect_err("must fail");
        assert!(is_interrupted(&err));
    }

    #[test]
    fn confirm_reprompts_on_unknown_answer() {
        let mut prompter = terminal("maybe\nYES\n\n");
        assert!(prompter.confirm("Enable?", false).expect("first"));
        assert!(!prompter.confirm("Enable?", false).expect("default"));
        let shown = String::from_utf8(prompter.output.clone()).expect("utf8");
        assert!(shown.contains("please answer y or n"));
    }

    #[test]
    fn prompt_until_skips_rejected_answers() {
        let mut prompter = terminal("abc\n12x\n8080\n");
        let answer = prompt_until(&mut prompter, "Port", Some("2333"), |value| {
            value.chars().all(|c| c.is_ascii_digit())
        })
        .expect("answer");
        assert_eq!(answer, "8080");
    }

    #[test]
    fn secret_fallback_warns_before_visible_prompt() {
        let mut prompter = terminal("  hunter2  \n");
        let answer = prompter
            .finish_secret("TOKEN", Err(io::Error::other("no tty")))
            .expect("answer");
        assert_eq!(answer, "hunter2");
        let shown = String::from_utf8(prompter.output.clone()).expect("utf8");
        let notice = shown.find("the answer will be visible").expect("notice");
        let prompt = shown.find("[?] TOKEN:").expect("prompt");
        assert!(notice < prompt);
    }

    #[test]
    fn aborted_secret_read_is_an_interrupt() {
        let mut prompter = terminal("ignored\n");
        let err = prompter
            .finish_secret("TOKEN", Err(io::ErrorKind::UnexpectedEof.into()))
            .expect_err("must fail");
        assert!(is_interrupted(&err));
        assert!(prompter.output.is_empty());
    }
}
