//! Terminal Interaction
//!
//! Reading target lists, yes/no prompts and the "press q to quit" hold used
//! by `bantool --wait`. Prompts go to stderr so stdout stays clean for data.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{normalize_targets, split_targets};

/// Read targets from stdin, prompting first when it is a terminal
pub fn read_targets(prompt: &str) -> io::Result<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("{} (end with Ctrl-D)", prompt);
    }
    read_targets_from(stdin.lock())
}

/// Read every line, split on non-word characters, then normalize
pub fn read_targets_from<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut raw = Vec::new();
    for line in reader.lines() {
        let line = line?;
        raw.extend(split_targets(&line).map(str::to_string));
    }
    Ok(normalize_targets(raw))
}

/// Ask a yes/no question
///
/// Returns `default` without asking when stdin is not a terminal.
pub fn confirm(question: &str, default: bool) -> io::Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(default);
    }

    let mut stderr = io::stderr();
    write!(
        stderr,
        "{} [{}] ",
        question,
        if default { "Y/n" } else { "y/N" }
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    let read = stdin.lock().read_line(&mut answer)?;
    Ok(parse_answer((read > 0).then_some(answer.as_str()), default))
}

/// Interpret an answer; `None` means the input was closed
pub fn parse_answer(answer: Option<&str>, default: bool) -> bool {
    match answer.map(str::trim) {
        None => false,
        Some("") => default,
        Some(a) => a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"),
    }
}

/// Block until `key` is pressed or `cancel` fires
///
/// Runs on the blocking pool because terminal reads are synchronous. Ctrl-C
/// is not delivered as a signal in raw mode, so it cancels the token instead.
pub async fn wait_for_key(key: char, cancel: CancellationToken) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        enable_raw_mode()?;
        let result = poll_for_key(key, &cancel);
        disable_raw_mode()?;
        result
    })
    .await
    .map_err(io::Error::other)?
}

fn poll_for_key(key: char, cancel: &CancellationToken) -> io::Result<()> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(pressed) = event::read()? {
                if pressed.kind != KeyEventKind::Press {
                    continue;
                }
                match pressed.code {
                    KeyCode::Char(c) if c == key => return Ok(()),
                    KeyCode::Char('c') if pressed.modifiers.contains(KeyModifiers::CONTROL) => {
                        cancel.cancel();
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }
}
