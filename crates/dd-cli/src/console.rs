//! Terminal input and colored progress output.

use std::io::{self, Write};

use anyhow::{Context, Result};
use async_trait::async_trait;
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, ExecutableCommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use dd_research::{FinalAnswer, ProgressHandler, ResearchEvent, SearchQuery};

/// Writes session output to stdout, colored when enabled.
#[derive(Clone, Copy)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn clear_screen(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.execute(Clear(ClearType::All))?;
        stdout.execute(cursor::MoveTo(0, 0))?;
        Ok(())
    }

    /// Print one line in `color` (plain when colors are off).
    pub fn line(&self, color: Option<Color>, text: &str) -> io::Result<()> {
        self.write_line(&mut io::stdout(), color, text)
    }

    fn write_line<W: Write>(&self, out: &mut W, color: Option<Color>, text: &str) -> io::Result<()> {
        match color.filter(|_| self.color) {
            Some(color) => {
                out.execute(SetForegroundColor(color))?;
                writeln!(out, "{}", text)?;
                out.execute(ResetColor)?;
            }
            None => writeln!(out, "{}", text)?,
        }
        out.flush()
    }

    fn prompt(&self, color: Color, text: &str) -> String {
        if self.color {
            format!("{}{}{}", SetForegroundColor(color), text, ResetColor)
        } else {
            text.to_string()
        }
    }

    pub fn print_iterations(&self, iterations: usize) -> io::Result<()> {
        self.line(
            Some(Color::Yellow),
            &format!("number of iterations: {}", iterations),
        )
    }

    pub fn print_history(&self, history: &[SearchQuery]) -> io::Result<()> {
        self.write_history(&mut io::stdout(), history)
    }

    pub fn print_answer(&self, answer: &FinalAnswer) -> io::Result<()> {
        self.write_answer(&mut io::stdout(), answer)
    }

    fn write_history<W: Write>(&self, out: &mut W, history: &[SearchQuery]) -> io::Result<()> {
        self.write_line(out, None, "")?;
        self.write_line(out, None, "the history :")?;
        for (i, query) in history.iter().enumerate() {
            self.write_line(out, Some(Color::DarkGrey), &format!("  {}. {}", i + 1, query.text))?;
        }
        self.write_line(out, None, "")?;
        self.write_line(out, Some(Color::DarkGrey), "-------------------")?;
        self.write_line(out, None, "")
    }

    fn write_answer<W: Write>(&self, out: &mut W, answer: &FinalAnswer) -> io::Result<()> {
        match answer {
            FinalAnswer::Synthesized(text) => self.write_line(out, None, text),
            FinalAnswer::Failed(error) => {
                self.write_line(out, Some(Color::Red), &format!("error prompt : {}", error))
            }
        }
    }

    /// Progress lines for one event; quiet events write nothing.
    fn write_event<W: Write>(&self, out: &mut W, event: &ResearchEvent) -> io::Result<()> {
        match event {
            ResearchEvent::RoundStarted { round, query, .. } => {
                self.write_line(out, None, &format!(">> {}", query))?;
                self.write_line(out, Some(Color::Yellow), &format!("The iteration n°{}", round))
            }
            ResearchEvent::FetchFailed { url, error } => self.write_line(
                out,
                Some(Color::Red),
                &format!("Error crawling {}: {}", url, error),
            ),
            ResearchEvent::FindingsExtracted { round, failed: true } => self.write_line(
                out,
                Some(Color::Red),
                &format!("Could not extract findings for iteration n°{}", round),
            ),
            ResearchEvent::Synthesizing { findings } => self.write_line(
                out,
                Some(Color::DarkGrey),
                &format!("Synthesizing answer from {} findings...", findings),
            ),
            ResearchEvent::InitialQuery { .. }
            | ResearchEvent::FindingsExtracted { .. }
            | ResearchEvent::NextQuery { .. } => Ok(()),
        }
    }
}

#[async_trait]
impl ProgressHandler for Console {
    async fn on_progress(&self, event: ResearchEvent) {
        if let Err(e) = self.write_event(&mut io::stdout(), &event) {
            tracing::debug!(error = %e, "Failed to write progress");
        }
    }
}
/// Line reader for the interactive prompts.
pub struct Prompter {
    editor: Editor<(), DefaultHistory>,
    console: Console,
}

impl Prompter {
    pub fn new(console: Console) -> Result<Self> {
        let editor = Editor::new().context("Failed to initialize line editor")?;
        Ok(Self { editor, console })
    }

    /// Read the research request. Returns `None` on Ctrl+C / Ctrl+D.
    pub fn read_request(&mut self) -> Result<Option<String>> {
        let prompt = self.console.prompt(Color::Green, "> ");
        loop {
            match self.read_line(&prompt)? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(line.trim().to_string())),
                None => return Ok(None),
            }
        }
    }

    /// Read the iteration count, re-asking until it parses.
    pub fn read_iterations(&mut self) -> Result<Option<usize>> {
        let prompt = self.console.prompt(Color::Yellow, "iterations > ");
        loop {
            let Some(line) = self.read_line(&prompt)? else {
                return Ok(None);
            };
            match parse_iterations(&line) {
                Some(n) => return Ok(Some(n)),
                None => self
                    .console
                    .line(Some(Color::Red), "Please enter a non-negative whole number.")?,
            }
        }
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e).context("Error reading input"),
        }
    }
}

pub fn parse_iterations(input: &str) -> Option<usize> {
    input.trim().parse().ok()
}
