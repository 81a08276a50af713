use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use roamer::core::{MapArtifact, Presenter, Role, Turn};
use roamer::map_html;

const BAR_CHAR: &str = "▎";

/// Prints the conversation to stdout and writes maps to an HTML file.
pub struct TerminalPresenter {
    map_output: PathBuf,
    /// Number of turns already on screen.
    shown: Cell<usize>,
    /// The part of the current answer already printed.
    printed: RefCell<String>,
    /// Whether the cursor is still on the answer's line.
    line_open: Cell<bool>,
    spinner: RefCell<Option<ProgressBar>>,
}

impl TerminalPresenter {
    pub fn new(map_output: PathBuf) -> Self {
        Self {
            map_output,
            shown: Cell::new(0),
            printed: RefCell::new(String::new()),
            line_open: Cell::new(false),
            spinner: RefCell::new(None),
        }
    }

    /// Prints every turn, not just the new ones.
    pub fn print_history(&self, turns: &[Turn]) {
        if turns.is_empty() {
            println!("{}", "No messages yet.".dimmed());
            return;
        }
        for turn in turns {
            match turn.role() {
                Role::User => {
                    println!("{}🧳 {}", BAR_CHAR.bright_green(), turn.message())
                }
                Role::Assistant => print_answer(turn.message()),
            }
        }
    }

    /// Forgets what was printed, after the session was reset.
    pub fn clear(&self) {
        self.stop_spinner();
        self.shown.set(0);
        self.printed.borrow_mut().clear();
        self.line_open.set(false);
    }

    fn start_spinner(&self) {
        let style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message("🤔 Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn end_line(&self) {
        if self.line_open.replace(false) {
            println!();
        }
    }

    fn stop_spinner(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }
}

impl Presenter for TerminalPresenter {
    fn render_history(&self, turns: &[Turn]) {
        self.stop_spinner();

        let shown = self.shown.get().min(turns.len());
        for turn in &turns[shown..] {
            // User turns were typed at the prompt, they are on screen.
            if turn.role() != Role::Assistant {
                continue;
            }
            let mut printed = self.printed.borrow_mut();
            match turn.message().strip_prefix(printed.as_str()) {
                Some(rest) if !printed.is_empty() => {
                    print!("{}", rest.bright_white());
                    self.end_line();
                }
                _ => {
                    self.end_line();
                    print_answer(turn.message());
                }
            }
            printed.clear();
        }
        self.shown.set(turns.len());

        if turns.last().is_some_and(|turn| turn.role() == Role::User) {
            self.start_spinner();
        }
    }

    fn render_streaming_draft(&self, draft: &str) {
        self.stop_spinner();

        let mut printed = self.printed.borrow_mut();
        let Some(rest) = draft.strip_prefix(printed.as_str()) else {
            return;
        };
        if printed.is_empty() {
            print!("{}🤖 ", BAR_CHAR.bright_cyan());
        }
        print!("{}", rest.bright_white());
        io::stdout().flush().ok();
        printed.push_str(rest);
        self.line_open.set(true);
    }

    fn render_map(&self, map: Option<&MapArtifact>) {
        let bar = BAR_CHAR.bright_magenta();
        let Some(map) = map else {
            println!("{bar}🗺️  Map cleared.");
            return;
        };

        let labels = map
            .markers
            .iter()
            .map(|marker| marker.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let written = map_html::render_html(map)
            .map_err(io::Error::other)
            .and_then(|html| fs::write(&self.map_output, html));
        self.end_line();
        match written {
            Ok(()) => println!(
                "{bar}📍 {} {}",
                labels.bold(),
                format!("(map saved to {})", self.map_output.display())
                    .dimmed()
            ),
            Err(err) => {
                error!("failed to write map: {err}");
                self.render_error(&format!(
                    "could not write the map to {}: {err}",
                    self.map_output.display()
                ));
            }
        }
    }

    fn render_error(&self, message: &str) {
        self.stop_spinner();
        eprintln!("{}⚠️  {}", BAR_CHAR.bright_red(), message.red());
    }
}

fn print_answer(message: &str) {
    if message.is_empty() {
        return;
    }
    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), message.bright_white());
}
