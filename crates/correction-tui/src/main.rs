//! Terminal correction widget demo
//!
//! A small crossterm + ratatui text box driven by `correction-core`: type text, request a
//! check, then walk the marked errors and accept or ignore their suggestions.
//!
//! # Usage
//!
//! ```bash
//! # Canned report read from a file
//! cargo run -p correction-tui -- --report report.json draft.txt
//!
//! # Any checker command: request JSON on stdin, report on stdout
//! cargo run -p correction-tui -- --checker-cmd ./check.sh --config checker.toml
//! ```
//!
//! Set `CORRECTION_TUI_LOG=<file>` to write `tracing` output to a file (filter with
//! `RUST_LOG`).
//!
//! # Keys
//!
//! - Typing / Enter / Backspace / Delete: edit text
//! - Arrow keys, Home/End: move the cursor
//! - Ctrl+R: check the text
//! - Tab: focus the next error
//! - 1-9: accept a suggestion of the focused error
//! - i: ignore the focused error
//! - Esc: close the suggestion box
//! - Ctrl+A: accept every suggestion
//! - Ctrl+K: commit reviewed corrections
//! - Ctrl+L: clear
//! - Ctrl+S: save
//! - Ctrl+Q: quit

use correction_core::{
    AnchorId, Annotation, CheckError, CheckerConfig, CheckerSession, ErrorKind, SessionEvent,
    SessionEventKind, TextDelta, TextRange,
};
use clap::Parser;
use correction_report::{FileTransport, ProcessTransport, ReportClient};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::{
    env, fs,
    io::{self, stdout},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use unicode_width::UnicodeWidthStr;

/// Command line options.
#[derive(Parser, Debug)]
#[command(name = "correction-tui")]
#[command(about = "Terminal text box with inline spelling and grammar corrections")]
struct Options {
    /// Checker configuration (TOML).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serve reports from a canned response file.
    #[arg(long, value_name = "PATH", conflicts_with = "checker_cmd")]
    report: Option<PathBuf>,

    /// Checker command: request JSON on stdin, report on stdout.
    #[arg(long, value_name = "CMD")]
    checker_cmd: Option<String>,

    /// Text file to edit.
    file_path: Option<PathBuf>,
}

/// Application state
struct App {
    session: CheckerSession,
    client: Option<ReportClient>,
    file_path: Option<PathBuf>,
    /// Cursor as a character offset into the text.
    cursor: usize,
    scroll_top: usize,
    next_anchor: u64,
    should_quit: bool,
    status_message: String,
    /// Session notifications collected since the last frame.
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl App {
    fn new(options: Options) -> io::Result<Self> {
        let config = match &options.config {
            Some(path) => CheckerConfig::load(path).map_err(io::Error::other)?,
            None => CheckerConfig::default(),
        };

        let content = match &options.file_path {
            Some(path) if path.exists() => fs::read_to_string(path)?,
            _ => String::new(),
        };

        let client = match (&options.report, &options.checker_cmd) {
            (Some(path), _) => Some(ReportClient::new(FileTransport::new(path), &config)),
            (None, Some(cmd)) => {
                let mut parts = cmd.split_whitespace();
                let program = parts
                    .next()
                    .ok_or_else(|| io::Error::other("empty --checker-cmd"))?;
                let transport = ProcessTransport::new(program).args(parts);
                Some(ReportClient::new(transport, &config))
            }
            (None, None) => None,
        };

        let mut session = CheckerSession::new(&content, config);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        session.subscribe(move |event| {
            if let Ok(mut events) = sink.lock() {
                events.push(*event);
            }
        });

        let status_message = if client.is_none() {
            "No checker configured (use --report or --checker-cmd)".to_string()
        } else {
            String::new()
        };

        Ok(Self {
            cursor: session.document().char_count(),
            session,
            client,
            file_path: options.file_path,
            scroll_top: 0,
            next_anchor: 0,
            should_quit: false,
            status_message,
            events,
        })
    }

    /// Deliver finished reports and promote the pending focus for this frame.
    fn on_frame(&mut self) {
        if let Some(client) = &self.client {
            while let Some(inbound) = client.try_recv() {
                if let Some(outcome) = inbound.deliver(&mut self.session) {
                    tracing::debug!(?outcome, "report delivered");
                }
            }
        }
        self.session.commit_frame();
        self.session.drain_focus_events();

        let events: Vec<SessionEvent> = match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for event in events {
            match event.kind {
                SessionEventKind::ReportApplied => {
                    let state = self.session.get_state();
                    self.status_message = format!(
                        "{} spelling, {} grammar",
                        state.spelling_count, state.grammar_count
                    );
                }
                SessionEventKind::ReportDiscarded if self.session.get_state().in_flight.is_none() => {
                    self.status_message = "Check failed (see log)".to_string();
                }
                SessionEventKind::AllResolved => {
                    self.status_message = "All corrections resolved".to_string();
                }
                _ => {}
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Suggestion box keys
        if self.session.focus().is_some() {
            match key.code {
                KeyCode::Char(c @ '1'..='9') if key.modifiers.is_empty() => {
                    let index = c as usize - '1' as usize;
                    self.choose_suggestion(index);
                    return;
                }
                KeyCode::Char('i') if key.modifiers.is_empty() => {
                    match self.session.ignore_focused() {
                        Ok(mark) => self.status_message = format!("Ignored {} error", mark.kind),
                        Err(err) => self.status_message = err.to_string(),
                    }
                    return;
                }
                KeyCode::Esc => {
                    self.session.close_focus();
                    return;
                }
                _ => {}
            }
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('q')) => self.should_quit = true,
            (KeyModifiers::CONTROL, KeyCode::Char('s')) => match self.save_file() {
                Ok(Some(path)) => self.status_message = format!("Saved: {}", path),
                Ok(None) => self.status_message = "No file to save to".to_string(),
                Err(e) => self.status_message = format!("Save failed: {}", e),
            },
            (KeyModifiers::CONTROL, KeyCode::Char('r')) => self.request_check(),
            (KeyModifiers::CONTROL, KeyCode::Char('a')) => {
                let outcome = self.session.accept_all();
                self.map_cursor(&outcome.deltas);
                self.status_message = format!("Accepted {} suggestions", outcome.accepted);
            }
            (KeyModifiers::CONTROL, KeyCode::Char('k')) => {
                let deltas = self.session.commit_corrections();
                self.map_cursor(&deltas);
                self.status_message = format!("Committed {} corrections", deltas.len());
            }
            (KeyModifiers::CONTROL, KeyCode::Char('l')) => {
                self.session.clear();
                self.cursor = 0;
                self.scroll_top = 0;
                self.status_message = "Cleared".to_string();
            }
            (_, KeyCode::Tab) => self.focus_next_error(),
            (_, KeyCode::Esc) => self.status_message.clear(),
            (_, KeyCode::Left) => self.cursor = self.cursor.saturating_sub(1),
            (_, KeyCode::Right) => {
                self.cursor = (self.cursor + 1).min(self.session.document().char_count());
            }
            (_, KeyCode::Up) => self.move_vertical(-1),
            (_, KeyCode::Down) => self.move_vertical(1),
            (_, KeyCode::Home) => self.cursor = self.line_bounds().0,
            (_, KeyCode::End) => self.cursor = self.line_bounds().1,
            (_, KeyCode::Enter) => self.insert_text("\n"),
            (_, KeyCode::Backspace) if self.cursor > 0 => {
                self.edit(TextRange::new(self.cursor - 1, self.cursor), "");
            }
            (_, KeyCode::Delete) if self.cursor < self.session.document().char_count() => {
                self.edit(TextRange::new(self.cursor, self.cursor + 1), "");
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => {
                self.insert_text(c.encode_utf8(&mut [0; 4]));
            }
            _ => {}
        }
    }

    fn handle_paste(&mut self, text: String) {
        self.insert_text(&text);
    }

    fn insert_text(&mut self, text: &str) {
        self.edit(TextRange::new(self.cursor, self.cursor), text);
    }

    fn edit(&mut self, range: TextRange, text: &str) {
        match self.session.edit(range, text) {
            Ok(_) => self.cursor = range.start + text.chars().count(),
            Err(err) => self.status_message = err.to_string(),
        }
    }

    fn request_check(&mut self) {
        let Some(client) = &self.client else {
            self.status_message = "No checker configured".to_string();
            return;
        };
        match self.session.begin_check() {
            Ok(submission) => {
                self.status_message = format!("Checking (#{})...", submission.ticket.generation());
                client.submit(submission);
            }
            Err(CheckError::EmptyDocument) => {
                self.status_message = "Nothing to check".to_string();
            }
            Err(err) => self.status_message = err.to_string(),
        }
    }

    /// Focus the first pending error after the cursor, wrapping around.
    fn focus_next_error(&mut self) {
        let pending: Vec<TextRange> = self
            .session
            .errors()
            .iter()
            .filter(|error| !error.corrected)
            .map(|error| error.range())
            .collect();
        let target = pending
            .iter()
            .find(|range| range.start > self.cursor)
            .or_else(|| pending.first())
            .copied();

        let Some(range) = target else {
            self.status_message = "No errors".to_string();
            return;
        };
        self.next_anchor += 1;
        self.cursor = range.start;
        self.session.click(AnchorId(self.next_anchor), range.start);
    }

    fn choose_suggestion(&mut self, index: usize) {
        match self.session.choose_suggestion(index) {
            Ok(outcome) => {
                self.cursor = outcome.replaced.end;
                if outcome.all_resolved {
                    self.status_message = "All corrections resolved".to_string();
                }
            }
            Err(err) => self.status_message = err.to_string(),
        }
    }

    fn map_cursor(&mut self, deltas: &[TextDelta]) {
        self.cursor = deltas
            .iter()
            .fold(self.cursor, |cursor, delta| delta.map_offset(cursor));
        self.cursor = self.cursor.min(self.session.document().char_count());
    }

    /// Character offsets of the start and end of the cursor's line.
    fn line_bounds(&self) -> (usize, usize) {
        let chars: Vec<char> = self.session.document().text().chars().collect();
        let cursor = self.cursor.min(chars.len());
        let start = chars[..cursor]
            .iter()
            .rposition(|&c| c == '\n')
            .map_or(0, |pos| pos + 1);
        let end = chars[cursor..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(chars.len(), |pos| cursor + pos);
        (start, end)
    }

    fn move_vertical(&mut self, direction: isize) {
        let text = self.session.document().text();
        let lines: Vec<usize> = text.split('\n').map(|line| line.chars().count()).collect();
        let (row, col) = cursor_row_col(&text, self.cursor);
        let target = row as isize + direction;
        if target < 0 || target as usize >= lines.len() {
            return;
        }
        let target = target as usize;
        let line_start: usize = lines[..target].iter().map(|len| len + 1).sum();
        self.cursor = line_start + col.min(lines[target]);
    }

    fn save_file(&self) -> io::Result<Option<String>> {
        let Some(path) = &self.file_path else {
            return Ok(None);
        };
        fs::write(path, self.session.document().text())?;
        Ok(Some(path.display().to_string()))
    }

    fn render(&mut self, frame: &mut Frame) {
        let popover_height = self
            .session
            .focus()
            .map_or(0, |focus| focus.suggestions.len().min(9) as u16 + 4);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),                 // text box
                Constraint::Length(popover_height), // suggestions
                Constraint::Length(1),              // status
                Constraint::Length(1),              // shortcuts
            ])
            .split(frame.area());

        self.render_text_box(frame, chunks[0]);
        if popover_height > 0 {
            self.render_popover(frame, chunks[1]);
        }
        self.render_status_line(frame, chunks[2]);
        render_shortcuts(frame, chunks[3]);
    }

    fn render_text_box(&mut self, frame: &mut Frame, area: Rect) {
        let snapshot = self.session.snapshot();
        let focused = self.session.focus().map(|focus| focus.range);
        let inner_height = area.height.saturating_sub(2) as usize;

        let mut lines: Vec<Line> = vec![Line::default()];
        for segment in snapshot.segments() {
            let mut style = Style::default();
            for &idx in &segment.annotations {
                let annotation = &snapshot.annotations[idx];
                style = style.patch(annotation_style(annotation));
                if focused == Some(annotation.range) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
            }
            for (i, piece) in segment.text.split('\n').enumerate() {
                if i > 0 {
                    lines.push(Line::default());
                }
                if !piece.is_empty()
                    && let Some(line) = lines.last_mut()
                {
                    line.spans.push(Span::styled(piece.to_string(), style));
                }
            }
        }

        let text = snapshot.text.as_str();
        let (row, col) = cursor_row_col(text, self.cursor);
        if row < self.scroll_top {
            self.scroll_top = row;
        } else if inner_height > 0 && row >= self.scroll_top + inner_height {
            self.scroll_top = row + 1 - inner_height;
        }

        let visible: Vec<Line> = lines
            .into_iter()
            .skip(self.scroll_top)
            .take(inner_height)
            .collect();

        let title = match &self.file_path {
            Some(path) => format!(" {} ", path.display()),
            None => " correction ".to_string(),
        };
        let paragraph =
            Paragraph::new(visible).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);

        let line_text: String = text.split('\n').nth(row).unwrap_or_default().chars().take(col).collect();
        let x = area.x + 1 + line_text.width() as u16;
        let y = area.y + 1 + (row - self.scroll_top) as u16;
        if x < area.right() && y < area.bottom() {
            frame.set_cursor_position(Position::new(x, y));
        }
    }

    fn render_popover(&self, frame: &mut Frame, area: Rect) {
        let Some(focus) = self.session.focus() else {
            return;
        };
        let word = self.session.document().slice(focus.range).unwrap_or_default();

        let mut lines = Vec::new();
        if let Some(explanation) = &focus.explanation {
            lines.push(Line::from(Span::styled(
                explanation.clone(),
                Style::default().fg(Color::Gray),
            )));
        } else {
            lines.push(Line::from(format!("\"{}\" ({})", word, focus.source)));
        }
        for (i, suggestion) in focus.suggestions.iter().take(9).enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Yellow)),
                Span::raw(suggestion.clone()),
            ]));
        }
        lines.push(Line::from(Span::styled(
            " i ignore   Esc close",
            Style::default().fg(Color::DarkGray),
        )));

        let title = format!(" {} ", focus.kind);
        let popover = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(popover, area);
    }

    fn render_status_line(&self, frame: &mut Frame, area: Rect) {
        let state = self.session.get_state();
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            format!(
                "Chars:{}/{} | Spelling:{} Grammar:{} Corrected:{}{} | Version:{}",
                state.char_count,
                self.session.config().max_chars,
                state.spelling_count,
                state.grammar_count,
                state.corrected_count,
                if state.in_flight.is_some() { " | checking" } else { "" },
                state.version
            )
        };

        let status_line = Paragraph::new(status_text)
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(status_line, area);
    }
}

fn render_shortcuts(frame: &mut Frame, area: Rect) {
    let shortcuts = "^R Check | Tab Next | ^A Accept all | ^K Commit | ^L Clear | ^S Save | ^Q Quit";
    let paragraph = Paragraph::new(shortcuts).style(Style::default().fg(Color::Cyan));
    frame.render_widget(paragraph, area);
}

fn annotation_style(annotation: &Annotation) -> Style {
    match annotation.kind.as_error() {
        Some(mark) if mark.corrected => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT),
        Some(mark) => match mark.kind {
            ErrorKind::Spelling => Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::UNDERLINED),
            ErrorKind::Grammar => Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        },
        None => Style::default().fg(Color::Green),
    }
}

/// Row and column (in characters) of `cursor` within `text`.
fn cursor_row_col(text: &str, cursor: usize) -> (usize, usize) {
    let mut row = 0;
    let mut col = 0;
    for c in text.chars().take(cursor) {
        if c == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (row, col)
}

fn setup_tracing() {
    use std::fs::OpenOptions;
    use tracing_subscriber::EnvFilter;

    let Some(path) = env::var_os("CORRECTION_TUI_LOG") else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("correction_core=debug,correction_report=debug,info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> io::Result<()> {
    let options = Options::parse();

    setup_tracing();

    let mut app = App::new(options)?;

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.on_frame();
        terminal.draw(|f| app.render(f))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.handle_key_event(key),
                Event::Paste(text) => app.handle_paste(text),
                _ => {}
            }
        }
    }

    app.session.cancel_in_flight();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let options =
            Options::try_parse_from(["correction-tui", "--report", "r.json", "draft.txt"]).unwrap();
        assert_eq!(options.report, Some(PathBuf::from("r.json")));
        assert_eq!(options.file_path, Some(PathBuf::from("draft.txt")));

        let options =
            Options::try_parse_from(["correction-tui", "--checker-cmd", "./check.sh -v", "-c", "c.toml"])
                .unwrap();
        assert_eq!(options.checker_cmd.as_deref(), Some("./check.sh -v"));
        assert_eq!(options.config, Some(PathBuf::from("c.toml")));

        assert!(Options::try_parse_from(["correction-tui", "--report"]).is_err());
        assert!(
            Options::try_parse_from(["correction-tui", "--report", "a", "--checker-cmd", "b"]).is_err()
        );
    }

    #[test]
    fn test_cursor_row_col() {
        assert_eq!(cursor_row_col("ab\ncd", 0), (0, 0));
        assert_eq!(cursor_row_col("ab\ncd", 2), (0, 2));
        assert_eq!(cursor_row_col("ab\ncd", 4), (1, 1));
    }
}
