use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::Show;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

const WINDOW_TITLE: &str = "t-switch";
const HEADER: &str = "Choose a theme:";
const FOOTER: &str = "Press 'enter' to select, 'q' to quit.";
const MARKER: &str = "> ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionResult {
    Chosen(String),
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Confirm,
    Cancel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerState {
    Browsing { cursor: usize },
    Chosen(String),
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    Redraw,
    Quit,
    Ignore,
}

impl PickerState {
    fn result(&self) -> Option<SelectionResult> {
        match self {
            PickerState::Browsing { .. } => None,
            PickerState::Chosen(name) => Some(SelectionResult::Chosen(name.clone())),
            PickerState::Cancelled => Some(SelectionResult::Cancelled),
        }
    }
}

/// Pure transition for one input. Terminal states swallow everything.
pub fn transition(state: &PickerState, input: Input, names: &[String]) -> (PickerState, Output) {
    let PickerState::Browsing { cursor } = *state else {
        return (state.clone(), Output::Ignore);
    };
    let last = names.len().saturating_sub(1);
    match input {
        Input::Up if cursor > 0 => (PickerState::Browsing { cursor: cursor - 1 }, Output::Redraw),
        Input::Down if cursor < last => {
            (PickerState::Browsing { cursor: cursor + 1 }, Output::Redraw)
        }
        Input::Up | Input::Down => (state.clone(), Output::Ignore),
        Input::Confirm => match names.get(cursor) {
            Some(name) => (PickerState::Chosen(name.clone()), Output::Quit),
            None => (state.clone(), Output::Ignore),
        },
        Input::Cancel => (PickerState::Cancelled, Output::Quit),
    }
}

pub fn input_for_key(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Cancel),
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Up | KeyCode::Char('k') => Some(Input::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Input::Down),
        KeyCode::Enter => Some(Input::Confirm),
        _ => None,
    }
}

pub struct Picker<'a> {
    names: &'a [String],
    state: PickerState,
}

impl<'a> Picker<'a> {
    pub fn new(names: &'a [String]) -> Self {
        Self {
            names,
            state: PickerState::Browsing { cursor: 0 },
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            PickerState::Browsing { cursor } => Some(cursor),
            _ => None,
        }
    }

    pub fn handle(&mut self, input: Input) -> Output {
        let (next, output) = transition(&self.state, input, self.names);
        self.state = next;
        output
    }

    pub fn result(&self) -> Option<SelectionResult> {
        self.state.result()
    }
}

/// Runs one blocking selection session over `names` (already sorted).
pub fn present(names: &[String]) -> Result<SelectionResult> {
    enable_raw_mode()?;
    with_restore(|| run_session(names), restore_terminal)
}

fn run_session(names: &[String]) -> Result<SelectionResult> {
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(SetTitle(WINDOW_TITLE))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let mut picker = Picker::new(names);
    event_loop(&mut terminal, &mut picker)
}

/// Runs `session`, then `restore` whether or not the session failed. The
/// session's error wins over a restore error.
fn with_restore<T, F, R>(session: F, restore: R) -> Result<T>
where
    F: FnOnce() -> Result<T>,
    R: FnOnce() -> Result<()>,
{
    let result = session();
    let restored = restore();
    let value = result?;
    restored?;
    Ok(value)
}

fn event_loop<B>(terminal: &mut Terminal<B>, picker: &mut Picker) -> Result<SelectionResult>
where
    B: ratatui::backend::Backend + Write,
{
    let tick_rate = Duration::from_millis(200);
    terminal.draw(|frame| render(frame, picker))?;
    loop {
        if !event::poll(tick_rate)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if let Some(input) = input_for_key(key) {
                    if picker.handle(input) == Output::Redraw {
                        terminal.draw(|frame| render(frame, picker))?;
                    }
                }
            }
            Event::Resize(_, _) => {
                terminal.draw(|frame| render(frame, picker))?;
            }
            Event::Mouse(_) | Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
        }

        if let Some(result) = picker.result() {
            return Ok(result);
        }
    }
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen, Show)?;
    Ok(())
}

fn render(frame: &mut Frame, picker: &Picker) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    let header = Paragraph::new(HEADER)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    let list_area = list_rect(chunks[1], picker.names);
    let items: Vec<ListItem> = if picker.names.is_empty() {
        vec![ListItem::new(Line::from("(no themes defined)"))]
    } else {
        picker
            .names
            .iter()
            .map(|name| ListItem::new(Line::from(name.as_str())))
            .collect()
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_symbol(MARKER)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD));
    let mut list_state = ListState::default();
    if !picker.names.is_empty() {
        list_state.select(picker.cursor());
    }
    frame.render_stateful_widget(list, list_area, &mut list_state);

    let footer = Paragraph::new(FOOTER).alignment(Alignment::Center);
    frame.render_widget(footer, chunks[2]);
}

/// Centers a box wide enough for the longest name plus marker and borders.
fn list_rect(area: Rect, names: &[String]) -> Rect {
    let widest = names
        .iter()
        .map(|name| UnicodeWidthStr::width(name.as_str()))
        .max()
        .unwrap_or(0)
        .max(HEADER.width());
    let width = (widest + MARKER.width() + 2).min(area.width as usize) as u16;
    let height = (names.len().max(1) + 2).min(area.height as usize) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height,
    }
}
