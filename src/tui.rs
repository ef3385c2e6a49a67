use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use tracing::{info, warn};

use crate::currencies::Converter;
use crate::error::ConverterError;
use crate::models::{Conversion, CurrencyDirectory, DirectoryEntry};

const MAX_AMOUNT_DIGITS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Popular,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Mode,
    Picker(Side),
    Amount,
}

impl Focus {
    const ORDER: [Focus; 4] = [
        Focus::Mode,
        Focus::Picker(Side::Source),
        Focus::Picker(Side::Destination),
        Focus::Amount,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Focus {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Focus {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Search box plus the selected row among its matches.
#[derive(Debug, Default)]
struct Picker {
    query: String,
    selected: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Loading(String),
    Converted(Conversion),
    Failed(String),
}

/// What the event loop has to do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Quit,
    Convert { from: String, to: String, amount: u32 },
    LoadDirectory,
}

pub struct App {
    mode: Mode,
    focus: Focus,
    popular: CurrencyDirectory,
    popular_selected: [usize; 2],
    directory: CurrencyDirectory,
    pickers: [Picker; 2],
    amount: String,
    status: Status,
}

fn slot(side: Side) -> usize {
    match side {
        Side::Source => 0,
        Side::Destination => 1,
    }
}

impl App {
    pub fn new(popular: CurrencyDirectory) -> App {
        App {
            mode: Mode::Popular,
            focus: Focus::Mode,
            popular_selected: [0, 1usize.min(popular.len().saturating_sub(1))],
            popular,
            directory: CurrencyDirectory::default(),
            pickers: [Picker::default(), Picker::default()],
            amount: "1".to_string(),
            status: Status::Idle,
        }
    }

    pub fn query(&self, side: Side) -> &str {
        &self.pickers[slot(side)].query
    }

    /// Entries offered by a picker in the current mode.
    pub fn options(&self, side: Side) -> Vec<&DirectoryEntry> {
        match self.mode {
            Mode::Popular => self.popular.entries().iter().collect(),
            Mode::Search => self.directory.search(&self.pickers[slot(side)].query),
        }
    }

    fn selected_index(&self, side: Side) -> usize {
        match self.mode {
            Mode::Popular => self.popular_selected[slot(side)],
            Mode::Search => self.pickers[slot(side)].selected,
        }
    }

    fn selected_index_mut(&mut self, side: Side) -> &mut usize {
        match self.mode {
            Mode::Popular => &mut self.popular_selected[slot(side)],
            Mode::Search => &mut self.pickers[slot(side)].selected,
        }
    }

    pub fn selected(&self, side: Side) -> Option<&DirectoryEntry> {
        self.options(side).get(self.selected_index(side)).copied()
    }

    /// Amount as typed; `None` unless it is a whole number of at least 1.
    pub fn amount(&self) -> Option<u32> {
        self.amount.parse::<u32>().ok().filter(|a| *a >= 1)
    }

    pub fn set_loading(&mut self, message: &str) {
        self.status = Status::Loading(message.to_string());
    }

    pub fn set_directory(&mut self, directory: CurrencyDirectory) {
        self.directory = directory;
        for picker in self.pickers.iter_mut() {
            picker.selected = 0;
        }
        self.status = Status::Idle;
    }

    pub fn fail(&mut self, err: &ConverterError) {
        self.status = Status::Failed(err.user_message());
    }

    pub fn finish_conversion(&mut self, result: Result<Conversion, ConverterError>) {
        match result {
            Ok(conversion) => self.status = Status::Converted(conversion),
            Err(err) => self.fail(&err),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            return Action::Quit;
        }

        match key.code {
            KeyCode::Enter => return self.conversion_request(),
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return Action::None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.previous();
                return Action::None;
            }
            KeyCode::F(5) if self.mode == Mode::Search => return Action::LoadDirectory,
            _ => {}
        }

        match self.focus {
            Focus::Mode => self.handle_mode_key(key),
            Focus::Picker(side) => {
                self.handle_picker_key(side, key);
                Action::None
            }
            Focus::Amount => {
                self.handle_amount_key(key);
                Action::None
            }
        }
    }

    fn handle_mode_key(&mut self, key: KeyEvent) -> Action {
        if !matches!(key.code, KeyCode::Left | KeyCode::Right) {
            return Action::None;
        }
        self.mode = match self.mode {
            Mode::Popular => Mode::Search,
            Mode::Search => Mode::Popular,
        };
        // The directory is never reused across visits to search mode.
        if self.mode == Mode::Search {
            Action::LoadDirectory
        } else {
            Action::None
        }
    }

    fn handle_picker_key(&mut self, side: Side, key: KeyEvent) {
        let count = self.options(side).len();
        match key.code {
            KeyCode::Up => {
                let selected = self.selected_index_mut(side);
                *selected = selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let selected = self.selected_index_mut(side);
                if *selected + 1 < count {
                    *selected += 1;
                }
            }
            KeyCode::Char(c) if self.mode == Mode::Search && !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let picker = &mut self.pickers[slot(side)];
                picker.query.push(c);
                picker.selected = 0;
            }
            KeyCode::Backspace if self.mode == Mode::Search => {
                let picker = &mut self.pickers[slot(side)];
                picker.query.pop();
                picker.selected = 0;
            }
            _ => {}
        }
    }

    fn handle_amount_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() && self.amount.len() < MAX_AMOUNT_DIGITS => {
                if self.amount == "0" {
                    self.amount.clear();
                }
                self.amount.push(c);
            }
            KeyCode::Backspace => {
                self.amount.pop();
            }
            KeyCode::Up => {
                let next = self.amount().unwrap_or(0).saturating_add(1);
                self.amount = next.to_string();
            }
            KeyCode::Down => {
                let next = self.amount().unwrap_or(1).saturating_sub(1).max(1);
                self.amount = next.to_string();
            }
            _ => {}
        }
    }

    fn conversion_request(&mut self) -> Action {
        let Some(amount) = self.amount() else {
            self.fail(&ConverterError::validation(
                "amount must be a whole number of at least 1",
            ));
            return Action::None;
        };
        match (self.selected(Side::Source), self.selected(Side::Destination)) {
            (Some(from), Some(to)) => Action::Convert {
                from: from.code.clone(),
                to: to.code.clone(),
                amount,
            },
            _ => {
                self.fail(&ConverterError::validation(
                    "select both a source and a destination currency",
                ));
                Action::None
            }
        }
    }
}

pub async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    converter: &Converter,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw_ui(f, &app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key) {
            Action::Quit => return Ok(()),
            Action::None => {}
            Action::Convert { from, to, amount } => {
                app.set_loading("Fetching exchange rates...");
                terminal.draw(|f| draw_ui(f, &app))?;
                let result = converter
                    .convert_currency(&from, &to, f64::from(amount))
                    .await;
                if let Err(err) = &result {
                    warn!(validation = err.is_validation(), "Conversion failed: {}", err);
                }
                app.finish_conversion(result);
            }
            Action::LoadDirectory => {
                app.set_loading("Loading currency list...");
                terminal.draw(|f| draw_ui(f, &app))?;
                match converter.currency_directory().await {
                    Ok(directory) => app.set_directory(directory),
                    Err(err) => app.fail(&err),
                }
            }
        }
    }
}

fn focus_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

fn draw_picker(f: &mut Frame, app: &App, side: Side, area: Rect) {
    let name = match side {
        Side::Source => "From",
        Side::Destination => "To",
    };
    let title = match app.mode {
        Mode::Popular => name.to_string(),
        Mode::Search => format!("{} (search: {})", name, app.query(side)),
    };

    let options = app.options(side);
    let (items, selected): (Vec<ListItem>, Option<usize>) = if options.is_empty() {
        (vec![ListItem::new("No matching currencies")], None)
    } else {
        (
            options
                .iter()
                .map(|entry| ListItem::new(entry.label()))
                .collect(),
            Some(app.selected_index(side).min(options.len() - 1)),
        )
    };

    let list = List::new(items)
        .block(focus_block(title, app.focus == Focus::Picker(side)))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, area, &mut state);
}

fn result_lines(status: &Status) -> Vec<Line<'static>> {
    match status {
        Status::Idle => vec![Line::from("Press Enter to convert.")],
        Status::Loading(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        ))],
        Status::Converted(conversion) => vec![
            Line::from(Span::styled(
                conversion.to_string(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "1 {} = {} {}",
                conversion.from, conversion.rate, conversion.to
            )),
            Line::from(""),
            Line::from(format!(
                "Rates last updated: {}",
                conversion.last_updated_display()
            )),
        ],
        Status::Failed(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))],
    }
}

pub fn draw_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(f.size());

    let title = Paragraph::new("Currency Converter")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(body[0]);

    let selected_tab = match app.mode {
        Mode::Popular => 0,
        Mode::Search => 1,
    };
    let tabs = Tabs::new(vec!["Popular currencies", "All currencies"])
        .select(selected_tab)
        .block(focus_block("Mode".to_string(), app.focus == Focus::Mode))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, sidebar[0]);

    draw_picker(f, app, Side::Source, sidebar[1]);
    draw_picker(f, app, Side::Destination, sidebar[2]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(body[1]);

    let amount = Paragraph::new(app.amount.as_str())
        .block(focus_block("Amount".to_string(), app.focus == Focus::Amount));
    f.render_widget(amount, main[0]);

    let result = Paragraph::new(result_lines(&app.status))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Result").borders(Borders::ALL));
    f.render_widget(result, main[1]);

    let help = Paragraph::new(
        "Tab: next field | Left/Right: mode | Up/Down: select | Enter: convert | F5: reload | Esc: quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[2]);
}

pub async fn start_tui(converter: &Converter, popular: CurrencyDirectory) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("Starting interactive converter");
    let app = App::new(popular);
    let res = run_app(&mut terminal, app, converter).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
