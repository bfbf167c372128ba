use anyhow::Result;
use cashback_tracker::webapp_data::format_percent;
use cashback_tracker::{
    get_all_cashbacks, CashbackEntry, FormField, FormFields, FormSource, HostMessage, LocalHost,
    MainButtonStyle, WebApp,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(FormField),
    MainButton,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Field(FormField::Bank) => Focus::Field(FormField::Category),
            Focus::Field(FormField::Category) => Focus::Field(FormField::Percent),
            Focus::Field(FormField::Percent) => Focus::MainButton,
            Focus::MainButton => Focus::Field(FormField::Bank),
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::Field(FormField::Bank) => Focus::MainButton,
            Focus::Field(FormField::Category) => Focus::Field(FormField::Bank),
            Focus::Field(FormField::Percent) => Focus::Field(FormField::Category),
            Focus::MainButton => Focus::Field(FormField::Percent),
        }
    }
}

fn field_label(field: FormField) -> &'static str {
    match field {
        FormField::Bank => "Банк",
        FormField::Category => "Категория",
        FormField::Percent => "Процент",
    }
}

pub struct App<'a> {
    pub webapp: WebApp<LocalHost<'a>>,
    pub style: MainButtonStyle,
    pub form: FormFields,
    pub focus: Focus,
    pub entries: Vec<CashbackEntry>,
    pub last_message: Option<HostMessage>,
}

impl<'a> App<'a> {
    pub fn new(host: LocalHost<'a>, style: MainButtonStyle) -> Result<Self> {
        let webapp = WebApp::init(host, &style);

        let mut app = Self {
            webapp,
            style,
            form: FormFields::default(),
            focus: Focus::Field(FormField::Bank),
            entries: Vec::new(),
            last_message: None,
        };
        app.refresh_entries()?;
        Ok(app)
    }

    pub fn refresh_entries(&mut self) -> Result<()> {
        let host = self.webapp.bridge();
        self.entries = get_all_cashbacks(host.connection(), host.user_id())?;
        Ok(())
    }

    /// Same as tapping the Mini App's main button
    pub fn press_main_button(&mut self) -> Result<()> {
        self.webapp.send_data(&self.form);

        for message in self.webapp.bridge().take_messages() {
            if matches!(message, HostMessage::Reply(_)) {
                self.form.clear();
                self.focus = Focus::Field(FormField::Bank);
                self.refresh_entries()?;
            }
            self.last_message = Some(message);
        }

        Ok(())
    }

    /// Returns false when the user asked to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => return Ok(false),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(false)
            }
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.previous(),
            KeyCode::Enter => match self.focus {
                Focus::MainButton => self.press_main_button()?,
                Focus::Field(_) => self.focus = self.focus.next(),
            },
            KeyCode::Backspace => {
                if let Focus::Field(field) = self.focus {
                    self.form.get_mut(field).pop();
                }
            }
            KeyCode::Char(c) => {
                if let Focus::Field(field) = self.focus {
                    self.form.get_mut(field).push(c);
                }
            }
            _ => {}
        }

        Ok(true)
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key)? {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(12), // Form
            Constraint::Min(0),     // Saved cashbacks
            Constraint::Length(4),  // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_form(f, chunks[1], app);
    render_entries(f, chunks[2], app);
    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "💳 Кешбэк",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("User: {}", app.webapp.bridge().user_id()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Saved: {}", app.entries.len()),
            Style::default().fg(Color::Green),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    for (i, field) in FormField::ALL.into_iter().enumerate() {
        let focused = app.focus == Focus::Field(field);
        let border = if focused { Color::Yellow } else { Color::DarkGray };

        let mut value = app.form.value(field);
        if focused {
            value.push('▏');
        }

        let input = Paragraph::new(value).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(format!(" {} ", field_label(field))),
        );
        f.render_widget(input, rows[i]);
    }

    let mut button_style = Style::default()
        .fg(hex_color(&app.style.text_color).unwrap_or(Color::White))
        .bg(hex_color(&app.style.color).unwrap_or(Color::Green));
    if app.focus == Focus::MainButton {
        button_style = button_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    let button = Paragraph::new(Line::from(Span::styled(" Отправить ", button_style)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, rows[3]);
}

fn render_entries(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(["Банк", "Категория", "%"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.entries.iter().map(|entry| {
        Row::new(vec![
            Cell::from(entry.bank.clone()),
            Cell::from(entry.category.clone()),
            Cell::from(format_percent(entry.percent)).style(Style::default().fg(Color::Green)),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(20), Constraint::Length(30), Constraint::Length(8)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Мои кешбэки "),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let message = match &app.last_message {
        Some(HostMessage::Alert(text)) => {
            Line::from(Span::styled(format!("⚠ {}", text), Style::default().fg(Color::Red)))
        }
        Some(HostMessage::Rejected(text)) => {
            Line::from(Span::styled(format!("✗ {}", text), Style::default().fg(Color::Red)))
        }
        Some(HostMessage::Reply(text)) => Line::from(Span::styled(
            text.lines().next().unwrap_or_default().to_string(),
            Style::default().fg(Color::Green),
        )),
        None => Line::from(""),
    };

    let help = Line::from(vec![
        Span::styled("Tab/↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Field | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Next / Send | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ]);

    let status_bar = Paragraph::new(vec![message, help])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));

    f.render_widget(status_bar, area);
}

/// `#2cab37` → `Color::Rgb(0x2c, 0xab, 0x37)`
fn hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some(Color::Rgb(r, g, b))
}
