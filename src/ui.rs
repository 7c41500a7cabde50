// 🖥️ Report Browser - ratatui view over a finished check
use crate::report::{PlaylistReport, ReportRow};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Playlist,
    Violations,
    Dances,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    All,
    InvalidTransitions,
    Unresolved,
    ByDance(String),
}

impl RowFilter {
    fn matches(&self, row: &ReportRow) -> bool {
        match self {
            RowFilter::All => true,
            RowFilter::InvalidTransitions => !row.valid_transition,
            RowFilter::Unresolved => !row.is_resolved(),
            RowFilter::ByDance(dance) => row.category.as_deref() == Some(dance.as_str()),
        }
    }

    fn label(&self) -> &str {
        match self {
            RowFilter::All => "all",
            RowFilter::InvalidTransitions => "invalid transitions",
            RowFilter::Unresolved => "no dance",
            RowFilter::ByDance(dance) => dance.as_str(),
        }
    }
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Playlist => Page::Violations,
            Page::Violations => Page::Dances,
            Page::Dances => Page::Playlist,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Playlist => Page::Dances,
            Page::Violations => Page::Playlist,
            Page::Dances => Page::Violations,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Playlist => "Playlist",
            Page::Violations => "Violations",
            Page::Dances => "Dances",
        }
    }
}

pub struct App {
    pub report: PlaylistReport,
    /// Indexes into `report.rows` that pass the active filter
    pub visible: Vec<usize>,
    pub state: TableState,
    pub dances_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: RowFilter,
}

impl App {
    pub fn new(report: PlaylistReport) -> Self {
        let mut dances_state = TableState::default();
        dances_state.select(Some(0));

        let mut app = Self {
            report,
            visible: Vec::new(),
            state: TableState::default(),
            dances_state,
            current_page: Page::Playlist,
            show_detail: false,
            filter: RowFilter::All,
        };
        app.apply_filter(RowFilter::All);
        app
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_row(&self) -> Option<&ReportRow> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .and_then(|index| self.report.rows.get(*index))
    }

    pub fn apply_filter(&mut self, filter: RowFilter) {
        self.visible = self
            .report
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.matches(row))
            .map(|(i, _)| i)
            .collect();
        self.filter = filter;

        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(RowFilter::All);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// (dance, count) in name order, as counted by the validator
    pub fn dance_counts(&self) -> Vec<(&str, usize)> {
        self.report
            .validation
            .counts
            .iter()
            .map(|(dance, count)| (dance.as_str(), *count))
            .collect()
    }

    /// Show only the dance highlighted on the Dances page
    pub fn filter_selected_dance(&mut self) {
        let dance = self
            .dances_state
            .selected()
            .and_then(|i| self.dance_counts().get(i).map(|(d, _)| d.to_string()));

        if let Some(dance) = dance {
            self.apply_filter(RowFilter::ByDance(dance));
            self.current_page = Page::Playlist;
        }
    }

    fn active_len(&self) -> usize {
        match self.current_page {
            Page::Dances => self.report.validation.counts.len(),
            _ => self.visible.len(),
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Dances => &mut self.dances_state,
            _ => &mut self.state,
        }
    }

    pub fn next(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(20));
        self.state.select(Some(i));
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

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter if app.current_page == Page::Dances => app.filter_selected_dance(),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Playlist;
                }
                KeyCode::Char('1') => {
                    app.apply_filter(RowFilter::All);
                    app.current_page = Page::Playlist;
                }
                KeyCode::Char('2') => {
                    app.apply_filter(RowFilter::InvalidTransitions);
                    app.current_page = Page::Playlist;
                }
                KeyCode::Char('3') => {
                    app.apply_filter(RowFilter::Unresolved);
                    app.current_page = Page::Playlist;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.visible.is_empty() {
                        app.state.select(Some(app.visible.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Playlist {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_playlist(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Playlist => render_playlist(f, chunks[1], app),
            Page::Violations => render_violations(f, chunks[1], app),
            Page::Dances => render_dances(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let validation = &app.report.validation;
    let pages = [Page::Playlist, Page::Violations, Page::Dances];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Tracks: {}", app.report.rows.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Blocks: {}", validation.block_count),
        Style::default().fg(Color::Cyan),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", validation.violations.len()),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("? {}", validation.unresolved_positions.len()),
        Style::default().fg(Color::Magenta),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_playlist(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["#", "Start", "Track", "Artists", "Time", "Dance", "OK"]);

    let rows: Vec<Row> = app
        .visible
        .iter()
        .filter_map(|i| app.report.rows.get(*i))
        .map(|row| {
            let color = if !row.is_resolved() {
                Color::Magenta
            } else if row.valid_transition {
                Color::Green
            } else {
                Color::Red
            };

            Row::new(vec![
                Cell::from(format!("{}", row.index + 1)),
                Cell::from(row.start_time.clone().unwrap_or_default()),
                Cell::from(truncate(&row.title, 30)),
                Cell::from(truncate(&row.creator, 24)),
                Cell::from(row.duration_display()),
                Cell::from(truncate(row.category_label(), 16)).style(Style::default().fg(color)),
                Cell::from(if row.valid_transition { "✓" } else { "✗" }).style(Style::default().fg(color)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(26),
            Constraint::Length(6),
            Constraint::Length(18),
            Constraint::Length(3),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Playlist ({}) ", app.filter.label())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_violations(f: &mut Frame, area: Rect, app: &App) {
    let mut content = vec![Line::from("")];

    if app.report.validation.violations.is_empty() && app.report.ambiguities.is_empty() {
        content.push(Line::from(Span::styled(
            "  No violations ✓",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
    }

    for violation in &app.report.validation.violations {
        let color = if violation.is_transition() { Color::Red } else { Color::Yellow };
        content.push(Line::from(vec![
            Span::styled("  ✗ ", Style::default().fg(color)),
            Span::raw(violation.to_string()),
        ]));
    }

    if !app.report.ambiguities.is_empty() {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            "  CATALOG AMBIGUITIES",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )));
        for ambiguity in &app.report.ambiguities {
            content.push(Line::from(vec![
                Span::styled("  ! ", Style::default().fg(Color::Magenta)),
                Span::raw(ambiguity.to_string()),
            ]));
        }
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Violations - {} ", app.report.validation.summary())),
    );

    f.render_widget(paragraph, area);
}

fn render_dances(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["Dance", "Count", "Share"]);
    let total = app.report.rows.len().max(1);

    let rows: Vec<Row> = app
        .dance_counts()
        .into_iter()
        .map(|(dance, count)| {
            Row::new(vec![
                Cell::from(dance.to_string()),
                Cell::from(format!("{}", count)),
                Cell::from(format!("{:.0}%", count as f64 * 100.0 / total as f64)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(25), Constraint::Length(10), Constraint::Length(10)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Dances - Enter to filter the playlist "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.dances_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.visible.len()),
        Style::default().fg(Color::Cyan),
    )];

    if app.filter != RowFilter::All {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", app.filter.label()),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    for (key, label) in [
        ("1/2/3", " All/Invalid/No dance | "),
        ("Enter", " Details | "),
        ("Tab", " Page | "),
        ("↑/↓", " Nav | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn detail_line<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Track Details ");

    let row = match app.selected_row() {
        Some(r) => r,
        None => {
            f.render_widget(Paragraph::new("No track selected").block(block), area);
            return;
        }
    };

    let verdict = if row.valid_transition {
        Span::styled("valid", Style::default().fg(Color::Green))
    } else {
        Span::styled("invalid", Style::default().fg(Color::Red))
    };

    let content = vec![
        Line::from(""),
        detail_line("  Position: ", format!("{}", row.index + 1)),
        Line::from(""),
        detail_line("  Track: ", row.title.clone()),
        Line::from(""),
        detail_line("  Artists: ", row.creator.clone()),
        Line::from(""),
        detail_line("  Duration: ", format!("{} ({} ms)", row.duration_display(), row.duration_ms)),
        Line::from(""),
        detail_line("  Dance: ", row.category_label().to_string()),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Transition: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            verdict,
        ]),
        Line::from(""),
        detail_line("  Tags: ", row.tags.join(" ")),
        Line::from(""),
        detail_line("  BPM: ", row.tempo.clone().unwrap_or_default()),
        Line::from(""),
        detail_line("  Start: ", row.start_time.clone().unwrap_or_default()),
        Line::from(""),
        detail_line("  Track id: ", row.id.clone()),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  LINK",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(row.reference.clone(), Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

// ============================================================================
// TESTS
// ============================================================================
