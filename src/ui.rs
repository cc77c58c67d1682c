use anyhow::Result;
use chrono::NaiveDateTime;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dog_walker::{temporal, Dog, DogRepository, DogStatus, FreshnessPolicy, Walk};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dogs,
    Walks,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dogs => Page::Walks,
            Page::Walks => Page::Dogs,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dogs => "Dogs",
            Page::Walks => "Walks",
        }
    }
}

fn status_color(status: DogStatus) -> Color {
    match status {
        DogStatus::Content => Color::Green,
        DogStatus::Hungry => Color::Yellow,
        DogStatus::NeedsWalk => Color::Magenta,
        DogStatus::HungryAndNeedsWalk => Color::Red,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub content: usize,
    pub hungry: usize,
    pub needs_walk: usize,
}

pub struct App<'c> {
    repo: DogRepository<'c>,
    pub policy: FreshnessPolicy,
    pub dogs: Vec<Dog>,
    /// Walks with the names of the dogs that went
    pub walks: Vec<(Walk, Vec<String>)>,
    pub state: TableState,
    pub walks_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub message: Option<String>,
    clock: fn() -> NaiveDateTime,
}

impl<'c> App<'c> {
    pub fn new(conn: &'c Connection, policy: FreshnessPolicy) -> dog_walker::Result<Self> {
        let mut app = Self {
            repo: DogRepository::new(conn),
            policy,
            dogs: Vec::new(),
            walks: Vec::new(),
            state: TableState::default(),
            walks_state: TableState::default(),
            current_page: Page::Dogs,
            show_detail: false,
            message: None,
            clock: temporal::now_local,
        };
        app.refresh()?;
        Ok(app)
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Reload everything from the database (picks up writes from other sessions)
    pub fn refresh(&mut self) -> dog_walker::Result<()> {
        self.repo.invalidate();
        self.dogs = self.repo.find_all()?;

        self.walks = self
            .repo
            .walks()?
            .into_iter()
            .map(|walk| -> dog_walker::Result<(Walk, Vec<String>)> {
                let names = self.repo.dog_names_for(&walk)?;
                Ok((walk, names))
            })
            .collect::<dog_walker::Result<Vec<_>>>()?;

        clamp_selection(&mut self.state, self.dogs.len());
        clamp_selection(&mut self.walks_state, self.walks.len());
        Ok(())
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn selected_dog(&self) -> Option<&Dog> {
        self.state.selected().and_then(|i| self.dogs.get(i))
    }

    fn current_len_and_state(&mut self) -> (usize, &mut TableState) {
        match self.current_page {
            Page::Dogs => (self.dogs.len(), &mut self.state),
            Page::Walks => (self.walks.len(), &mut self.walks_state),
        }
    }

    pub fn next(&mut self) {
        let (len, state) = self.current_len_and_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (len, state) = self.current_len_and_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn feed_selected(&mut self) -> dog_walker::Result<()> {
        let now = self.now();
        let Some(index) = self.state.selected().filter(|&i| i < self.dogs.len()) else {
            return Ok(());
        };

        let dog = &mut self.dogs[index];
        self.repo.record_feeding(dog, now)?;
        self.message = Some(format!("Fed {} at {}", dog.name, temporal::format_activity_time(now)));
        Ok(())
    }

    pub fn walk_selected(&mut self) -> dog_walker::Result<()> {
        let now = self.now();
        let Some(index) = self.state.selected().filter(|&i| i < self.dogs.len()) else {
            return Ok(());
        };

        let dog = &mut self.dogs[index];
        let walk = self.repo.record_walk(dog, now)?;
        let name = dog.name.clone();
        self.message = Some(format!("Walked {} at {}", name, walk.formatted_time()));
        self.walks.insert(0, (walk, vec![name]));
        clamp_selection(&mut self.walks_state, self.walks.len());
        Ok(())
    }

    pub fn stats(&self) -> BoardStats {
        let now = self.now();
        let mut stats = BoardStats::default();

        for dog in &self.dogs {
            let status = dog.status(&self.policy, now);
            if status.is_content() {
                stats.content += 1;
            }
            if dog.is_hungry(&self.policy, now) {
                stats.hungry += 1;
            }
            if dog.needs_walk(&self.policy, now) {
                stats.needs_walk += 1;
            }
        }

        stats
    }

    /// Apply one key press. Returns false when the board should close.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let result = match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Enter => {
                self.toggle_detail();
                Ok(())
            }
            KeyCode::Tab => {
                self.next_page();
                Ok(())
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.next();
                Ok(())
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.previous();
                Ok(())
            }
            KeyCode::Char('f') if self.current_page == Page::Dogs => self.feed_selected(),
            KeyCode::Char('w') if self.current_page == Page::Dogs => self.walk_selected(),
            KeyCode::Char('r') => self.refresh().map(|_| {
                self.message = Some("Refreshed".to_string());
            }),
            _ => Ok(()),
        };

        if let Err(err) = result {
            tracing::error!(error = %err, "board action failed");
            self.message = Some(format!("Error: {}", err));
        }
        true
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        _ => {}
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
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
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code, key.modifiers) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with counts
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Dogs {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // Dog list
                Constraint::Percentage(40), // Detail panel
            ])
            .split(chunks[1]);

        render_dogs(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Dogs => render_dogs(f, chunks[1], app),
            Page::Walks => render_walks(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let mut tab_spans = vec![];
    for (i, page) in [Page::Dogs, Page::Walks].iter().enumerate() {
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

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Dogs: {}", app.dogs.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", stats.content),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("hungry {}", stats.hungry),
        Style::default().fg(Color::Yellow),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("needs walk {}", stats.needs_walk),
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

fn render_dogs(f: &mut Frame, area: Rect, app: &mut App) {
    let now = app.now();

    let rows = app.dogs.iter().map(|dog| {
        let status = dog.status(&app.policy, now);
        let color = status_color(status);
        let note = if status.is_content() { "content" } else { status.note() };

        let cells = vec![
            Cell::from(truncate(&dog.name, 20)).style(Style::default().fg(color)),
            Cell::from(dog.age(now).to_string()),
            Cell::from(truncate(&dog.breed, 18)),
            Cell::from(temporal::format_optional(dog.last_walked_at())),
            Cell::from(temporal::format_optional(dog.last_fed_at())),
            Cell::from(note).style(Style::default().fg(color)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(10),
            Constraint::Length(20),
            Constraint::Length(21),
            Constraint::Length(21),
            Constraint::Min(12),
        ],
    )
    .header(header_row(&["Name", "Age", "Breed", "Last walked", "Last fed", "Status"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Dogs "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_walks(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.walks.iter().map(|(walk, names)| {
        Row::new(vec![
            Cell::from(walk.formatted_time()).style(Style::default().fg(Color::Green)),
            Cell::from(names.join(", ")),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Length(26), Constraint::Min(20)])
        .header(header_row(&["When", "Dogs"]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Walks "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.walks_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = match app.current_page {
        Page::Dogs => (app.state.selected(), app.dogs.len()),
        Page::Walks => (app.walks_state.selected(), app.walks.len()),
    };
    let selected = selected.map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
    }

    for (key, label) in [
        ("f", " Feed"),
        ("w", " Walk"),
        ("r", " Refresh"),
        ("Enter", " Details"),
        ("Tab", " Page"),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(dog) = app.selected_dog() else {
        let no_selection = Paragraph::new("No dog selected")
            .block(Block::default().borders(Borders::ALL).title(" Dog Details "));
        f.render_widget(no_selection, area);
        return;
    };

    let now = app.now();
    let label = |text: &'static str| {
        Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    };
    let status = dog.status(&app.policy, now);

    let mut content = vec![
        Line::from(Span::styled(
            format!("  {}", dog.name),
            Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![label("  Age: "), Span::raw(dog.age(now).to_string())]),
        Line::from(vec![label("  Breed: "), Span::raw(dog.breed.clone())]),
        Line::from(vec![label("  Image: "), Span::raw(truncate(&dog.image_url, 40))]),
    ];

    if !dog.favorite_treats.is_empty() {
        content.push(Line::from(vec![
            label("  Treats: "),
            Span::raw(dog.favorite_treats.join(", ")),
        ]));
    }

    content.extend([
        Line::from(""),
        Line::from(vec![
            label("  Last walked: "),
            Span::raw(temporal::format_optional(dog.last_walked_at())),
        ]),
        Line::from(vec![
            label("  Last fed: "),
            Span::raw(temporal::format_optional(dog.last_fed_at())),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Press Enter to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ]);

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Dog Details "),
    );

    f.render_widget(detail_panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dog_walker::{count_rows, setup_database, NewDog};

    fn fixed_now() -> NaiveDateTime {
        temporal::parse_timestamp("2022-04-08 12:00:00").unwrap()
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut repo = DogRepository::new(&conn);
        repo.create(NewDog::new("Lennon", "2020-08-31", "Pomeranian", "")).unwrap();
        repo.create(NewDog::new("Olivia", "2018-03-31", "Terrier", "")).unwrap();
        conn
    }

    #[test]
    fn test_navigation_wraps() {
        let conn = setup();
        let mut app = App::new(&conn, FreshnessPolicy::default()).unwrap();

        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_feed_and_walk_keys() {
        let conn = setup();
        let mut app = App::new(&conn, FreshnessPolicy::default())
            .unwrap()
            .with_clock(fixed_now);

        assert_eq!(app.stats().hungry, 2);

        assert!(app.handle_key(KeyCode::Char('f'), KeyModifiers::NONE));
        assert!(app.handle_key(KeyCode::Char('w'), KeyModifiers::NONE));

        assert_eq!(app.stats(), BoardStats { content: 1, hungry: 1, needs_walk: 1 });
        assert_eq!(app.walks.len(), 1);
        assert_eq!(app.walks[0].1, vec!["Lennon".to_string()]);
        assert_eq!(count_rows(&conn, "feedings").unwrap(), 1);
        assert!(app.message.as_deref().unwrap_or("").starts_with("Walked Lennon"));
    }

    #[test]
    fn test_feed_is_ignored_on_walks_page() {
        let conn = setup();
        let mut app = App::new(&conn, FreshnessPolicy::default()).unwrap();

        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        app.handle_key(KeyCode::Char('f'), KeyModifiers::NONE);
        assert_eq!(count_rows(&conn, "feedings").unwrap(), 0);
    }

    #[test]
    fn test_refresh_sees_outside_writes() {
        let conn = setup();
        let mut app = App::new(&conn, FreshnessPolicy::default()).unwrap();

        DogRepository::new(&conn)
            .create(NewDog::new("Biscuit", "2021-01-01", "Beagle", ""))
            .unwrap();
        assert_eq!(app.dogs.len(), 2);

        app.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        assert_eq!(app.dogs.len(), 3);
    }

    #[test]
    fn test_quit_keys() {
        let conn = setup();
        let mut app = App::new(&conn, FreshnessPolicy::default()).unwrap();

        assert!(!app.handle_key(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(!app.handle_key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Lennon", 10), "Lennon");
        assert_eq!(truncate("Señor Biscuits the Third", 10), "Señor B...");
    }
}
