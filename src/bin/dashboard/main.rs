mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Tabs, Wrap,
    },
    Frame, Terminal,
};

use app::{format_change, format_pct, truncate, AppState, Tab};
use mlbb_meta_tracker::config::Config;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(cfg);

    // Initial load before rendering
    app.ensure_loaded(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('r') | KeyCode::Char('R') => app.reload(client).await,
                KeyCode::Tab | KeyCode::Right => app.tab = app.tab.next(),
                KeyCode::Char('1') => app.tab = Tab::Meta,
                KeyCode::Char('2') => app.tab = Tab::Trend,
                KeyCode::Char('3') => app.tab = Tab::Hero,
                KeyCode::Down | KeyCode::Char('j') => app.select_next_hero(),
                KeyCode::Up | KeyCode::Char('k') => app.select_prev_hero(),
                _ => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header + tabs
            Constraint::Min(0),    // body
            Constraint::Length(1), // status bar
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    match app.tab {
        Tab::Meta => render_meta(f, app, chunks[1]),
        Tab::Trend => render_trend(f, app, chunks[1]),
        Tab::Hero => render_hero(f, app, chunks[1]),
    }
    render_status(f, app, chunks[2]);
    render_footer(f, chunks[3]);
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .map(|t| Line::from(format!(" {} ", t.title())))
        .collect();

    let summary = format!(
        " MLBB Meta  │  {} heroes  │  {} dates ",
        app.views.hero_names.len(),
        app.views.dates
    );

    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(bordered(&summary))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    f.render_widget(tabs, area);
}

fn render_meta(f: &mut Frame, app: &AppState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let bars: Vec<Bar> = app
        .views
        .role_averages
        .iter()
        .map(|g| {
            Bar::default()
                .value((g.win_rate_pct * 100.0).round().max(0.0) as u64)
                .label(Line::from(truncate(&g.key, 8)))
                .text_value(format!("{:.1}", g.win_rate_pct))
        })
        .collect();

    let meta_title = match app.views.meta_average {
        Some(avg) => format!(" WIN RATE BY ROLE (meta {}) ", format_pct(avg)),
        None => " WIN RATE BY ROLE ".to_string(),
    };
    let chart = BarChart::default()
        .block(bordered(&meta_title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(8)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, halves[0]);

    let header = Row::new(["#", "Hero", "Role", "Win", "Ban"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let meta = app.views.meta_average.unwrap_or(0.0);
    let rows: Vec<Row> = app
        .views
        .latest_heroes
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let win_color = if o.win_rate_pct >= meta { Color::Green } else { Color::Red };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&o.hero_name, 16)),
                Cell::from(truncate(&o.primary_role, 10)),
                Cell::from(format_pct(o.win_rate_pct)).style(Style::default().fg(win_color)),
                Cell::from(format_pct(o.ban_rate_pct)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(bordered(" LATEST SNAPSHOT "));
    f.render_widget(table, halves[1]);
}

fn render_trend(f: &mut Frame, app: &AppState, area: Rect) {
    let paragraph = Paragraph::new(app.views.report_text.as_str())
        .block(bordered(" TREND REPORT "))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_hero(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(detail) = app.hero_detail() else {
        f.render_widget(Paragraph::new("No hero data loaded.").block(bordered(" HERO ")), area);
        return;
    };

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let change_color = if detail.change_pp >= 0.0 { Color::Green } else { Color::Red };
    let lines = vec![
        Line::from(vec![
            Span::styled(detail.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  │  {}  │  {}", detail.role, detail.lane)),
        ]),
        Line::from(vec![
            Span::raw(format!(
                "win {}  ban {}  change ",
                format_pct(detail.win_rate_pct),
                format_pct(detail.ban_rate_pct)
            )),
            Span::styled(format_change(detail.change_pp), Style::default().fg(change_color)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(bordered(&format!(
            " HERO {}/{} ",
            app.selected_hero + 1,
            app.views.hero_names.len()
        ))),
        parts[0],
    );

    let x_max = detail.points.last().map_or(1.0, |p| p.0.max(1.0));
    let meta = app.views.meta_average.unwrap_or(50.0);
    let meta_line = [(0.0, meta), (x_max, meta)];

    let (lo, hi) = detail
        .points
        .iter()
        .map(|p| p.1)
        .chain([meta])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let y_bounds = [(lo - 1.0).floor(), (hi + 1.0).ceil()];

    let datasets = vec![
        Dataset::default()
            .name("win rate %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&detail.points),
        Dataset::default()
            .name("meta avg")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&meta_line),
    ];

    let chart = Chart::new(datasets)
        .block(bordered(" WIN RATE HISTORY "))
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(detail.first_date.clone()), Span::raw(detail.last_date.clone())])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.0}", y_bounds[0])),
                    Span::raw(format!("{:.0}", y_bounds[1])),
                ])
                .style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(chart, parts[1]);
}

fn render_status(f: &mut Frame, app: &AppState, area: Rect) {
    let source = app
        .source
        .as_ref()
        .map_or("no data".to_string(), |s| s.to_string());
    let mut spans = vec![Span::styled(
        format!(" source: {} ", truncate(&source, 60)),
        Style::default().fg(Color::Green),
    )];
    if let Some(w) = app.warnings.last() {
        spans.push(Span::styled(
            format!(" ⚠ {}", truncate(w, 80)),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("reload  "),
        Span::styled("[tab / 1-3] ", Style::default().fg(Color::Yellow)),
        Span::raw("switch view  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select hero"),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
