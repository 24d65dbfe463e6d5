use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::BoxedAddress;
use crate::catalog::{self, Catalog, CatalogItem, LoadError, LoadOptions};
use crate::config::PlayerConfig;
use crate::player;
use crate::shelf::Shelf;
use crate::source::CatalogSource;

const COLOR_BG: Color = Color::Rgb(11, 19, 36);
const COLOR_PANEL_BG: Color = Color::Rgb(17, 27, 48);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(36, 52, 86);
const COLOR_BORDER_IDLE: Color = Color::Rgb(44, 60, 94);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(226, 232, 240);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_ERROR_BG: Color = Color::Rgb(42, 15, 18);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TAG_SEPARATOR_WIDTH: usize = 3;

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn badge_span(item: &CatalogItem) -> Span<'static> {
    let label = format!(" {} ", item.badge());
    if item.confidence {
        Span::styled(
            label,
            Style::default()
                .fg(COLOR_BG)
                .bg(COLOR_SUCCESS)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            label,
            Style::default()
                .fg(COLOR_ERROR)
                .bg(COLOR_ERROR_BG)
                .add_modifier(Modifier::BOLD),
        )
    }
}

/// Trims `text` so it fits in `width` columns, marking the cut with an ellipsis.
fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// The real terminal: raw mode plus the alternate screen.
struct CrosstermScreen;

impl player::Screen for CrosstermScreen {
    fn release(&mut self) -> Result<()> {
        let raw = disable_raw_mode();
        let mut stdout = io::stdout();
        let screen = stdout.execute(LeaveAlternateScreen).map(|_| ());
        let shown = stdout.execute(cursor::Show).map(|_| ());
        raw.and(screen).and(shown)?;
        Ok(())
    }

    fn reclaim(&mut self) -> Result<()> {
        enable_raw_mode()?;
        if let Err(err) = io::stdout().execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        Ok(())
    }
}

struct Spinner {
    index: usize,
}

impl Spinner {
    fn new() -> Self {
        Self { index: 0 }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % SPINNER_FRAMES.len();
    }

    fn reset(&mut self) {
        self.index = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    Search,
}

pub struct Options {
    pub shelf: Shelf<BoxedAddress>,
    pub source: Arc<dyn CatalogSource>,
    pub load_options: LoadOptions,
    pub player: PlayerConfig,
    pub placeholder_poster: String,
}

pub struct Model {
    shelf: Shelf<BoxedAddress>,
    source: Arc<dyn CatalogSource>,
    load_options: LoadOptions,
    player: PlayerConfig,
    placeholder_poster: String,
    status_message: String,
    load_error: Option<String>,
    booted: bool,
    pending_load: Option<Receiver<Result<Catalog, LoadError>>>,
    selected: usize,
    mode: InputMode,
    spinner: Spinner,
    needs_redraw: bool,
    needs_clear: bool,
}

impl Model {
    pub fn new(options: Options) -> Self {
        Self {
            shelf: options.shelf,
            source: options.source,
            load_options: options.load_options,
            player: options.player,
            placeholder_poster: options.placeholder_poster,
            status_message: "Loading catalog…".to_string(),
            load_error: None,
            booted: false,
            pending_load: None,
            selected: 0,
            mode: InputMode::Browse,
            spinner: Spinner::new(),
            needs_redraw: true,
            needs_clear: false,
        }
    }

    pub fn share_link(&self) -> String {
        self.shelf.share_link()
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_load();

        player::with_screen(&mut CrosstermScreen, || {
            let backend = CrosstermBackend::new(io::stdout());
            let mut terminal = Terminal::new(backend)?;
            terminal.clear()?;
            self.event_loop(&mut terminal)
        })
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_load() {
                self.mark_dirty();
            }

            if self.needs_clear {
                terminal.clear()?;
                self.needs_clear = false;
                self.needs_redraw = true;
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                            }
                        }
                        self.mark_dirty();
                    }
                } else {
                    self.mark_dirty();
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    self.spinner.advance();
                    self.mark_dirty();
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Starts the single outstanding catalog load; refuses to overlap loads.
    fn start_load(&mut self) {
        if self.is_loading() {
            self.status_message = "A load is already in progress.".to_string();
            return;
        }
        let (tx, rx) = bounded(1);
        let source = Arc::clone(&self.source);
        let mut opts = self.load_options.clone();
        opts.now = chrono::Utc::now();
        thread::spawn(move || {
            let result = catalog::load(source.as_ref(), &opts);
            let _ = tx.send(result);
        });
        self.pending_load = Some(rx);
        self.status_message = format!("Loading {}…", self.source.describe());
    }

    fn poll_load(&mut self) -> bool {
        let Some(rx) = &self.pending_load else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(LoadError::Malformed(
                "catalog loader stopped unexpectedly".to_string(),
            )),
        };
        self.pending_load = None;
        self.apply_load_result(result);
        true
    }

    fn apply_load_result(&mut self, result: Result<Catalog, LoadError>) {
        match result {
            Ok(catalog) => {
                self.load_error = None;
                let count = catalog.len();
                if self.booted {
                    self.shelf.replace_catalog(catalog);
                    self.status_message = format!("Reloaded {count} titles.");
                } else {
                    self.booted = true;
                    let opened = self.shelf.boot(catalog).map(|item| item.title.clone());
                    self.status_message = match opened {
                        Some(title) => format!("Loaded {count} titles. Playing {title}."),
                        None => format!("Loaded {count} titles."),
                    };
                    self.select_open_item();
                }
                self.clamp_selection();
            }
            Err(err) => {
                self.booted = true;
                self.shelf.replace_catalog(Catalog::default());
                self.selected = 0;
                let message = format!("Could not load {}: {}", self.source.describe(), err);
                self.status_message = "Catalog unavailable.".to_string();
                self.load_error = Some(message);
            }
        }
    }

    fn select_open_item(&mut self) {
        let Some(open_id) = self.shelf.view_state().open_item_id.clone() else {
            return;
        };
        if let Some(row) = (0..self.shelf.visible_len())
            .find(|&row| self.shelf.visible_at(row).is_some_and(|item| item.id == open_id))
        {
            self.selected = row;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.shelf.visible_len();
        self.selected = if len == 0 {
            0
        } else {
            self.selected.min(len - 1)
        };
    }

    fn modal_visible(&self) -> bool {
        self.shelf.open_item_ref().is_some()
    }

    fn focused_item(&self) -> Option<&CatalogItem> {
        self.shelf
            .open_item_ref()
            .or_else(|| self.shelf.visible_at(self.selected))
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.mode == InputMode::Search {
            self.handle_search_key(code);
            return Ok(false);
        }
        if self.modal_visible() {
            return self.handle_modal_key(code);
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc => {
                if !self.shelf.filter_text().is_empty() {
                    self.shelf.set_filter("");
                    self.clamp_selection();
                    self.status_message = "Filter cleared.".to_string();
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = self.shelf.visible_len().saturating_sub(1);
            }
            KeyCode::Char('/') => {
                self.mode = InputMode::Search;
                self.status_message = "Type to filter by title or tag. Enter to keep, Esc to clear.".to_string();
            }
            KeyCode::Char('s') => {
                let next = self.shelf.sort_mode().next();
                self.shelf.set_sort(next);
                self.clamp_selection();
                self.status_message = format!("Sorted by {}.", next.label());
            }
            KeyCode::Char('r') => self.start_load(),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('o') => self.open_externally()?,
            KeyCode::Char('c') => self.copy_embed_link()?,
            KeyCode::Char('y') => self.copy_share_link()?,
            KeyCode::Char('f') => self.launch_player()?,
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.mode = InputMode::Browse;
                self.status_message = format!("{} matching titles.", self.shelf.visible_len());
            }
            KeyCode::Esc => {
                self.mode = InputMode::Browse;
                self.shelf.set_filter("");
                self.status_message = "Filter cleared.".to_string();
            }
            KeyCode::Backspace => {
                let mut text = self.shelf.filter_text().to_string();
                text.pop();
                self.shelf.set_filter(text);
            }
            KeyCode::Char(ch) => {
                let mut text = self.shelf.filter_text().to_string();
                text.push(ch);
                self.shelf.set_filter(text);
            }
            _ => {}
        }
        self.clamp_selection();
    }

    fn handle_modal_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.shelf.close_item();
                self.status_message = "Player closed.".to_string();
            }
            KeyCode::Char('o') => self.open_externally()?,
            KeyCode::Char('c') => self.copy_embed_link()?,
            KeyCode::Char('y') => self.copy_share_link()?,
            KeyCode::Char('f') => self.launch_player()?,
            _ => {}
        }
        Ok(false)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.shelf.visible_len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
    }

    fn open_selected(&mut self) {
        let Some(id) = self.shelf.visible_at(self.selected).map(|item| item.id.clone()) else {
            self.status_message = "Nothing to play.".to_string();
            return;
        };
        if let Some(item) = self.shelf.open_item(&id) {
            self.status_message = if item.confidence {
                format!("Playing {}.", item.title)
            } else {
                format!(
                    "{} has no canonical embed link; it may open a share page instead.",
                    item.title
                )
            };
        }
    }

    fn focused_embed(&self) -> Result<(String, String)> {
        let item = self
            .focused_item()
            .ok_or_else(|| anyhow!("no title selected"))?;
        if item.embed.trim().is_empty() {
            return Err(anyhow!("{} has no link", item.title));
        }
        Ok((item.title.clone(), item.embed.clone()))
    }

    fn open_externally(&mut self) -> Result<()> {
        let (title, url) = self.focused_embed()?;
        match webbrowser::open(&url) {
            Ok(_) => {
                self.status_message = format!("Opened {title} in your browser.");
            }
            Err(err) => {
                self.status_message = format!("Failed to open {title}: {err} (URL: {url})");
            }
        }
        Ok(())
    }

    fn copy_embed_link(&mut self) -> Result<()> {
        let (title, url) = self.focused_embed()?;
        copy_to_clipboard(url)?;
        self.status_message = format!("Embed link for {title} copied to clipboard.");
        Ok(())
    }

    fn copy_share_link(&mut self) -> Result<()> {
        let link = self.shelf.share_link();
        copy_to_clipboard(link.clone())?;
        self.status_message = format!("Share link copied: {link}");
        Ok(())
    }

    fn launch_player(&mut self) -> Result<()> {
        let (title, url) = self.focused_embed()?;
        match player::launch(&self.player, &url, &mut CrosstermScreen)? {
            player::Launch::Detached => {
                self.status_message = format!("Launched player for {title}.");
            }
            player::Launch::Finished(status) => {
                self.needs_clear = true;
                self.status_message = format!("Player for {title} exited ({status}).");
            }
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_search(frame, layout[1]);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(layout[2]);
        self.draw_grid(frame, main[0]);
        self.draw_details(frame, main[1]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[3]);

        if self.modal_visible() {
            self.draw_player(frame, layout[2]);
        }
    }

    fn footer_text(&self) -> &'static str {
        match (self.mode, self.modal_visible()) {
            (InputMode::Search, _) => "type to filter · Enter keep · Esc clear",
            (_, true) => "o open · c copy embed · y copy share link · f player · Esc close",
            _ => "j/k move · Enter play · / search · s sort · r reload · o open · c copy · q quit",
        }
    }

    fn draw_search(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.mode == InputMode::Search;
        let border = if focused {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let mut spans = vec![Span::styled(
            self.shelf.filter_text().to_string(),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )];
        if focused {
            spans.push(Span::styled("▏", Style::default().fg(COLOR_ACCENT)));
        } else if self.shelf.filter_text().is_empty() {
            spans = vec![Span::styled(
                "Search title or tag (press /)",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )];
        }
        let title = format!(" Search · sort: {} ", self.shelf.sort_mode().label());
        let input = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(COLOR_ACCENT)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(COLOR_PANEL_BG)),
        );
        frame.render_widget(input, area);
    }

    fn draw_grid(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                format!(" Titles ({}/{}) ", self.shelf.visible_len(), self.shelf.catalog().len()),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_BG));

        if let Some(message) = self.empty_message() {
            let paragraph = Paragraph::new(message)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(if self.load_error.is_some() {
                    COLOR_ERROR
                } else {
                    COLOR_TEXT_SECONDARY
                }));
            frame.render_widget(paragraph, area);
            return;
        }

        let inner_width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = self
            .shelf
            .visible()
            .map(|item| ListItem::new(grid_row(item, inner_width)))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn empty_message(&self) -> Option<String> {
        if let Some(error) = &self.load_error {
            return Some(format!(
                "{error}\n\nMake sure the catalog exists, then press r to retry."
            ));
        }
        if !self.booted {
            return Some("Loading catalog…".to_string());
        }
        if self.shelf.visible_len() == 0 {
            if self.shelf.catalog().is_empty() {
                return Some("The catalog is empty.".to_string());
            }
            return Some(format!("No titles match “{}”.", self.shelf.filter_text()));
        }
        None
    }

    fn draw_details(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(" Details ", Style::default().fg(COLOR_ACCENT)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let text = match self.shelf.visible_at(self.selected) {
            Some(item) => detail_text(item, &self.placeholder_poster),
            None => Text::from(Span::styled(
                "Select a title to see its details.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        };
        let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_player(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(item) = self.shelf.open_item_ref() else {
            return;
        };
        let popup = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup);

        let mut lines = vec![
            Line::from(vec![
                badge_span(item),
                Span::raw(" "),
                Span::styled(
                    item.title.clone(),
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                item.tag_line(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::default(),
            Line::from(Span::styled("Embed link", Style::default().fg(COLOR_ACCENT))),
            Line::from(Span::raw(if item.embed.is_empty() {
                "(none)".to_string()
            } else {
                item.embed.clone()
            })),
            Line::default(),
            Line::from(Span::styled("Share link", Style::default().fg(COLOR_ACCENT))),
            Line::from(Span::raw(self.shelf.share_link())),
        ];
        if !item.confidence {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "This link could not be turned into an embed link. Paste the OneDrive embed code to fix it.",
                Style::default().fg(COLOR_ERROR),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        " Player ",
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup);
    }
}

fn grid_row(item: &CatalogItem, width: usize) -> Vec<Line<'static>> {
    let badge = badge_span(item);
    let year = if item.year.is_empty() {
        String::new()
    } else {
        format!(" ({})", item.year)
    };
    let title_width = width
        .saturating_sub(badge.width() + 1)
        .saturating_sub(UnicodeWidthStr::width(year.as_str()));
    let tags_width = width.saturating_sub(TAG_SEPARATOR_WIDTH);
    vec![
        Line::from(vec![
            badge,
            Span::raw(" "),
            Span::styled(
                truncate_to_width(&item.title, title_width),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(year, Style::default().fg(COLOR_TEXT_SECONDARY)),
        ]),
        Line::from(Span::styled(
            format!("   {}", truncate_to_width(&item.tag_line(), tags_width)),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
    ]
}

fn detail_text(item: &CatalogItem, placeholder_poster: &str) -> Text<'static> {
    let label = |name: &str| {
        Span::styled(
            format!("{name:<8}"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )
    };
    let value = |v: String| Span::styled(v, Style::default().fg(COLOR_TEXT_PRIMARY));
    let poster = if item.poster.is_empty() {
        placeholder_poster.to_string()
    } else {
        item.poster.clone()
    };
    let or_dash = |v: &str| {
        if v.is_empty() {
            "-".to_string()
        } else {
            v.to_string()
        }
    };
    Text::from(vec![
        Line::from(vec![badge_span(item)]),
        Line::default(),
        Line::from(vec![label("Title"), value(item.title.clone())]),
        Line::from(vec![label("Year"), value(or_dash(&item.year))]),
        Line::from(vec![label("Tags"), value(or_dash(&item.tag_line()))]),
        Line::from(vec![label("Added"), value(item.added_at.clone())]),
        Line::from(vec![label("Id"), value(item.id.clone())]),
        Line::from(vec![label("Poster"), value(poster)]),
        Line::default(),
        Line::from(vec![label("Embed"), value(or_dash(&item.embed))]),
    ])
}

fn copy_to_clipboard(text: String) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|err| anyhow!("create clipboard context: {}", err))?;
    clipboard
        .set_text(text)
        .map_err(|err| anyhow!("copy to clipboard: {}", err))?;
    Ok(())
}
