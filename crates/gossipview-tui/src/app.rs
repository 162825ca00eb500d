use std::sync::Arc;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use gossipview_core::display::format_clock;
use gossipview_core::settings::{cycle_interval, parse_interval, SettingsForm};
use gossipview_core::source::{api_link, resolve_target, startup_base_url};
use gossipview_core::{normalize, NodeReport, Settings, SourceError};
use gossipview_service::{GossipSource, ServiceError};
use gossipview_store::{KeyValueStore, SettingsStore};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::components::card_list::{CardList, RowAction};
use crate::components::centered_rect;
use crate::event::AppEvent;
use crate::overlay::DetailOverlay;
use crate::poll::{PollController, PollOutcome, PollPhase};
use crate::refresh_timer::RefreshTimer;
use crate::view::{build_view, CardsView, Disclosures, Pagination};

pub const NO_BASE_URL_MESSAGE: &str = "Please set the Base API URL.";
pub const INVALID_URL_MESSAGE: &str = "Please enter a valid http(s) URL for the API.";
pub const LOADING_MESSAGE: &str = "Loading…";
pub const SAVED_MESSAGE: &str = "Saved.";

pub type DynStore = Box<dyn KeyValueStore + Send>;

/// What the app is currently doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Card list navigation
    Normal,
    /// Editing the settings form. Nothing is persisted until Enter.
    EditSettings {
        form: SettingsForm,
        field: SettingsField,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    BaseUrl,
    UseProxy,
    AutoRefresh,
    Interval,
}

impl SettingsField {
    fn next(self) -> Self {
        match self {
            SettingsField::BaseUrl => SettingsField::UseProxy,
            SettingsField::UseProxy => SettingsField::AutoRefresh,
            SettingsField::AutoRefresh => SettingsField::Interval,
            SettingsField::Interval => SettingsField::BaseUrl,
        }
    }

    fn prev(self) -> Self {
        match self {
            SettingsField::BaseUrl => SettingsField::Interval,
            SettingsField::UseProxy => SettingsField::BaseUrl,
            SettingsField::AutoRefresh => SettingsField::UseProxy,
            SettingsField::Interval => SettingsField::AutoRefresh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    /// `false` renders the line as an error.
    pub ok: bool,
}

/// The whole dashboard: settings, poll bookkeeping, the last model and
/// everything drawn from it.
pub struct App {
    store: SettingsStore<DynStore>,
    settings: Settings,
    version: Option<String>,
    source: Arc<dyn GossipSource>,
    tx: UnboundedSender<AppEvent>,
    poll: PollController,
    timer: RefreshTimer,
    nodes: Vec<NodeReport>,
    pagination: Pagination,
    disclosures: Disclosures,
    view: CardsView,
    cards: CardList,
    overlay: DetailOverlay,
    status: StatusLine,
    mode: Mode,
    screen: Rect,
    should_quit: bool,
}

impl App {
    /// Build the app from stored settings. Nothing is fetched until
    /// [`App::bootstrap`].
    pub fn new(store: DynStore, source: Arc<dyn GossipSource>, tx: UnboundedSender<AppEvent>) -> Self {
        let store = SettingsStore::new(store);
        let settings = store.load();
        let view = CardsView::Empty;
        let mut cards = CardList::new();
        cards.rebuild(&view);
        Self {
            store,
            settings,
            version: None,
            source,
            tx,
            poll: PollController::new(),
            timer: RefreshTimer::new(),
            nodes: Vec::new(),
            pagination: Pagination::default(),
            disclosures: Disclosures::default(),
            view,
            cards,
            overlay: DetailOverlay::default(),
            status: StatusLine {
                text: String::new(),
                ok: true,
            },
            mode: Mode::Normal,
            screen: Rect::default(),
            should_quit: false,
        }
    }

    /// Fetch host defaults, adopt the default base URL when none is
    /// stored, then run the first poll and arm auto-refresh.
    pub async fn bootstrap(&mut self) {
        let config = match self.source.fetch_config().await {
            Ok(config) => Some(config),
            Err(e) => {
                debug!("no host config, continuing without defaults: {e}");
                None
            }
        };

        if let Some(config) = &config {
            self.version = config.version.clone().filter(|v| !v.is_empty());
            match &self.version {
                Some(v) => info!(version = %v, "dashboard host config loaded"),
                None => warn!("dashboard host did not report a version"),
            }
        }

        if self.settings.base_url.is_empty() {
            let server_default = config.as_ref().and_then(|c| c.default_base_url());
            let adopted = startup_base_url(&self.settings.base_url, server_default);
            if let Err(e) = self.store.set_base_url(&adopted) {
                warn!("failed to persist default base URL: {e}");
            }
            if !adopted.is_empty() {
                info!(base_url = %adopted, "adopted host default base URL");
            }
            self.settings.base_url = adopted;
        }

        self.refresh();
        self.rearm_timer();
    }

    /// Start a poll. Any poll still in flight is superseded.
    pub fn refresh(&mut self) {
        let target = match resolve_target(&self.settings) {
            Ok(target) => target,
            Err(SourceError::NoBaseUrlConfigured) => {
                self.poll.abandon();
                self.set_status(NO_BASE_URL_MESSAGE, false);
                return;
            }
        };

        let token = self.poll.begin();
        info!(token, target = target.as_str(), "poll started");
        self.set_status(LOADING_MESSAGE, true);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_gossip(&target).await;
            let _ = tx.send(AppEvent::PollFinished { token, result });
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Resize => {}
            AppEvent::PollFinished { token, result } => self.finish_poll(token, result),
            AppEvent::RefreshTick { timer } => {
                if self.timer.accepts(timer) {
                    self.refresh();
                } else {
                    debug!(timer, "ignoring tick from cancelled timer");
                }
            }
        }
    }

    fn finish_poll(&mut self, token: u64, result: Result<Value, ServiceError>) {
        let outcome = match result {
            Ok(_) => PollOutcome::Succeeded,
            Err(_) => PollOutcome::Failed,
        };
        if !self.poll.complete(token, outcome) {
            debug!(token, "discarding superseded poll result");
            return;
        }

        match result {
            Ok(payload) => {
                self.nodes = normalize(&payload);
                self.pagination.retain_nodes(&self.nodes);
                self.disclosures.clear();
                self.rerender();
                info!(token, nodes = self.nodes.len(), "poll succeeded");
                self.set_status(format!("Updated at {}", format_clock(Local::now())), true);
            }
            Err(e) => {
                warn!(token, "poll failed: {e}");
                self.set_status(format!("Failed to load gossip: {e}"), false);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.overlay.handle_key(key) {
            return;
        }

        match self.mode.clone() {
            Mode::Normal => self.handle_normal(key),
            Mode::EditSettings { form, field } => self.handle_edit_settings(key, form, field),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('e') => {
                self.mode = Mode::EditSettings {
                    form: SettingsForm::from(&self.settings),
                    field: SettingsField::BaseUrl,
                };
            }
            KeyCode::Char('a') => self.toggle_auto_refresh(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.step_interval(true),
            KeyCode::Char('-') => self.step_interval(false),
            KeyCode::Char('j') | KeyCode::Down => self.cards.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.cards.select_prev(),
            KeyCode::Char('g') | KeyCode::Home => self.cards.select_first(),
            KeyCode::Char('G') | KeyCode::End => self.cards.select_last(),
            KeyCode::Enter => {
                if let Some(action) = self.cards.selected_action().cloned() {
                    self.activate(action);
                }
            }
            _ => {}
        }
    }

    fn handle_edit_settings(&mut self, key: KeyEvent, mut form: SettingsForm, field: SettingsField) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                return;
            }
            KeyCode::Enter => {
                self.save_settings(form, field);
                return;
            }
            KeyCode::Tab | KeyCode::Down => {
                self.mode = Mode::EditSettings {
                    form,
                    field: field.next(),
                };
                return;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.mode = Mode::EditSettings {
                    form,
                    field: field.prev(),
                };
                return;
            }
            _ => {}
        }

        match (field, key.code) {
            (SettingsField::BaseUrl, KeyCode::Backspace) => {
                form.base_url.pop();
            }
            (SettingsField::BaseUrl, KeyCode::Char(c)) => form.base_url.push(c),
            (SettingsField::UseProxy, KeyCode::Char(' ')) => form.use_proxy = !form.use_proxy,
            (SettingsField::AutoRefresh, KeyCode::Char(' ')) => {
                form.auto_refresh = !form.auto_refresh
            }
            (SettingsField::Interval, KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right) => {
                form.interval = cycle_interval(parse_interval(&form.interval), true).to_string();
            }
            (SettingsField::Interval, KeyCode::Char('-') | KeyCode::Left) => {
                form.interval = cycle_interval(parse_interval(&form.interval), false).to_string();
            }
            (SettingsField::Interval, KeyCode::Char(c)) if c.is_ascii_digit() => {
                form.interval.push(c)
            }
            (SettingsField::Interval, KeyCode::Backspace) => {
                form.interval.pop();
            }
            _ => {}
        }
        self.mode = Mode::EditSettings { form, field };
    }

    /// Validate and persist the form. A rejected form keeps the previous
    /// settings and issues no request.
    fn save_settings(&mut self, form: SettingsForm, field: SettingsField) {
        let settings = match form.validate() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("settings rejected: {e}");
                self.set_status(INVALID_URL_MESSAGE, false);
                self.mode = Mode::EditSettings { form, field };
                return;
            }
        };

        if let Err(e) = self.store.save(&settings) {
            error!("failed to save settings: {e}");
            self.set_status(format!("Failed to save settings: {e}"), false);
            self.mode = Mode::EditSettings { form, field };
            return;
        }

        info!(
            base_url = %settings.base_url,
            use_proxy = settings.use_proxy,
            auto_refresh = settings.auto_refresh,
            interval = settings.interval_seconds,
            "settings saved"
        );
        self.settings = settings;
        self.mode = Mode::Normal;
        self.set_status(SAVED_MESSAGE, true);
        self.refresh();
        self.rearm_timer();
    }

    fn toggle_auto_refresh(&mut self) {
        let enabled = !self.settings.auto_refresh;
        if let Err(e) = self.store.set_auto_refresh(enabled) {
            error!("failed to save auto-refresh: {e}");
            self.set_status(format!("Failed to save settings: {e}"), false);
            return;
        }
        self.settings.auto_refresh = enabled;
        self.rearm_timer();
    }

    fn step_interval(&mut self, forward: bool) {
        let next = cycle_interval(self.settings.interval_seconds, forward);
        if let Err(e) = self.store.set_interval_seconds(next) {
            error!("failed to save interval: {e}");
            self.set_status(format!("Failed to save settings: {e}"), false);
            return;
        }
        self.settings.interval_seconds = next;
        self.rearm_timer();
    }

    fn rearm_timer(&mut self) {
        self.timer.rearm(
            self.settings.auto_refresh,
            self.settings.refresh_period(),
            &self.tx,
        );
    }

    fn activate(&mut self, action: RowAction) {
        match action {
            RowAction::ToggleTasks { node, repo } => {
                self.disclosures.toggle(&node, repo);
                self.rerender();
            }
            RowAction::ShowMore { node } => {
                self.pagination.show_more(&node);
                self.rerender();
            }
            RowAction::OpenOutput { text } => self.overlay.open(&text),
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.overlay.handle_click(mouse.column, mouse.row, self.screen) {
                    return;
                }
                if self.mode != Mode::Normal {
                    return;
                }
                if let Some(action) = self.cards.action_at(mouse.column, mouse.row) {
                    self.cards.select_where(|a| *a == action);
                    self.activate(action);
                }
            }
            MouseEventKind::ScrollDown if !self.overlay.is_open() => self.cards.select_next(),
            MouseEventKind::ScrollUp if !self.overlay.is_open() => self.cards.select_prev(),
            _ => {}
        }
    }

    fn rerender(&mut self) {
        self.view = build_view(&self.nodes, &self.pagination, &self.disclosures);
        self.cards.rebuild(&self.view);
    }

    fn set_status(&mut self, text: impl Into<String>, ok: bool) {
        self.status = StatusLine {
            text: text.into(),
            ok,
        };
    }

    // -- Accessors --

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings as currently persisted.
    pub fn stored_settings(&self) -> Settings {
        self.store.load()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn view(&self) -> &CardsView {
        &self.view
    }

    pub fn nodes(&self) -> &[NodeReport] {
        &self.nodes
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn cards(&self) -> &CardList {
        &self.cards
    }

    pub fn overlay(&self) -> &DetailOverlay {
        &self.overlay
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.poll.phase(), PollPhase::Fetching { .. })
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn timer_period(&self) -> Option<std::time::Duration> {
        self.timer.period()
    }

    /// Plain-text rendering of the card list.
    pub fn snapshot_text(&self) -> String {
        self.cards.text_lines().join("\n")
    }

    // -- Rendering --

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.screen = area;

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_title_bar(frame, layout[0]);
        self.cards.render(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        if let Mode::EditSettings { form, field } = &self.mode {
            render_settings_form(frame, form, *field, area);
        }
        self.overlay.render(frame, area);
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " gossipview ",
            Style::default().bold().fg(Color::Cyan),
        )];
        if let Some(version) = &self.version {
            spans.push(Span::styled(
                format!("v{version} "),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::raw("| "));
        match api_link(&self.settings.base_url) {
            Some(link) => spans.push(Span::styled(link, Style::default().fg(Color::Yellow))),
            None => spans.push(Span::styled("no base URL", Style::default().fg(Color::DarkGray))),
        }
        if self.settings.use_proxy {
            spans.push(Span::styled(" (proxy)", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::raw(" | "));
        let auto = if self.settings.auto_refresh {
            Span::styled(
                format!("auto {}s", self.settings.refresh_period().as_secs()),
                Style::default().fg(Color::Green),
            )
        } else {
            Span::styled("auto off", Style::default().fg(Color::DarkGray))
        };
        spans.push(auto);
        frame.render_widget(Line::from(spans), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let status_style = if self.status.ok {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::Red).bold()
        };

        let hints: &[(&str, &str)] = if self.overlay.is_open() {
            &[("j/k", "scroll"), ("Esc", "close")]
        } else {
            match &self.mode {
                Mode::Normal => &[
                    ("q", "quit"),
                    ("r", "refresh"),
                    ("e", "settings"),
                    ("a", "auto"),
                    ("+/-", "interval"),
                    ("j/k", "nav"),
                    ("Enter", "open"),
                ],
                Mode::EditSettings { .. } => &[
                    ("Tab", "next field"),
                    ("Space", "toggle"),
                    ("Enter", "save"),
                    ("Esc", "cancel"),
                ],
            }
        };

        let mut spans = vec![Span::styled(format!(" {} ", self.status.text), status_style)];
        for (key, desc) in hints {
            spans.push(Span::styled(
                format!(" {key}"),
                Style::default().fg(Color::Yellow).bold(),
            ));
            spans.push(Span::raw(format!(" {desc} ")));
        }
        frame.render_widget(Line::from(spans), area);
    }
}

fn render_settings_form(frame: &mut Frame, form: &SettingsForm, field: SettingsField, area: Rect) {
    let popup = centered_rect(60, 40, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(" Settings ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let label_style = |f: SettingsField| {
        if f == field {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default()
        }
    };
    let check = |on: bool| if on { "[x]" } else { "[ ]" };

    let lines = vec![
        Line::from(vec![
            Span::styled("Base API URL: ", label_style(SettingsField::BaseUrl)),
            Span::raw(form.base_url.as_str()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Use proxy:    ", label_style(SettingsField::UseProxy)),
            Span::raw(check(form.use_proxy)),
        ]),
        Line::from(vec![
            Span::styled("Auto-refresh: ", label_style(SettingsField::AutoRefresh)),
            Span::raw(check(form.auto_refresh)),
        ]),
        Line::from(vec![
            Span::styled("Interval (s): ", label_style(SettingsField::Interval)),
            Span::raw(form.interval.as_str()),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}
