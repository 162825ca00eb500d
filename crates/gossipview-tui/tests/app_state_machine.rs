//! State machine tests for the dashboard App.
//!
//! Each test builds an App over a scripted in-memory GossipSource and a
//! MemoryStore, then drives it with synthetic key events and the events the
//! app's own tasks put on the channel. Time is paused, so delays and the
//! refresh timer are deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gossipview_core::GossipTarget;
use gossipview_service::{GossipSource, ServerConfig, ServiceError};
use gossipview_store::{MemoryStore, AUTO_REFRESH_KEY, BASE_URL_KEY, INTERVAL_KEY, USE_PROXY_KEY};
use gossipview_tui::app::{App, Mode, INVALID_URL_MESSAGE, NO_BASE_URL_MESSAGE};
use gossipview_tui::components::card_list::RowAction;
use gossipview_tui::event::AppEvent;
use gossipview_tui::view::{CardsView, NodeCard, EMPTY_MESSAGE};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};

type Reply = (Duration, Result<Value, ServiceError>);

/// Replays queued gossip replies in order, each after its own delay.
/// Once the queue is empty every fetch returns `[]` immediately.
struct ScriptedSource {
    config: Result<ServerConfig, ServiceError>,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new(config: Result<ServerConfig, ServiceError>) -> Self {
        Self {
            config,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn without_config() -> Self {
        Self::new(Err(ServiceError::Status(404)))
    }

    fn reply(self, delay_ms: u64, result: Result<Value, ServiceError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back((Duration::from_millis(delay_ms), result));
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GossipSource for ScriptedSource {
    async fn fetch_config(&self) -> Result<ServerConfig, ServiceError> {
        self.config.clone()
    }

    async fn fetch_gossip(&self, target: &GossipTarget) -> Result<Value, ServiceError> {
        self.requests.lock().unwrap().push(target.as_str().to_string());
        let next = self.replies.lock().unwrap().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(json!([]))));
        tokio::time::sleep(delay).await;
        result
    }
}

struct Harness {
    app: App,
    rx: UnboundedReceiver<AppEvent>,
    source: Arc<ScriptedSource>,
}

impl Harness {
    fn new(store: MemoryStore, source: ScriptedSource) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(source);
        let dyn_source: Arc<dyn GossipSource> = source.clone();
        let app = App::new(Box::new(store), dyn_source, tx);
        Self { app, rx, source }
    }

    /// Process channel events until `duration` of (paused) time has passed.
    async fn run_for(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, self.rx.recv()).await {
            self.app.handle_event(event);
        }
    }

    async fn settle(&mut self) {
        self.run_for(Duration::from_secs(1)).await;
    }

    fn press(&mut self, code: KeyCode) {
        self.app
            .handle_event(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    /// Move the selection onto the first row whose action matches, then
    /// press Enter on it.
    fn activate(&mut self, pred: impl Fn(&RowAction) -> bool) {
        self.press(KeyCode::Char('g'));
        for _ in 0..500 {
            if self.app.cards().selected_action().is_some_and(&pred) {
                self.press(KeyCode::Enter);
                return;
            }
            self.press(KeyCode::Char('j'));
        }
        panic!("no row matched");
    }

    fn cards(&self) -> &[NodeCard] {
        match self.app.view() {
            CardsView::Cards(cards) => cards,
            CardsView::Empty => &[],
        }
    }
}

fn direct_store(base: &str) -> MemoryStore {
    MemoryStore::with_values([(BASE_URL_KEY, base), (USE_PROXY_KEY, "false")])
}

fn repo(name: &str, time: Value) -> Value {
    json!({
        "Repository": {"Name": name, "ConfigPath": format!("{name}/cfg.yml")},
        "Sha1": "0123456789abcdef",
        "Time": time,
        "Changed": false,
        "Success": true,
    })
}

fn node(url: &str, repositories: Vec<Value>) -> Value {
    json!({
        "node_url": url,
        "last_updated": "2024-06-01T12:00:00Z",
        "is_local": false,
        "repositories": repositories,
    })
}

fn many_repos(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| repo(&format!("r{i:02}"), json!(format!("2024-01-01T00:{:02}:00Z", 59 - i))))
        .collect()
}

// ---- Bootstrap ----

#[tokio::test(start_paused = true)]
async fn bootstrap_adopts_and_persists_server_default() {
    let source = ScriptedSource::new(Ok(ServerConfig {
        base_api_url: Some("http://node:25566".into()),
        version: Some("0.4.1".into()),
    }));
    let mut h = Harness::new(MemoryStore::new(), source);
    h.app.bootstrap().await;
    h.settle().await;

    assert_eq!(h.app.settings().base_url, "http://node:25566");
    assert_eq!(h.app.stored_settings().base_url, "http://node:25566");
    assert_eq!(h.app.version(), Some("0.4.1"));
    assert_eq!(
        h.source.requests(),
        vec!["/proxy/gossip?base=http%3A%2F%2Fnode%3A25566".to_string()]
    );
    assert!(h.app.status().text.starts_with("Updated at "));
}

#[tokio::test(start_paused = true)]
async fn stored_base_url_wins_over_server_default() {
    let source = ScriptedSource::new(Ok(ServerConfig {
        base_api_url: Some("http://other:1".into()),
        version: None,
    }));
    let mut h = Harness::new(direct_store("http://mine:2/"), source);
    h.app.bootstrap().await;
    h.settle().await;

    assert_eq!(h.app.settings().base_url, "http://mine:2/");
    assert_eq!(h.source.requests(), vec!["http://mine:2/gossip".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unreachable_config_without_stored_url_asks_for_one() {
    let mut h = Harness::new(MemoryStore::new(), ScriptedSource::without_config());
    h.app.bootstrap().await;
    h.settle().await;

    assert_eq!(h.app.status().text, NO_BASE_URL_MESSAGE);
    assert!(!h.app.status().ok);
    assert!(h.source.requests().is_empty());
    assert_eq!(h.app.version(), None);
}

// ---- Settings save ----

#[tokio::test(start_paused = true)]
async fn invalid_save_keeps_settings_and_sends_nothing() {
    let mut h = Harness::new(direct_store("http://good:1"), ScriptedSource::without_config());
    h.app.bootstrap().await;
    h.settle().await;
    let before = h.app.stored_settings();
    assert_eq!(h.source.requests().len(), 1);

    for bad in ["ftp://bad", "not a url", "http://"] {
        h.press(KeyCode::Char('e'));
        for _ in 0..40 {
            h.press(KeyCode::Backspace);
        }
        h.type_text(bad);
        h.press(KeyCode::Enter);

        assert_eq!(h.app.status().text, INVALID_URL_MESSAGE, "input {bad}");
        assert!(matches!(h.app.mode(), Mode::EditSettings { .. }));
        h.press(KeyCode::Esc);
    }

    h.settle().await;
    assert_eq!(h.app.stored_settings(), before);
    assert_eq!(h.app.settings(), &before);
    assert_eq!(h.source.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn valid_save_persists_and_refreshes() {
    let mut h = Harness::new(direct_store("http://old:1"), ScriptedSource::without_config());
    h.app.bootstrap().await;
    h.settle().await;

    h.press(KeyCode::Char('e'));
    for _ in 0..20 {
        h.press(KeyCode::Backspace);
    }
    h.type_text("https://new:2/");
    h.press(KeyCode::Tab); // proxy
    h.press(KeyCode::Char(' '));
    h.press(KeyCode::Enter);
    assert_eq!(h.app.mode(), &Mode::Normal);
    h.settle().await;

    let stored = h.app.stored_settings();
    assert_eq!(stored.base_url, "https://new:2/");
    assert!(stored.use_proxy);
    assert_eq!(
        h.source.requests().last().map(String::as_str),
        Some("/proxy/gossip?base=https%3A%2F%2Fnew%3A2")
    );
}

#[tokio::test(start_paused = true)]
async fn store_failure_keeps_form_open_and_settings_unchanged() {
    let mut h = Harness::new(
        direct_store("http://old:1").read_only(),
        ScriptedSource::without_config(),
    );
    h.app.bootstrap().await;
    h.settle().await;
    let before = h.app.stored_settings();

    h.press(KeyCode::Char('e'));
    for _ in 0..20 {
        h.press(KeyCode::Backspace);
    }
    h.type_text("http://new:2");
    h.press(KeyCode::Enter);
    h.settle().await;

    assert!(h.app.status().text.starts_with("Failed to save settings:"));
    assert!(!h.app.status().ok);
    assert!(matches!(h.app.mode(), Mode::EditSettings { .. }));
    assert_eq!(h.app.settings(), &before);
    assert_eq!(h.app.stored_settings(), before);
    assert_eq!(h.source.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn clearing_the_base_url_is_allowed_but_stops_polling() {
    let mut h = Harness::new(direct_store("http://old:1"), ScriptedSource::without_config());
    h.app.bootstrap().await;
    h.settle().await;

    h.press(KeyCode::Char('e'));
    for _ in 0..20 {
        h.press(KeyCode::Backspace);
    }
    h.press(KeyCode::Enter);
    h.settle().await;

    assert_eq!(h.app.stored_settings().base_url, "");
    assert_eq!(h.app.status().text, NO_BASE_URL_MESSAGE);
    assert_eq!(h.source.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_form_changes_nothing() {
    let mut h = Harness::new(direct_store("http://keep:1"), ScriptedSource::without_config());
    h.press(KeyCode::Char('e'));
    h.type_text("/extra");
    h.press(KeyCode::Esc);
    assert_eq!(h.app.mode(), &Mode::Normal);
    assert_eq!(h.app.stored_settings().base_url, "http://keep:1");
}

#[tokio::test(start_paused = true)]
async fn q_types_into_the_form_but_quits_from_the_list() {
    let mut h = Harness::new(MemoryStore::new(), ScriptedSource::without_config());
    h.press(KeyCode::Char('e'));
    h.press(KeyCode::Char('q'));
    assert!(!h.app.should_quit());
    match h.app.mode() {
        Mode::EditSettings { form, .. } => assert_eq!(form.base_url, "q"),
        other => panic!("unexpected mode {other:?}"),
    }
    h.press(KeyCode::Esc);
    h.press(KeyCode::Char('q'));
    assert!(h.app.should_quit());
}

// ---- Rendering through the app ----

#[tokio::test(start_paused = true)]
async fn repositories_sorted_newest_first_with_missing_last() {
    let payload = json!([node(
        "http://a:1",
        vec![
            repo("none", Value::Null),
            repo("jan", json!("2024-01-01")),
            repo("jun", json!("2024-06-01")),
        ],
    )]);
    let source = ScriptedSource::without_config().reply(0, Ok(payload));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;

    let titles: Vec<&str> = h.cards()[0].repos.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["jun", "jan", "none"]);
}

#[tokio::test(start_paused = true)]
async fn show_more_is_per_node_and_caps_at_total() {
    let payload = json!([
        node("http://a:1", many_repos(60)),
        node("http://b:1", many_repos(30)),
    ]);
    let source = ScriptedSource::without_config().reply(0, Ok(payload));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;

    assert_eq!(h.cards()[0].repos.len(), 25);
    assert_eq!(h.cards()[1].repos.len(), 25);

    let node_a = |a: &RowAction| matches!(a, RowAction::ShowMore { node } if node == "http://a:1");

    h.activate(node_a);
    assert_eq!(h.cards()[0].repos.len(), 50);
    assert_eq!(h.cards()[0].show_more.map(|m| m.remaining), Some(10));
    assert_eq!(h.cards()[1].repos.len(), 25);

    h.activate(node_a);
    assert_eq!(h.cards()[0].repos.len(), 60);
    assert!(h.cards()[0].show_more.is_none());
    assert_eq!(h.cards()[1].repos.len(), 25);
    assert_eq!(h.cards()[1].show_more.map(|m| m.remaining), Some(5));

    // Pagination is a pure re-render.
    assert_eq!(h.source.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn expanded_pages_survive_a_refresh() {
    let payload = json!([node("http://a:1", many_repos(40))]);
    let source = ScriptedSource::without_config()
        .reply(0, Ok(payload.clone()))
        .reply(0, Ok(payload));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;

    h.activate(|a| matches!(a, RowAction::ShowMore { .. }));
    assert_eq!(h.cards()[0].repos.len(), 40);

    h.press(KeyCode::Char('r'));
    h.settle().await;
    assert_eq!(h.source.requests().len(), 2);
    assert_eq!(h.cards()[0].repos.len(), 40);
}

#[tokio::test(start_paused = true)]
async fn same_model_renders_the_same_view() {
    let payload = json!([node("http://a:1", many_repos(30))]);
    let source = ScriptedSource::without_config()
        .reply(0, Ok(payload.clone()))
        .reply(0, Ok(payload));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;
    let first = h.app.view().clone();
    let first_text = h.app.snapshot_text();

    h.press(KeyCode::Char('r'));
    h.settle().await;
    assert_eq!(h.app.view(), &first);
    assert_eq!(h.app.snapshot_text(), first_text);
}

#[tokio::test(start_paused = true)]
async fn task_disclosure_only_for_changed_repos_with_tasks() {
    let task = json!({
        "Task": {"Name": "deploy", "Command": ["make", "deploy"]},
        "Success": false,
        "Output": "boom\nstack",
    });
    let payload = json!([{
        "node_url": "http://a:1",
        "repositories": [
            {"Repository": {"Name": "quiet"}, "Changed": false, "TaskStatues": [task.clone()]},
            {"Repository": {"Name": "empty"}, "Changed": true, "TaskStatuses": []},
            {"Repository": {"Name": "busy"}, "Changed": true, "TaskStatuses": [task]},
        ],
    }]);
    let source = ScriptedSource::without_config().reply(0, Ok(payload));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;

    let with_tasks: Vec<&str> = h.cards()[0]
        .repos
        .iter()
        .filter(|r| r.tasks.is_some())
        .map(|r| r.title.as_str())
        .collect();
    assert_eq!(with_tasks, vec!["busy"]);
    assert!(!h.app.snapshot_text().contains("deploy"));

    h.activate(|a| matches!(a, RowAction::ToggleTasks { .. }));
    let text = h.app.snapshot_text();
    assert!(text.contains("▾ Tasks (1)"));
    assert!(text.contains("deploy [fail]  make deploy"));

    h.activate(|a| matches!(a, RowAction::OpenOutput { .. }));
    assert_eq!(h.app.overlay().content(), Some("boom\nstack"));
    h.press(KeyCode::Esc);
    assert!(!h.app.overlay().is_open());
    assert!(!h.app.should_quit());
}

#[tokio::test(start_paused = true)]
async fn non_array_payload_shows_no_nodes() {
    let source = ScriptedSource::without_config().reply(0, Ok(json!({"not": "an array"})));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;

    assert_eq!(h.app.view(), &CardsView::Empty);
    assert_eq!(h.app.snapshot_text(), EMPTY_MESSAGE);
    assert!(h.app.status().ok);
}

// ---- Poll ordering and failure ----

#[tokio::test(start_paused = true)]
async fn slow_superseded_poll_is_discarded() {
    let source = ScriptedSource::without_config()
        .reply(5_000, Ok(json!([node("http://slow-a:1", vec![])])))
        .reply(1_000, Ok(json!([node("http://fast-b:1", vec![])])));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.press(KeyCode::Char('r'));

    h.run_for(Duration::from_secs(2)).await;
    assert_eq!(h.cards()[0].tooltip, "http://fast-b:1");
    let after_b = h.app.status().clone();

    h.run_for(Duration::from_secs(10)).await;
    assert_eq!(h.cards().len(), 1);
    assert_eq!(h.cards()[0].tooltip, "http://fast-b:1");
    assert_eq!(h.app.status(), &after_b);
    assert!(!h.app.is_fetching());
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_previous_cards() {
    let source = ScriptedSource::without_config()
        .reply(0, Ok(json!([node("http://a:1", many_repos(3))])))
        .reply(0, Err(ServiceError::Status(502)))
        .reply(0, Err(ServiceError::Timeout(Duration::from_secs(15))));
    let mut h = Harness::new(direct_store("http://a:1"), source);
    h.app.bootstrap().await;
    h.settle().await;
    let good = h.app.view().clone();

    h.press(KeyCode::Char('r'));
    h.settle().await;
    assert_eq!(h.app.status().text, "Failed to load gossip: HTTP 502");
    assert!(!h.app.status().ok);
    assert_eq!(h.app.view(), &good);

    h.press(KeyCode::Char('r'));
    h.settle().await;
    assert_eq!(
        h.app.status().text,
        "Failed to load gossip: request timed out after 15s"
    );
    assert_eq!(h.app.view(), &good);
}

// ---- Auto-refresh timer ----

#[tokio::test(start_paused = true)]
async fn toggling_auto_refresh_leaves_one_timer() {
    let mut h = Harness::new(direct_store("http://a:1"), ScriptedSource::without_config());
    h.app.bootstrap().await;
    h.settle().await;
    assert!(!h.app.timer_armed());
    assert_eq!(h.source.requests().len(), 1);

    h.press(KeyCode::Char('a'));
    h.press(KeyCode::Char('a'));
    assert!(!h.app.timer_armed());
    h.press(KeyCode::Char('a'));
    assert!(h.app.timer_armed());
    assert!(h.app.stored_settings().auto_refresh);

    // 10s period: ticks at 10s and 20s.
    h.run_for(Duration::from_millis(25_000)).await;
    assert_eq!(h.source.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn changing_interval_twice_rearms_once() {
    let store = MemoryStore::with_values([
        (BASE_URL_KEY, "http://a:1"),
        (USE_PROXY_KEY, "false"),
        (AUTO_REFRESH_KEY, "true"),
        (INTERVAL_KEY, "10"),
    ]);
    let mut h = Harness::new(store, ScriptedSource::without_config());
    h.app.bootstrap().await;
    assert_eq!(h.app.timer_period(), Some(Duration::from_secs(10)));

    h.press(KeyCode::Char('+'));
    h.press(KeyCode::Char('+'));
    assert_eq!(h.app.timer_period(), Some(Duration::from_secs(30)));
    assert_eq!(h.app.stored_settings().interval_seconds, 30);

    // Initial poll, then ticks at 30s and 60s only.
    h.run_for(Duration::from_millis(65_000)).await;
    assert_eq!(h.source.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn short_intervals_are_floored() {
    let store = MemoryStore::with_values([
        (BASE_URL_KEY, "http://a:1"),
        (AUTO_REFRESH_KEY, "true"),
        (INTERVAL_KEY, "1"),
    ]);
    let mut h = Harness::new(store, ScriptedSource::without_config());
    h.app.bootstrap().await;
    assert_eq!(h.app.timer_period(), Some(Duration::from_secs(3)));
}
