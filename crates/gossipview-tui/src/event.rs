use crossterm::event::{KeyEvent, MouseEvent};
use gossipview_service::ServiceError;

/// Everything the app reacts to. Terminal input, poll completions and
/// timer ticks all arrive on one channel and are handled one at a time.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// The terminal was resized; only a redraw is needed.
    Resize,
    /// A gossip fetch finished. `token` identifies the poll that issued it.
    PollFinished {
        token: u64,
        result: Result<serde_json::Value, ServiceError>,
    },
    /// The auto-refresh timer fired. `timer` identifies which arming.
    RefreshTick { timer: u64 },
}
