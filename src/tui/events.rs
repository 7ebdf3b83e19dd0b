//! Event handling for the TUI.

use crate::services::ReplayLoad;
use crate::types::Identifier;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events the TUI loop reacts to.
#[derive(Debug)]
pub enum Event {
    /// Keyboard input.
    Key(KeyEvent),
    /// Periodic tick; also the point where new run snapshots are picked up.
    Tick,
    Resize(u16, u16),
    /// A replay requested with sequence number `seq` finished loading.
    ReplayLoaded {
        seq: u64,
        bot_config_id: Identifier,
        load: ReplayLoad,
    },
}

/// Merges terminal input and background results into one channel.
pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        // crossterm polling blocks, so it gets its own thread.
        tokio::task::spawn_blocking(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
                    Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if event_tx.send(event).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Sender for background tasks that report back to the UI.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Whether `event` is `code` without modifiers (shift allowed for characters).
pub fn is_key(event: &KeyEvent, code: KeyCode) -> bool {
    event.code == code && event.modifiers.difference(KeyModifiers::SHIFT).is_empty()
}

/// Ctrl+C or `q`.
pub fn is_quit(event: &KeyEvent) -> bool {
    event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL)
        || is_key(event, KeyCode::Char('q'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&key(KeyCode::Char('q'), KeyModifiers::ALT)));
    }

    #[test]
    fn test_is_key_allows_shift() {
        assert!(is_key(&key(KeyCode::Char('R'), KeyModifiers::SHIFT), KeyCode::Char('R')));
        assert!(!is_key(&key(KeyCode::Char('r'), KeyModifiers::CONTROL), KeyCode::Char('r')));
    }
}
