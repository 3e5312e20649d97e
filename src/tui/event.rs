//! Event handling for the monitor view.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

/// Actions the monitor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// Close the monitor.
    Quit,
    /// Move selection up one row.
    Up,
    /// Move selection down one row.
    Down,
    /// Ask the backend to pause the selected job.
    Pause,
    /// Ask the backend to resume the selected job.
    Resume,
    /// Refresh the job list now instead of waiting for the next tick.
    Refresh,
}

/// Reads crossterm events on a background task and hands mapped actions
/// to the monitor loop over a channel.
pub struct EventHandler {
    rx: mpsc::Receiver<AppAction>,
    _tx: mpsc::Sender<AppAction>,
}

impl EventHandler {
    pub fn new(poll_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        let tx_clone = tx.clone();

        tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut poll_interval = tokio::time::interval(poll_rate);

            loop {
                let tick = poll_interval.tick();
                let crossterm_event = reader.next().fuse();

                tokio::select! {
                    _ = tick => {}
                    Some(Ok(evt)) = crossterm_event => {
                        if let Some(action) = Self::map_event(evt) {
                            if tx_clone.send(action).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Wait for the next action.
    pub async fn next(&mut self) -> Option<AppAction> {
        self.rx.recv().await
    }

    fn map_event(event: Event) -> Option<AppAction> {
        match event {
            Event::Key(key) => Self::map_key_event(key),
            _ => None,
        }
    }

    fn map_key_event(key: KeyEvent) -> Option<AppAction> {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(AppAction::Quit),

            (_, KeyCode::Char('q')) | (_, KeyCode::Esc) => Some(AppAction::Quit),

            (_, KeyCode::Up) | (_, KeyCode::Char('k')) => Some(AppAction::Up),
            (_, KeyCode::Down) | (_, KeyCode::Char('j')) => Some(AppAction::Down),

            (_, KeyCode::Char('p')) => Some(AppAction::Pause),
            (_, KeyCode::Char('r')) => Some(AppAction::Resume),
            (_, KeyCode::Char('g')) | (_, KeyCode::F(5)) => Some(AppAction::Refresh),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(EventHandler::map_event(key(KeyCode::Char('q'))), Some(AppAction::Quit));
        assert_eq!(EventHandler::map_event(key(KeyCode::Esc)), Some(AppAction::Quit));
        assert_eq!(EventHandler::map_event(key(KeyCode::Up)), Some(AppAction::Up));
        assert_eq!(EventHandler::map_event(key(KeyCode::Char('j'))), Some(AppAction::Down));
        assert_eq!(EventHandler::map_event(key(KeyCode::Char('p'))), Some(AppAction::Pause));
        assert_eq!(EventHandler::map_event(key(KeyCode::Char('r'))), Some(AppAction::Resume));
        assert_eq!(EventHandler::map_event(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(EventHandler::map_event(event), Some(AppAction::Quit));
    }
}
