use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use tokio::sync::mpsc;

use crate::drive::mutation::{DownloadReport, MutationReport};
use crate::drive::tree::DirectoryNode;
use crate::error::Result;
use crate::session::Session;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// A periodic tick for rendering and notification expiry.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// A login request settled. `epoch` identifies the login attempt.
    LoginComplete { epoch: u64, result: Result<Session> },
    /// A tree fetch settled. `generation` identifies the fetch.
    TreeFetched {
        generation: u64,
        result: Result<DirectoryNode>,
    },
    /// One file of an upload batch finished. `epoch` is the login epoch the
    /// request was issued under, as for the two events below.
    UploadFinished {
        epoch: u64,
        message: String,
        ok: bool,
    },
    /// A mutating action (or a whole upload batch) finished.
    MutationComplete { epoch: u64, report: MutationReport },
    /// A download finished.
    DownloadComplete { epoch: u64, report: DownloadReport },
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        // crossterm polling blocks, so it runs on a blocking thread.
        tokio::task::spawn_blocking(move || loop {
            let forwarded = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => event_tx.send(Event::Key(key)),
                    Ok(CrosstermEvent::Mouse(mouse)) => event_tx.send(Event::Mouse(mouse)),
                    Ok(CrosstermEvent::Resize(w, h)) => event_tx.send(Event::Resize(w, h)),
                    _ => Ok(()),
                }
            } else {
                event_tx.send(Event::Tick)
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for async tasks to report completions.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (waits until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}
