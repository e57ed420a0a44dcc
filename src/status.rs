//! Live status line shown while a backend call is in flight.
//!
//! The render loop runs on its own thread and owns all display state. The
//! orchestration side only talks to it through [`StatusEvent`] messages on a
//! bounded channel, and must call [`StatusUi::stop`] (which joins the thread)
//! before printing anything else to the terminal.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::input::InputSource;
use crate::runner::ItemHooks;

/// Braille spinner frames.
pub const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const FRAME_INTERVAL: Duration = Duration::from_millis(80);
const QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    SetText(String),
    Quit,
}

/// What the render loop had on screen when it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub text: String,
    pub frames: usize,
    pub texts_applied: usize,
}

struct RenderState {
    frame: usize,
    text: String,
    quitting: bool,
    summary: RenderSummary,
}

impl RenderState {
    fn new(text: String) -> Self {
        Self {
            frame: 0,
            text,
            quitting: false,
            summary: RenderSummary::default(),
        }
    }

    fn apply(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::SetText(text) => {
                self.text = text;
                self.summary.texts_applied += 1;
            }
            StatusEvent::Quit => self.quitting = true,
        }
    }

    fn draw<W: Write>(&mut self, out: &mut W) {
        let _ = execute!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Magenta),
            Print(format!("{} ", SPINNER_FRAMES[self.frame])),
            ResetColor,
            Print(&self.text)
        );
        let _ = out.flush();
        self.summary.frames += 1;
    }

    fn advance(&mut self) {
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
    }

    fn finish(mut self) -> RenderSummary {
        self.summary.text = self.text;
        self.summary
    }
}

fn render_loop(
    rx: mpsc::Receiver<StatusEvent>,
    mut out: Box<dyn Write + Send>,
    text: String,
    interval: Duration,
) -> RenderSummary {
    let mut state = RenderState::new(text);
    let _ = execute!(out, Hide);
    state.draw(&mut out);

    while !state.quitting {
        match rx.recv_timeout(interval) {
            Ok(event) => {
                state.apply(event);
                // Take everything already queued so a burst of updates costs
                // one redraw and a queued quit is seen right away.
                while !state.quitting {
                    match rx.try_recv() {
                        Ok(event) => state.apply(event),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            state.quitting = true;
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => state.advance(),
            Err(RecvTimeoutError::Disconnected) => state.quitting = true,
        }
        if !state.quitting {
            state.draw(&mut out);
        }
    }

    let _ = execute!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Show);
    let _ = out.flush();
    state.finish()
}

/// Handle to a running status display.
pub struct StatusUi {
    sender: SyncSender<StatusEvent>,
    quit_sent: AtomicBool,
    worker: Option<JoinHandle<RenderSummary>>,
}

impl StatusUi {
    /// Starts rendering on stderr and returns immediately.
    pub fn start(text: &str) -> io::Result<Self> {
        Self::start_with(text, Box::new(io::stderr()), FRAME_INTERVAL)
    }

    pub fn start_with(
        text: &str,
        out: Box<dyn Write + Send>,
        interval: Duration,
    ) -> io::Result<Self> {
        let (sender, rx) = mpsc::sync_channel(QUEUE_CAPACITY);
        let text = text.to_string();
        let worker = thread::Builder::new()
            .name("status-ui".into())
            .spawn(move || render_loop(rx, out, text, interval))?;
        Ok(Self {
            sender,
            quit_sent: AtomicBool::new(false),
            worker: Some(worker),
        })
    }

    /// Replaces the status text. Returns false once quit has been requested
    /// or the loop is gone; such updates are dropped.
    pub fn set_text(&self, text: impl Into<String>) -> bool {
        if self.quit_sent.load(Ordering::SeqCst) {
            return false;
        }
        self.sender.send(StatusEvent::SetText(text.into())).is_ok()
    }

    pub fn quit(&self) {
        if !self.quit_sent.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(StatusEvent::Quit);
        }
    }

    /// Requests quit and blocks until the render thread has exited.
    pub fn stop(mut self) -> RenderSummary {
        self.quit();
        self.join()
    }

    fn join(&mut self) -> RenderSummary {
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(summary)) => summary,
            Some(Err(_)) => {
                log::warn!("status display thread panicked");
                RenderSummary::default()
            }
            None => RenderSummary::default(),
        }
    }
}

impl Drop for StatusUi {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.quit();
            self.join();
        }
    }
}

/// Shows a status line for the duration of each item's shape phase.
pub struct StatusHooks {
    enabled: bool,
    current: Option<StatusUi>,
}

impl StatusHooks {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            current: None,
        }
    }
}

impl ItemHooks for StatusHooks {
    fn before_shape(&mut self, index: usize, total: usize, source: &InputSource) {
        if !self.enabled {
            return;
        }
        let text = format!("Shaping {source} ({}/{total})...", index + 1);
        match StatusUi::start(&text) {
            Ok(ui) => self.current = Some(ui),
            Err(err) => log::warn!("status display unavailable: {err}"),
        }
    }

    fn after_shape(&mut self, _: usize, _: usize, _: &InputSource) {
        if let Some(ui) = self.current.take() {
            ui.stop();
        }
    }
}
