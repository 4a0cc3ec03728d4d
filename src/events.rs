use std::{io, sync::mpsc, thread, time::Duration};
use termion::{event::Event as TermEvent, input::TermRead};
use tracing::warn;

pub(crate) enum Event<I> {
    Input(I),
    Tick,
}

/// A small event handler that wraps termion input (keys and mouse) and tick events. Each event
/// type is handled in its own thread and returned to a common `Receiver`.
///
/// Ticks drive the staggered reveal animation; they carry no game state.
pub(crate) struct Events {
    rx: mpsc::Receiver<Event<TermEvent>>,
    _input_handle: thread::JoinHandle<()>,
    _tick_handle: thread::JoinHandle<()>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    pub(crate) tick_rate: Duration,
}

impl Events {
    pub(crate) fn with_config(config: Config) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            _input_handle: {
                let tx = tx.clone();
                thread::spawn(move || {
                    let stdin = io::stdin();
                    for event in stdin.events().flatten() {
                        if let Err(err) = tx.send(Event::Input(event)) {
                            warn!(%err, "input receiver hung up");
                            return;
                        }
                    }
                })
            },
            _tick_handle: {
                thread::spawn(move || loop {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    thread::sleep(config.tick_rate);
                })
            },
        }
    }

    pub(crate) fn next(&self) -> Result<Event<TermEvent>, mpsc::RecvError> {
        self.rx.recv()
    }
}
