// Game engine capability.
//
// The host game is an external collaborator that may be missing entirely or
// may fail on any call. `GameEngine` is the seam; `Engine` wraps it with an
// explicit `Unavailable` variant so the session checks availability once per
// call instead of guarding every use. All `Engine` methods are best-effort:
// failures are logged at debug level and turned into a neutral result
// (not ready / nothing sent), and never reach the session's state.
//
// `LineEngine` is the one concrete engine shipped here. It writes each call
// as a JSON line to any `Write`, which lets a separate game process consume
// the signals from the receiver's stdout.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::input::KeyCode;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("engine call could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("engine refused the call: {0}")]
    Refused(String),
}

/// Native calls the receiver makes into the host game.
pub trait GameEngine: Send {
    fn is_ready(&mut self) -> Result<bool, EngineError>;
    fn inject_signal(&mut self, code: KeyCode) -> Result<(), EngineError>;
    /// The "insert coin / start" cue.
    fn begin_play(&mut self) -> Result<(), EngineError>;
}

/// Engine capability as seen by the session.
#[derive(Default)]
pub enum Engine {
    #[default]
    Unavailable,
    Attached(Box<dyn GameEngine>),
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Unavailable => f.write_str("Engine::Unavailable"),
            Engine::Attached(_) => f.write_str("Engine::Attached(..)"),
        }
    }
}

impl Engine {
    pub fn attached(engine: impl GameEngine + 'static) -> Self {
        Engine::Attached(Box::new(engine))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Engine::Attached(_))
    }

    /// True only if an engine is attached and says it is ready.
    pub fn is_ready(&mut self) -> bool {
        let Engine::Attached(engine) = self else {
            return false;
        };
        match engine.is_ready() {
            Ok(ready) => ready,
            Err(e) => {
                debug!(error = %e, "engine readiness query failed");
                false
            }
        }
    }

    pub fn inject_signal(&mut self, code: KeyCode) {
        let Engine::Attached(engine) = self else {
            debug!(%code, "no engine attached; key signal dropped");
            return;
        };
        if let Err(e) = engine.inject_signal(code) {
            debug!(%code, error = %e, "key signal not delivered");
        }
    }

    pub fn begin_play(&mut self) {
        let Engine::Attached(engine) = self else {
            debug!("no engine attached; begin-play cue dropped");
            return;
        };
        if let Err(e) = engine.begin_play() {
            debug!(error = %e, "begin-play cue not delivered");
        }
    }
}

/// One engine call, as written by `LineEngine`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum EngineCall {
    InjectSignal { code: u16 },
    BeginPlay,
}

/// Engine that writes one JSON line per call to `writer`. Readiness is fixed
/// at construction since the consumer can't answer back over the pipe.
pub struct LineEngine<W> {
    writer: W,
    ready: bool,
}

impl<W: Write> LineEngine<W> {
    pub fn new(writer: W, ready: bool) -> Self {
        Self { writer, ready }
    }

    fn write_call(&mut self, call: &EngineCall) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.writer, call)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineEngine<io::Stdout> {
    pub fn stdout(ready: bool) -> Self {
        Self::new(io::stdout(), ready)
    }
}

impl<W: Write + Send> GameEngine for LineEngine<W> {
    fn is_ready(&mut self) -> Result<bool, EngineError> {
        Ok(self.ready)
    }

    fn inject_signal(&mut self, code: KeyCode) -> Result<(), EngineError> {
        self.write_call(&EngineCall::InjectSignal { code: code.0 })
    }

    fn begin_play(&mut self) -> Result<(), EngineError> {
        self.write_call(&EngineCall::BeginPlay)
    }
}
