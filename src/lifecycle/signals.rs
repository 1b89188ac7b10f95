//! OS signal handling.
//!
//! # Responsibilities
//! - Register interest in termination signals (SIGINT, SIGTERM, SIGQUIT, SIGHUP)
//! - Wait for the first one to arrive
//! - Release the registration once a signal was received
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A [`SignalListener`] is a scoped acquisition: registered on construction,
//!   released when consumed by [`SignalListener::recv`] or dropped
//! - Single-shot: a listener is never re-armed
//! - Non-Unix platforms only support ctrl-c ([`SignalKind::Interrupt`])

use std::fmt;
use std::str::FromStr;

use futures_util::future::select_all;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Termination notifications a listener can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// SIGINT, or ctrl-c on Windows.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGQUIT.
    Quit,
    /// SIGHUP.
    Hangup,
}

impl SignalKind {
    /// The set waited on when the caller does not choose one.
    pub const DEFAULT: [SignalKind; 3] = [
        SignalKind::Interrupt,
        SignalKind::Terminate,
        SignalKind::Quit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Interrupt => "interrupt",
            SignalKind::Terminate => "terminate",
            SignalKind::Quit => "quit",
            SignalKind::Hangup => "hangup",
        }
    }

    /// Whether this platform can deliver the signal.
    pub fn is_supported(self) -> bool {
        cfg!(unix) || self == SignalKind::Interrupt
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interrupt" | "int" | "sigint" => Ok(SignalKind::Interrupt),
            "terminate" | "term" | "sigterm" => Ok(SignalKind::Terminate),
            "quit" | "sigquit" => Ok(SignalKind::Quit),
            "hangup" | "hup" | "sighup" => Ok(SignalKind::Hangup),
            _ => Err(SignalError::UnknownKind(s.to_string())),
        }
    }
}

/// Errors raised while acquiring OS signal notifications.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no termination signals requested")]
    Empty,

    #[error("signal {0} is not supported on this platform")]
    Unsupported(SignalKind),

    #[error("unknown signal name {0:?}")]
    UnknownKind(String),

    #[error("failed to register {kind} handler: {source}")]
    Register {
        kind: SignalKind,
        #[source]
        source: std::io::Error,
    },
}

/// Exclusive registration of interest in a set of termination signals.
#[derive(Debug)]
pub struct SignalListener {
    streams: Vec<(SignalKind, platform::Stream)>,
}

impl SignalListener {
    /// Register interest in `kinds`. Duplicates are collapsed.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime, like `tokio::signal`.
    pub fn register(kinds: &[SignalKind]) -> Result<Self, SignalError> {
        let mut streams: Vec<(SignalKind, platform::Stream)> = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            if streams.iter().any(|(registered, _)| *registered == kind) {
                continue;
            }
            if !kind.is_supported() {
                return Err(SignalError::Unsupported(kind));
            }
            let stream = platform::register(kind)
                .map_err(|source| SignalError::Register { kind, source })?;
            streams.push((kind, stream));
        }

        if streams.is_empty() {
            return Err(SignalError::Empty);
        }

        tracing::debug!(signals = ?kinds, "Registered termination signal handlers");
        Ok(Self { streams })
    }

    /// The signals this listener waits on.
    pub fn kinds(&self) -> Vec<SignalKind> {
        self.streams.iter().map(|(kind, _)| *kind).collect()
    }

    /// Wait for the first registered signal, then release the registration.
    pub async fn recv(mut self) -> SignalKind {
        let waits = self
            .streams
            .iter_mut()
            .map(|(kind, stream)| {
                let kind = *kind;
                async move {
                    platform::recv(stream).await;
                    kind
                }
                .boxed()
            })
            .collect::<Vec<_>>();

        let (kind, _, _) = select_all(waits).await;
        tracing::debug!(signal = %kind, "Releasing termination signal handlers");
        kind
    }
}

#[cfg(unix)]
mod platform {
    use super::SignalKind;
    use tokio::signal::unix::{signal, Signal, SignalKind as UnixSignal};

    pub(super) type Stream = Signal;

    pub(super) fn register(kind: SignalKind) -> std::io::Result<Stream> {
        let unix = match kind {
            SignalKind::Interrupt => UnixSignal::interrupt(),
            SignalKind::Terminate => UnixSignal::terminate(),
            SignalKind::Quit => UnixSignal::quit(),
            SignalKind::Hangup => UnixSignal::hangup(),
        };
        signal(unix)
    }

    pub(super) async fn recv(stream: &mut Stream) {
        stream.recv().await;
    }
}

#[cfg(not(unix))]
mod platform {
    use super::SignalKind;
    use tokio::signal::windows::{ctrl_c, CtrlC};

    pub(super) type Stream = CtrlC;

    // Only `Interrupt` passes the support check on this platform.
    pub(super) fn register(_kind: SignalKind) -> std::io::Result<Stream> {
        ctrl_c()
    }

    pub(super) async fn recv(stream: &mut Stream) {
        stream.recv().await;
    }
}
