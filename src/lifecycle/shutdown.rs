//! Shutdown coordination across terminate signals.
//!
//! Waits for one termination trigger, then closes every supplied
//! [`TerminateSignal`] under a single [`ClosePolicy`]:
//!
//! | Policy       | Across signals           | Within a signal          |
//! |--------------|--------------------------|--------------------------|
//! | `async`      | all closed concurrently  | callbacks concurrent     |
//! | `sync`       | one at a time, in order  | callbacks concurrent     |
//! | `force-sync` | one at a time, in order  | callbacks in order       |

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::context::StopContext;
use crate::lifecycle::signals::{SignalError, SignalKind, SignalListener};
use crate::lifecycle::terminate::TerminateSignal;
use crate::lifecycle::tracker::WaitGroup;

/// Cross-signal close policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosePolicy {
    /// Close all signals concurrently.
    #[default]
    Async,
    /// Close signals one after another; callbacks of each run concurrently.
    Sync,
    /// Close signals one after another; callbacks of each run in order.
    ForceSync,
}

impl ClosePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ClosePolicy::Async => "async",
            ClosePolicy::Sync => "sync",
            ClosePolicy::ForceSync => "force-sync",
        }
    }
}

impl fmt::Display for ClosePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown close policy {0:?}, expected async, sync or force-sync")]
pub struct ParsePolicyError(String);

impl FromStr for ClosePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "async" => Ok(ClosePolicy::Async),
            "sync" => Ok(ClosePolicy::Sync),
            "force-sync" | "forcesync" => Ok(ClosePolicy::ForceSync),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Wait for SIGINT/SIGTERM/SIGQUIT, then close all signals concurrently.
pub async fn wait_for_async(signals: &[TerminateSignal]) {
    wait_for(ClosePolicy::Async, signals).await;
}

/// Wait for SIGINT/SIGTERM/SIGQUIT, then close signals one at a time.
pub async fn wait_for_sync(signals: &[TerminateSignal]) {
    wait_for(ClosePolicy::Sync, signals).await;
}

/// Wait for SIGINT/SIGTERM/SIGQUIT, then close signals one at a time with
/// each signal's callbacks run in registration order.
pub async fn wait_for_force_sync(signals: &[TerminateSignal]) {
    wait_for(ClosePolicy::ForceSync, signals).await;
}

/// Older name for [`wait_for_async`].
#[deprecated(note = "use `wait_for_async`")]
pub async fn waiting_for_graceful_shutdown(signals: &[TerminateSignal]) {
    wait_for_async(signals).await;
}

/// Wait for the default termination signals, then close under `policy`.
pub async fn wait_for(policy: ClosePolicy, signals: &[TerminateSignal]) {
    wait_for_signals(&SignalKind::DEFAULT, policy, signals).await;
}

/// Wait for any of `kinds`, then close under `policy`.
pub async fn wait_for_signals(
    kinds: &[SignalKind],
    policy: ClosePolicy,
    signals: &[TerminateSignal],
) {
    // Acquire before awaiting so no signal slips in between.
    let listener = SignalListener::register(kinds);
    wait_with_trigger(os_trigger(listener), policy, signals).await;
}

/// Wait until `ctx` stops, then close under `policy`.
pub async fn wait_until(ctx: &StopContext, policy: ClosePolicy, signals: &[TerminateSignal]) {
    wait_with_trigger(ctx.cancelled(), policy, signals).await;
}

/// Wait for an arbitrary trigger future, then close under `policy`.
pub async fn wait_with_trigger<F>(trigger: F, policy: ClosePolicy, signals: &[TerminateSignal])
where
    F: Future<Output = ()>,
{
    tracing::info!(policy = %policy, signals = signals.len(), "Waiting for termination trigger");
    trigger.await;
    tracing::info!("Termination trigger received");

    close_all(policy, signals).await;
}

/// Close every signal under `policy`, returning once all have drained.
pub async fn close_all(policy: ClosePolicy, signals: &[TerminateSignal]) {
    if signals.is_empty() {
        tracing::info!("No terminate signals to close");
        return;
    }

    tracing::info!(policy = %policy, signals = signals.len(), "Closing terminate signals");

    match policy {
        ClosePolicy::Async => {
            let group = WaitGroup::new();
            group.add(signals.len());
            for signal in signals {
                let signal = signal.clone();
                let group = group.clone();
                tokio::spawn(async move {
                    signal.close(Some(&group)).await;
                });
            }
            group.wait().await;
        }
        ClosePolicy::Sync => {
            for signal in signals {
                signal.close(None).await;
            }
        }
        ClosePolicy::ForceSync => {
            for signal in signals {
                signal.sync_close(None).await;
            }
        }
    }

    tracing::info!(policy = %policy, signals = signals.len(), "All terminate signals closed");
}

async fn os_trigger(listener: Result<SignalListener, SignalError>) {
    match listener {
        Ok(listener) => {
            let kind = listener.recv().await;
            tracing::info!(signal = %kind, "Termination signal received");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to register termination signals, falling back to ctrl-c");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c, shutting down now");
            }
        }
    }
}
