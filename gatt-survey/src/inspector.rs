//! Connect, enumerate and disconnect, one peripheral at a time
//!
//! Every target gets its own [`Inspection`]. Failures are captured in it
//! and never stop the batch: a failed connect skips the rest of that
//! device, a failed enumeration still disconnects.

use tracing::{debug, info, warn};

use crate::radio::{Peripheral, RadioError, Service};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Connect,
    Enumerate,
    Disconnect,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Connect => "connect",
            Phase::Enumerate => "enumerate",
            Phase::Disconnect => "disconnect",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Failure {
    pub phase: Phase,
    pub message: String,
}

impl Failure {
    fn new(phase: Phase, err: RadioError) -> Self {
        Self {
            phase,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enumeration {
    Services(Vec<Service>),
    Failed(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// No link was made, so nothing else was attempted.
    ConnectFailed { error: Failure },
    Connected {
        enumeration: Enumeration,
        disconnect_error: Option<Failure>,
    },
}

/// Everything learned about one target.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Inspection {
    pub identifier: String,
    pub address: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Inspection {
    pub fn connected(&self) -> bool {
        matches!(self.outcome, Outcome::Connected { .. })
    }

    pub fn services(&self) -> Option<&[Service]> {
        match &self.outcome {
            Outcome::Connected {
                enumeration: Enumeration::Services(services),
                ..
            } => Some(services),
            _ => None,
        }
    }

    pub fn failures(&self) -> Vec<&Failure> {
        match &self.outcome {
            Outcome::ConnectFailed { error } => vec![error],
            Outcome::Connected {
                enumeration,
                disconnect_error,
            } => {
                let mut failures = Vec::new();
                if let Enumeration::Failed(f) = enumeration {
                    failures.push(f);
                }
                failures.extend(disconnect_error);
                failures
            }
        }
    }
}

enum State {
    Connecting,
    Enumerating,
    Disconnecting(Enumeration),
}

/// Run one target through connect, enumerate and disconnect.
pub async fn inspect<P: Peripheral>(peripheral: &P) -> Inspection {
    let identifier = peripheral.identifier();
    let address = peripheral.address();

    let mut state = State::Connecting;
    let outcome = loop {
        state = match state {
            State::Connecting => {
                debug!("connecting to {identifier} [{address}]");
                match peripheral.connect().await {
                    Ok(()) => {
                        info!("{identifier} [{address}] connected");
                        State::Enumerating
                    }
                    Err(e) => {
                        warn!("{identifier} [{address}] connect failed: {e}");
                        break Outcome::ConnectFailed {
                            error: Failure::new(Phase::Connect, e),
                        };
                    }
                }
            }
            State::Enumerating => match peripheral.services().await {
                Ok(services) => {
                    debug!("{identifier} [{address}] has {} service(s)", services.len());
                    State::Disconnecting(Enumeration::Services(services))
                }
                Err(e) => {
                    warn!("{identifier} [{address}] service enumeration failed: {e}");
                    State::Disconnecting(Enumeration::Failed(Failure::new(Phase::Enumerate, e)))
                }
            },
            State::Disconnecting(enumeration) => {
                let disconnect_error = match peripheral.disconnect().await {
                    Ok(()) => {
                        debug!("{identifier} [{address}] disconnected");
                        None
                    }
                    Err(e) => {
                        warn!("{identifier} [{address}] disconnect failed: {e}");
                        Some(Failure::new(Phase::Disconnect, e))
                    }
                };
                break Outcome::Connected {
                    enumeration,
                    disconnect_error,
                };
            }
        };
    };

    Inspection {
        identifier,
        address,
        outcome,
    }
}

/// Inspect every target in order, handing each result to `on_done` as soon
/// as that device is finished.
pub async fn inspect_all<P, F>(targets: &[P], mut on_done: F) -> Vec<Inspection>
where
    P: Peripheral,
    F: FnMut(&Inspection),
{
    let mut inspections = Vec::with_capacity(targets.len());
    for peripheral in targets {
        let inspection = inspect(peripheral).await;
        on_done(&inspection);
        inspections.push(inspection);
    }
    inspections
}
