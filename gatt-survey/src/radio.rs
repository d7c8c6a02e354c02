//! Radio adapter contract
//!
//! The survey only talks to the radio through these traits. [`crate::btle`]
//! implements them on top of btleplug; tests use scripted doubles.

use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod mock;

#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error(transparent)]
    Btle(#[from] btleplug::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

/// One discovery notification, in the order the adapter produced it.
#[derive(Debug)]
pub enum ScanEvent<P> {
    Started,
    Found(P),
    Stopped,
}

pub type ScanEvents<P> = mpsc::UnboundedSender<ScanEvent<P>>;

/// Entry point of the radio stack: lists local controllers.
#[async_trait::async_trait]
pub trait Radio: Send + Sync {
    type Adapter: Adapter;

    async fn adapters(&self) -> Result<Vec<Self::Adapter>, RadioError>;
}

/// A local radio controller.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    type Peripheral: Peripheral;

    /// Scan for `duration`, sending `Started` once, `Found` for every
    /// discovery and `Stopped` once the period has elapsed.
    ///
    /// Returns only after the scan has stopped. Send failures on `events`
    /// are ignored: a closed receiver just means nobody is listening.
    async fn scan_for(
        &self,
        duration: Duration,
        events: ScanEvents<Self::Peripheral>,
    ) -> Result<(), RadioError>;
}

/// A remote device seen during a scan.
///
/// The accessors are pure and reflect what was advertised when the handle
/// was produced; link state lives on the adapter side.
#[async_trait::async_trait]
pub trait Peripheral: Send + Sync {
    fn identifier(&self) -> String;
    fn address(&self) -> String;
    fn is_connectable(&self) -> bool;

    async fn connect(&self) -> Result<(), RadioError>;
    async fn disconnect(&self) -> Result<(), RadioError>;

    /// Services exposed by a connected peripheral, each with its
    /// characteristics.
    async fn services(&self) -> Result<Vec<Service>, RadioError>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Service {
    pub uuid: Uuid,
    pub characteristics: Vec<Characteristic>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub capabilities: Capabilities,
}

/// Operations a characteristic supports, as reported by the adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Capabilities {
    pub read: bool,
    pub write_request: bool,
    pub write_command: bool,
    pub notify: bool,
    pub indicate: bool,
}

impl Capabilities {
    pub fn can_read(&self) -> bool {
        self.read
    }

    pub fn can_write_request(&self) -> bool {
        self.write_request
    }

    pub fn can_write_command(&self) -> bool {
        self.write_command
    }

    pub fn can_notify(&self) -> bool {
        self.notify
    }

    pub fn can_indicate(&self) -> bool {
        self.indicate
    }

    /// Space separated labels in a fixed order, or `none`.
    pub fn label(&self) -> String {
        let labels: Vec<&str> = [
            (self.can_read(), "read"),
            (self.can_write_request(), "write"),
            (self.can_write_command(), "write_no_resp"),
            (self.can_notify(), "notify"),
            (self.can_indicate(), "indicate"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect();

        if labels.is_empty() {
            "none".to_string()
        } else {
            labels.join(" ")
        }
    }
}
