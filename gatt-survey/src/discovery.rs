//! Time-bounded discovery of connectable peripherals

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::radio::{Adapter, Peripheral, RadioError, ScanEvent};

/// Connectable peripherals in first-seen order, unique by address.
pub struct Discovered<P> {
    seen: HashSet<String>,
    found: Vec<P>,
}

impl<P: Peripheral> Discovered<P> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            found: Vec::new(),
        }
    }

    /// Keep `peripheral` if it is connectable and its address is non-empty
    /// and new. Returns whether it was kept.
    pub fn observe(&mut self, peripheral: P) -> bool {
        if !peripheral.is_connectable() {
            return false;
        }
        let address = peripheral.address();
        if address.is_empty() || !self.seen.insert(address) {
            return false;
        }
        self.found.push(peripheral);
        true
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn into_vec(self) -> Vec<P> {
        self.found
    }
}

impl<P: Peripheral> Default for Discovered<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan for `scan_duration` and return what was found.
///
/// Discovery events are consumed from a single channel here, so the
/// dedup state is only ever touched by this loop. Finding nothing is not
/// an error.
pub async fn collect<A: Adapter>(
    adapter: &A,
    scan_duration: Duration,
) -> Result<Vec<A::Peripheral>, RadioError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ScanEvent<A::Peripheral>>();

    let gather = async move {
        let mut discovered = Discovered::new();
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Started => {
                    info!("Scanning for {} seconds...", scan_duration.as_secs());
                }
                ScanEvent::Found(peripheral) => {
                    let identifier = peripheral.identifier();
                    let address = peripheral.address();
                    if discovered.observe(peripheral) {
                        info!("Found: {identifier} [{address}]");
                    } else {
                        debug!("skipping {identifier} [{address}]");
                    }
                }
                ScanEvent::Stopped => {
                    info!("Scan complete, {} device(s) found", discovered.len());
                    break;
                }
            }
        }
        discovered
    };

    let (scanned, discovered) = tokio::join!(adapter.scan_for(scan_duration, tx), gather);
    scanned?;
    Ok(discovered.into_vec())
}
