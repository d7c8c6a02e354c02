//! Scripted radio doubles for tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Adapter, Peripheral, Radio, RadioError, ScanEvent, ScanEvents, Service};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Connect,
    Services,
    Disconnect,
}

#[derive(Default)]
struct JournalState {
    calls: Vec<(Op, String)>,
    scans: usize,
    linked: usize,
    peak: usize,
}

/// Shared record of every call made against the doubles.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<JournalState>>);

impl Journal {
    fn record(&self, op: Op, address: &str, ok: bool) {
        let mut state = self.0.lock().unwrap();
        state.calls.push((op, address.to_string()));
        match op {
            Op::Connect if ok => {
                state.linked += 1;
                state.peak = state.peak.max(state.linked);
            }
            Op::Disconnect => state.linked = state.linked.saturating_sub(1),
            _ => {}
        }
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: Op, address: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(o, a)| *o == op && a == address)
            .count()
    }

    pub fn scans(&self) -> usize {
        self.0.lock().unwrap().scans
    }

    /// Highest number of links held at the same time.
    pub fn peak_links(&self) -> usize {
        self.0.lock().unwrap().peak
    }
}

#[derive(Clone)]
pub struct MockPeripheral {
    identifier: String,
    address: String,
    connectable: bool,
    connect_error: Option<String>,
    services: Result<Vec<Service>, String>,
    disconnect_error: Option<String>,
    journal: Journal,
}

impl MockPeripheral {
    pub fn new(identifier: &str, address: &str, journal: &Journal) -> Self {
        Self {
            identifier: identifier.to_string(),
            address: address.to_string(),
            connectable: true,
            connect_error: None,
            services: Ok(Vec::new()),
            disconnect_error: None,
            journal: journal.clone(),
        }
    }

    pub fn not_connectable(mut self) -> Self {
        self.connectable = false;
        self
    }

    pub fn with_services(mut self, services: Vec<Service>) -> Self {
        self.services = Ok(services);
        self
    }

    pub fn failing_connect(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    pub fn failing_services(mut self, message: &str) -> Self {
        self.services = Err(message.to_string());
        self
    }

    pub fn failing_disconnect(mut self, message: &str) -> Self {
        self.disconnect_error = Some(message.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Peripheral for MockPeripheral {
    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn address(&self) -> String {
        self.address.clone()
    }

    fn is_connectable(&self) -> bool {
        self.connectable
    }

    async fn connect(&self) -> Result<(), RadioError> {
        self.journal
            .record(Op::Connect, &self.address, self.connect_error.is_none());
        match &self.connect_error {
            Some(e) => Err(RadioError::Other(e.clone())),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) -> Result<(), RadioError> {
        self.journal.record(Op::Disconnect, &self.address, true);
        match &self.disconnect_error {
            Some(e) => Err(RadioError::Other(e.clone())),
            None => Ok(()),
        }
    }

    async fn services(&self) -> Result<Vec<Service>, RadioError> {
        self.journal.record(Op::Services, &self.address, true);
        self.services.clone().map_err(RadioError::Other)
    }
}

/// Emits its script of discoveries from a spawned task, the way a real
/// stack delivers them from its own context.
pub struct MockAdapter {
    script: Vec<MockPeripheral>,
    journal: Journal,
    scan_error: Option<String>,
}

impl MockAdapter {
    pub fn new(script: Vec<MockPeripheral>, journal: &Journal) -> Self {
        Self {
            script,
            journal: journal.clone(),
            scan_error: None,
        }
    }

    pub fn failing_scan(mut self, message: &str) -> Self {
        self.scan_error = Some(message.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Adapter for MockAdapter {
    type Peripheral = MockPeripheral;

    async fn scan_for(
        &self,
        duration: Duration,
        events: ScanEvents<MockPeripheral>,
    ) -> Result<(), RadioError> {
        self.journal.0.lock().unwrap().scans += 1;
        if let Some(e) = &self.scan_error {
            return Err(RadioError::Other(e.clone()));
        }

        let _ = events.send(ScanEvent::Started);
        let found = events.clone();
        let script = self.script.clone();
        let feeder = tokio::spawn(async move {
            for peripheral in script {
                let _ = found.send(ScanEvent::Found(peripheral));
                tokio::task::yield_now().await;
            }
        });

        tokio::time::sleep(duration).await;
        let _ = feeder.await;
        let _ = events.send(ScanEvent::Stopped);
        Ok(())
    }
}

pub struct MockRadio {
    adapters: Mutex<Vec<MockAdapter>>,
}

impl MockRadio {
    pub fn new(adapters: Vec<MockAdapter>) -> Self {
        Self {
            adapters: Mutex::new(adapters),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait::async_trait]
impl Radio for MockRadio {
    type Adapter = MockAdapter;

    /// Hands the scripted adapters over; a second call returns none.
    async fn adapters(&self) -> Result<Vec<MockAdapter>, RadioError> {
        Ok(std::mem::take(&mut *self.adapters.lock().unwrap()))
    }
}
