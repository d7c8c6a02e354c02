//! btleplug implementation of the radio contract

use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

use btleplug::api::{
    BDAddr, Central, CentralEvent, CharPropFlags, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform;
use futures::stream::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::radio::{
    Adapter, Capabilities, Characteristic, Peripheral, Radio, RadioError, ScanEvent, ScanEvents,
    Service,
};

/// Settings applied when the radio is opened, in place of process-wide
/// platform switches.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Upper bound on a single connect attempt
    pub connect_timeout: Duration,
    /// Only report peripherals advertising one of these services. Empty
    /// means no filtering.
    pub service_filter: Vec<Uuid>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            service_filter: Vec::new(),
        }
    }
}

impl AdapterConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_service_filter(mut self, services: Vec<Uuid>) -> Self {
        self.service_filter = services;
        self
    }
}

pub struct BtleRadio {
    manager: platform::Manager,
    config: AdapterConfig,
}

impl BtleRadio {
    pub async fn new(config: AdapterConfig) -> Result<Self, RadioError> {
        let manager = platform::Manager::new().await?;
        Ok(Self { manager, config })
    }
}

#[async_trait::async_trait]
impl Radio for BtleRadio {
    type Adapter = BtleAdapter;

    async fn adapters(&self) -> Result<Vec<BtleAdapter>, RadioError> {
        let adapters = self.manager.adapters().await?;
        Ok(adapters
            .into_iter()
            .map(|adapter| BtleAdapter {
                adapter,
                config: self.config.clone(),
            })
            .collect())
    }
}

pub struct BtleAdapter {
    adapter: platform::Adapter,
    config: AdapterConfig,
}

impl BtleAdapter {
    /// Freeze the advertised identity of `id`, if the stack has any
    /// properties for it yet.
    async fn snapshot(
        &self,
        id: &platform::PeripheralId,
    ) -> Result<Option<BtlePeripheral>, RadioError> {
        let peripheral = self.adapter.peripheral(id).await?;
        let Some(props) = peripheral.properties().await? else {
            return Ok(None);
        };

        // CoreBluetooth hides hardware addresses and reports all zeros.
        let address = if props.address == BDAddr::default() {
            peripheral.id().to_string()
        } else {
            props.address.to_string()
        };

        Ok(Some(BtlePeripheral {
            identifier: props.local_name.unwrap_or_default(),
            address,
            connect_timeout: self.config.connect_timeout,
            peripheral,
        }))
    }
}

#[async_trait::async_trait]
impl Adapter for BtleAdapter {
    type Peripheral = BtlePeripheral;

    async fn scan_for(
        &self,
        duration: Duration,
        events: ScanEvents<BtlePeripheral>,
    ) -> Result<(), RadioError> {
        let mut stream = self.adapter.events().await?;
        self.adapter
            .start_scan(ScanFilter {
                services: self.config.service_filter.clone(),
            })
            .await?;
        let _ = events.send(ScanEvent::Started);

        let mut gate = NameGate::default();
        let mut stream_open = true;
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = stream.next(), if stream_open => match event {
                    Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) => {
                        if gate.is_reported(&id) {
                            continue;
                        }
                        match self.snapshot(&id).await {
                            Ok(Some(peripheral)) => {
                                let named = !peripheral.identifier.is_empty();
                                if gate.offer(id, named) {
                                    let _ = events.send(ScanEvent::Found(peripheral));
                                }
                            }
                            Ok(None) => {}
                            Err(e) => debug!("could not read peripheral {id}: {e}"),
                        }
                    }
                    Some(_) => {}
                    None => {
                        debug!("adapter event stream ended before the scan period");
                        stream_open = false;
                    }
                },
            }
        }

        for id in gate.finish() {
            match self.snapshot(&id).await {
                Ok(Some(peripheral)) => {
                    let _ = events.send(ScanEvent::Found(peripheral));
                }
                Ok(None) => {}
                Err(e) => debug!("could not read peripheral {id}: {e}"),
            }
        }

        let stopped = self.adapter.stop_scan().await;
        let _ = events.send(ScanEvent::Stopped);
        stopped?;
        Ok(())
    }
}

pub struct BtlePeripheral {
    peripheral: platform::Peripheral,
    identifier: String,
    address: String,
    connect_timeout: Duration,
}

#[async_trait::async_trait]
impl Peripheral for BtlePeripheral {
    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn address(&self) -> String {
        self.address.clone()
    }

    // btleplug does not surface the advertising connectable flag.
    fn is_connectable(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<(), RadioError> {
        tokio::time::timeout(self.connect_timeout, self.peripheral.connect())
            .await
            .map_err(|_| RadioError::Timeout(self.connect_timeout))??;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RadioError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn services(&self) -> Result<Vec<Service>, RadioError> {
        self.peripheral.discover_services().await?;
        let services: Vec<Service> = self
            .peripheral
            .services()
            .into_iter()
            .map(|service| Service {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| Characteristic {
                        uuid: c.uuid,
                        capabilities: capabilities(c.properties),
                    })
                    .collect(),
            })
            .collect();
        info!("{} [{}]: {} service(s)", self.identifier, self.address, services.len());
        Ok(services)
    }
}

/// Holds peripherals back until they advertise a name.
///
/// Many devices only send their name in the scan response, after the first
/// advertisement. A peripheral is reported once, as soon as it has a name;
/// the ones that never get one are handed back by [`NameGate::finish`].
struct NameGate<K> {
    reported: HashSet<K>,
    unnamed: Vec<K>,
}

impl<K> Default for NameGate<K> {
    fn default() -> Self {
        Self {
            reported: HashSet::new(),
            unnamed: Vec::new(),
        }
    }
}

impl<K: Hash + Eq> NameGate<K> {
    fn is_reported(&self, id: &K) -> bool {
        self.reported.contains(id)
    }

    /// Whether `id` should be reported now.
    fn offer(&mut self, id: K, named: bool) -> bool {
        if self.reported.contains(&id) {
            return false;
        }
        if named {
            self.unnamed.retain(|u| *u != id);
            self.reported.insert(id);
            true
        } else {
            if !self.unnamed.contains(&id) {
                self.unnamed.push(id);
            }
            false
        }
    }

    /// Peripherals never reported because they stayed nameless, in
    /// first-seen order.
    fn finish(self) -> Vec<K> {
        self.unnamed
    }
}

fn capabilities(flags: CharPropFlags) -> Capabilities {
    Capabilities {
        read: flags.contains(CharPropFlags::READ),
        write_request: flags.contains(CharPropFlags::WRITE),
        write_command: flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
        notify: flags.contains(CharPropFlags::NOTIFY),
        indicate: flags.contains(CharPropFlags::INDICATE),
    }
}
