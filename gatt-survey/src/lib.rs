//! GATT survey
//!
//! Scans for BLE peripherals for a fixed period, keeps the ones advertising
//! a given name, then connects to each in turn and lists its services and
//! characteristics.
//!
//! # Example
//!
//! ```ignore
//! use gatt_survey::{AdapterConfig, BtleRadio, Progress, SurveyConfig, report};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let radio = BtleRadio::new(AdapterConfig::default()).await?;
//!     let config = SurveyConfig::default().with_identifier("SHB1000");
//!
//!     gatt_survey::survey(&radio, &config, |progress| match progress {
//!         Progress::TargetsFound(n) => {
//!             println!("{}", report::targets_found(n, &config.identifier))
//!         }
//!         Progress::Inspected(inspection) => print!("{}", report::render(inspection)),
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod btle;
mod config;
pub mod discovery;
mod error;
pub mod inspector;
pub mod radio;
pub mod report;
pub mod selector;

use tracing::info;

pub use btle::{AdapterConfig, BtleRadio};
pub use config::{DEFAULT_IDENTIFIER, DEFAULT_SCAN_DURATION, SurveyConfig};
pub use error::SurveyError;
pub use inspector::{Failure, Inspection, Outcome, Phase};
pub use radio::{Adapter, Peripheral, Radio, RadioError};
pub use selector::NameMatch;

/// Reported while a survey runs.
#[derive(Debug)]
pub enum Progress<'a> {
    /// Discovery is over and this many targets will be inspected.
    TargetsFound(usize),
    Inspected(&'a Inspection),
}

#[derive(Debug)]
pub struct Summary {
    /// Connectable peripherals seen during the scan, targets or not.
    pub discovered: usize,
    pub inspections: Vec<Inspection>,
}

impl Summary {
    /// Targets that had at least one failure.
    pub fn devices_with_errors(&self) -> usize {
        self.inspections
            .iter()
            .filter(|i| !i.failures().is_empty())
            .count()
    }
}

/// The first adapter the radio reports.
pub async fn first_adapter<R: Radio>(radio: &R) -> Result<R::Adapter, SurveyError> {
    radio
        .adapters()
        .await
        .map_err(SurveyError::Adapters)?
        .into_iter()
        .next()
        .ok_or(SurveyError::NoAdapter)
}

/// Scan, select targets, and inspect each of them.
///
/// Fails only for conditions that end the whole run: no adapter, a scan
/// the adapter could not perform, or no targets. Per-device problems are
/// inside the returned inspections.
pub async fn survey<R, F>(
    radio: &R,
    config: &SurveyConfig,
    mut on_progress: F,
) -> Result<Summary, SurveyError>
where
    R: Radio,
    F: FnMut(Progress<'_>),
{
    let adapter = first_adapter(radio).await?;

    let discovered = discovery::collect(&adapter, config.scan_duration)
        .await
        .map_err(SurveyError::Scan)?;
    let total = discovered.len();

    let targets = selector::select(discovered, &config.identifier, config.name_match);
    if targets.is_empty() {
        return Err(SurveyError::NoTargets {
            identifier: config.identifier.clone(),
        });
    }
    info!(
        "{} of {total} device(s) match {:?}",
        targets.len(),
        config.identifier
    );

    on_progress(Progress::TargetsFound(targets.len()));
    let inspections =
        inspector::inspect_all(&targets, |i| on_progress(Progress::Inspected(i))).await;

    Ok(Summary {
        discovered: total,
        inspections,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Progress, SurveyConfig, SurveyError, survey};
    use crate::radio::mock::{Journal, MockAdapter, MockPeripheral, MockRadio, Op};

    fn config() -> SurveyConfig {
        SurveyConfig::default().with_scan_duration(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn no_adapter_fails_before_scanning() {
        let radio = MockRadio::empty();
        let err = survey(&radio, &config(), |_| {}).await.unwrap_err();
        assert!(matches!(err, SurveyError::NoAdapter));
        assert_eq!(err.to_string(), "No Bluetooth adapter found.");
    }

    #[tokio::test]
    async fn no_targets_is_terminal() {
        let journal = Journal::default();
        let script = vec![MockPeripheral::new("X", "A", &journal)];
        let radio = MockRadio::new(vec![MockAdapter::new(script, &journal)]);

        let err = survey(&radio, &config(), |_| {}).await.unwrap_err();
        assert!(matches!(err, SurveyError::NoTargets { .. }));
        assert_eq!(err.to_string(), "No SHB1000 devices found.");
        assert_eq!(journal.scans(), 1);
        assert!(journal.calls().is_empty());
    }

    #[tokio::test]
    async fn scan_failure_is_terminal() {
        let journal = Journal::default();
        let radio = MockRadio::new(vec![
            MockAdapter::new(Vec::new(), &journal).failing_scan("powered off"),
        ]);
        let err = survey(&radio, &config(), |_| {}).await.unwrap_err();
        assert!(matches!(err, SurveyError::Scan(_)));
    }

    #[tokio::test]
    async fn only_first_adapter_is_used() {
        let journal = Journal::default();
        let other = Journal::default();
        let radio = MockRadio::new(vec![
            MockAdapter::new(vec![MockPeripheral::new("SHB1000", "A", &journal)], &journal),
            MockAdapter::new(vec![MockPeripheral::new("SHB1000", "B", &other)], &other),
        ]);

        let summary = survey(&radio, &config(), |_| {}).await.unwrap();
        assert_eq!(summary.inspections.len(), 1);
        assert_eq!(other.scans(), 0);
    }

    #[tokio::test]
    async fn per_device_errors_do_not_fail_the_run() {
        let journal = Journal::default();
        let script = vec![
            MockPeripheral::new("SHB1000", "A", &journal).failing_connect("rejected"),
            MockPeripheral::new("phone", "P", &journal),
            MockPeripheral::new("SHB1000", "B", &journal),
            MockPeripheral::new("SHB1000", "A", &journal),
            MockPeripheral::new("SHB1000", "N", &journal).not_connectable(),
        ];
        let radio = MockRadio::new(vec![MockAdapter::new(script, &journal)]);

        let mut events = Vec::new();
        let summary = survey(&radio, &config(), |p| {
            events.push(match p {
                Progress::TargetsFound(n) => format!("targets {n}"),
                Progress::Inspected(i) => format!("done {}", i.address),
            })
        })
        .await
        .unwrap();

        assert_eq!(events, vec!["targets 2", "done A", "done B"]);
        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.devices_with_errors(), 1);
        assert_eq!(journal.count(Op::Connect, "P"), 0);
        assert_eq!(journal.count(Op::Disconnect, "A"), 0);
        assert_eq!(journal.count(Op::Disconnect, "B"), 1);
    }
}
