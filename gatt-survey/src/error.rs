use crate::radio::RadioError;

/// Conditions that end a survey run before or instead of the inspection
/// loop. Per-device faults are never reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("No Bluetooth adapter found.")]
    NoAdapter,
    #[error("failed to list Bluetooth adapters: {0}")]
    Adapters(#[source] RadioError),
    #[error("scan failed: {0}")]
    Scan(#[source] RadioError),
    #[error("No {identifier} devices found.")]
    NoTargets { identifier: String },
}
