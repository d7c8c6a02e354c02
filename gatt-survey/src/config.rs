use std::time::Duration;

use crate::selector::NameMatch;

/// Advertised name of the devices this tool was written for.
pub const DEFAULT_IDENTIFIER: &str = "SHB1000";

pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(20);

/// What to look for and how long to look.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub identifier: String,
    pub scan_duration: Duration,
    pub name_match: NameMatch,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            scan_duration: DEFAULT_SCAN_DURATION,
            name_match: NameMatch::Exact,
        }
    }
}

impl SurveyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    pub fn with_name_match(mut self, name_match: NameMatch) -> Self {
        self.name_match = name_match;
        self
    }
}
