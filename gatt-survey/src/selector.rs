//! Target selection by advertised identifier

use crate::radio::Peripheral;

/// How a peripheral's identifier is compared against the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMatch {
    /// Byte-for-byte equality, no normalisation.
    #[default]
    Exact,
    /// ASCII case-insensitive equality.
    IgnoreCase,
    /// The identifier starts with the target.
    Prefix,
}

impl NameMatch {
    pub fn matches(self, identifier: &str, target: &str) -> bool {
        match self {
            NameMatch::Exact => identifier == target,
            NameMatch::IgnoreCase => identifier.eq_ignore_ascii_case(target),
            NameMatch::Prefix => identifier.starts_with(target),
        }
    }
}

/// The peripherals whose identifier matches `identifier`, in input order.
///
/// An empty result is returned as-is; deciding whether that ends the run is
/// up to the caller.
pub fn select<P: Peripheral>(peripherals: Vec<P>, identifier: &str, matching: NameMatch) -> Vec<P> {
    peripherals
        .into_iter()
        .filter(|p| matching.matches(&p.identifier(), identifier))
        .collect()
}
