//! Human readable and JSON rendering of inspections

use std::fmt::Write as _;

use crate::inspector::{Enumeration, Inspection, Outcome};

/// Line printed before the inspection loop starts.
pub fn targets_found(count: usize, identifier: &str) -> String {
    format!("Found {count} {identifier} device(s). Connecting to enumerate services...")
}

/// Render one device's inspection as indented text, ending in a blank line.
pub fn render(inspection: &Inspection) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "Device: {} [{}]",
        inspection.identifier, inspection.address
    );

    match &inspection.outcome {
        Outcome::ConnectFailed { error } => {
            let _ = writeln!(out);
            let _ = writeln!(out, "  Error: {}", error.message);
        }
        Outcome::Connected {
            enumeration,
            disconnect_error,
        } => {
            let _ = writeln!(out, " - connected");
            let _ = writeln!(out);
            let _ = writeln!(out, "  Services and Characteristics:");
            match enumeration {
                Enumeration::Services(services) if services.is_empty() => {
                    let _ = writeln!(out, "    (no services found)");
                }
                Enumeration::Services(services) => {
                    for service in services {
                        let _ = writeln!(out, "    Service: {}", service.uuid);
                        for chr in &service.characteristics {
                            let _ = writeln!(
                                out,
                                "      Characteristic: {}  [{}]",
                                chr.uuid,
                                chr.capabilities.label()
                            );
                        }
                    }
                }
                Enumeration::Failed(failure) => {
                    let _ = writeln!(out, "    Error enumerating services: {}", failure.message);
                }
            }
            if let Some(failure) = disconnect_error {
                let _ = writeln!(out, "  Error disconnecting: {}", failure.message);
            }
        }
    }

    let _ = writeln!(out);
    out
}

pub fn render_json(inspection: &Inspection) -> serde_json::Result<String> {
    serde_json::to_string_pretty(inspection)
}
