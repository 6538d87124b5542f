use std::{cmp::Ordering, fmt};

use shared::error::BridgeError;
use tracing::debug;

/// Dot-separated numeric version. Non-numeric components read as 0 and
/// missing trailing components compare as 0, so "6" == "6.0.0".
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    components: Vec<u64>,
}

impl SemanticVersion {
    pub fn parse(raw: &str) -> Self {
        let components = raw
            .trim()
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect();
        Self { components }
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|index| self.component(index).cmp(&other.component(index)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.components.iter().map(u64::to_string).collect();
        f.write_str(&rendered.join("."))
    }
}

#[derive(Debug, Clone)]
pub struct VersionGate {
    current: String,
}

impl VersionGate {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            current: version.into(),
        }
    }

    pub fn set(&mut self, version: impl Into<String>) {
        self.current = version.into();
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn is_suitable_to(&self, target: &str) -> bool {
        SemanticVersion::parse(&self.current) >= SemanticVersion::parse(target)
    }

    pub fn require(&self, target: &str, method: &str) -> Result<(), BridgeError> {
        if self.is_suitable_to(target) {
            return Ok(());
        }
        debug!(method, target, current = %self.current, "method gated by host version");
        Err(BridgeError::method_unsupported(method, &self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn compares_against_current_version() {
        let gate = VersionGate::new("6.4");
        assert!(gate.is_suitable_to("6.1"));
        assert!(gate.is_suitable_to("6.4"));
        assert!(!gate.is_suitable_to("6.5"));
        assert!(!gate.is_suitable_to("7"));
    }

    #[test]
    fn missing_components_pad_with_zero() {
        assert_eq!(SemanticVersion::parse("6"), SemanticVersion::parse("6.0.0"));
        assert!(VersionGate::new("6").is_suitable_to("6.0.0"));
        assert!(VersionGate::new("6.0.0").is_suitable_to("6"));
    }

    #[test]
    fn two_digit_minor_is_numeric_not_lexical() {
        assert!(SemanticVersion::parse("6.10") > SemanticVersion::parse("6.9"));
        assert!(VersionGate::new("6.10").is_suitable_to("6.9"));
    }

    #[test]
    fn non_numeric_components_read_as_zero() {
        assert_eq!(SemanticVersion::parse("6.beta").components(), &[6, 0]);
        assert_eq!(SemanticVersion::parse("6.beta"), SemanticVersion::parse("6"));
        assert!(VersionGate::new("").is_suitable_to("0"));
    }

    #[test]
    fn set_replaces_current_value() {
        let mut gate = VersionGate::new("6.0");
        assert!(!gate.is_suitable_to("6.2"));
        gate.set("6.2");
        assert!(gate.is_suitable_to("6.2"));
        assert_eq!(gate.current(), "6.2");
    }

    #[test]
    fn require_reports_method_unsupported() {
        let gate = VersionGate::new("6.0");
        let err = gate.require("6.2", "showPopup").expect_err("gated");
        assert_eq!(err.code, ErrorCode::MethodUnsupported);
        assert!(err.message.contains("showPopup"));
        assert!(gate.require("6.0", "ready").is_ok());
    }
}
