//! Detection core: entropy analysis, indicators, burst tracking, classification

pub mod burst;
pub mod classifier;
pub mod entropy;
pub mod patterns;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity, ordered least to most severe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Classification label for a scored detection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Classification {
    Benign,
    Suspicious,
    RaaS,
    Ransomware,
}

/// Kind of observed filesystem change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// Record of a single observed filesystem change
///
/// Immutable once created; ids are assigned by the event store on append.
/// The entropy field is serialized as `fme` (file mutation entropy), the
/// name downstream consumers already use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEvent {
    pub id: u64,
    pub path: String,
    pub action: FileAction,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "fme")]
    pub entropy: f64,
}

/// A scored, severity-graded detection
///
/// Created only when the risk score clears the lowest alerting cutoff;
/// immutable once created. Wire names (`fme`, `abt`, `type`) match the
/// externally observed schema so consumers need no translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: u64,
    pub host: String,
    pub path: String,
    pub severity: Severity,
    #[serde(rename = "fme")]
    pub entropy: f64,
    #[serde(rename = "abt")]
    pub burst_threshold: f64,
    #[serde(rename = "type")]
    pub classification: Classification,
    pub risk_score: u8,
    pub reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_escalation() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "\"info\"");
    }

    #[test]
    fn classification_serializes_with_original_casing() {
        assert_eq!(serde_json::to_string(&Classification::RaaS).unwrap(), "\"RaaS\"");
        assert_eq!(
            serde_json::to_string(&Classification::Ransomware).unwrap(),
            "\"Ransomware\""
        );
    }

    #[test]
    fn alert_uses_wire_field_names() {
        let alert = Alert {
            id: 7,
            host: "workstation".to_string(),
            path: "/home/user/file.locked".to_string(),
            severity: Severity::Critical,
            entropy: 7.91,
            burst_threshold: 2.0,
            classification: Classification::Ransomware,
            risk_score: 100,
            reasons: vec!["Suspicious file extension".to_string()],
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&alert).unwrap();
        assert!(json.get("fme").is_some());
        assert!(json.get("abt").is_some());
        assert_eq!(json["type"], "Ransomware");
        assert_eq!(json["severity"], "critical");
    }

    #[test]
    fn file_event_uses_wire_field_names() {
        let event = FileEvent {
            id: 1,
            path: "/home/user/notes.txt".to_string(),
            action: FileAction::Modified,
            timestamp: Utc::now(),
            entropy: 4.2,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("fme").is_some());
        assert_eq!(json["action"], "modified");
    }
}
