//! Risk scoring and alert classification
//!
//! Fuses the three detection signals (entropy, indicator tags, burst rate)
//! plus the extension heuristic into one additive risk score, then maps the
//! score onto a severity grade and classification label. Every contributing
//! condition is independent; a single event can trip all four.

use crate::config::DetectionConfig;
use crate::detector::patterns::{self, IndicatorTag};
use crate::detector::{Alert, Classification, FileEvent, Severity};
use std::path::Path;

/// Score a file event against all detection conditions
///
/// Conditions are evaluated in a fixed order and their reasons accumulate in
/// that order, so identical inputs always produce an identical alert. The
/// burst condition compares the pruned event count in the window against the
/// adaptive threshold. Returns `None` when the score stays below the lowest
/// alerting cutoff; no alert record exists for benign activity.
pub fn classify(
    event: &FileEvent,
    tags: &[IndicatorTag],
    recent_count: usize,
    burst_threshold: f64,
    cfg: &DetectionConfig,
    host: &str,
) -> Option<Alert> {
    let mut score: u32 = 0;
    let mut reasons = Vec::new();

    if event.entropy > cfg.high_entropy_threshold {
        score += cfg.weight_entropy;
        reasons.push("High file entropy (possible encryption)".to_string());
    }

    if !tags.is_empty() {
        score += cfg.weight_indicator * tags.len() as u32;
        let listed: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        reasons.push(format!("Suspicious patterns: {}", listed.join(", ")));
    }

    if recent_count as f64 > burst_threshold {
        score += cfg.weight_burst;
        reasons.push(format!(
            "Rapid file modifications ({recent_count} > {burst_threshold:.1})"
        ));
    }

    if patterns::extension_matches(Path::new(&event.path), &cfg.critical_extensions) {
        score += cfg.weight_extension;
        reasons.push("Suspicious file extension".to_string());
    }

    let risk_score = score.min(100) as u8;
    let (severity, classification) = grade(risk_score, cfg);

    if severity == Severity::Info {
        return None;
    }

    Some(Alert {
        id: 0,
        host: host.to_string(),
        path: event.path.clone(),
        severity,
        entropy: event.entropy,
        burst_threshold,
        classification,
        risk_score,
        reasons,
        created_at: event.timestamp,
    })
}

/// Map a risk score onto severity and classification, top cutoff first
pub fn grade(risk_score: u8, cfg: &DetectionConfig) -> (Severity, Classification) {
    if risk_score >= cfg.score_critical {
        (Severity::Critical, Classification::Ransomware)
    } else if risk_score >= cfg.score_high {
        (Severity::High, Classification::RaaS)
    } else if risk_score >= cfg.score_medium {
        (Severity::Medium, Classification::Suspicious)
    } else if risk_score >= cfg.score_low {
        (Severity::Low, Classification::Suspicious)
    } else {
        (Severity::Info, Classification::Benign)
    }
}
