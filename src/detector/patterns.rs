//! Content and path indicators of ransomware activity
//!
//! Scans a changed file's path and content prefix for the cheap, telltale
//! signs: a deny-listed extension, ransom-note language, or ciphertext-level
//! entropy. Each match becomes a typed tag the classifier can score.

use crate::config::DetectionConfig;
use crate::detector::entropy;
use std::fmt;
use std::path::Path;

/// A matched ransomware indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorTag {
    /// Path suffix matches the extension deny-list
    RansomwareExtension,
    /// Ransom-note keyword found in the buffer prefix
    RansomNote,
    /// Buffer entropy exceeds the high-entropy threshold
    HighEntropy,
}

impl fmt::Display for IndicatorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorTag::RansomwareExtension => "ransomware-extension",
            IndicatorTag::RansomNote => "ransom-note",
            IndicatorTag::HighEntropy => "high-entropy",
        };
        f.write_str(name)
    }
}

/// Scan a path and buffer for ransomware indicators
///
/// Returns the matched tags in fixed evaluation order (extension, note,
/// entropy); an empty vec means no indicator fired. Reads only the
/// configured prefix of the buffer for keyword matching.
pub fn scan(path: &Path, buffer: &[u8], cfg: &DetectionConfig) -> Vec<IndicatorTag> {
    let mut tags = Vec::new();

    if extension_matches(path, &cfg.suspicious_extensions) {
        tags.push(IndicatorTag::RansomwareExtension);
    }

    if contains_note_keyword(buffer, cfg) {
        tags.push(IndicatorTag::RansomNote);
    }

    if entropy::is_high(entropy::sampled(buffer, cfg.sample_window), cfg.high_entropy_threshold) {
        tags.push(IndicatorTag::HighEntropy);
    }

    tags
}

/// Check whether a path's extension is on a deny-list (case-insensitive)
pub fn extension_matches(path: &Path, deny_list: &[String]) -> bool {
    let ext = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return false,
    };

    deny_list.iter().any(|denied| denied.eq_ignore_ascii_case(&ext))
}

/// Case-insensitive search for any configured keyword in the buffer prefix
fn contains_note_keyword(buffer: &[u8], cfg: &DetectionConfig) -> bool {
    if buffer.is_empty() || cfg.note_keywords.is_empty() {
        return false;
    }

    let prefix_len = cfg.note_prefix_len.min(buffer.len());
    let prefix = String::from_utf8_lossy(&buffer[..prefix_len]).to_lowercase();

    cfg.note_keywords
        .iter()
        .any(|keyword| prefix.contains(&keyword.to_lowercase()))
}
