//! Shannon entropy as an encryption proxy
//!
//! Plaintext and structured documents sit in the 3-5.5 bits/byte range;
//! ciphertext is indistinguishable from random data and lands at 7.9-8.0.
//! A file whose content jumps into that band after a write is the single
//! strongest signal of ransomware activity.

/// Shannon entropy of a buffer, in bits per byte
///
/// Returns a value in `[0.0, 8.0]`: 0.0 for an empty buffer or a single
/// repeated byte value, 8.0 for perfectly uniform random data. Order of
/// bytes is irrelevant; only the frequency histogram matters.
#[inline]
pub fn shannon(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut histogram = [0u64; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in histogram.iter() {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }

    entropy
}

/// Entropy of a buffer with deterministic sampling for large inputs
///
/// Buffers up to three sample windows are measured whole. Larger buffers
/// are measured over the concatenation of a head, middle, and tail window
/// of `window` bytes each, which bounds cost on big files while remaining
/// deterministic for a given buffer. Alert thresholds are tuned against
/// this strategy; keep it stable.
pub fn sampled(data: &[u8], window: usize) -> f64 {
    if window == 0 || data.len() <= window.saturating_mul(3) {
        return shannon(data);
    }

    let mid = data.len() / 2 - window / 2;
    let tail = data.len() - window;

    let mut sample = Vec::with_capacity(window * 3);
    sample.extend_from_slice(&data[..window]);
    sample.extend_from_slice(&data[mid..mid + window]);
    sample.extend_from_slice(&data[tail..]);

    shannon(&sample)
}

/// Check if an entropy value indicates likely encryption
#[inline]
pub fn is_high(entropy: f64, threshold: f64) -> bool {
    entropy > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random bytes (LCG), good enough to saturate
    /// the histogram without pulling in an RNG crate.
    fn random_bytes(len: usize) -> Vec<u8> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn empty_buffer_is_zero() {
        assert_eq!(shannon(&[]), 0.0);
    }

    #[test]
    fn repeated_byte_is_zero() {
        assert_eq!(shannon(&[0xAA; 4096]), 0.0);
    }

    #[test]
    fn two_symbol_alphabet_is_one_bit() {
        let data: Vec<u8> = (0..2048).map(|i| (i % 2) as u8).collect();
        assert!((shannon(&data) - 1.0).abs() < 0.01);
    }

    #[test]
    fn ascii_text_is_midrange() {
        let text = b"The quick brown fox jumps over the lazy dog, twice over.";
        let e = shannon(text);
        assert!(e > 3.0 && e < 5.5, "got {e}");
    }

    #[test]
    fn random_data_approaches_eight() {
        let e = shannon(&random_bytes(8192));
        assert!((e - 8.0).abs() < 0.05, "got {e}");
    }

    #[test]
    fn order_independent() {
        let data = random_bytes(1024);
        let mut reversed = data.clone();
        reversed.reverse();
        let mut rotated = data.clone();
        rotated.rotate_left(337);

        assert_eq!(shannon(&data), shannon(&reversed));
        assert_eq!(shannon(&data), shannon(&rotated));
    }

    #[test]
    fn sampled_matches_whole_for_small_buffers() {
        let data = random_bytes(1000);
        assert_eq!(sampled(&data, 8192), shannon(&data));
    }

    #[test]
    fn sampled_is_deterministic_and_bounded() {
        let data = random_bytes(100_000);
        let a = sampled(&data, 8192);
        let b = sampled(&data, 8192);
        assert_eq!(a, b);
        assert!(a > 7.9 && a <= 8.0);
    }

    #[test]
    fn sampled_detects_uniform_large_file() {
        let data = vec![0u8; 200_000];
        assert_eq!(sampled(&data, 8192), 0.0);
    }

    #[test]
    fn high_entropy_check() {
        assert!(is_high(7.8, 7.5));
        assert!(!is_high(7.5, 7.5));
        assert!(!is_high(4.2, 7.5));
    }
}
