//! Conversion between gene-level and bit-level mutation probabilities.

/// Convert a whole-gene resampling probability into the per-bit flip
/// probability that changes a `bits`-wide gene equally often.
///
/// Resampling a gene with probability `p` yields a different allele with
/// probability `p·(1 − 0.5^bits)`. The returned `q` satisfies
/// `1 − (1 − q)^bits = p·(1 − 0.5^bits)`.
///
/// Returns 0.0 for `p <= 0` or `bits == 0`.
pub fn mm_to_pm_scaling(probability: f64, bits: u32) -> f64 {
    if probability <= 0.0 || bits == 0 {
        return 0.0;
    }
    let p = probability.min(1.0);
    let b = f64::from(bits);
    let changed = p * (1.0 - 0.5f64.powf(b));
    1.0 - ((1.0 - changed).ln() / b).exp()
}
