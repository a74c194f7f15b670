//! Multinomial splitting of an integer total.
//!
//! Draws are made by conditional binomials: category `i` receives
//! `Binomial(remaining, p_i / remaining_mass)` and the last category receives
//! whatever is left, so the parts always sum to the total.
use rand::RngCore;
use rand_distr::{Binomial, Distribution};

use crate::error::{Error, Result};

/// Split `total` into `weights.len()` non-negative parts drawn from a multinomial
/// distribution with (possibly unnormalized) `weights`.
///
/// Returns an empty vector for empty weights and a zero total. Weights must be
/// finite and non-negative with a positive sum whenever `total > 0`.
pub fn multinomial(total: u64, weights: &[f64], rng: &mut dyn RngCore) -> Result<Vec<u64>> {
    if weights.is_empty() {
        return if total == 0 {
            Ok(Vec::new())
        } else {
            Err(Error::EmptyGroup { population: total })
        };
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(Error::InvalidConfig(format!(
            "multinomial weight {w} is not a finite non-negative number"
        )));
    }

    let mut counts = vec![0u64; weights.len()];
    if total == 0 {
        return Ok(counts);
    }

    // suffix[i] is the weight mass of categories i.. .
    let mut suffix = vec![0.0f64; weights.len() + 1];
    for i in (0..weights.len()).rev() {
        suffix[i] = suffix[i + 1] + weights[i];
    }
    if suffix[0] <= 0.0 {
        return Err(Error::InvalidConfig(
            "multinomial weights sum to zero".into(),
        ));
    }

    let mut remaining = total;
    for (i, &w) in weights.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if suffix[i + 1] <= 0.0 {
            counts[i] = remaining;
            break;
        }
        let p = (w / suffix[i]).clamp(0.0, 1.0);
        let drawn = binomial(remaining, p, rng)?;
        counts[i] = drawn;
        remaining -= drawn;
    }

    Ok(counts)
}

/// Split `total` across `parts` equally likely buckets.
pub fn uniform_multinomial(total: u64, parts: usize, rng: &mut dyn RngCore) -> Result<Vec<u64>> {
    if parts == 0 {
        return multinomial(total, &[], rng);
    }
    let weights = vec![1.0 / parts as f64; parts];
    multinomial(total, &weights, rng)
}

fn binomial(n: u64, p: f64, rng: &mut dyn RngCore) -> Result<u64> {
    if p <= 0.0 {
        return Ok(0);
    }
    if p >= 1.0 {
        return Ok(n);
    }
    let dist = Binomial::new(n, p)
        .map_err(|e| Error::InvalidConfig(format!("binomial({n}, {p}): {e}")))?;
    Ok(dist.sample(rng))
}
