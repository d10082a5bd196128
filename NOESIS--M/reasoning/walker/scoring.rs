use rand::{Rng, RngCore};

/// Logistic gate.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Annealed temperature.
///
/// Falls linearly from `start` to `floor` as `steps` approaches `max_steps`,
/// then is pulled further toward `floor` as energy drains. Never below
/// `floor`.
#[must_use]
pub fn temperature(start: f64, floor: f64, steps: usize, max_steps: usize, energy: f64) -> f64 {
    let progress = if max_steps == 0 {
        1.0
    } else {
        (steps as f64 / max_steps as f64).min(1.0)
    };
    let scheduled = (floor - start).mul_add(progress, start);
    let scaled = (scheduled - floor).mul_add(energy.clamp(0.0, 1.0), floor);
    scaled.max(floor)
}

/// Numerically stable softmax of `logits / temperature`.
#[must_use]
pub fn softmax(logits: &[f64], temperature: f64) -> Vec<f64> {
    let temperature = temperature.max(1e-6);
    let scaled: Vec<f64> = logits.iter().map(|logit| logit / temperature).collect();
    let peak = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = scaled.iter().map(|value| (value - peak).exp()).collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.into_iter().map(|weight| weight / total).collect()
    } else {
        vec![1.0 / logits.len() as f64; logits.len()]
    }
}

/// Draws an index with probability proportional to `probabilities`.
pub fn sample_index(probabilities: &[f64], rng: &mut dyn RngCore) -> Option<usize> {
    if probabilities.is_empty() {
        return None;
    }
    let draw: f64 = rng.gen::<f64>() * probabilities.iter().sum::<f64>();
    let mut cumulative = 0.0;
    for (index, probability) in probabilities.iter().enumerate() {
        cumulative += probability;
        if draw < cumulative {
            return Some(index);
        }
    }
    Some(probabilities.len() - 1)
}
