use crate::distribution::DistributionKind;
use crate::types::EPSILON;

/// Smallest value a generated strictly-positive parameter is clamped to
pub const MIN_POSITIVE_PARAMETER: f64 = 1e-6;

/// Clean an observed reward so it stays inside the support of its family.
///
/// Non-finite values become 0.0.
pub fn sanitize_reward(kind: DistributionKind, reward: f64) -> f64 {
    if !reward.is_finite() {
        return 0.0;
    }
    match kind {
        DistributionKind::Bernoulli => reward.clamp(0.0, 1.0),
        DistributionKind::Gaussian => reward,
        DistributionKind::Poisson | DistributionKind::Exponential => reward.max(0.0),
    }
}

/// Clamp a randomly generated primary parameter into the valid domain of `kind`.
pub fn clamp_parameter(kind: DistributionKind, value: f64) -> f64 {
    if !value.is_finite() {
        return match kind {
            DistributionKind::Bernoulli => 0.5,
            DistributionKind::Gaussian => 0.0,
            DistributionKind::Poisson | DistributionKind::Exponential => 1.0,
        };
    }
    match kind {
        DistributionKind::Bernoulli => value.clamp(0.0, 1.0),
        DistributionKind::Gaussian => value,
        DistributionKind::Poisson | DistributionKind::Exponential => {
            value.max(MIN_POSITIVE_PARAMETER)
        }
    }
}

/// Clamp a randomly generated secondary parameter (Gaussian std_dev).
pub fn clamp_secondary(value: f64) -> f64 {
    if value.is_finite() {
        value.max(MIN_POSITIVE_PARAMETER)
    } else {
        1.0
    }
}

/// `numerator / denominator`, or `None` when the denominator is ~0
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.abs() < EPSILON {
        None
    } else {
        Some(numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_reward() {
        assert_eq!(sanitize_reward(DistributionKind::Bernoulli, 1.5), 1.0);
        assert_eq!(sanitize_reward(DistributionKind::Gaussian, -3.0), -3.0);
        assert_eq!(sanitize_reward(DistributionKind::Poisson, -1.0), 0.0);
        assert_eq!(sanitize_reward(DistributionKind::Exponential, f64::NAN), 0.0);
    }

    #[test]
    fn test_clamp_parameter() {
        assert_eq!(clamp_parameter(DistributionKind::Bernoulli, 1.7), 1.0);
        assert_eq!(clamp_parameter(DistributionKind::Bernoulli, -0.2), 0.0);
        assert_eq!(clamp_parameter(DistributionKind::Gaussian, -4.0), -4.0);
        assert_eq!(
            clamp_parameter(DistributionKind::Poisson, -2.0),
            MIN_POSITIVE_PARAMETER
        );
        assert_eq!(clamp_secondary(0.0), MIN_POSITIVE_PARAMETER);
    }

    #[test]
    fn test_safe_ratio() {
        assert_eq!(safe_ratio(1.0, 4.0), Some(0.25));
        assert_eq!(safe_ratio(1.0, 0.0), None);
    }
}
