//! EMA reputation rules.

/// Weights for the trust and uptime moving averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReputationPolicy {
    /// Added to trust on success.
    pub trust_reward: f64,
    /// Subtracted from trust on failure.
    pub trust_penalty: f64,
    /// Uptime retention when online; the remainder is credited.
    pub online_retention: f64,
    /// Uptime retention when offline.
    pub offline_retention: f64,
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            trust_reward: 0.05,
            trust_penalty: 0.10,
            online_retention: 0.95,
            offline_retention: 0.995,
        }
    }
}

impl ReputationPolicy {
    pub fn next_trust(&self, trust: f64, success: bool) -> f64 {
        let next = if success {
            trust + self.trust_reward
        } else {
            trust - self.trust_penalty
        };
        clamp_score(next)
    }

    pub fn next_uptime(&self, uptime: f64, online: bool) -> f64 {
        let next = if online {
            uptime * self.online_retention + (1.0 - self.online_retention)
        } else {
            uptime * self.offline_retention
        };
        clamp_score(next)
    }
}

/// Clamp into `[0, 1]`. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
