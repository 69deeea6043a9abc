//! Heat index computation and risk classification.
//!
//! Below 80°F the simple linear approximation is used; at or above 80°F the
//! full nine-term regression takes over. Tiers are assigned on the unrounded
//! value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Temperature at which the regression replaces the linear approximation.
pub const REGRESSION_CUTOVER_F: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Safe,
    Caution,
    Danger,
    Extreme,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Safe => "safe",
            RiskTier::Caution => "caution",
            RiskTier::Danger => "danger",
            RiskTier::Extreme => "extreme",
        }
    }

    pub fn advisory(&self) -> &'static str {
        match self {
            RiskTier::Safe => "It's a great day for a walk!",
            RiskTier::Caution => "Caution: Fatigue possible with prolonged exposure. Take breaks.",
            RiskTier::Danger => {
                "Danger: Heatstroke, cramps, or exhaustion likely. Limit outdoor time."
            }
            RiskTier::Extreme => {
                "Extreme danger: Heatstroke highly likely. Avoid outdoor activity."
            }
        }
    }

    /// Whether a walk under this tier should be explicitly confirmed first.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, RiskTier::Danger | RiskTier::Extreme)
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (°F, inclusive) of the non-safe tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub caution_f: f64,
    pub danger_f: f64,
    pub extreme_f: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { caution_f: 80.0, danger_f: 90.0, extreme_f: 125.0 }
    }
}

impl RiskThresholds {
    pub fn classify(&self, heat_index_f: f64) -> RiskTier {
        if heat_index_f >= self.extreme_f {
            RiskTier::Extreme
        } else if heat_index_f >= self.danger_f {
            RiskTier::Danger
        } else if heat_index_f >= self.caution_f {
            RiskTier::Caution
        } else {
            RiskTier::Safe
        }
    }

    /// Thresholds must be strictly increasing and finite.
    pub fn is_valid(&self) -> bool {
        [self.caution_f, self.danger_f, self.extreme_f].iter().all(|v| v.is_finite())
            && self.caution_f < self.danger_f
            && self.danger_f < self.extreme_f
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatIndexResult {
    pub heat_index_f: i64,
    pub risk_tier: RiskTier,
    pub advisory: String,
}

/// Evaluate with the default tier table.
pub fn evaluate(temperature_f: f64, humidity_pct: f64) -> HeatIndexResult {
    evaluate_with(&RiskThresholds::default(), temperature_f, humidity_pct)
}

pub fn evaluate_with(
    thresholds: &RiskThresholds,
    temperature_f: f64,
    humidity_pct: f64,
) -> HeatIndexResult {
    let hi = heat_index(temperature_f, humidity_pct);
    let risk_tier = thresholds.classify(hi);

    HeatIndexResult {
        heat_index_f: hi.round() as i64,
        risk_tier,
        advisory: risk_tier.advisory().to_string(),
    }
}

/// Unrounded heat index with the regime switch applied.
pub fn heat_index(temperature_f: f64, humidity_pct: f64) -> f64 {
    if temperature_f >= REGRESSION_CUTOVER_F {
        regression_heat_index(temperature_f, humidity_pct)
    } else {
        linear_heat_index(temperature_f, humidity_pct)
    }
}

pub fn linear_heat_index(t: f64, rh: f64) -> f64 {
    0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094)
}

pub fn regression_heat_index(t: f64, rh: f64) -> f64 {
    -42.379 + 2.049_015_23 * t + 10.143_331_27 * rh
        - 0.224_755_41 * t * rh
        - 6.837_83e-3 * t * t
        - 5.481_717e-2 * rh * rh
        + 1.228_74e-3 * t * t * rh
        + 8.528_2e-4 * t * rh * rh
        - 1.99e-6 * t * t * rh * rh
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hot_humid_afternoon_is_danger() {
        let res = evaluate(95.0, 70.0);
        assert_eq!(res.risk_tier, RiskTier::Danger);
        assert_eq!(res.heat_index_f, 123);
    }

    #[test]
    fn mild_day_is_safe() {
        let res = evaluate(70.0, 50.0);
        assert_eq!(res.risk_tier, RiskTier::Safe);
        // 0.5 * (70 + 61 + 2.4 + 4.7) = 69.05
        assert_eq!(res.heat_index_f, 69);
    }

    #[test]
    fn regimes_diverge_on_either_side_of_cutover() {
        let below = heat_index(79.0, 90.0);
        assert_eq!(below, linear_heat_index(79.0, 90.0));
        assert_ne!(below, regression_heat_index(79.0, 90.0));

        let above = heat_index(80.0, 90.0);
        assert_eq!(above, regression_heat_index(80.0, 90.0));
        assert_ne!(above, linear_heat_index(80.0, 90.0));
    }

    #[test]
    fn classification_uses_unrounded_value() {
        let table = RiskThresholds::default();
        assert_eq!(table.classify(79.6), RiskTier::Safe);
        assert_eq!(table.classify(80.0), RiskTier::Caution);
        assert_eq!(table.classify(89.99), RiskTier::Caution);
        assert_eq!(table.classify(90.0), RiskTier::Danger);
        assert_eq!(table.classify(124.9), RiskTier::Danger);
        assert_eq!(table.classify(125.0), RiskTier::Extreme);
    }

    #[test]
    fn custom_thresholds_move_the_extreme_cut() {
        let table = RiskThresholds { extreme_f: 103.0, ..RiskThresholds::default() };
        assert!(table.is_valid());
        assert_eq!(evaluate_with(&table, 95.0, 70.0).risk_tier, RiskTier::Extreme);
    }

    #[test]
    fn unordered_thresholds_are_invalid() {
        let table = RiskThresholds { caution_f: 95.0, danger_f: 90.0, extreme_f: 125.0 };
        assert!(!table.is_valid());
    }

    #[test]
    fn advisory_text_differs_per_tier() {
        let tiers = [RiskTier::Safe, RiskTier::Caution, RiskTier::Danger, RiskTier::Extreme];
        for (i, a) in tiers.iter().enumerate() {
            assert!(!a.advisory().is_empty());
            for b in &tiers[i + 1..] {
                assert_ne!(a.advisory(), b.advisory());
                assert!(a < b);
            }
        }
    }

    #[test]
    fn only_upper_tiers_need_confirmation() {
        assert!(!RiskTier::Safe.needs_confirmation());
        assert!(!RiskTier::Caution.needs_confirmation());
        assert!(RiskTier::Danger.needs_confirmation());
        assert!(RiskTier::Extreme.needs_confirmation());
    }

    #[test]
    fn negative_temperature_is_safe() {
        let res = evaluate(-20.0, 40.0);
        assert_eq!(res.risk_tier, RiskTier::Safe);
    }

    proptest! {
        #[test]
        fn never_panics_and_rounds_consistently(t in -60.0f64..140.0, rh in -10.0f64..150.0) {
            let res = evaluate(t, rh);
            let hi = heat_index(t, rh);
            prop_assert_eq!(res.heat_index_f, hi.round() as i64);
            prop_assert_eq!(res.risk_tier, RiskThresholds::default().classify(hi));
        }

        #[test]
        fn cool_air_is_always_safe(t in -60.0f64..70.0, rh in 0.0f64..100.0) {
            prop_assert_eq!(evaluate(t, rh).risk_tier, RiskTier::Safe);
        }
    }
}
