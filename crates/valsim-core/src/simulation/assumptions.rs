use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Probability distribution family for a forward-looking assumption.
///
/// Unrecognised family names deserialize to `Point`, which draws no
/// randomness and returns the mean unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DistributionFamily {
    Normal,
    Triangular,
    Uniform,
    /// Degenerate point mass at the mean.
    #[default]
    Point,
}

impl From<String> for DistributionFamily {
    fn from(s: String) -> Self {
        match s.as_str() {
            "normal" => DistributionFamily::Normal,
            "triangular" => DistributionFamily::Triangular,
            "uniform" => DistributionFamily::Uniform,
            _ => DistributionFamily::Point,
        }
    }
}

impl From<DistributionFamily> for String {
    fn from(family: DistributionFamily) -> Self {
        match family {
            DistributionFamily::Normal => "normal",
            DistributionFamily::Triangular => "triangular",
            DistributionFamily::Uniform => "uniform",
            DistributionFamily::Point => "point",
        }
        .to_string()
    }
}

/// Parameters of one uncertain assumption, expressed in percentage points.
///
/// Spread and bound fields are optional; when absent they are derived from
/// the mean by fixed multipliers (see `sample`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionParameter {
    #[serde(default)]
    pub family: DistributionFamily,
    pub mean: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl DistributionParameter {
    /// A zero-variance parameter fixed at `mean`.
    pub fn point(mean: f64) -> Self {
        DistributionParameter {
            family: DistributionFamily::Point,
            mean,
            std: None,
            min: None,
            max: None,
        }
    }

    /// A normal parameter with an explicit standard deviation.
    pub fn normal(mean: f64, std: f64) -> Self {
        DistributionParameter {
            family: DistributionFamily::Normal,
            mean,
            std: Some(std),
            min: None,
            max: None,
        }
    }
}

/// The six uncertain assumptions driving one valuation, in percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionSet {
    pub revenue_growth: DistributionParameter,
    pub ebitda_margin: DistributionParameter,
    pub capex_to_revenue: DistributionParameter,
    pub nwc_to_revenue_delta: DistributionParameter,
    pub wacc: DistributionParameter,
    pub terminal_growth: DistributionParameter,
}

/// One concrete draw of all six assumptions, converted to fractions.
#[derive(Debug, Clone, Copy)]
pub struct AssumptionDraw {
    pub revenue_growth: Rate,
    pub ebitda_margin: Rate,
    pub capex_to_revenue: Rate,
    pub nwc_to_revenue_delta: Rate,
    pub wacc: Rate,
    pub terminal_growth: Rate,
}

impl AssumptionSet {
    /// Draw one full assumption set. The six samples of a trial are always
    /// taken together from the same generator.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> AssumptionDraw {
        AssumptionDraw {
            revenue_growth: sample(&self.revenue_growth, rng) / 100.0,
            ebitda_margin: sample(&self.ebitda_margin, rng) / 100.0,
            capex_to_revenue: sample(&self.capex_to_revenue, rng) / 100.0,
            nwc_to_revenue_delta: sample(&self.nwc_to_revenue_delta, rng) / 100.0,
            wacc: sample(&self.wacc, rng) / 100.0,
            terminal_growth: sample(&self.terminal_growth, rng) / 100.0,
        }
    }

    /// The draw obtained by fixing every assumption at its mean.
    pub fn mean_draw(&self) -> AssumptionDraw {
        AssumptionDraw {
            revenue_growth: self.revenue_growth.mean / 100.0,
            ebitda_margin: self.ebitda_margin.mean / 100.0,
            capex_to_revenue: self.capex_to_revenue.mean / 100.0,
            nwc_to_revenue_delta: self.nwc_to_revenue_delta.mean / 100.0,
            wacc: self.wacc.mean / 100.0,
            terminal_growth: self.terminal_growth.mean / 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

// Spread and bound defaults derived from the mean when a parameter omits them.
const DEFAULT_STD_OF_MEAN: f64 = 0.1;
const TRIANGULAR_MIN_OF_MEAN: f64 = 0.7;
const TRIANGULAR_MAX_OF_MEAN: f64 = 1.3;
const UNIFORM_MIN_OF_MEAN: f64 = 0.8;
const UNIFORM_MAX_OF_MEAN: f64 = 1.2;

/// Draw one value from the parameter's distribution.
///
/// Every family returns a finite value for degenerate parameters: zero
/// spread collapses to the mean, collapsed triangular bounds to the mode,
/// and `Point` consumes no randomness at all.
pub fn sample<R: Rng + ?Sized>(param: &DistributionParameter, rng: &mut R) -> f64 {
    match param.family {
        DistributionFamily::Normal => {
            let std = param.std.unwrap_or(DEFAULT_STD_OF_MEAN * param.mean);
            param.mean + std * standard_normal(rng)
        }
        DistributionFamily::Triangular => {
            let min = param.min.unwrap_or(TRIANGULAR_MIN_OF_MEAN * param.mean);
            let max = param.max.unwrap_or(TRIANGULAR_MAX_OF_MEAN * param.mean);
            triangular(rng, min, param.mean, max)
        }
        DistributionFamily::Uniform => {
            let min = param.min.unwrap_or(UNIFORM_MIN_OF_MEAN * param.mean);
            let max = param.max.unwrap_or(UNIFORM_MAX_OF_MEAN * param.mean);
            min + (max - min) * rng.gen::<f64>()
        }
        DistributionFamily::Point => param.mean,
    }
}

/// Standard normal draw via the Box-Muller transform.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-12); // ln(0) guard
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Inverse-CDF triangular draw on [min, max] with the given mode.
fn triangular<R: Rng + ?Sized>(rng: &mut R, min: f64, mode: f64, max: f64) -> f64 {
    if max <= min {
        // Collapsed or inverted bounds: the only sensible finite value.
        return mode;
    }
    let u = rng.gen::<f64>();
    let fc = (mode - min) / (max - min);
    if u < fc {
        min + (u * (max - min) * (mode - min)).sqrt()
    } else {
        max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use statrs::statistics::Distribution;

    const SEED: u64 = 42;
    const N: usize = 50_000;

    fn draws(param: &DistributionParameter) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(SEED);
        (0..N).map(|_| sample(param, &mut rng)).collect()
    }

    fn mean_of(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_point_returns_mean_without_randomness() {
        let param = DistributionParameter::point(7.5);
        let mut rng = StdRng::seed_from_u64(SEED);
        for _ in 0..100 {
            assert_eq!(sample(&param, &mut rng), 7.5);
        }
    }

    #[test]
    fn test_unknown_family_falls_back_to_point() {
        let param: DistributionParameter =
            serde_json::from_str(r#"{"family":"lognormal","mean":4.0}"#).unwrap();
        assert_eq!(param.family, DistributionFamily::Point);
        let mut rng = StdRng::seed_from_u64(SEED);
        assert_eq!(sample(&param, &mut rng), 4.0);
    }

    #[test]
    fn test_missing_family_defaults_to_point() {
        let param: DistributionParameter = serde_json::from_str(r#"{"mean":2.5}"#).unwrap();
        assert_eq!(param.family, DistributionFamily::Point);
    }

    #[test]
    fn test_family_roundtrip() {
        for family in ["normal", "triangular", "uniform", "point"] {
            let json = format!(r#"{{"family":"{family}","mean":1.0}}"#);
            let param: DistributionParameter = serde_json::from_str(&json).unwrap();
            let back = serde_json::to_value(&param).unwrap();
            assert_eq!(back["family"], family);
        }
    }

    #[test]
    fn test_normal_zero_std_collapses_to_mean() {
        let param = DistributionParameter::normal(12.0, 0.0);
        let mut rng = StdRng::seed_from_u64(SEED);
        for _ in 0..100 {
            assert_eq!(sample(&param, &mut rng), 12.0);
        }
    }

    #[test]
    fn test_normal_default_std_is_tenth_of_mean() {
        let param = DistributionParameter {
            family: DistributionFamily::Normal,
            mean: 100.0,
            std: None,
            min: None,
            max: None,
        };
        let values = draws(&param);
        let mean = mean_of(&values);
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / N as f64;
        assert!((mean - 100.0).abs() < 0.2, "mean={mean}");
        assert!((var.sqrt() - 10.0).abs() < 0.2, "std={}", var.sqrt());
    }

    #[test]
    fn test_normal_matches_reference_moments() {
        let param = DistributionParameter::normal(5.0, 2.0);
        let reference = statrs::distribution::Normal::new(5.0, 2.0).unwrap();
        let mean = mean_of(&draws(&param));
        assert!((mean - reference.mean().unwrap()).abs() < 0.05, "mean={mean}");
    }

    #[test]
    fn test_triangular_stays_within_bounds() {
        let param = DistributionParameter {
            family: DistributionFamily::Triangular,
            mean: 5.0,
            std: None,
            min: Some(2.0),
            max: Some(11.0),
        };
        for v in draws(&param) {
            assert!((2.0..=11.0).contains(&v), "out of bounds: {v}");
        }
    }

    #[test]
    fn test_triangular_default_bounds_from_mean() {
        let param = DistributionParameter {
            family: DistributionFamily::Triangular,
            mean: 10.0,
            std: None,
            min: None,
            max: None,
        };
        for v in draws(&param) {
            assert!((7.0..=13.0).contains(&v), "out of bounds: {v}");
        }
    }

    #[test]
    fn test_triangular_matches_reference_moments() {
        let param = DistributionParameter {
            family: DistributionFamily::Triangular,
            mean: 5.0,
            std: None,
            min: Some(2.0),
            max: Some(11.0),
        };
        let reference = statrs::distribution::Triangular::new(2.0, 11.0, 5.0).unwrap();
        let mean = mean_of(&draws(&param));
        assert!((mean - reference.mean().unwrap()).abs() < 0.05, "mean={mean}");
    }

    #[test]
    fn test_triangular_collapsed_bounds_return_mode() {
        let param = DistributionParameter {
            family: DistributionFamily::Triangular,
            mean: 3.0,
            std: None,
            min: Some(3.0),
            max: Some(3.0),
        };
        let mut rng = StdRng::seed_from_u64(SEED);
        for _ in 0..100 {
            assert_eq!(sample(&param, &mut rng), 3.0);
        }
    }

    #[test]
    fn test_triangular_negative_mean_derived_bounds_stay_finite() {
        // A negative mean inverts the derived bounds (0.7m > 1.3m).
        let param = DistributionParameter {
            family: DistributionFamily::Triangular,
            mean: -10.0,
            std: None,
            min: None,
            max: None,
        };
        let mut rng = StdRng::seed_from_u64(SEED);
        for _ in 0..100 {
            assert_eq!(sample(&param, &mut rng), -10.0);
        }
    }

    #[test]
    fn test_uniform_stays_within_bounds() {
        let param = DistributionParameter {
            family: DistributionFamily::Uniform,
            mean: 10.0,
            std: None,
            min: None,
            max: None,
        };
        for v in draws(&param) {
            assert!((8.0..=12.0).contains(&v), "out of bounds: {v}");
        }
    }

    #[test]
    fn test_uniform_matches_reference_moments() {
        let param = DistributionParameter {
            family: DistributionFamily::Uniform,
            mean: 0.0,
            std: None,
            min: Some(3.0),
            max: Some(7.0),
        };
        let reference = statrs::distribution::Uniform::new(3.0, 7.0).unwrap();
        let mean = mean_of(&draws(&param));
        assert!((mean - reference.mean().unwrap()).abs() < 0.05, "mean={mean}");
    }

    #[test]
    fn test_draw_converts_percentage_points_to_fractions() {
        let set = AssumptionSet {
            revenue_growth: DistributionParameter::point(10.0),
            ebitda_margin: DistributionParameter::point(20.0),
            capex_to_revenue: DistributionParameter::point(5.0),
            nwc_to_revenue_delta: DistributionParameter::point(0.0),
            wacc: DistributionParameter::point(10.0),
            terminal_growth: DistributionParameter::point(2.0),
        };
        let mut rng = StdRng::seed_from_u64(SEED);
        let draw = set.draw(&mut rng);
        assert_eq!(draw.revenue_growth, 0.10);
        assert_eq!(draw.ebitda_margin, 0.20);
        assert_eq!(draw.wacc, 0.10);
        assert_eq!(draw.terminal_growth, 0.02);
    }

    #[test]
    fn test_mean_draw_ignores_spread() {
        let set = AssumptionSet {
            revenue_growth: DistributionParameter::normal(10.0, 4.0),
            ebitda_margin: DistributionParameter::normal(20.0, 4.0),
            capex_to_revenue: DistributionParameter::point(5.0),
            nwc_to_revenue_delta: DistributionParameter::point(0.0),
            wacc: DistributionParameter::normal(10.0, 1.0),
            terminal_growth: DistributionParameter::point(2.0),
        };
        let draw = set.mean_draw();
        assert_eq!(draw.revenue_growth, 0.10);
        assert_eq!(draw.wacc, 0.10);
    }
}
