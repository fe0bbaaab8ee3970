//! Scalar parameter values and sampling distributions
//!
//! Scenario files give rates either as literal numbers, as `"a/b"` fraction
//! strings (so an incubation exit rate can be written `"1/5.2"`), or as a
//! named sampling distribution drawn once per realization.

use rand::Rng;
use rand_distr::{Distribution, Gamma, LogNormal};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Scalar that deserializes from a number or an `"a/b"` fraction string
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Expression(f64);

impl Expression {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Expression(v)),
            Raw::Text(s) => parse_expression(&s)
                .map(Expression)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn parse_expression(s: &str) -> std::result::Result<f64, String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid numeric expression '{s}'"))
    };
    match s.split_once('/') {
        Some((num, den)) => {
            let den = parse(den)?;
            if den == 0.0 {
                return Err(format!("expression '{s}' divides by zero"));
            }
            Ok(parse(num)? / den)
        }
        None => parse(s),
    }
}

/// Sampling distribution for a per-realization parameter draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "lowercase")]
pub enum ValueDistribution {
    Fixed { value: Expression },
    Uniform { low: Expression, high: Expression },
    Gamma { shape: f64, scale: f64 },
    LogNormal { meanlog: f64, sdlog: f64 },
}

impl ValueDistribution {
    /// Check parameters at configuration time so draws cannot fail mid-run
    pub fn validate(&self, name: &str) -> Result<()> {
        let bad = |msg: String| Err(EngineError::Config(msg));
        match *self {
            ValueDistribution::Fixed { .. } => Ok(()),
            ValueDistribution::Uniform { low, high } => {
                if low.value() > high.value() {
                    return bad(format!(
                        "{name}: uniform low ({}) exceeds high ({})",
                        low.value(),
                        high.value()
                    ));
                }
                Ok(())
            }
            ValueDistribution::Gamma { shape, scale } => {
                if shape <= 0.0 || scale <= 0.0 {
                    return bad(format!("{name}: gamma shape and scale must be positive"));
                }
                Ok(())
            }
            ValueDistribution::LogNormal { sdlog, .. } => {
                if sdlog <= 0.0 {
                    return bad(format!("{name}: lognormal sdlog must be positive"));
                }
                Ok(())
            }
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        match *self {
            ValueDistribution::Fixed { value } => Ok(value.value()),
            ValueDistribution::Uniform { low, high } => {
                Ok(rng.gen_range(low.value()..=high.value()))
            }
            ValueDistribution::Gamma { shape, scale } => {
                let distr = Gamma::new(shape, scale)
                    .map_err(|e| EngineError::Config(format!("gamma distribution: {e}")))?;
                Ok(distr.sample(rng))
            }
            ValueDistribution::LogNormal { meanlog, sdlog } => {
                let distr = LogNormal::new(meanlog, sdlog)
                    .map_err(|e| EngineError::Config(format!("lognormal distribution: {e}")))?;
                Ok(distr.sample(rng))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_expression_accepts_numbers_and_fractions() {
        let e: Expression = serde_yaml::from_str("0.25").unwrap();
        assert_eq!(e.value(), 0.25);

        let e: Expression = serde_yaml::from_str("\"1/5.2\"").unwrap();
        assert!((e.value() - 1.0 / 5.2).abs() < 1e-12);

        let e: Expression = serde_yaml::from_str("\"0.9\"").unwrap();
        assert_eq!(e.value(), 0.9);
    }

    #[test]
    fn test_expression_rejects_garbage() {
        assert!(serde_yaml::from_str::<Expression>("\"1/0\"").is_err());
        assert!(serde_yaml::from_str::<Expression>("\"two/three\"").is_err());
    }

    #[test]
    fn test_distribution_yaml_shapes() {
        let d: ValueDistribution =
            serde_yaml::from_str("{distribution: uniform, low: \"1/6\", high: 0.5}").unwrap();
        assert!(matches!(d, ValueDistribution::Uniform { .. }));

        let d: ValueDistribution =
            serde_yaml::from_str("{distribution: fixed, value: 2.5}").unwrap();
        assert!(matches!(d, ValueDistribution::Fixed { .. }));
    }

    #[test]
    fn test_uniform_sample_stays_in_bounds() {
        let d = ValueDistribution::Uniform {
            low: Expression::new(2.0),
            high: Expression::new(3.0),
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let v = d.sample(&mut rng).unwrap();
            assert!((2.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn test_degenerate_uniform_is_fixed() {
        let d = ValueDistribution::Uniform {
            low: Expression::new(1.5),
            high: Expression::new(1.5),
        };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(d.sample(&mut rng).unwrap(), 1.5);
    }

    #[test]
    fn test_validation_catches_bad_parameters() {
        let d = ValueDistribution::Uniform {
            low: Expression::new(2.0),
            high: Expression::new(1.0),
        };
        assert!(d.validate("R0s").is_err());

        let d = ValueDistribution::Gamma {
            shape: -1.0,
            scale: 1.0,
        };
        assert!(d.validate("gamma").is_err());
    }
}
