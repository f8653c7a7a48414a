//! Derived-metric formulas.
//!
//! Every division goes through [`divide`], which reports a zero denominator
//! instead of producing `inf`/`NaN`. Callers resolve that marker with
//! [`resolve`] (nonzero numerator → infinite, otherwise 0) or, for the
//! multi-stage ratings, collapse the whole formula to 0.

use serde::{Serialize, Serializer};

/// Weight of a free-throw attempt when counting possessions.
pub const FT_POSSESSION_FACTOR: f64 = 0.475;

/// A formula hit a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroDenominator {
    pub numerator_nonzero: bool,
}

pub type FormulaResult = Result<f64, ZeroDenominator>;

/// `numerator / denominator`, or the zero-denominator marker.
#[inline]
pub fn divide(numerator: f64, denominator: f64) -> FormulaResult {
    if denominator == 0.0 {
        Err(ZeroDenominator {
            numerator_nonzero: numerator != 0.0,
        })
    } else {
        Ok(numerator / denominator)
    }
}

/// One reported metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Value(f64),
    /// Activity happened but the denominator was zero.
    Infinite,
    /// The metric does not apply to this query.
    Undefined,
}

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// `"12.34"`, `"Inf."`, or `None` for an undefined metric.
    pub fn display(&self) -> Option<String> {
        match self {
            StatValue::Value(v) => Some(format!("{:.2}", v)),
            StatValue::Infinite => Some("Inf.".to_string()),
            StatValue::Undefined => None,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.display() {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_none(),
        }
    }
}

/// Apply the zero-activity convention to a formula result.
pub fn resolve(result: FormulaResult) -> StatValue {
    match result {
        Ok(value) => StatValue::Value(value),
        Err(ZeroDenominator {
            numerator_nonzero: true,
        }) => StatValue::Infinite,
        Err(_) => StatValue::Value(0.0),
    }
}

/// `a / b`.
pub fn rate(a: f64, b: f64) -> FormulaResult {
    divide(a, b)
}

/// `100 * a / (a + b)`.
pub fn percent(a: f64, b: f64) -> FormulaResult {
    Ok(100.0 * divide(a, a + b)?)
}

/// `100 * (2FGM + 0.5 * 3FGM) / FGA`.
pub fn effective_fg_pct(made_2: f64, made_3: f64, fga: f64) -> FormulaResult {
    Ok(100.0 * divide(made_2 + 0.5 * made_3, fga)?)
}

/// `100 * PTS / (2 * (FGA + 0.475 * FTA))`.
pub fn true_shooting_pct(points: f64, fga: f64, fta: f64) -> FormulaResult {
    divide(points * 100.0, 2.0 * (fga + FT_POSSESSION_FACTOR * fta))
}

/// `100 * TOV / (FGA + 0.475 * FTA + TOV)`.
pub fn turnover_rate(tov: f64, fga: f64, fta: f64) -> FormulaResult {
    divide(100.0 * tov, fga + FT_POSSESSION_FACTOR * fta + tov)
}

pub fn assist_turnover_ratio(ast: f64, tov: f64) -> FormulaResult {
    divide(ast, tov)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_zero_marker() {
        assert_eq!(divide(3.0, 2.0), Ok(1.5));
        assert_eq!(
            divide(3.0, 0.0),
            Err(ZeroDenominator {
                numerator_nonzero: true
            })
        );
        assert_eq!(resolve(divide(3.0, 0.0)), StatValue::Infinite);
        assert_eq!(resolve(divide(0.0, 0.0)), StatValue::Value(0.0));
    }

    #[test]
    fn test_effective_fg_pct() {
        assert_eq!(effective_fg_pct(3.0, 0.0, 5.0), Ok(60.0));
        assert_eq!(effective_fg_pct(1.0, 2.0, 4.0), Ok(50.0));
    }

    #[test]
    fn test_percent_bounds() {
        for a in 0..6 {
            for b in 0..6 {
                if a + b == 0 {
                    assert_eq!(resolve(percent(0.0, 0.0)), StatValue::Value(0.0));
                    continue;
                }
                let p = percent(a as f64, b as f64).unwrap();
                assert!((0.0..=100.0).contains(&p));
            }
        }
    }

    #[test]
    fn test_shooting_and_turnovers() {
        // 20 points on 10 FGA and 4 FTA.
        let ts = true_shooting_pct(20.0, 10.0, 4.0).unwrap();
        assert!((ts - 2000.0 / 23.8).abs() < 1e-9);

        let tov = turnover_rate(2.0, 10.0, 4.0).unwrap();
        assert!((tov - 200.0 / 13.9).abs() < 1e-9);

        assert_eq!(assist_turnover_ratio(6.0, 3.0), Ok(2.0));
        assert_eq!(resolve(assist_turnover_ratio(4.0, 0.0)), StatValue::Infinite);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatValue::Value(7.0 / 3.0).display().unwrap(), "2.33");
        assert_eq!(StatValue::Infinite.display().unwrap(), "Inf.");
        assert_eq!(StatValue::Undefined.display(), None);
        assert_eq!(
            serde_json::to_string(&vec![StatValue::Value(1.0), StatValue::Infinite]).unwrap(),
            r#"["1.00","Inf."]"#
        );
    }
}
