//! Statistics Calculator Module
//! Box-plot summaries and least-squares trendlines for the chart builder.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Whisker reach in multiples of the interquartile range.
pub const WHISKER_IQR: f64 = 1.5;

/// Five-number summary plus outliers for one box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub count: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Ordinary least-squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OlsFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Two-tailed p-value of the slope; `None` with fewer than three points.
    pub p_value: Option<f64>,
    pub n: usize,
}

impl OlsFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Fitted equation and fit quality, one line each.
    pub fn hover_lines(&self, x_field: &str, y_field: &str) -> Vec<String> {
        let sign = if self.intercept < 0.0 { '-' } else { '+' };
        let mut lines = vec![
            "OLS trendline".to_string(),
            format!(
                "{} = {:.4} * {} {} {:.4}",
                y_field,
                self.slope,
                x_field,
                sign,
                self.intercept.abs()
            ),
            format!("R² = {:.6}", self.r_squared),
        ];
        if let Some(p) = self.p_value {
            lines.push(format!("p = {:.4}", p));
        }
        lines.push(format!("n = {}", self.n));
        lines
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Box summary of the finite values; `None` when there are none.
    pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = Self::percentile(&sorted, 25.0);
        let median = Self::percentile(&sorted, 50.0);
        let q3 = Self::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|&v| v >= low_fence)
            .unwrap_or(q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= high_fence)
            .unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < low_fence || v > high_fence)
            .collect();

        Some(BoxSummary {
            count: sorted.len(),
            mean: sorted.iter().mean(),
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Least-squares line through the finite (x, y) pairs.
    ///
    /// `None` with fewer than two points or no spread in x.
    pub fn ols_fit(xs: &[f64], ys: &[f64]) -> Option<OlsFit> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = xs
            .iter()
            .zip(ys)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| (*x, *y))
            .unzip();
        let n = xs.len();
        if n < 2 {
            return None;
        }

        let mean_x = xs.iter().mean();
        let mean_y = ys.iter().mean();
        let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
        if sxx == 0.0 {
            return None;
        }
        let sxy: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        let syy: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let sse: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
            .sum();
        let r_squared = if syy > 0.0 { 1.0 - sse / syy } else { 1.0 };

        Some(OlsFit {
            slope,
            intercept,
            r_squared,
            p_value: Self::slope_p_value(slope, sse, sxx, n),
            n,
        })
    }

    /// Two-tailed t-test of slope == 0 with n - 2 degrees of freedom.
    fn slope_p_value(slope: f64, sse: f64, sxx: f64, n: usize) -> Option<f64> {
        if n < 3 {
            return None;
        }
        let df = (n - 2) as f64;
        let se = (sse / df / sxx).sqrt();
        if se == 0.0 {
            return Some(0.0);
        }
        let t = slope / se;
        let dist = StudentsT::new(0.0, 1.0, df).ok()?;
        Some(2.0 * (1.0 - dist.cdf(t.abs())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_hover_lines() {
        let fit = StatsCalculator::ols_fit(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(
            fit.hover_lines("job_prestige", "income"),
            vec![
                "OLS trendline",
                "income = 2.0000 * job_prestige + 0.0000",
                "R² = 1.000000",
                "p = 0.0000",
                "n = 3",
            ]
        );

        let falling = StatsCalculator::ols_fit(&[0.0, 1.0], &[-1.0, -3.0]).unwrap();
        let lines = falling.hover_lines("x", "y");
        assert_eq!(lines[1], "y = -2.0000 * x - 1.0000");
        // Two points leave no degrees of freedom for the t-test
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "n = 2");
    }

    #[test]
    fn test_box_summary_quartiles() {
        let summary = StatsCalculator::box_summary(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.q1, 2.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q3, 4.0);
        assert_eq!(summary.lower_whisker, 1.0);
        assert_eq!(summary.upper_whisker, 5.0);
        assert!(summary.outliers.is_empty());
        assert_eq!(summary.mean, 3.0);
    }

    #[test]
    fn test_box_summary_outliers() {
        let summary =
            StatsCalculator::box_summary(&[10.0, 11.0, 12.0, 13.0, 14.0, 100.0, f64::NAN]).unwrap();
        assert_eq!(summary.count, 6);
        assert_eq!(summary.outliers, vec![100.0]);
        assert_eq!(summary.upper_whisker, 14.0);
        assert!(StatsCalculator::box_summary(&[]).is_none());
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(StatsCalculator::percentile(&sorted, 25.0), 1.75);
        assert_eq!(StatsCalculator::percentile(&sorted, 50.0), 2.5);
    }

    #[test]
    fn test_ols_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let fit = StatsCalculator::ols_fit(&xs, &ys).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.p_value, Some(0.0));
        assert_eq!(fit.predict(10.0), 21.0);
    }

    #[test]
    fn test_ols_noisy_line() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 5.0, 4.0, 5.0];
        let fit = StatsCalculator::ols_fit(&xs, &ys).unwrap();
        assert!((fit.slope - 0.6).abs() < 1e-12);
        assert!((fit.intercept - 2.2).abs() < 1e-12);
        assert!((fit.r_squared - 0.6).abs() < 1e-9);
        let p = fit.p_value.unwrap();
        assert!(p > 0.05 && p < 0.2, "p = {}", p);
    }

    #[test]
    fn test_ols_degenerate() {
        assert!(StatsCalculator::ols_fit(&[1.0], &[2.0]).is_none());
        assert!(StatsCalculator::ols_fit(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
        let fit = StatsCalculator::ols_fit(&[1.0, f64::NAN, 2.0], &[1.0, 5.0, 2.0]).unwrap();
        assert_eq!(fit.n, 2);
        assert_eq!(fit.p_value, None);
    }
}
