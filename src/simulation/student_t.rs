//! Student's t distribution
//!
//! The cumulative distribution is evaluated through the regularized
//! incomplete beta function; quantiles are found by bisection on it.

use super::{SimulationError, SimulationResult};

const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural logarithm of the gamma function for `x > 0`
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = LANCZOS[0];
    for (i, &c) in LANCZOS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized incomplete beta function `I_x(a, b)`
pub fn incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges quickly only below the mean
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

// Lentz evaluation of the incomplete beta continued fraction
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPS: f64 = 1e-15;
    const FPMIN: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// `P(T <= t)` for `T` with `df` degrees of freedom
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    let tail = 0.5 * incomplete_beta(x, 0.5 * df, 0.5);
    if t > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Value `t` with `P(T <= t) = p` for `T` with `df` degrees of freedom
pub fn student_t_quantile(df: f64, p: f64) -> SimulationResult<f64> {
    if !(df.is_finite() && df > 0.0) {
        return Err(SimulationError::configuration_error(format!(
            "Student t needs positive degrees of freedom, got {}",
            df
        )));
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(SimulationError::configuration_error(format!(
            "Student t quantile probability {} outside (0, 1)",
            p
        )));
    }
    if p < 0.5 {
        return Ok(-student_t_quantile(df, 1.0 - p)?);
    }
    if p == 0.5 {
        return Ok(0.0);
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    while student_t_cdf(hi, df) < p {
        lo = hi;
        hi *= 2.0;
        if hi > 1e12 {
            return Err(SimulationError::configuration_error(format!(
                "Student t quantile {} with {} degrees of freedom out of range",
                p, df
            )));
        }
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if student_t_cdf(mid, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-12 * hi.max(1.0) {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Critical value `t_{df, 1 - alpha/2}` of a two-sided interval
pub fn two_sided_critical_value(df: usize, alpha: f64) -> SimulationResult<f64> {
    student_t_quantile(df as f64, 1.0 - alpha / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ln_gamma_known_values() {
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!(ln_gamma(2.0).abs() < 1e-12);
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn test_incomplete_beta_symmetry() {
        let a = 2.5;
        let b = 4.0;
        let x = 0.3;
        let lhs = incomplete_beta(x, a, b);
        let rhs = 1.0 - incomplete_beta(1.0 - x, b, a);
        assert!((lhs - rhs).abs() < 1e-12);
        // I_x(1, 1) is the uniform CDF
        assert!((incomplete_beta(0.42, 1.0, 1.0) - 0.42).abs() < 1e-12);
    }

    #[test]
    fn test_cdf_symmetry() {
        assert!((student_t_cdf(0.0, 7.0) - 0.5).abs() < 1e-12);
        let upper = student_t_cdf(1.3, 7.0);
        let lower = student_t_cdf(-1.3, 7.0);
        assert!((upper + lower - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_table_values() {
        let cases = [(1, 12.706), (10, 2.228), (30, 2.042), (63, 1.998)];
        for (df, expected) in cases {
            let t = two_sided_critical_value(df, 0.05).unwrap();
            assert!((t - expected).abs() < 1e-3, "df {}: {}", df, t);
        }
        let t = two_sided_critical_value(20, 0.01).unwrap();
        assert!((t - 2.845).abs() < 1e-3);
    }

    #[test]
    fn test_quantile_inverts_cdf() {
        let t = student_t_quantile(5.0, 0.9).unwrap();
        assert!((student_t_cdf(t, 5.0) - 0.9).abs() < 1e-9);
        let t = student_t_quantile(5.0, 0.1).unwrap();
        assert!((student_t_cdf(t, 5.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_domain() {
        assert!(student_t_quantile(0.0, 0.9).is_err());
        assert!(student_t_quantile(3.0, 1.0).is_err());
        assert!(student_t_quantile(3.0, 0.0).is_err());
        assert_eq!(student_t_quantile(3.0, 0.5).unwrap(), 0.0);
    }
}
