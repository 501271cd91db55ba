//! Contest success function.
//!
//! A Tullock contest: the probability that side A wins given each side's
//! investment is `A^r / (A^r + B^r)`. The exponent `r` sets how decisive
//! money is. Near zero every round is a coin flip; as `r` grows the
//! bigger spender wins almost surely.

/// Exponent used when neither the rules nor the artifact supply one.
pub const DEFAULT_CSF_EXPONENT: f64 = 1.0855;

/// Probability that the side investing `a` beats the side investing `b`.
///
/// Returns exactly 0.5 when both investments are zero (or negative, which
/// is treated as zero) and whenever `r` is not a positive finite number,
/// since `A^0 / (A^0 + B^0)` is a coin flip whatever the spend. The result
/// is always finite and in `[0, 1]`.
#[must_use]
pub fn contest_success(a: f64, b: f64, r: f64) -> f64 {
    let a = sanitize(a);
    let b = sanitize(b);
    let r = if r.is_finite() && r > 0.0 { r } else { return 0.5 };

    // 0^0 is 1 in floating point, but 0^r/(0^r+0^r) is still 0/0 for r > 0.
    if a == 0.0 && b == 0.0 {
        return 0.5;
    }
    if b == 0.0 {
        return 1.0;
    }
    if a == 0.0 {
        return 0.0;
    }

    // p = 1 / (1 + (b/a)^r), evaluated in log space so large spends with a
    // large exponent neither overflow nor lose the equal-spend midpoint.
    let diff = r * (b.ln() - a.ln());
    let p = 1.0 / (1.0 + diff.exp());
    p.clamp(0.0, 1.0)
}

fn sanitize(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 { x } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zero_zero_is_half() {
        assert!(approx(contest_success(0.0, 0.0, 1.0855), 0.5));
        assert!(approx(contest_success(0.0, 0.0, 0.0), 0.5));
    }

    #[test]
    fn test_equal_spend_is_half() {
        for r in [0.1, 1.0, 5.0, 50.0] {
            assert!(approx(contest_success(4000.0, 4000.0, r), 0.5));
        }
    }

    #[test]
    fn test_linear_exponent_matches_ratio() {
        let p = contest_success(3000.0, 1000.0, 1.0);
        assert!(approx(p, 0.75));
    }

    #[test]
    fn test_one_side_zero() {
        assert!(approx(contest_success(1000.0, 0.0, 1.0), 1.0));
        assert!(approx(contest_success(0.0, 1000.0, 1.0), 0.0));
    }

    #[test]
    fn test_zero_exponent_ignores_spend() {
        assert!(approx(contest_success(5.0, 0.0, 0.0), 0.5));
        assert!(approx(contest_success(0.0, 5.0, 0.0), 0.5));
        assert!(approx(contest_success(80_000.0, 200.0, 0.0), 0.5));
        assert!(approx(contest_success(5.0, 0.0, -1.0), 0.5));
    }

    #[test]
    fn test_large_exponent_does_not_overflow() {
        let p = contest_success(80_000.0, 79_000.0, 200.0);
        assert!(p.is_finite());
        assert!(p > 0.9);
    }

    #[test]
    fn test_small_exponent_approaches_coin_flip() {
        let p = contest_success(20_000.0, 1_000.0, 0.001);
        assert!((p - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_nan_inputs_are_sanitized() {
        let p = contest_success(f64::NAN, 1000.0, 1.0);
        assert!(approx(p, 0.0));
        let p = contest_success(1000.0, 1000.0, f64::NAN);
        assert!(approx(p, 0.5));
    }
}
