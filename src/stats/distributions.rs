//! Distribution functions used by the variance tests
//!
//! Normal, F and chi-square tails come from `statrs`. The asymptotic
//! Kolmogorov survival function and the studentized range CDF have no
//! `statrs` counterpart and are built on its error and gamma functions.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};
use statrs::function::erf::erfc;
use statrs::function::gamma::ln_gamma;
use std::f64::consts::{PI, SQRT_2};

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Upper tail P(F > f) of the F distribution with (d1, d2) degrees of freedom
///
/// NaN when the degrees of freedom are not positive.
pub fn f_sf(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    if f.is_infinite() {
        return 0.0;
    }
    FisherSnedecor::new(d1, d2).map_or(f64::NAN, |dist| dist.sf(f))
}

/// Upper tail of the chi-square distribution with `df` degrees of freedom
pub fn chi2_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    ChiSquared::new(df).map_or(f64::NAN, |dist| dist.sf(x))
}

/// Kolmogorov distribution survival function Q(λ) = P(K > λ)
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    if lambda < 1.18 {
        // Jacobi-theta form, fast for small λ
        let factor = (2.0 * PI).sqrt() / lambda;
        let w = PI * PI / (8.0 * lambda * lambda);
        let cdf: f64 = (1..=20)
            .map(|j| {
                let k = (2 * j - 1) as f64;
                (-k * k * w).exp()
            })
            .sum::<f64>()
            * factor;
        return (1.0 - cdf).clamp(0.0, 1.0);
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = (-2.0 * j * j * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-16 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

const LEG_X: [f64; 6] = [
    0.981560634246719250690549090149,
    0.904117256370474856678465866119,
    0.769902674194304687036893833213,
    0.587317954286617447296702418941,
    0.367831498998180193752691536644,
    0.125233408511468915472441369464,
];

const LEG_A: [f64; 6] = [
    0.047175336386511827194615961485,
    0.106939325995318430960254718194,
    0.160078328543346226334652529543,
    0.203167426723065921749064455810,
    0.233492536538354808760849898925,
    0.249147045813402785000562436043,
];

/// P(range of `cc` standard normals < w), one range group
fn range_prob_infinite_df(w: f64, cc: f64) -> f64 {
    const NLEG: usize = 12;
    const IHALF: usize = 6;
    const C1: f64 = -30.0;
    const C3: f64 = 60.0;
    const BB: f64 = 8.0;
    const WLAR: f64 = 3.0;

    let qsqz = w * 0.5;
    if qsqz >= BB {
        return 1.0;
    }

    // (2Φ(w/2) - 1)^cc
    let mut pr_w = 2.0 * normal_cdf(qsqz) - 1.0;
    pr_w = if pr_w >= 1.0 { 1.0 } else { pr_w.powf(cc) };

    let wincr = if w > WLAR { 2 } else { 3 };
    let mut blb = qsqz;
    let binc = (BB - qsqz) / wincr as f64;
    let mut bub = blb + binc;
    let mut einsum = 0.0;
    let cc1 = cc - 1.0;
    let inv_sqrt_2pi = 1.0 / (2.0 * PI).sqrt();

    for _ in 0..wincr {
        let mut elsum = 0.0;
        let a = 0.5 * (bub + blb);
        let b = 0.5 * (bub - blb);

        for jj in 1..=NLEG {
            let (j, xx) = if IHALF < jj {
                let j = NLEG - jj + 1;
                (j, LEG_X[j - 1])
            } else {
                (jj, -LEG_X[jj - 1])
            };
            let ac = a + b * xx;
            let qexpo = ac * ac;
            if qexpo > C3 {
                break;
            }

            let pplus = 2.0 * normal_cdf(ac);
            let pminus = 2.0 * normal_cdf(ac - w);
            let rinsum = pplus * 0.5 - pminus * 0.5;
            if rinsum >= (C1 / cc1).exp() {
                elsum += LEG_A[j - 1] * (-(0.5 * qexpo)).exp() * rinsum.powf(cc1);
            }
        }

        elsum *= 2.0 * b * cc * inv_sqrt_2pi;
        einsum += elsum;
        blb = bub;
        bub += binc;
    }

    pr_w += einsum;
    if pr_w <= C1.exp() {
        return 0.0;
    }
    pr_w.min(1.0)
}

const LEGQ_X: [f64; 8] = [
    0.989400934991649932596154173450,
    0.944575023073232576077988415535,
    0.865631202387831743880467897712,
    0.755404408355003033895101194847,
    0.617876244402643748446671764049,
    0.458016777657227386342419442984,
    0.281603550779258913230460501460,
    0.950125098376374401853193354250e-1,
];

const LEGQ_A: [f64; 8] = [
    0.271524594117540948517805724560e-1,
    0.622535239386478928628438369944e-1,
    0.951585116824927848099251076022e-1,
    0.124628971255533872052476282192,
    0.149595988816576732081501730547,
    0.169156519395002538189312079030,
    0.182603415044923588866763667969,
    0.189450610455068496285396723208,
];

/// Studentized range CDF P(Q < q) for `means` group means and `df` error df
///
/// Gauss-Legendre integration of the infinite-df range probability over the
/// scaled chi distribution of the error standard deviation.
pub fn ptukey(q: f64, means: usize, df: f64) -> f64 {
    const NLEGQ: usize = 16;
    const IHALFQ: usize = 8;
    const EPS1: f64 = -30.0;
    const EPS2: f64 = 1.0e-14;
    const DLARG: f64 = 25000.0;

    if q.is_nan() || df.is_nan() {
        return f64::NAN;
    }
    if q <= 0.0 {
        return 0.0;
    }
    if df < 2.0 || means < 2 {
        return f64::NAN;
    }
    if q.is_infinite() {
        return 1.0;
    }

    let cc = means as f64;
    if df > DLARG {
        return range_prob_infinite_df(q, cc);
    }

    let f2 = df * 0.5;
    let ulen: f64 = if df <= 100.0 {
        1.0
    } else if df <= 800.0 {
        0.5
    } else if df <= 5000.0 {
        0.25
    } else {
        0.125
    };
    let f2lf = f2 * df.ln() - df * std::f64::consts::LN_2 - ln_gamma(f2) + ulen.ln();
    let f21 = f2 - 1.0;
    let ff4 = df * 0.25;

    let mut ans = 0.0;
    for i in 1..=50 {
        let mut otsum = 0.0;
        let twa1 = (2 * i - 1) as f64 * ulen;

        for jj in 1..=NLEGQ {
            let (j, upper) = if IHALFQ < jj { (jj - IHALFQ - 1, true) } else { (jj - 1, false) };
            let offset = LEGQ_X[j] * ulen;
            let t1 = if upper {
                f2lf + f21 * (twa1 + offset).ln() - (offset + twa1) * ff4
            } else {
                f2lf + f21 * (twa1 - offset).ln() + (offset - twa1) * ff4
            };

            if t1 >= EPS1 {
                let scale = if upper { twa1 + offset } else { twa1 - offset };
                let qsqz = q * (scale * 0.5).sqrt();
                otsum += range_prob_infinite_df(qsqz, cc) * LEGQ_A[j] * t1.exp();
            }
        }

        if i as f64 * ulen >= 1.0 && otsum <= EPS2 {
            break;
        }
        ans += otsum;
    }

    ans.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_cdf() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(normal_cdf(1.959963984540054), 0.975, epsilon = 1e-12);
        assert_relative_eq!(normal_cdf(-1.0), 0.15865525393145707, epsilon = 1e-12);
    }

    #[test]
    fn test_f_sf_closed_forms() {
        // F(1, 1) has median 1
        assert_relative_eq!(f_sf(1.0, 1.0, 1.0), 0.5, epsilon = 1e-12);
        // d1 = 2: P(F > f) = (1 + 2f/d2)^(-d2/2)
        assert_relative_eq!(f_sf(3.0, 2.0, 10.0), 1.6f64.powf(-5.0), epsilon = 1e-12);
        assert_relative_eq!(f_sf(0.0, 3.0, 7.0), 1.0);
        assert_relative_eq!(f_sf(f64::INFINITY, 3.0, 7.0), 0.0);
    }

    #[test]
    fn test_f_sf_matches_incomplete_beta() {
        use statrs::function::beta::beta_reg;
        for &(f, d1, d2) in &[(2.7, 3.0, 17.0), (0.4, 8.0, 40.0), (11.0, 1.0, 5.0)] {
            let expected = beta_reg(d2 / 2.0, d1 / 2.0, d2 / (d2 + d1 * f));
            assert_relative_eq!(f_sf(f, d1, d2), expected, epsilon = 1e-12);
        }
        assert!(f_sf(1.0, 0.0, 5.0).is_nan());
    }

    #[test]
    fn test_chi2_sf() {
        // Two degrees of freedom: exp(-x/2)
        assert_relative_eq!(chi2_sf(3.0, 2.0), (-1.5f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(chi2_sf(5.991464547107979, 2.0), 0.05, epsilon = 1e-10);
        assert_relative_eq!(chi2_sf(0.0, 2.0), 1.0);
    }

    #[test]
    fn test_kolmogorov_sf() {
        assert_relative_eq!(kolmogorov_sf(1.0), 0.26999967167735456, epsilon = 1e-9);
        assert_relative_eq!(kolmogorov_sf(1.3580986393225505), 0.05, epsilon = 1e-6);
        assert_relative_eq!(kolmogorov_sf(0.1), 1.0, epsilon = 1e-12);
        // Both branches agree at the switch point
        let below = kolmogorov_sf(1.18 - 1e-12);
        let above = kolmogorov_sf(1.18);
        assert_relative_eq!(below, above, epsilon = 1e-9);
    }

    #[test]
    fn test_ptukey_two_means_matches_t() {
        // With two means, Q / sqrt(2) is |t| with df degrees of freedom,
        // so P(Q >= q) = P(F(1, df) >= q^2 / 2)
        for &(q, df) in &[(2.5, 10.0), (3.2, 30.0), (1.4, 120.0)] {
            let upper_tail = 1.0 - ptukey(q, 2, df);
            assert_relative_eq!(upper_tail, f_sf(q * q / 2.0, 1.0, df), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_ptukey_infinite_df_two_means() {
        let q = 2.771808;
        assert_relative_eq!(ptukey(q, 2, 1.0e6), 2.0 * normal_cdf(q / SQRT_2) - 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ptukey_critical_value() {
        // Tabulated q(0.95; 3, 10) = 3.877
        assert_relative_eq!(ptukey(3.877676, 3, 10.0), 0.95, epsilon = 5e-4);
        assert_eq!(ptukey(0.0, 3, 10.0), 0.0);
        assert!(ptukey(1.0, 1, 10.0).is_nan());
    }
}
