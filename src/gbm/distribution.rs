//! The pluggable loss/link abstraction driving residuals, gamma fitting and
//! ensemble truncation.
//!
//! Per `spec.md` §9 ("Polymorphic distribution object"), this replaces an
//! inheritance hierarchy with a capability set on a tagged enum: every
//! family implements the same handful of functions, and two boolean flags
//! select which leaf-fit code path (§4.5) applies.

use std::fmt;

/// One of the ten loss families named in spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    Gaussian,
    Bernoulli,
    ModifiedHuber,
    Multinomial,
    Poisson,
    Gamma,
    Tweedie,
    Laplace,
    Quantile,
    Huber,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Gaussian => "gaussian",
            Family::Bernoulli => "bernoulli",
            Family::ModifiedHuber => "modified_huber",
            Family::Multinomial => "multinomial",
            Family::Poisson => "poisson",
            Family::Gamma => "gamma",
            Family::Tweedie => "tweedie",
            Family::Laplace => "laplace",
            Family::Quantile => "quantile",
            Family::Huber => "huber",
        };
        write!(f, "{}", name)
    }
}

/// Extra parameters some families need (Tweedie's power, Huber/Quantile's
/// alpha). Kept out of `Family` itself so the enum stays `Copy` and cheap
/// to pass around in hot loops.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionParams {
    pub tweedie_power: f64,
    pub huber_alpha: f64,
    pub quantile_alpha: f64,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            tweedie_power: 1.5,
            huber_alpha: 0.9,
            quantile_alpha: 0.5,
        }
    }
}

/// The per-family capability set: link functions, gradient, and the two
/// gamma-accumulator functions used by the closed-form leaf fit (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct Distribution {
    pub family: Family,
    pub params: DistributionParams,
}

impl Distribution {
    pub fn new(family: Family, params: DistributionParams) -> Self {
        Self { family, params }
    }

    pub fn gaussian() -> Self {
        Self::new(Family::Gaussian, DistributionParams::default())
    }

    pub fn bernoulli() -> Self {
        Self::new(Family::Bernoulli, DistributionParams::default())
    }

    /// `f` is the canonical link-space prediction; `link_inv` maps it back
    /// to the response's natural scale.
    pub fn link(&self, x: f64) -> f64 {
        match self.family {
            Family::Poisson | Family::Gamma | Family::Tweedie => x.ln(),
            Family::Bernoulli | Family::ModifiedHuber | Family::Multinomial => {
                (x / (1.0 - x)).ln()
            }
            _ => x,
        }
    }

    pub fn link_inv(&self, x: f64) -> f64 {
        match self.family {
            Family::Poisson | Family::Gamma | Family::Tweedie => x.exp(),
            Family::Bernoulli | Family::ModifiedHuber | Family::Multinomial => {
                1.0 / (1.0 + (-x).exp())
            }
            _ => x,
        }
    }

    /// Negative half-gradient of the loss at `f` (link-space prediction)
    /// given observed `y`. This is what `gbm::residual` writes into `WORK[k]`
    /// for single-class families; multinomial with more than two classes
    /// uses the joint softmax instead (see `gbm::residual::multinomial_residuals`).
    /// `nclass=2` multinomial collapses to the single-tree optimization
    /// (`spec.md` §8), reusing Bernoulli's sigmoid residual formula — the
    /// same collapse `gamma_num`/`gamma_denom` already apply below.
    pub fn neg_half_gradient(&self, y: f64, f: f64) -> f64 {
        match self.family {
            Family::Gaussian => y - f,
            Family::Bernoulli | Family::Multinomial => {
                let p = self.link_inv(f);
                y - p
            }
            Family::ModifiedHuber => {
                let margin = y * f;
                if margin >= 1.0 {
                    0.0
                } else if margin >= -1.0 {
                    y * (1.0 - margin)
                } else {
                    4.0 * y
                }
            }
            Family::Poisson => {
                let mu = self.link_inv(f);
                y - mu
            }
            Family::Gamma => {
                let mu = self.link_inv(f);
                (y - mu) / mu
            }
            Family::Tweedie => {
                let mu = self.link_inv(f);
                let p = self.params.tweedie_power;
                mu.powf(1.0 - p) * (y - mu)
            }
            Family::Laplace | Family::Quantile | Family::Huber => y - f,
        }
    }

    /// Numerator of the closed-form gamma step (spec.md §4.5).
    pub fn gamma_num(&self, w: f64, y: f64, _r: f64, f: f64) -> f64 {
        match self.family {
            Family::Gaussian => w * (y - f),
            Family::Bernoulli | Family::Multinomial => {
                let p = self.link_inv(f);
                w * (y - p)
            }
            Family::Poisson => {
                let mu = self.link_inv(f);
                w * (y - mu)
            }
            Family::Gamma => w * (y / self.link_inv(f) - 1.0),
            Family::Tweedie => {
                let mu = self.link_inv(f);
                let p = self.params.tweedie_power;
                w * mu.powf(1.0 - p) * (y - mu)
            }
            Family::ModifiedHuber | Family::Laplace | Family::Quantile | Family::Huber => {
                unreachable!("{} uses the quantile or Huber leaf-fit path, not gamma_num", self.family)
            }
        }
    }

    /// Denominator of the closed-form gamma step.
    pub fn gamma_denom(&self, w: f64, _y: f64, _r: f64, f: f64) -> f64 {
        match self.family {
            Family::Gaussian => w,
            Family::Bernoulli | Family::Multinomial => {
                let p = self.link_inv(f);
                w * p * (1.0 - p)
            }
            Family::Poisson => w * self.link_inv(f),
            Family::Gamma => w,
            Family::Tweedie => {
                let mu = self.link_inv(f);
                let p = self.params.tweedie_power;
                w * mu.powf(2.0 - p)
            }
            Family::ModifiedHuber | Family::Laplace | Family::Quantile | Family::Huber => {
                unreachable!("{} uses the quantile or Huber leaf-fit path, not gamma_denom", self.family)
            }
        }
    }

    /// True when the leaf-fit pass (spec.md §4.5) must use the weighted
    /// stratified-quantile path rather than the closed-form ratio.
    pub fn needs_quantile_fit(&self) -> bool {
        matches!(self.family, Family::Laplace | Family::Quantile)
    }

    /// True when the leaf-fit pass must use the two-step Huber path.
    pub fn needs_huber_fit(&self) -> bool {
        matches!(self.family, Family::Huber)
    }

    /// True when link-space predictions must be kept within a safe
    /// exponentiation range before `link_inv` (spec.md §4.1 step 6).
    pub fn truncate_log_space(&self) -> bool {
        matches!(self.family, Family::Poisson | Family::Gamma | Family::Tweedie)
    }

    /// Number of scratch columns (`TREE`/`WORK`) this family needs: K for
    /// multinomial with K classes, 1 otherwise. `nclass=2` multinomial
    /// collapses to the single-tree optimization (spec.md §8 boundary case),
    /// which callers implement by passing `nclass=1` for that case.
    pub fn num_classes(&self, nclass: usize) -> usize {
        match self.family {
            Family::Multinomial if nclass > 2 => nclass,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_link_is_identity() {
        let d = Distribution::gaussian();
        assert_eq!(d.link(2.5), 2.5);
        assert_eq!(d.link_inv(2.5), 2.5);
    }

    #[test]
    fn bernoulli_link_inv_is_sigmoid() {
        let d = Distribution::bernoulli();
        assert!((d.link_inv(0.0) - 0.5).abs() < 1e-12);
        assert!(d.link_inv(10.0) > 0.999);
        assert!(d.link_inv(-10.0) < 0.001);
    }

    #[test]
    fn bernoulli_neg_half_gradient_is_residual_in_probability_space() {
        let d = Distribution::bernoulli();
        let g = d.neg_half_gradient(1.0, 0.0);
        assert!((g - 0.5).abs() < 1e-12);
    }

    #[test]
    fn gaussian_gamma_num_denom_give_mean_residual() {
        let d = Distribution::gaussian();
        assert_eq!(d.gamma_num(2.0, 5.0, 0.0, 3.0), 4.0);
        assert_eq!(d.gamma_denom(2.0, 5.0, 0.0, 3.0), 2.0);
    }

    #[test]
    fn laplace_and_huber_need_non_closed_form_fits() {
        assert!(Distribution::new(Family::Laplace, DistributionParams::default()).needs_quantile_fit());
        assert!(Distribution::new(Family::Quantile, DistributionParams::default()).needs_quantile_fit());
        assert!(Distribution::new(Family::Huber, DistributionParams::default()).needs_huber_fit());
        assert!(!Distribution::gaussian().needs_quantile_fit());
        assert!(!Distribution::gaussian().needs_huber_fit());
    }

    #[test]
    fn log_link_families_need_truncation() {
        assert!(Distribution::new(Family::Poisson, DistributionParams::default()).truncate_log_space());
        assert!(Distribution::new(Family::Gamma, DistributionParams::default()).truncate_log_space());
        assert!(Distribution::new(Family::Tweedie, DistributionParams::default()).truncate_log_space());
        assert!(!Distribution::gaussian().truncate_log_space());
    }

    #[test]
    fn multinomial_num_classes_matches_nclass_above_two() {
        let d = Distribution::new(Family::Multinomial, DistributionParams::default());
        assert_eq!(d.num_classes(3), 3);
        // nclass=2 multinomial collapses to the single-tree optimization.
        assert_eq!(d.num_classes(2), 1);
        assert_eq!(Distribution::gaussian().num_classes(1), 1);
    }
}
