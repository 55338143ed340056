use crate::error::{Error, Result};

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f64) -> f64;
}

fn validate(rate: f64, vi: f64, vf: f64) -> Result<()> {
    if !(rate.is_finite() && vi.is_finite() && vf.is_finite()) {
        return Err(Error::invalid("rate", "decay parameters must be finite"));
    }
    ((rate >= 0.0 && vi >= vf) || (rate < 0.0 && vi <= vf))
        .then_some(())
        .ok_or_else(|| Error::invalid("rate", "`vi - vf` must have same sign as `rate`"))
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f64) -> f64 {
        self.value
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>floor(t)</sup>, v<sub>f</sub>)
///
/// Evaluated at whole episode counts this is the same as multiplying by `r` once per
/// episode and clamping at `v`<sub>f</sub>.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometric {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Geometric {
    /// **Errors** if `rate` is not in `[0,1]` or `vi < vf`
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        if rate > 1.0 {
            return Err(Error::invalid("rate", "geometric decay rate must be at most 1"));
        }
        Ok(Self { rate, vi, vf })
    }

    /// Starting value
    pub fn initial(&self) -> f64 {
        self.vi
    }
}

impl Decay for Geometric {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        (vi * rate.powf(t.floor())).max(vf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_functional() {
        assert!(validate(1.0, 1.0, 0.0).is_ok());
        assert!(validate(1.0, -1.0, 0.0).is_err());
        assert!(validate(-1.0, 1.0, 0.0).is_err());
        assert!(validate(-1.0, -1.0, 0.0).is_ok());
        assert!(validate(f64::NAN, 1.0, 0.0).is_err());
    }

    #[test]
    fn constant_decay() {
        let x = Constant::new(1.0);
        assert_eq!(x.evaluate(0.0), 1.0);
        assert_eq!(x.evaluate(1.0), 1.0);
    }

    #[test]
    fn geometric_decay() {
        let x = Geometric::new(0.5, 2.0, 0.3).unwrap();
        assert_eq!(x.evaluate(0.0), 2.0);
        assert_eq!(x.evaluate(0.5), 2.0);
        assert_eq!(x.evaluate(1.0), 1.0);
        assert_eq!(x.evaluate(2.0), 0.5);
        assert_eq!(x.evaluate(10.0), 0.3);
    }

    #[test]
    fn geometric_rejects_growth() {
        assert!(Geometric::new(1.5, 1.0, 0.0).is_err());
        assert!(Geometric::new(0.9, 0.1, 1.0).is_err());
    }
}
