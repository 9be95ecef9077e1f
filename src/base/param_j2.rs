use serde::{Deserialize, Serialize};

/// Holds the parameters of the J2 plasticity model with isotropic and kinematic hardening
///
/// Units follow the demo specimen: stresses in GPa, lengths in m.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamJ2 {
    /// Shear modulus μ
    pub mu: f64,

    /// Lamé modulus λ
    pub lambda: f64,

    /// Initial yield stress
    pub sy: f64,

    /// Isotropic hardening: saturation rate
    pub bh: f64,

    /// Isotropic hardening: saturation value
    pub qh: f64,

    /// Kinematic hardening: saturation rate
    pub bb: f64,

    /// Kinematic hardening: saturation value (includes the factor 2/3)
    pub qb: f64,
}

impl ParamJ2 {
    /// Returns a sample set of parameters (steel-like, in GPa)
    pub fn sample() -> Self {
        ParamJ2 {
            mu: 100.0,
            lambda: 10.0,
            sy: 0.3,
            bh: 20.0,
            qh: 0.1,
            bb: 250.0,
            qb: 0.1,
        }
    }

    /// Returns the sample parameters with a yield stress so large that the response is elastic
    pub fn sample_elastic() -> Self {
        ParamJ2 {
            sy: 1e10,
            ..ParamJ2::sample()
        }
    }

    /// Returns the uniaxial (Young) modulus μ(3λ + 2μ)/(λ + μ)
    pub fn young(&self) -> f64 {
        self.mu * (3.0 * self.lambda + 2.0 * self.mu) / (self.lambda + self.mu)
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.mu <= 0.0 {
            return Some(format!("mu = {:?} is incorrect; it must be > 0.0", self.mu));
        }
        if self.lambda + self.mu <= 0.0 {
            return Some(format!(
                "lambda = {:?} is incorrect; it must be > -mu",
                self.lambda
            ));
        }
        if self.sy < 0.0 {
            return Some(format!("sy = {:?} is incorrect; it must be ≥ 0.0", self.sy));
        }
        if self.bh < 0.0 || self.bb < 0.0 {
            return Some("saturation rates bh and bb must be ≥ 0.0".to_string());
        }
        None // all good
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ParamJ2;
    use russell_lab::approx_eq;

    #[test]
    fn sample_works() {
        let p = ParamJ2::sample();
        assert_eq!(p.validate(), None);
        approx_eq(p.young(), 100.0 * 230.0 / 110.0, 1e-13);
        let e = ParamJ2::sample_elastic();
        assert_eq!(e.sy, 1e10);
        assert_eq!(e.mu, p.mu);
    }

    #[test]
    fn validate_captures_errors() {
        let mut p = ParamJ2::sample();
        p.mu = 0.0;
        assert_eq!(p.validate(), Some("mu = 0.0 is incorrect; it must be > 0.0".to_string()));
        p.mu = 100.0;
        p.sy = -1.0;
        assert_eq!(p.validate(), Some("sy = -1.0 is incorrect; it must be ≥ 0.0".to_string()));
        p.sy = 0.3;
        p.bb = -1.0;
        assert_eq!(
            p.validate(),
            Some("saturation rates bh and bb must be ≥ 0.0".to_string())
        );
    }

    #[test]
    fn serialize_works() {
        let p = ParamJ2::sample();
        let json = serde_json::to_string(&p).unwrap();
        let q: ParamJ2 = serde_json::from_str(&json).unwrap();
        assert_eq!(format!("{:?}", p), format!("{:?}", q));
    }
}
