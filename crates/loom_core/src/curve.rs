use crate::equation_engine::parse_polynomial;
use crate::error::TrivializationError;
use crate::polynomial::BivariatePolynomial;
use crate::root_finding::{polynomial_roots, RootSolverSettings};
use crate::traits::CurveEvaluator;
use anyhow::{bail, Result};
use num_complex::Complex64;

/// A curve given by an explicit polynomial `F(x, z)`.
#[derive(Debug, Clone)]
pub struct PolynomialCurve {
    equation: BivariatePolynomial,
    sheet_count: usize,
}

impl PolynomialCurve {
    pub fn new(equation: BivariatePolynomial) -> Result<Self> {
        let sheet_count = match equation.degree_x() {
            Some(n) if n > 0 => n,
            _ => bail!(TrivializationError::Configuration(
                "the curve must have positive degree in x".to_string()
            )),
        };
        Ok(Self {
            equation,
            sheet_count,
        })
    }

    /// Parses a curve such as `x^3 - u*x + z` with numeric values for its
    /// parameters.
    pub fn parse(input: &str, params: &[(String, Complex64)]) -> Result<Self> {
        Self::new(parse_polynomial(input, params)?)
    }

    pub fn equation(&self) -> &BivariatePolynomial {
        &self.equation
    }
}

impl CurveEvaluator for PolynomialCurve {
    fn sheet_count(&self) -> usize {
        self.sheet_count
    }

    fn roots(&self, z: Complex64, settings: &RootSolverSettings) -> Result<Vec<Complex64>> {
        let fiber = self.equation.at_z(z);
        let roots = polynomial_roots(&fiber, settings)?;
        if roots.len() != self.sheet_count {
            bail!(TrivializationError::SheetCount {
                z,
                expected: self.sheet_count,
                found: roots.len(),
            });
        }
        Ok(roots)
    }

    fn polynomial(&self) -> Option<&BivariatePolynomial> {
        Some(&self.equation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_count_is_degree_in_x() {
        let curve = PolynomialCurve::parse("x^3 - 3*x + z", &[]).expect("curve");
        assert_eq!(curve.sheet_count(), 3);
        let roots = curve
            .roots(Complex64::new(0.0, 0.0), &RootSolverSettings::default())
            .expect("roots");
        assert_eq!(roots.len(), 3);
        for r in roots {
            assert!(curve.equation().eval(r, Complex64::new(0.0, 0.0)).norm() < 1e-10);
        }
    }

    #[test]
    fn leading_coefficient_vanishing_changes_sheet_count() {
        let curve = PolynomialCurve::parse("z*x^2 - 1", &[]).expect("curve");
        let err = curve
            .roots(Complex64::new(0.0, 0.0), &RootSolverSettings::default())
            .expect_err("fiber drops degree at z = 0");
        assert!(matches!(
            TrivializationError::find(&err),
            Some(TrivializationError::SheetCount { expected: 2, found: 0, .. })
        ));
    }

    #[test]
    fn rejects_curves_without_x() {
        let err = PolynomialCurve::parse("z^2 - 1", &[]).expect_err("no sheets");
        assert!(format!("{err}").contains("positive degree"));
    }
}
