//! Dense complex polynomials in one and two variables.
//!
//! `Polynomial` stores coefficients in ascending order, `c[0] + c[1] t + ...`.
//! `BivariatePolynomial` is a polynomial in the sheet coordinate `x` whose
//! coefficients are polynomials in the base coordinate `z`, i.e.
//! `F(x, z) = sum_p a_p(z) x^p`.

use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::{One, Zero};
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Neg, Sub};

/// Coefficients of an interpolated resultant below this fraction of the
/// largest one are treated as FFT noise.
const RESULTANT_TRIM_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coeffs: Vec<Complex64>,
}

impl Polynomial {
    /// Builds a polynomial from ascending coefficients, dropping exact zeros
    /// at the top.
    pub fn new(mut coeffs: Vec<Complex64>) -> Self {
        while coeffs.last().map_or(false, |c| c.is_zero()) {
            coeffs.pop();
        }
        Self { coeffs }
    }

    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(value: Complex64) -> Self {
        Self::new(vec![value])
    }

    pub fn monomial(value: Complex64, degree: usize) -> Self {
        let mut coeffs = vec![Complex64::zero(); degree + 1];
        coeffs[degree] = value;
        Self::new(coeffs)
    }

    pub fn from_real(coeffs: &[f64]) -> Self {
        Self::new(coeffs.iter().map(|&c| Complex64::new(c, 0.0)).collect())
    }

    pub fn coeffs(&self) -> &[Complex64] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Degree of the polynomial, `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    pub fn leading_coefficient(&self) -> Complex64 {
        self.coeffs.last().copied().unwrap_or_else(Complex64::zero)
    }

    pub fn eval(&self, t: Complex64) -> Complex64 {
        self.coeffs
            .iter()
            .rev()
            .fold(Complex64::zero(), |acc, &c| acc * t + c)
    }

    /// Evaluates `p(t)` and `p'(t)` in a single Horner pass.
    pub fn eval_with_derivative(&self, t: Complex64) -> (Complex64, Complex64) {
        let mut value = Complex64::zero();
        let mut derivative = Complex64::zero();
        for &c in self.coeffs.iter().rev() {
            derivative = derivative * t + value;
            value = value * t + c;
        }
        (value, derivative)
    }

    /// `sum |c_k| r^k`, the scale against which rounding in `eval` is measured.
    pub fn abs_eval(&self, r: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * r + c.norm())
    }

    pub fn derivative(&self) -> Self {
        Self::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, &c)| c * k as f64)
                .collect(),
        )
    }

    /// Coefficient of `dt^k` in `p(t0 + dt)`.
    pub fn taylor_coefficient(&self, t0: Complex64, k: usize) -> Complex64 {
        let mut sum = Complex64::zero();
        let mut power = Complex64::one();
        for (q, &c) in self.coeffs.iter().enumerate().skip(k) {
            sum += c * binomial(q, k) * power;
            power *= t0;
        }
        sum
    }

    /// Sets real and imaginary parts that are negligible relative to the
    /// largest coefficient to exactly zero, then drops zeros at the top.
    pub fn denoised(&self, relative_tolerance: f64) -> Self {
        let scale = self.coeffs.iter().map(|c| c.norm()).fold(0.0, f64::max);
        let threshold = relative_tolerance * scale;
        let clean = |v: f64| if v.abs() <= threshold { 0.0 } else { v };
        Self::new(
            self.coeffs
                .iter()
                .map(|c| Complex64::new(clean(c.re), clean(c.im)))
                .collect(),
        )
    }

    pub fn scale(&self, factor: Complex64) -> Self {
        Self::new(self.coeffs.iter().map(|&c| c * factor).collect())
    }

    pub fn pow(&self, exponent: u32) -> Self {
        let mut result = Self::constant(Complex64::one());
        for _ in 0..exponent {
            result = &result * self;
        }
        result
    }
}

impl<'a> Add<&'a Polynomial> for &'a Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &'a Polynomial) -> Polynomial {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        let coeffs = (0..len)
            .map(|k| {
                self.coeffs.get(k).copied().unwrap_or_else(Complex64::zero)
                    + rhs.coeffs.get(k).copied().unwrap_or_else(Complex64::zero)
            })
            .collect();
        Polynomial::new(coeffs)
    }
}

impl<'a> Sub<&'a Polynomial> for &'a Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &'a Polynomial) -> Polynomial {
        self + &(-rhs)
    }
}

impl<'a> Mul<&'a Polynomial> for &'a Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &'a Polynomial) -> Polynomial {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero();
        }
        let mut coeffs = vec![Complex64::zero(); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Polynomial::new(coeffs)
    }
}

impl<'a> Neg for &'a Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        Polynomial::new(self.coeffs.iter().map(|&c| -c).collect())
    }
}

/// `F(x, z) = sum_p a_p(z) x^p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BivariatePolynomial {
    coeffs: Vec<Polynomial>,
}

impl BivariatePolynomial {
    /// Builds `F` from its `x`-coefficients `a_0(z), a_1(z), ...`.
    pub fn new(mut coeffs: Vec<Polynomial>) -> Self {
        while coeffs.last().map_or(false, Polynomial::is_zero) {
            coeffs.pop();
        }
        Self { coeffs }
    }

    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(value: Complex64) -> Self {
        Self::new(vec![Polynomial::constant(value)])
    }

    /// The monomial `x`.
    pub fn x() -> Self {
        Self::new(vec![Polynomial::zero(), Polynomial::constant(Complex64::one())])
    }

    /// The monomial `z`.
    pub fn z() -> Self {
        Self::new(vec![Polynomial::monomial(Complex64::one(), 1)])
    }

    /// Builds `F` from a table `table[p][q]` = coefficient of `x^p z^q`.
    pub fn from_table(table: &[&[f64]]) -> Self {
        Self::new(table.iter().map(|row| Polynomial::from_real(row)).collect())
    }

    pub fn x_coefficients(&self) -> &[Polynomial] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        self.degree_x().unwrap_or(0) == 0 && self.degree_z() == 0
    }

    /// Degree in `x`, `None` for the zero polynomial.
    pub fn degree_x(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    /// Largest degree in `z` among the coefficients.
    pub fn degree_z(&self) -> usize {
        self.coeffs
            .iter()
            .filter_map(Polynomial::degree)
            .max()
            .unwrap_or(0)
    }

    /// The univariate polynomial `x -> F(x, z)`.
    pub fn at_z(&self, z: Complex64) -> Polynomial {
        Polynomial::new(self.fiber_coefficients(z))
    }

    /// The univariate polynomial `z -> F(x, z)`.
    pub fn at_x(&self, x: Complex64) -> Polynomial {
        let mut result = Polynomial::zero();
        let mut power = Complex64::one();
        for a_p in &self.coeffs {
            result = &result + &a_p.scale(power);
            power *= x;
        }
        result
    }

    pub fn eval(&self, x: Complex64, z: Complex64) -> Complex64 {
        self.at_z(z).eval(x)
    }

    /// `dF/dx`.
    pub fn derivative_x(&self) -> Self {
        Self::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(p, a_p)| a_p.scale(Complex64::new(p as f64, 0.0)))
                .collect(),
        )
    }

    /// `dF/dz`.
    pub fn derivative_z(&self) -> Self {
        Self::new(self.coeffs.iter().map(Polynomial::derivative).collect())
    }

    /// The same polynomial with the roles of `x` and `z` exchanged.
    pub fn swap_variables(&self) -> Self {
        let rows = self.degree_z() + 1;
        let mut table = vec![vec![Complex64::zero(); self.coeffs.len()]; rows];
        for (p, a_p) in self.coeffs.iter().enumerate() {
            for (q, &c) in a_p.coeffs().iter().enumerate() {
                table[q][p] = c;
            }
        }
        Self::new(table.into_iter().map(Polynomial::new).collect())
    }

    /// Coefficient of `dx^j dz^k` in `F(x0 + dx, z0 + dz)`.
    pub fn taylor_coefficient(&self, x0: Complex64, z0: Complex64, j: usize, k: usize) -> Complex64 {
        let mut sum = Complex64::zero();
        let mut power = Complex64::one();
        for (p, a_p) in self.coeffs.iter().enumerate().skip(j) {
            sum += a_p.taylor_coefficient(z0, k) * binomial(p, j) * power;
            power *= x0;
        }
        sum
    }

    pub fn scale(&self, factor: Complex64) -> Self {
        Self::new(self.coeffs.iter().map(|a| a.scale(factor)).collect())
    }

    pub fn pow(&self, exponent: u32) -> Self {
        let mut result = Self::constant(Complex64::one());
        for _ in 0..exponent {
            result = &result * self;
        }
        result
    }

    /// Resultant with respect to `x`, as a polynomial in `z`.
    ///
    /// The Sylvester determinant is sampled on the unit circle at enough
    /// points to fix its degree and interpolated back with an FFT.
    pub fn resultant_x(&self, other: &Self) -> Result<Polynomial> {
        let (m, k) = match (self.degree_x(), other.degree_x()) {
            (Some(m), Some(k)) => (m, k),
            _ => bail!("Resultant of a zero polynomial is undefined."),
        };
        if m + k == 0 {
            return Ok(Polynomial::constant(Complex64::one()));
        }

        let bound = k * self.degree_z() + m * other.degree_z();
        let n_samples = bound + 1;
        let mut samples: Vec<Complex64> = (0..n_samples)
            .map(|s| {
                let z = Complex64::from_polar(1.0, 2.0 * PI * s as f64 / n_samples as f64);
                sylvester_determinant(&self.fiber_coefficients(z), &other.fiber_coefficients(z))
            })
            .collect();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_samples);
        fft.process(&mut samples);

        let normalization = 1.0 / n_samples as f64;
        let coeffs = samples.into_iter().map(|c| c * normalization).collect();
        Ok(Polynomial::new(coeffs).denoised(RESULTANT_TRIM_TOLERANCE))
    }

    /// Resultant with respect to `z`, as a polynomial in `x`.
    pub fn resultant_z(&self, other: &Self) -> Result<Polynomial> {
        self.swap_variables().resultant_x(&other.swap_variables())
    }

    /// `Res_x(F, dF/dx)`; vanishes exactly where the fiber has a repeated
    /// root or the leading coefficient drops.
    pub fn discriminant(&self) -> Result<Polynomial> {
        self.resultant_x(&self.derivative_x())
    }

    /// Coefficients of `x -> F(x, z)` at the formal degree, top zeros kept.
    fn fiber_coefficients(&self, z: Complex64) -> Vec<Complex64> {
        self.coeffs.iter().map(|a_p| a_p.eval(z)).collect()
    }
}

impl<'a> Add<&'a BivariatePolynomial> for &'a BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn add(self, rhs: &'a BivariatePolynomial) -> BivariatePolynomial {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        let zero = Polynomial::zero();
        let coeffs = (0..len)
            .map(|p| {
                let a = self.coeffs.get(p).unwrap_or(&zero);
                let b = rhs.coeffs.get(p).unwrap_or(&zero);
                a + b
            })
            .collect();
        BivariatePolynomial::new(coeffs)
    }
}

impl<'a> Sub<&'a BivariatePolynomial> for &'a BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn sub(self, rhs: &'a BivariatePolynomial) -> BivariatePolynomial {
        self + &(-rhs)
    }
}

impl<'a> Mul<&'a BivariatePolynomial> for &'a BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn mul(self, rhs: &'a BivariatePolynomial) -> BivariatePolynomial {
        if self.is_zero() || rhs.is_zero() {
            return BivariatePolynomial::zero();
        }
        let mut coeffs = vec![Polynomial::zero(); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] = &coeffs[i + j] + &(a * b);
            }
        }
        BivariatePolynomial::new(coeffs)
    }
}

impl<'a> Neg for &'a BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn neg(self) -> BivariatePolynomial {
        BivariatePolynomial::new(self.coeffs.iter().map(|a| -a).collect())
    }
}

fn sylvester_determinant(f: &[Complex64], g: &[Complex64]) -> Complex64 {
    let m = f.len() - 1;
    let k = g.len() - 1;
    let size = m + k;
    let mut matrix = DMatrix::<Complex64>::zeros(size, size);
    for row in 0..k {
        for (offset, &c) in f.iter().rev().enumerate() {
            matrix[(row, row + offset)] = c;
        }
    }
    for row in 0..m {
        for (offset, &c) in g.iter().rev().enumerate() {
            matrix[(k + row, row + offset)] = c;
        }
    }
    matrix.determinant()
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn eval_with_derivative_matches_separate_evaluation() {
        // 1 + 2t + 3t^2
        let p = Polynomial::from_real(&[1.0, 2.0, 3.0]);
        let t = c(0.5, -1.0);
        let (value, derivative) = p.eval_with_derivative(t);
        assert!((value - p.eval(t)).norm() < 1e-14);
        assert!((derivative - p.derivative().eval(t)).norm() < 1e-14);
        assert!((derivative - (c(2.0, 0.0) + t * 6.0)).norm() < 1e-14);
    }

    #[test]
    fn new_strips_exact_top_zeros() {
        let p = Polynomial::from_real(&[1.0, 0.0, 0.0]);
        assert_eq!(p.degree(), Some(0));
        assert_eq!(Polynomial::from_real(&[0.0]).degree(), None);
    }

    #[test]
    fn taylor_coefficient_of_cubic() {
        // t^3 around t0 = 2: 8 + 12 dt + 6 dt^2 + dt^3
        let p = Polynomial::from_real(&[0.0, 0.0, 0.0, 1.0]);
        let t0 = c(2.0, 0.0);
        let expected = [8.0, 12.0, 6.0, 1.0, 0.0];
        for (k, &e) in expected.iter().enumerate() {
            assert!((p.taylor_coefficient(t0, k) - c(e, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn bivariate_arithmetic_builds_expected_table() {
        // (x - z) * (x + z) = x^2 - z^2
        let x = BivariatePolynomial::x();
        let z = BivariatePolynomial::z();
        let product = &(&x - &z) * &(&x + &z);
        let expected = BivariatePolynomial::from_table(&[&[0.0, 0.0, -1.0], &[], &[1.0]]);
        assert_eq!(product, expected);
        assert_eq!(product.degree_x(), Some(2));
        assert_eq!(product.degree_z(), 2);
    }

    #[test]
    fn swap_variables_is_an_involution() {
        let f = BivariatePolynomial::from_table(&[&[1.0, 2.0], &[0.0, 0.0, 3.0], &[4.0]]);
        let swapped = f.swap_variables();
        let x = c(0.3, 0.1);
        let z = c(-0.7, 0.4);
        assert!((swapped.eval(z, x) - f.eval(x, z)).norm() < 1e-12);
        assert_eq!(swapped.swap_variables(), f);
    }

    #[test]
    fn bivariate_taylor_coefficients_at_a_point() {
        // F = x^2 z  around (x0, z0) = (1, 2):
        // (1 + dx)^2 (2 + dz) -> coeff of dx dz is 2, of dx^2 is 2.
        let f = BivariatePolynomial::from_table(&[&[], &[], &[0.0, 1.0]]);
        let x0 = c(1.0, 0.0);
        let z0 = c(2.0, 0.0);
        assert!((f.taylor_coefficient(x0, z0, 0, 0) - c(2.0, 0.0)).norm() < 1e-12);
        assert!((f.taylor_coefficient(x0, z0, 1, 1) - c(2.0, 0.0)).norm() < 1e-12);
        assert!((f.taylor_coefficient(x0, z0, 2, 0) - c(2.0, 0.0)).norm() < 1e-12);
        assert!((f.taylor_coefficient(x0, z0, 0, 1) - c(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn discriminant_of_square_root_curve_is_linear() {
        // F = x^2 - z, Res_x(F, 2x) = -4z
        let f = BivariatePolynomial::from_table(&[&[0.0, -1.0], &[], &[1.0]]);
        let disc = f.discriminant().expect("discriminant should compute");
        assert_eq!(disc.degree(), Some(1));
        assert_eq!(disc.coeffs()[0], c(0.0, 0.0));
        assert!((disc.coeffs()[1] - c(-4.0, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn discriminant_of_a_pure_power_is_an_exact_monomial() {
        // F = x^5 - z, Res_x(F, 5x^4) = 3125 z^4
        let f = BivariatePolynomial::from_table(&[&[0.0, -1.0], &[], &[], &[], &[], &[1.0]]);
        let disc = f.discriminant().expect("discriminant should compute");
        assert_eq!(disc.degree(), Some(4));
        assert!(disc.coeffs()[..4].iter().all(|c| c.is_zero()));
        assert!((disc.coeffs()[4].norm() - 3125.0).abs() < 1e-6);
    }

    #[test]
    fn discriminant_of_cubic_vanishes_at_folds() {
        // F = x^3 - 3x + z, folds at z = +-2
        let f = BivariatePolynomial::from_table(&[&[0.0, 1.0], &[-3.0], &[], &[1.0]]);
        let disc = f.discriminant().expect("discriminant should compute");
        assert_eq!(disc.degree(), Some(2));
        for z in [c(2.0, 0.0), c(-2.0, 0.0)] {
            assert!(disc.eval(z).norm() < 1e-9, "D({z}) = {}", disc.eval(z));
        }
        assert!(disc.eval(c(0.0, 0.0)).norm() > 1.0);
    }

    #[test]
    fn resultant_in_z_eliminates_the_base_coordinate() {
        // F = x^3 - 3x + z, dF/dx = 3x^2 - 3 -> Res_z = 3x^2 - 3
        let f = BivariatePolynomial::from_table(&[&[0.0, 1.0], &[-3.0], &[], &[1.0]]);
        let res = f
            .resultant_z(&f.derivative_x())
            .expect("resultant should compute");
        assert_eq!(res.degree(), Some(2));
        for x in [c(1.0, 0.0), c(-1.0, 0.0)] {
            assert!(res.eval(x).norm() < 1e-10);
        }
    }

    #[test]
    fn resultant_rejects_zero_polynomials() {
        let f = BivariatePolynomial::x();
        let err = f
            .resultant_x(&BivariatePolynomial::zero())
            .expect_err("zero polynomial should be rejected");
        assert!(format!("{err}").contains("zero polynomial"));
    }
}
