//! Weight systems of simply-laced Lie algebras.
//!
//! Sheets of the curve are labeled by weights of a representation. Vectors
//! are stored in the orthonormal (ambient) basis, so differences of weights
//! can be compared directly with roots.

use crate::error::TrivializationError;
use crate::traits::RootSystemProvider;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance for comparing weight and root vectors.
pub const WEIGHT_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgebraType {
    A,
    D,
    E,
}

impl fmt::Display for AlgebraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlgebraType::A => "A",
            AlgebraType::D => "D",
            AlgebraType::E => "E",
        };
        f.write_str(name)
    }
}

/// An algebra name such as `A2` or `D4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgebraName {
    pub algebra_type: AlgebraType,
    pub rank: usize,
}

impl FromStr for AlgebraName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let algebra_type = match chars.next() {
            Some('A') | Some('a') => AlgebraType::A,
            Some('D') | Some('d') => AlgebraType::D,
            Some('E') | Some('e') => AlgebraType::E,
            _ => bail!(TrivializationError::Configuration(format!(
                "unknown algebra '{}'",
                s
            ))),
        };
        let rank: usize = chars.as_str().parse().map_err(|_| {
            TrivializationError::Configuration(format!("malformed algebra rank in '{}'", s))
        })?;
        let valid = match algebra_type {
            AlgebraType::A => rank >= 1,
            AlgebraType::D => rank >= 2,
            AlgebraType::E => (6..=8).contains(&rank),
        };
        if !valid {
            bail!(TrivializationError::Configuration(format!(
                "{}{} is not a valid algebra",
                algebra_type, rank
            )));
        }
        Ok(Self { algebra_type, rank })
    }
}

impl fmt::Display for AlgebraName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.algebra_type, self.rank)
    }
}

/// Weights, roots and the map between the first fundamental representation
/// and the chosen one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSystem {
    pub algebra: AlgebraName,
    pub fundamental_representation_index: usize,
    /// Weights of the first fundamental representation.
    pub ffr_weights: Vec<Vec<f64>>,
    /// Weights of the chosen representation.
    pub weights: Vec<Vec<f64>>,
    pub multiplicities: Vec<usize>,
    pub roots: Vec<Vec<f64>>,
    pub positive_roots: Vec<Vec<f64>>,
    /// Row `i` expresses `weights[i]` in terms of `ffr_weights`.
    pub weight_coefficients: Vec<Vec<f64>>,
}

impl RootSystem {
    pub fn algebra_type(&self) -> AlgebraType {
        self.algebra.algebra_type
    }

    pub fn rank(&self) -> usize {
        self.algebra.rank
    }

    /// Number of sheets in the first fundamental representation.
    pub fn ffr_sheet_count(&self) -> usize {
        self.ffr_weights.len()
    }

    /// Number of sheets in the chosen representation.
    pub fn sheet_count(&self) -> usize {
        self.weights.len()
    }

    /// Type D curves can carry a structural pair of sheets at `x = 0`.
    pub fn allows_zero_sheet_pair(&self) -> bool {
        self.algebra_type() == AlgebraType::D
    }

    pub fn validate(&self) -> Result<()> {
        let dim = self
            .ffr_weights
            .first()
            .map(Vec::len)
            .context("root system has no first fundamental weights")?;
        let vectors = self
            .ffr_weights
            .iter()
            .chain(&self.weights)
            .chain(&self.roots)
            .chain(&self.positive_roots);
        if vectors.into_iter().any(|v| v.len() != dim) {
            bail!(TrivializationError::Configuration(
                "weights and roots must share one dimension".to_string()
            ));
        }
        if self.multiplicities.len() != self.weights.len() {
            bail!(TrivializationError::Configuration(
                "one multiplicity per weight is required".to_string()
            ));
        }
        if self.weight_coefficients.len() != self.weights.len()
            || self
                .weight_coefficients
                .iter()
                .any(|row| row.len() != self.ffr_weights.len())
        {
            bail!(TrivializationError::Configuration(
                "weight coefficients must map every weight onto the first fundamental weights"
                    .to_string()
            ));
        }
        for root in &self.positive_roots {
            if !self.roots.iter().any(|r| vectors_equal(r, root)) {
                bail!(TrivializationError::Configuration(format!(
                    "positive root {:?} is not a root",
                    root
                )));
            }
        }
        Ok(())
    }

    /// Pairs of weight indices `(i, j)` with `w_j - w_i = root`.
    pub fn ordered_weight_pairs(&self, root: &[f64], ffr: bool) -> Vec<(usize, usize)> {
        let weights = if ffr {
            &self.ffr_weights
        } else {
            &self.weights
        };
        let mut pairs = Vec::new();
        for (i, w_1) in weights.iter().enumerate() {
            for (j, w_2) in weights.iter().enumerate() {
                let diff = difference(w_2, w_1);
                if vectors_equal(&diff, root) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Index of the positive root equal to `v` or to `-v`.
    pub fn match_positive_root(&self, v: &[f64]) -> Option<usize> {
        let negated: Vec<f64> = v.iter().map(|c| -c).collect();
        self.positive_roots
            .iter()
            .position(|root| vectors_equal(root, v) || vectors_equal(root, &negated))
    }
}

pub(crate) fn vectors_equal(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() < WEIGHT_TOLERANCE)
}

pub(crate) fn difference(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}


fn unit_vector(dim: usize, i: usize, sign: f64) -> Vec<f64> {
    let mut v = vec![0.0; dim];
    v[i] = sign;
    v
}

/// Built-in data for the A and D series.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalRootSystems;

impl ClassicalRootSystems {
    /// `sl(n+1)`: first fundamental weights `e_0 .. e_n`, representation `k`
    /// is the `k`-th exterior power.
    fn type_a(rank: usize, representation: usize) -> Result<RootSystem> {
        if representation == 0 || representation > rank {
            bail!(TrivializationError::Configuration(format!(
                "A{} has no fundamental representation {}",
                rank, representation
            )));
        }
        let dim = rank + 1;
        let ffr_weights: Vec<Vec<f64>> = (0..dim).map(|i| unit_vector(dim, i, 1.0)).collect();

        let mut roots = Vec::new();
        let mut positive_roots = Vec::new();
        for i in 0..dim {
            for j in 0..dim {
                if i == j {
                    continue;
                }
                let root = difference(&ffr_weights[i], &ffr_weights[j]);
                if i < j {
                    positive_roots.push(root.clone());
                }
                roots.push(root);
            }
        }

        let subsets = k_subsets(dim, representation);
        let weight_coefficients: Vec<Vec<f64>> = subsets
            .iter()
            .map(|subset| {
                let mut row = vec![0.0; dim];
                for &i in subset {
                    row[i] = 1.0;
                }
                row
            })
            .collect();
        let weights = weight_coefficients.clone();
        let multiplicities = vec![1; weights.len()];

        Ok(RootSystem {
            algebra: AlgebraName {
                algebra_type: AlgebraType::A,
                rank,
            },
            fundamental_representation_index: representation,
            ffr_weights,
            weights,
            multiplicities,
            roots,
            positive_roots,
            weight_coefficients,
        })
    }

    /// `so(2n)` in the vector representation: `e_0 .. e_{n-1}` followed by
    /// `-e_0 .. -e_{n-1}`.
    fn type_d(rank: usize, representation: usize) -> Result<RootSystem> {
        if representation != 1 {
            bail!(TrivializationError::NotImplemented(format!(
                "built-in D{} data only covers the vector representation",
                rank
            )));
        }
        let ffr_weights: Vec<Vec<f64>> = [1.0, -1.0]
            .iter()
            .flat_map(|&sign| (0..rank).map(move |i| unit_vector(rank, i, sign)))
            .collect();

        let mut roots = Vec::new();
        let mut positive_roots = Vec::new();
        for i in 0..rank {
            for j in (i + 1)..rank {
                let minus = difference(&unit_vector(rank, i, 1.0), &unit_vector(rank, j, 1.0));
                let plus = difference(&unit_vector(rank, i, 1.0), &unit_vector(rank, j, -1.0));
                positive_roots.push(minus.clone());
                positive_roots.push(plus.clone());
                roots.push(minus.iter().map(|c| -c).collect());
                roots.push(plus.iter().map(|c| -c).collect());
                roots.push(minus);
                roots.push(plus);
            }
        }

        let n = ffr_weights.len();
        let weight_coefficients: Vec<Vec<f64>> =
            (0..n).map(|i| unit_vector(n, i, 1.0)).collect();

        Ok(RootSystem {
            algebra: AlgebraName {
                algebra_type: AlgebraType::D,
                rank,
            },
            fundamental_representation_index: 1,
            weights: ffr_weights.clone(),
            multiplicities: vec![1; n],
            ffr_weights,
            roots,
            positive_roots,
            weight_coefficients,
        })
    }
}

impl RootSystemProvider for ClassicalRootSystems {
    fn root_system(&self, algebra: &str, representation: usize) -> Result<RootSystem> {
        let name: AlgebraName = algebra.parse()?;
        let system = match name.algebra_type {
            AlgebraType::A => Self::type_a(name.rank, representation)?,
            AlgebraType::D => Self::type_d(name.rank, representation)?,
            AlgebraType::E => bail!(TrivializationError::NotImplemented(format!(
                "no built-in weight data for {}",
                name
            ))),
        };
        system.validate()?;
        Ok(system)
    }
}

/// All `k`-element subsets of `0..n` in lexicographic order.
fn k_subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut current = Vec::with_capacity(k);
    fn recurse(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            recurse(i + 1, n, k, current, out);
            current.pop();
        }
    }
    recurse(0, n, k, &mut current, &mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algebra_names() {
        let name: AlgebraName = "A2".parse().expect("A2");
        assert_eq!(name.algebra_type, AlgebraType::A);
        assert_eq!(name.rank, 2);
        assert_eq!(name.to_string(), "A2");

        let err = "Q3".parse::<AlgebraName>().expect_err("unknown family");
        assert!(format!("{err}").contains("unknown algebra"));
        let err = "Dx".parse::<AlgebraName>().expect_err("bad rank");
        assert!(format!("{err}").contains("malformed"));
        let err = "D1".parse::<AlgebraName>().expect_err("too small");
        assert!(format!("{err}").contains("not a valid algebra"));
    }

    #[test]
    fn type_a_first_representation() {
        let g = ClassicalRootSystems.root_system("A2", 1).expect("A2");
        assert_eq!(g.ffr_sheet_count(), 3);
        assert_eq!(g.sheet_count(), 3);
        assert_eq!(g.roots.len(), 6);
        assert_eq!(g.positive_roots.len(), 3);
        assert!(!g.allows_zero_sheet_pair());
        // w_1 - w_0 = e_1 - e_0 is a negative root.
        assert_eq!(g.match_positive_root(&[-1.0, 1.0, 0.0]), Some(0));
    }

    #[test]
    fn type_a_exterior_square() {
        let g = ClassicalRootSystems.root_system("A3", 2).expect("A3");
        assert_eq!(g.sheet_count(), 6);
        assert_eq!(g.weight_coefficients[0], vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(g.weight_coefficients[5], vec![0.0, 0.0, 1.0, 1.0]);
        let root = difference(&g.weights[1], &g.weights[0]);
        assert!(g.ordered_weight_pairs(&root, false).contains(&(0, 1)));
    }

    #[test]
    fn type_d_vector_representation() {
        let g = ClassicalRootSystems.root_system("D3", 1).expect("D3");
        assert_eq!(g.sheet_count(), 6);
        assert_eq!(g.positive_roots.len(), 6);
        assert_eq!(g.roots.len(), 12);
        assert!(g.allows_zero_sheet_pair());
        assert_eq!(g.ffr_weights[3], vec![-1.0, 0.0, 0.0]);
        // e_0 - (-e_0) = 2 e_0 is not a root of D.
        assert_eq!(g.match_positive_root(&[2.0, 0.0, 0.0]), None);

        let err = ClassicalRootSystems
            .root_system("D3", 2)
            .expect_err("spinor data missing");
        assert!(format!("{err}").contains("vector representation"));
    }

    #[test]
    fn e_type_requires_external_data() {
        let err = ClassicalRootSystems
            .root_system("E6", 1)
            .expect_err("no E data");
        assert!(matches!(
            TrivializationError::find(&err),
            Some(TrivializationError::NotImplemented(_))
        ));
    }

    #[test]
    fn validate_rejects_inconsistent_shapes() {
        let mut g = ClassicalRootSystems.root_system("A1", 1).expect("A1");
        g.multiplicities.pop();
        assert!(g.validate().is_err());
    }
}
