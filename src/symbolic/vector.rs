use std::collections::HashMap;

use glam::{DMat3, DVec3};

use super::expr::{Expr, Symbol};

/// Three-component symbolic vector expressed in the Newtonian basis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector {
    pub x: Expr,
    pub y: Expr,
    pub z: Expr,
}

impl Vector {
    pub fn new(x: Expr, y: Expr, z: Expr) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Lifts a numeric vector into literal expressions.
    pub fn from_dvec3(v: DVec3) -> Self {
        Self::new(
            Expr::constant(v.x),
            Expr::constant(v.y),
            Expr::constant(v.z),
        )
    }

    /// `direction * magnitude`, e.g. `Vector::along(DVec3::NEG_Y, &g)`.
    pub fn along(direction: DVec3, magnitude: &Expr) -> Self {
        Self::from_dvec3(direction).scale(magnitude)
    }

    pub fn components(&self) -> [&Expr; 3] {
        [&self.x, &self.y, &self.z]
    }

    pub fn map(&self, mut f: impl FnMut(&Expr) -> Expr) -> Self {
        Self::new(f(&self.x), f(&self.y), f(&self.z))
    }

    pub fn dot(&self, other: &Vector) -> Expr {
        &self.x * &other.x + &self.y * &other.y + &self.z * &other.z
    }

    pub fn cross(&self, other: &Vector) -> Vector {
        Vector::new(
            &self.y * &other.z - &self.z * &other.y,
            &self.z * &other.x - &self.x * &other.z,
            &self.x * &other.y - &self.y * &other.x,
        )
    }

    pub fn scale(&self, factor: &Expr) -> Vector {
        self.map(|c| c * factor)
    }

    pub fn length_squared(&self) -> Expr {
        self.dot(self)
    }

    /// Component-wise partial derivative.
    pub fn diff(&self, symbol: &Symbol) -> Vector {
        self.map(|c| c.diff(symbol))
    }

    pub fn subs(&self, map: &HashMap<Symbol, Expr>) -> Vector {
        self.map(|c| c.subs(map))
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero() && self.z.is_zero()
    }
}

impl std::ops::Add for &Vector {
    type Output = Vector;
    fn add(self, rhs: &Vector) -> Vector {
        Vector::new(&self.x + &rhs.x, &self.y + &rhs.y, &self.z + &rhs.z)
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        &self + &rhs
    }
}

impl std::ops::Sub for &Vector {
    type Output = Vector;
    fn sub(self, rhs: &Vector) -> Vector {
        Vector::new(&self.x - &rhs.x, &self.y - &rhs.y, &self.z - &rhs.z)
    }
}

impl std::ops::Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        &self - &rhs
    }
}

impl std::ops::Neg for &Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        self.map(|c| -c)
    }
}

impl std::ops::Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        -&self
    }
}

impl std::ops::Mul<&Expr> for &Vector {
    type Output = Vector;
    fn mul(self, rhs: &Expr) -> Vector {
        self.scale(rhs)
    }
}

impl std::ops::Mul<Expr> for Vector {
    type Output = Vector;
    fn mul(self, rhs: Expr) -> Vector {
        self.scale(&rhs)
    }
}

impl std::ops::Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        self.map(|c| Expr::scaled(rhs, c))
    }
}

/// Symbolic 3x3 operator, used for inertia about a center of mass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dyadic {
    rows: [[Expr; 3]; 3],
}

impl Dyadic {
    pub fn from_rows(rows: [[Expr; 3]; 3]) -> Self {
        Self { rows }
    }

    pub fn diagonal(xx: Expr, yy: Expr, zz: Expr) -> Self {
        let mut dyadic = Self::default();
        dyadic.rows[0][0] = xx;
        dyadic.rows[1][1] = yy;
        dyadic.rows[2][2] = zz;
        dyadic
    }

    /// Lifts a numeric matrix into literal expressions.
    pub fn from_dmat3(m: DMat3) -> Self {
        let row = |i: usize| {
            let r = m.row(i);
            [
                Expr::constant(r.x),
                Expr::constant(r.y),
                Expr::constant(r.z),
            ]
        };
        Self::from_rows([row(0), row(1), row(2)])
    }

    pub fn get(&self, row: usize, col: usize) -> &Expr {
        &self.rows[row][col]
    }

    pub fn scale(&self, factor: &Expr) -> Self {
        let mut out = self.clone();
        for row in out.rows.iter_mut() {
            for entry in row.iter_mut() {
                *entry = &*entry * factor;
            }
        }
        out
    }

    /// Right dot product `D · v`.
    pub fn dot(&self, v: &Vector) -> Vector {
        let row = |r: &[Expr; 3]| &r[0] * &v.x + &r[1] * &v.y + &r[2] * &v.z;
        Vector::new(row(&self.rows[0]), row(&self.rows[1]), row(&self.rows[2]))
    }
}
