use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::expr::{Expr, Symbol};
use crate::error::{DynamicsError, Result};

/// Algorithm used for symbolic matrix inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InversionMethod {
    /// Gauss-Jordan elimination with structural (non-literal-zero) pivoting.
    GaussJordan,
    /// Transposed cofactor matrix over the determinant. Only practical for small systems.
    Adjugate,
}

/// Dense row-major matrix of expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct SymMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Expr>,
}

impl SymMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Expr::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, Expr::one());
        }
        m
    }

    /// Single-column matrix.
    pub fn column(entries: Vec<Expr>) -> Self {
        Self {
            rows: entries.len(),
            cols: 1,
            data: entries,
        }
    }

    /// `∂exprs[i] / ∂symbols[j]`.
    pub fn jacobian(exprs: &[Expr], symbols: &[Symbol]) -> Self {
        let mut m = Self::zeros(exprs.len(), symbols.len());
        for (i, expr) in exprs.iter().enumerate() {
            for (j, symbol) in symbols.iter().enumerate() {
                m.set(i, j, expr.diff(symbol));
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &Expr {
        &self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Expr) {
        self.data[row * self.cols + col] = value;
    }

    /// Entries in row-major order.
    pub fn entries(&self) -> &[Expr] {
        &self.data
    }

    pub fn into_entries(self) -> Vec<Expr> {
        self.data
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn subs(&self, map: &HashMap<Symbol, Expr>) -> Self {
        self.map(|e| e.subs(map))
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.set(c, r, self.get(r, c).clone());
            }
        }
        t
    }

    /// Copies `block` into this matrix with its top-left corner at `(row, col)`.
    pub fn set_block(&mut self, row: usize, col: usize, block: &SymMatrix) {
        for r in 0..block.rows {
            for c in 0..block.cols {
                self.set(row + r, col + c, block.get(r, c).clone());
            }
        }
    }

    /// Rows `start..end` as a new matrix.
    pub fn row_range(&self, start: usize, end: usize) -> Self {
        Self {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }

    pub fn mul(&self, rhs: &SymMatrix) -> Result<Self> {
        if self.cols != rhs.rows {
            return Err(DynamicsError::DimensionMismatch {
                expected: self.cols,
                found: rhs.rows,
            });
        }
        let mut out = Self::zeros(self.rows, rhs.cols);
        for r in 0..self.rows {
            for c in 0..rhs.cols {
                let entry: Expr = (0..self.cols)
                    .map(|k| self.get(r, k) * rhs.get(k, c))
                    .sum();
                out.set(r, c, entry);
            }
        }
        Ok(out)
    }

    pub fn inverse(&self, method: InversionMethod) -> Result<Self> {
        if !self.is_square() {
            return Err(DynamicsError::DimensionMismatch {
                expected: self.rows,
                found: self.cols,
            });
        }
        match method {
            InversionMethod::GaussJordan => self.gauss_jordan_inverse(),
            InversionMethod::Adjugate => self.adjugate_inverse(),
        }
    }

    fn singular(&self) -> DynamicsError {
        DynamicsError::SingularSystem {
            size: self.rows,
            origin: "symbolic inversion",
        }
    }

    fn gauss_jordan_inverse(&self) -> Result<Self> {
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            let pivot_row = (col..n)
                .find(|&r| !a.get(r, col).is_zero())
                .ok_or_else(|| self.singular())?;
            if pivot_row != col {
                a.swap_rows(pivot_row, col);
                inv.swap_rows(pivot_row, col);
            }

            let pivot_inv = a.get(col, col).recip();
            for j in 0..n {
                let scaled_a = a.get(col, j) * &pivot_inv;
                a.set(col, j, scaled_a);
                let scaled_inv = inv.get(col, j) * &pivot_inv;
                inv.set(col, j, scaled_inv);
            }
            a.set(col, col, Expr::one());

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a.get(r, col).clone();
                if factor.is_zero() {
                    continue;
                }
                for j in 0..n {
                    let reduced_a = a.get(r, j) - &(&factor * a.get(col, j));
                    a.set(r, j, reduced_a);
                    let reduced_inv = inv.get(r, j) - &(&factor * inv.get(col, j));
                    inv.set(r, j, reduced_inv);
                }
                a.set(r, col, Expr::zero());
            }
        }
        Ok(inv)
    }

    fn adjugate_inverse(&self) -> Result<Self> {
        let det = self.determinant();
        if det.is_zero() {
            return Err(self.singular());
        }
        let n = self.rows;
        if n == 1 {
            return Ok(Self::column(vec![det.recip()]));
        }
        let det_inv = det.recip();
        let mut inv = Self::zeros(n, n);
        for r in 0..n {
            for c in 0..n {
                let minor = self.minor(r, c).determinant();
                let sign = if (r + c) % 2 == 0 { 1.0 } else { -1.0 };
                inv.set(c, r, Expr::scaled(sign, &minor) * &det_inv);
            }
        }
        Ok(inv)
    }

    /// Cofactor expansion along the first row, skipping literal zeros.
    pub fn determinant(&self) -> Expr {
        match self.rows {
            0 => Expr::one(),
            1 => self.get(0, 0).clone(),
            2 => self.get(0, 0) * self.get(1, 1) - self.get(0, 1) * self.get(1, 0),
            n => (0..n)
                .filter(|&c| !self.get(0, c).is_zero())
                .map(|c| {
                    let sign = if c % 2 == 0 { 1.0 } else { -1.0 };
                    Expr::scaled(sign, &(self.get(0, c) * self.minor(0, c).determinant()))
                })
                .sum(),
        }
    }

    fn minor(&self, skip_row: usize, skip_col: usize) -> Self {
        let mut data = Vec::with_capacity((self.rows - 1) * (self.cols - 1));
        for r in (0..self.rows).filter(|&r| r != skip_row) {
            for c in (0..self.cols).filter(|&c| c != skip_col) {
                data.push(self.get(r, c).clone());
            }
        }
        Self {
            rows: self.rows - 1,
            cols: self.cols - 1,
            data,
        }
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }
}
