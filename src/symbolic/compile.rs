use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use super::expr::{Expr, Node, Symbol};
use super::matrix::SymMatrix;
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Const(f64),
    Arg(usize),
    Add,
    Mul,
    Pow(f64),
    Sin,
    Cos,
}

/// Maps each argument symbol to its positional index.
struct ArgIndex(HashMap<Symbol, usize>);

impl ArgIndex {
    fn new(args: &[Symbol]) -> Self {
        Self(args.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect())
    }

    fn lookup(&self, symbol: &Symbol) -> Result<usize, CompileError> {
        self.0
            .get(symbol)
            .copied()
            .ok_or_else(|| CompileError::UnboundSymbol(symbol.name().to_string()))
    }
}

/// Postfix instruction tape for a single expression.
#[derive(Debug, Clone)]
struct Tape {
    ops: Vec<Op>,
    max_depth: usize,
}

impl Tape {
    fn build(expr: &Expr, index: &ArgIndex) -> Result<Self, CompileError> {
        let mut tape = Tape {
            ops: Vec::new(),
            max_depth: 0,
        };
        tape.emit(expr, index, 0)?;
        Ok(tape)
    }

    fn emit(&mut self, expr: &Expr, index: &ArgIndex, depth: usize) -> Result<(), CompileError> {
        self.max_depth = self.max_depth.max(depth + 1);
        match expr.node() {
            Node::Constant(value) => self.ops.push(Op::Const(*value)),
            Node::Symbol(s) => self.ops.push(Op::Arg(index.lookup(s)?)),
            Node::Add(a, b) => {
                self.emit(a, index, depth)?;
                self.emit(b, index, depth + 1)?;
                self.ops.push(Op::Add);
            }
            Node::Mul(a, b) => {
                self.emit(a, index, depth)?;
                self.emit(b, index, depth + 1)?;
                self.ops.push(Op::Mul);
            }
            Node::Pow(base, exponent) => {
                self.emit(base, index, depth)?;
                self.ops.push(Op::Pow(*exponent));
            }
            Node::Sin(arg) => {
                self.emit(arg, index, depth)?;
                self.ops.push(Op::Sin);
            }
            Node::Cos(arg) => {
                self.emit(arg, index, depth)?;
                self.ops.push(Op::Cos);
            }
        }
        Ok(())
    }

    fn run(&self, args: &[f64], stack: &mut Vec<f64>) -> f64 {
        stack.clear();
        for op in &self.ops {
            match *op {
                Op::Const(value) => stack.push(value),
                Op::Arg(i) => stack.push(args[i]),
                Op::Add => {
                    let rhs = stack.pop().unwrap_or_default();
                    let lhs = stack.pop().unwrap_or_default();
                    stack.push(lhs + rhs);
                }
                Op::Mul => {
                    let rhs = stack.pop().unwrap_or_default();
                    let lhs = stack.pop().unwrap_or_default();
                    stack.push(lhs * rhs);
                }
                Op::Pow(exponent) => {
                    let base = stack.pop().unwrap_or_default();
                    stack.push(pow(base, exponent));
                }
                Op::Sin => {
                    let arg = stack.pop().unwrap_or_default();
                    stack.push(arg.sin());
                }
                Op::Cos => {
                    let arg = stack.pop().unwrap_or_default();
                    stack.push(arg.cos());
                }
            }
        }
        stack.pop().unwrap_or_default()
    }
}

fn pow(base: f64, exponent: f64) -> f64 {
    if exponent == -1.0 {
        base.recip()
    } else if exponent == 2.0 {
        base * base
    } else if exponent.fract() == 0.0 && exponent.abs() <= i32::MAX as f64 {
        base.powi(exponent as i32)
    } else {
        base.powf(exponent)
    }
}

/// Numeric function of positional arguments compiled from one expression.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    tape: Tape,
    arity: usize,
}

impl CompiledExpr {
    /// Compiles `expr` as a function of `args`, in that order.
    pub fn compile(expr: &Expr, args: &[Symbol]) -> Result<Self, CompileError> {
        let index = ArgIndex::new(args);
        Ok(Self {
            tape: Tape::build(expr, &index)?,
            arity: args.len(),
        })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[f64]) -> Result<f64, CompileError> {
        check_arity(self.arity, args)?;
        let mut stack = Vec::with_capacity(self.tape.max_depth);
        Ok(self.tape.run(args, &mut stack))
    }
}

/// Numeric matrix function compiled entry by entry from a [`SymMatrix`].
#[derive(Debug, Clone)]
pub struct CompiledMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<Tape>,
    arity: usize,
    max_depth: usize,
}

impl CompiledMatrix {
    pub fn compile(matrix: &SymMatrix, args: &[Symbol]) -> Result<Self, CompileError> {
        let index = ArgIndex::new(args);
        let entries = matrix
            .entries()
            .iter()
            .map(|e| Tape::build(e, &index))
            .collect::<Result<Vec<_>, _>>()?;
        let max_depth = entries.iter().map(|t| t.max_depth).max().unwrap_or(0);
        Ok(Self {
            rows: matrix.rows(),
            cols: matrix.cols(),
            entries,
            arity: args.len(),
            max_depth,
        })
    }

    /// Compiles a list of expressions as a column.
    pub fn compile_column(exprs: &[Expr], args: &[Symbol]) -> Result<Self, CompileError> {
        Self::compile(&SymMatrix::column(exprs.to_vec()), args)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    fn values(&self, args: &[f64]) -> Result<Vec<f64>, CompileError> {
        check_arity(self.arity, args)?;
        let mut stack = Vec::with_capacity(self.max_depth);
        Ok(self
            .entries
            .iter()
            .map(|tape| tape.run(args, &mut stack))
            .collect())
    }

    pub fn evaluate(&self, args: &[f64]) -> Result<DMatrix<f64>, CompileError> {
        let values = self.values(args)?;
        Ok(DMatrix::from_row_slice(self.rows, self.cols, &values))
    }

    /// Evaluates all entries, row-major, as one vector.
    pub fn evaluate_vector(&self, args: &[f64]) -> Result<DVector<f64>, CompileError> {
        Ok(DVector::from_vec(self.values(args)?))
    }
}

fn check_arity(expected: usize, args: &[f64]) -> Result<(), CompileError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CompileError::ArgumentCount {
            expected,
            found: args.len(),
        })
    }
}
