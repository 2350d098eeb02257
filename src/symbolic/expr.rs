use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::CompileError;

/// Identity of a named scalar in symbolic expressions.
///
/// Equality, hashing and ordering use the numeric id handed out by the
/// owning [`SymbolTable`](crate::core::symbols::SymbolTable); the name is only
/// used for display and lookup.
#[derive(Debug, Clone)]
pub struct Symbol {
    id: u64,
    name: Arc<str>,
}

impl Symbol {
    pub(crate) fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: Arc::from(name),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expression consisting of this symbol alone.
    pub fn expr(&self) -> Expr {
        Expr::symbol(self)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Constant(f64),
    Symbol(Symbol),
    Add(Expr, Expr),
    /// Products keep a constant factor, when present, on the left.
    Mul(Expr, Expr),
    Pow(Expr, f64),
    Sin(Expr),
    Cos(Expr),
}

/// Immutable scalar expression tree, cheap to clone.
///
/// Constructors fold constants and drop neutral elements, so structurally
/// zero entries of a Jacobian come out as the literal `0`.
#[derive(Clone)]
pub struct Expr(Arc<Node>);

impl Expr {
    fn from_node(node: Node) -> Self {
        Expr(Arc::new(node))
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    pub fn constant(value: f64) -> Self {
        Self::from_node(Node::Constant(value))
    }

    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    pub fn one() -> Self {
        Self::constant(1.0)
    }

    pub fn symbol(symbol: &Symbol) -> Self {
        Self::from_node(Node::Symbol(symbol.clone()))
    }

    pub fn as_constant(&self) -> Option<f64> {
        match *self.0 {
            Node::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &*self.0 {
            Node::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_constant() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_constant() == Some(1.0)
    }

    pub fn sum(a: &Expr, b: &Expr) -> Expr {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::constant(x + y),
            (Some(x), _) if x == 0.0 => b.clone(),
            (_, Some(y)) if y == 0.0 => a.clone(),
            _ => Self::from_node(Node::Add(a.clone(), b.clone())),
        }
    }

    pub fn product(a: &Expr, b: &Expr) -> Expr {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::constant(x * y),
            (Some(x), _) => Self::scaled(x, b),
            (_, Some(y)) => Self::scaled(y, a),
            _ => Self::from_node(Node::Mul(a.clone(), b.clone())),
        }
    }

    pub fn difference(a: &Expr, b: &Expr) -> Expr {
        Self::sum(a, &Self::scaled(-1.0, b))
    }

    pub fn quotient(a: &Expr, b: &Expr) -> Expr {
        match b.as_constant() {
            Some(divisor) => Self::scaled(1.0 / divisor, a),
            None => Self::product(a, &b.recip()),
        }
    }

    /// `factor * expr`, merging nested constant factors.
    pub fn scaled(factor: f64, expr: &Expr) -> Expr {
        if factor == 0.0 {
            return Expr::zero();
        }
        if factor == 1.0 {
            return expr.clone();
        }
        match expr.node() {
            Node::Constant(value) => Expr::constant(factor * value),
            Node::Mul(lhs, rhs) => match lhs.as_constant() {
                Some(inner) => Self::scaled(factor * inner, rhs),
                None => Self::from_node(Node::Mul(Expr::constant(factor), expr.clone())),
            },
            _ => Self::from_node(Node::Mul(Expr::constant(factor), expr.clone())),
        }
    }

    pub fn powf(&self, exponent: f64) -> Expr {
        if exponent == 0.0 {
            return Expr::one();
        }
        if exponent == 1.0 {
            return self.clone();
        }
        match self.as_constant() {
            Some(value) => Expr::constant(value.powf(exponent)),
            None => Self::from_node(Node::Pow(self.clone(), exponent)),
        }
    }

    pub fn powi(&self, exponent: i32) -> Expr {
        self.powf(f64::from(exponent))
    }

    pub fn sqrt(&self) -> Expr {
        self.powf(0.5)
    }

    pub fn recip(&self) -> Expr {
        self.powf(-1.0)
    }

    pub fn sin(&self) -> Expr {
        match self.as_constant() {
            Some(value) => Expr::constant(value.sin()),
            None => Self::from_node(Node::Sin(self.clone())),
        }
    }

    pub fn cos(&self) -> Expr {
        match self.as_constant() {
            Some(value) => Expr::constant(value.cos()),
            None => Self::from_node(Node::Cos(self.clone())),
        }
    }

    /// Partial derivative with respect to `symbol`, every other symbol held fixed.
    pub fn diff(&self, symbol: &Symbol) -> Expr {
        match self.node() {
            Node::Constant(_) => Expr::zero(),
            Node::Symbol(s) => {
                if s == symbol {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Node::Add(a, b) => Expr::sum(&a.diff(symbol), &b.diff(symbol)),
            Node::Mul(a, b) => Expr::sum(
                &Expr::product(&a.diff(symbol), b),
                &Expr::product(a, &b.diff(symbol)),
            ),
            Node::Pow(base, exponent) => {
                let inner = base.diff(symbol);
                if inner.is_zero() {
                    return Expr::zero();
                }
                Expr::product(
                    &Expr::scaled(*exponent, &base.powf(exponent - 1.0)),
                    &inner,
                )
            }
            Node::Sin(arg) => Expr::product(&arg.cos(), &arg.diff(symbol)),
            Node::Cos(arg) => Expr::scaled(-1.0, &Expr::product(&arg.sin(), &arg.diff(symbol))),
        }
    }

    /// Simultaneous substitution of symbols by expressions.
    pub fn subs(&self, map: &HashMap<Symbol, Expr>) -> Expr {
        if map.is_empty() {
            return self.clone();
        }
        match self.node() {
            Node::Constant(_) => self.clone(),
            Node::Symbol(s) => map.get(s).cloned().unwrap_or_else(|| self.clone()),
            Node::Add(a, b) => Expr::sum(&a.subs(map), &b.subs(map)),
            Node::Mul(a, b) => Expr::product(&a.subs(map), &b.subs(map)),
            Node::Pow(base, exponent) => base.subs(map).powf(*exponent),
            Node::Sin(arg) => arg.subs(map).sin(),
            Node::Cos(arg) => arg.subs(map).cos(),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self.node() {
            Node::Constant(_) => {}
            Node::Symbol(s) => {
                out.insert(s.clone());
            }
            Node::Add(a, b) | Node::Mul(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Node::Pow(arg, _) | Node::Sin(arg) | Node::Cos(arg) => arg.collect_symbols(out),
        }
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        match self.node() {
            Node::Constant(_) => false,
            Node::Symbol(s) => s == symbol,
            Node::Add(a, b) | Node::Mul(a, b) => a.contains(symbol) || b.contains(symbol),
            Node::Pow(arg, _) | Node::Sin(arg) | Node::Cos(arg) => arg.contains(symbol),
        }
    }

    /// Direct tree-walking evaluation; compile with
    /// [`CompiledExpr`](super::CompiledExpr) for repeated calls.
    pub fn evaluate(&self, values: &HashMap<Symbol, f64>) -> Result<f64, CompileError> {
        Ok(match self.node() {
            Node::Constant(value) => *value,
            Node::Symbol(s) => *values
                .get(s)
                .ok_or_else(|| CompileError::UnboundSymbol(s.name().to_string()))?,
            Node::Add(a, b) => a.evaluate(values)? + b.evaluate(values)?,
            Node::Mul(a, b) => a.evaluate(values)? * b.evaluate(values)?,
            Node::Pow(base, exponent) => base.evaluate(values)?.powf(*exponent),
            Node::Sin(arg) => arg.evaluate(values)?.sin(),
            Node::Cos(arg) => arg.evaluate(values)?.cos(),
        })
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::zero()
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl From<&Symbol> for Expr {
    fn from(symbol: &Symbol) -> Self {
        Expr::symbol(symbol)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Constant(value) => write!(f, "{value}"),
            Node::Symbol(s) => write!(f, "{s}"),
            Node::Add(a, b) => write!(f, "({a} + {b})"),
            Node::Mul(a, b) => write!(f, "{a}*{b}"),
            Node::Pow(base, exponent) => match base.node() {
                Node::Constant(_) | Node::Symbol(_) => write!(f, "{base}^{exponent}"),
                _ => write!(f, "({base})^{exponent}"),
            },
            Node::Sin(arg) => write!(f, "sin({arg})"),
            Node::Cos(arg) => write!(f, "cos({arg})"),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

macro_rules! impl_binary_op {
    ($op:ident, $method:ident, $combine:path) => {
        impl std::ops::$op<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $combine(&self, &rhs)
            }
        }

        impl std::ops::$op<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $combine(&self, rhs)
            }
        }

        impl std::ops::$op<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $combine(self, &rhs)
            }
        }

        impl std::ops::$op<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $combine(self, rhs)
            }
        }

        impl std::ops::$op<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $combine(&self, &Expr::constant(rhs))
            }
        }

        impl std::ops::$op<f64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $combine(self, &Expr::constant(rhs))
            }
        }

        impl std::ops::$op<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $combine(&Expr::constant(self), &rhs)
            }
        }

        impl std::ops::$op<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $combine(&Expr::constant(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, Expr::sum);
impl_binary_op!(Sub, sub, Expr::difference);
impl_binary_op!(Mul, mul, Expr::product);
impl_binary_op!(Div, div, Expr::quotient);

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::scaled(-1.0, &self)
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::scaled(-1.0, self)
    }
}

impl std::ops::AddAssign<Expr> for Expr {
    fn add_assign(&mut self, rhs: Expr) {
        *self = Expr::sum(self, &rhs);
    }
}

impl std::ops::AddAssign<&Expr> for Expr {
    fn add_assign(&mut self, rhs: &Expr) {
        *self = Expr::sum(self, rhs);
    }
}

impl std::ops::SubAssign<Expr> for Expr {
    fn sub_assign(&mut self, rhs: Expr) {
        *self = Expr::difference(self, &rhs);
    }
}

impl std::iter::Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        iter.fold(Expr::zero(), |acc, item| Expr::sum(&acc, &item))
    }
}

impl<'a> std::iter::Sum<&'a Expr> for Expr {
    fn sum<I: Iterator<Item = &'a Expr>>(iter: I) -> Expr {
        iter.fold(Expr::zero(), |acc, item| Expr::sum(&acc, item))
    }
}
