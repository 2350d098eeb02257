use std::collections::HashMap;

use super::symbols::SymbolTable;
use crate::config::MAX_DERIVATIVE_ORDER;
use crate::error::ConfigError;
use crate::symbolic::{Expr, Symbol, Vector};

/// A differentiable quantity: its coordinate at each derivative order.
#[derive(Debug, Clone, PartialEq)]
pub struct Differentiable {
    chain: Vec<Symbol>,
}

impl Differentiable {
    /// Coordinate at `order`, if the chain reaches that far.
    pub fn get(&self, order: usize) -> Option<&Symbol> {
        self.chain.get(order)
    }

    pub fn expr(&self, order: usize) -> Option<Expr> {
        self.get(order).map(Symbol::expr)
    }

    pub fn max_order(&self) -> usize {
        self.chain.len() - 1
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.chain
    }

    /// `(position, velocity, acceleration)` for a full chain.
    pub fn triple(&self) -> Option<(Expr, Expr, Expr)> {
        Some((self.expr(0)?, self.expr(1)?, self.expr(2)?))
    }
}

/// Generalized coordinates grouped by derivative order, plus the
/// differentiation links between orders.
///
/// Declaration order is the state-vector layout and the Jacobian column order;
/// the registry is append-only.
#[derive(Debug, Clone, Default)]
pub struct CoordinateRegistry {
    by_order: [Vec<Symbol>; MAX_DERIVATIVE_ORDER + 1],
    orders: HashMap<Symbol, usize>,
    derivatives: HashMap<Symbol, Symbol>,
    antiderivatives: HashMap<Symbol, Symbol>,
    links: Vec<(Symbol, Symbol)>,
    anonymous: usize,
}

impl CoordinateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` with derivatives up to `max_order` (`name_d`, `name_dd`).
    ///
    /// With no name the registry picks `x0`, `x1`, ... The whole chain is
    /// created and linked, or nothing is.
    pub fn declare(
        &mut self,
        symbols: &mut SymbolTable,
        name: Option<&str>,
        max_order: usize,
    ) -> Result<Differentiable, ConfigError> {
        if max_order > MAX_DERIVATIVE_ORDER {
            return Err(ConfigError::OrderOutOfRange(max_order));
        }
        let base = match name {
            Some(name) => name.to_string(),
            None => self.next_anonymous_name(symbols),
        };
        let names: Vec<String> = (0..=max_order)
            .map(|order| format!("{base}{}", derivative_suffix(order)))
            .collect();
        if let Some(taken) = names.iter().find(|n| symbols.contains(n)) {
            return Err(ConfigError::DuplicateSymbol(taken.clone()));
        }

        let mut chain = Vec::with_capacity(names.len());
        for (order, name) in names.iter().enumerate() {
            let symbol = symbols.declare(name)?;
            self.register(symbol.clone(), order)?;
            chain.push(symbol);
        }
        for pair in chain.windows(2) {
            self.link_derivative(&pair[0], &pair[1])?;
        }
        log::trace!("declared coordinate `{base}` up to order {max_order}");
        Ok(Differentiable { chain })
    }

    fn next_anonymous_name(&mut self, symbols: &SymbolTable) -> String {
        loop {
            let candidate = format!("x{}", self.anonymous);
            self.anonymous += 1;
            if !symbols.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Appends an existing symbol to the coordinates of `order`.
    pub fn register(&mut self, symbol: Symbol, order: usize) -> Result<(), ConfigError> {
        if order > MAX_DERIVATIVE_ORDER {
            return Err(ConfigError::OrderOutOfRange(order));
        }
        if self.orders.contains_key(&symbol) {
            return Err(ConfigError::DuplicateSymbol(symbol.name().to_string()));
        }
        self.orders.insert(symbol.clone(), order);
        self.by_order[order].push(symbol);
        Ok(())
    }

    /// Records that `higher` is the time derivative of `lower`.
    pub fn link_derivative(&mut self, lower: &Symbol, higher: &Symbol) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidLink {
            lower: lower.name().to_string(),
            higher: higher.name().to_string(),
            reason,
        };
        let lower_order = *self
            .orders
            .get(lower)
            .ok_or_else(|| invalid("lower coordinate is not registered"))?;
        let higher_order = *self
            .orders
            .get(higher)
            .ok_or_else(|| invalid("higher coordinate is not registered"))?;
        if higher_order != lower_order + 1 {
            return Err(invalid("orders are not consecutive"));
        }
        if self.derivatives.contains_key(lower) {
            return Err(ConfigError::DerivativeAlreadyLinked(lower.name().to_string()));
        }
        if self.antiderivatives.contains_key(higher) {
            return Err(ConfigError::AntiderivativeAlreadyLinked(
                higher.name().to_string(),
            ));
        }
        self.derivatives.insert(lower.clone(), higher.clone());
        self.antiderivatives.insert(higher.clone(), lower.clone());
        self.links.push((lower.clone(), higher.clone()));
        Ok(())
    }

    /// Coordinates of one derivative order, in declaration order.
    pub fn coordinates(&self, order: usize) -> &[Symbol] {
        match self.by_order.get(order) {
            Some(coordinates) => coordinates,
            None => &[],
        }
    }

    pub fn order_of(&self, symbol: &Symbol) -> Option<usize> {
        self.orders.get(symbol).copied()
    }

    pub fn derivative_of(&self, symbol: &Symbol) -> Option<&Symbol> {
        self.derivatives.get(symbol)
    }

    pub fn antiderivative_of(&self, symbol: &Symbol) -> Option<&Symbol> {
        self.antiderivatives.get(symbol)
    }

    /// Positions followed by velocities: the integrator state layout.
    pub fn state_variables(&self) -> Vec<Symbol> {
        let mut state = self.coordinates(0).to_vec();
        state.extend_from_slice(self.coordinates(1));
        state
    }

    /// Velocities followed by accelerations: the layout of the state derivative.
    pub fn state_derivatives(&self) -> Vec<Symbol> {
        let mut state = self.coordinates(1).to_vec();
        state.extend_from_slice(self.coordinates(2));
        state
    }

    /// Total time derivative through the chain rule over every linked coordinate.
    pub fn time_derivative(&self, expr: &Expr) -> Expr {
        self.links
            .iter()
            .filter(|(lower, _)| expr.contains(lower))
            .map(|(lower, higher)| expr.diff(lower) * higher.expr())
            .sum()
    }

    pub fn time_derivative_vector(&self, v: &Vector) -> Vector {
        v.map(|c| self.time_derivative(c))
    }
}

fn derivative_suffix(order: usize) -> String {
    if order == 0 {
        String::new()
    } else {
        format!("_{}", "d".repeat(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaring_creates_linked_chain() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        let x = registry.declare(&mut symbols, Some("x"), 2).unwrap();
        let names: Vec<_> = x.symbols().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["x", "x_d", "x_dd"]);
        assert_eq!(registry.derivative_of(x.get(0).unwrap()), x.get(1));
        assert_eq!(registry.antiderivative_of(x.get(2).unwrap()), x.get(1));
    }

    #[test]
    fn anonymous_names_come_from_the_registry_counter() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        symbols.declare("x0").unwrap();
        let a = registry.declare(&mut symbols, None, 1).unwrap();
        assert_eq!(a.get(0).unwrap().name(), "x1");
        assert_eq!(a.get(1).unwrap().name(), "x1_d");
    }

    #[test]
    fn failed_declaration_leaves_registry_untouched() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        symbols.declare("q_dd").unwrap();
        assert!(registry.declare(&mut symbols, Some("q"), 2).is_err());
        assert!(registry.coordinates(0).is_empty());
        assert!(!symbols.contains("q"));
    }

    #[test]
    fn orders_above_acceleration_are_rejected() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        assert_eq!(
            registry.declare(&mut symbols, Some("q"), 3).unwrap_err(),
            ConfigError::OrderOutOfRange(3)
        );
    }

    #[test]
    fn double_link_is_rejected() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        let q = registry.declare(&mut symbols, Some("q"), 1).unwrap();
        let other = symbols.declare("w").unwrap();
        registry.register(other.clone(), 1).unwrap();
        assert_eq!(
            registry.link_derivative(q.get(0).unwrap(), &other).unwrap_err(),
            ConfigError::DerivativeAlreadyLinked("q".into())
        );
    }

    #[test]
    fn time_derivative_applies_chain_rule() {
        let mut symbols = SymbolTable::new();
        let mut registry = CoordinateRegistry::new();
        let (q, q_d, _) = registry
            .declare(&mut symbols, Some("q"), 2)
            .unwrap()
            .triple()
            .unwrap();
        let q_sym = q.as_symbol().unwrap().clone();
        let q_d_sym = q_d.as_symbol().unwrap().clone();
        let d = registry.time_derivative(&q.sin());
        let mut values = HashMap::new();
        values.insert(q_sym, 0.3);
        values.insert(q_d_sym, 2.0);
        let expected = 0.3_f64.cos() * 2.0;
        assert!((d.evaluate(&values).unwrap() - expected).abs() < 1e-12);
    }
}
