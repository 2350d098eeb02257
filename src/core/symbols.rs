use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ConfigError;
use crate::symbolic::{Expr, Symbol};

/// Model-owned table of named symbols.
///
/// Ids are unique within one table. Scratch symbols (used while inverting
/// matrices) take ids from the same counter but are never registered by name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_name: HashMap<String, Symbol>,
    order: Vec<Symbol>,
    next_id: AtomicU64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new named symbol. Names are unique per model.
    pub fn declare(&mut self, name: &str) -> Result<Symbol, ConfigError> {
        if self.by_name.contains_key(name) {
            return Err(ConfigError::DuplicateSymbol(name.to_string()));
        }
        let symbol = Symbol::new(self.allocate_id(), name);
        self.by_name.insert(name.to_string(), symbol.clone());
        self.order.push(symbol.clone());
        Ok(symbol)
    }

    /// Unregistered symbol with a unique id, for temporary substitutions.
    pub fn scratch(&self, name: &str) -> Symbol {
        Symbol::new(self.allocate_id(), name)
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name)
    }

    /// Declared symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Numeric values bound to constant symbols, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    entries: Vec<(Symbol, f64)>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, value: f64) {
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((symbol, value)),
        }
    }

    pub fn value(&self, symbol: &Symbol) -> Option<f64> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.entries.iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    /// Symbol → literal map for pre-substituting constants.
    pub fn substitutions(&self) -> HashMap<Symbol, Expr> {
        self.entries
            .iter()
            .map(|(s, v)| (s.clone(), Expr::constant(*v)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.entries.iter().map(|(s, v)| (s, *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
