//! Error types for model description, compilation and numeric evaluation.
//!
//! Three kinds of failure exist, matching where they are detected:
//! [`ConfigError`] while the model is described or assembled, [`CompileError`]
//! when a symbolic expression is turned into a numeric function, and the
//! per-step [`DynamicsError::SingularSystem`] raised by the evaluator.

use thiserror::Error;

/// Problems with the model description, detected before integration starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A symbol with this name already exists in the model.
    #[error("symbol `{0}` is already declared")]
    DuplicateSymbol(String),

    /// Coordinates only exist for position, velocity and acceleration.
    #[error("derivative order {0} is out of range (maximum is 2)")]
    OrderOutOfRange(usize),

    /// A coordinate can be differentiated into exactly one other coordinate.
    #[error("coordinate `{0}` already has a registered derivative")]
    DerivativeAlreadyLinked(String),

    /// A coordinate can be the derivative of exactly one other coordinate.
    #[error("coordinate `{0}` is already the derivative of another coordinate")]
    AntiderivativeAlreadyLinked(String),

    /// Derivative links must connect a registered coordinate to one of the next order.
    #[error("cannot link `{lower}` to `{higher}`: {reason}")]
    InvalidLink {
        lower: String,
        higher: String,
        reason: &'static str,
    },

    /// Two collections that must line up element by element do not.
    #[error("expected {expected} {what}, found {found}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The model declares no generalized velocities to project onto.
    #[error("the model declares no generalized velocities")]
    NoCoordinates,

    /// Pre-inverted systems are fixed at assembly time and cannot toggle rows.
    #[error("constraint {index} has a state-dependent activity predicate, which a pre-inverted system cannot honor")]
    DynamicActivityNotSupported { index: usize },

    /// An initial state was requested without a value for this coordinate.
    #[error("no initial value given for state variable `{0}`")]
    MissingInitialValue(String),
}

/// Failures while compiling or calling a compiled numeric function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The expression references a symbol that is not a function argument.
    #[error("symbol `{0}` is not among the function arguments")]
    UnboundSymbol(String),

    /// A compiled function was called with the wrong number of arguments.
    #[error("expected {expected} arguments, got {found}")]
    ArgumentCount { expected: usize, found: usize },
}

/// Top-level error returned by assembly and evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("compilation error: {0}")]
    Compile(#[from] CompileError),

    /// The assembled (or active-subset) matrix cannot be inverted.
    #[error("{size}x{size} system is singular ({origin})")]
    SingularSystem { size: usize, origin: &'static str },

    /// A numeric buffer does not match the layout the model expects.
    #[error("dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Convenient Result alias for dynamics operations.
pub type Result<T> = std::result::Result<T, DynamicsError>;
