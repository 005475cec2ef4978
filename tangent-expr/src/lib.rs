//! Tangent Expr - Expression compiler
//!
//! Turns an infix string over one free variable into something that can be
//! evaluated many times as `f64`, differentiated symbolically and rendered
//! back to text. Compilation and evaluation never panic: failures surface
//! as `TangentError` values and NaN.

mod ast;
mod compile;
mod diff;
mod functions;
mod parser;
mod render;
mod simplify;

pub use ast::{BinOp, Expr, UnaryOp};
pub use compile::{BoundExpr, CompiledExpr, Univariate};
pub use diff::{derivative, derivative_text, differentiate};
pub use functions::{
    load_constants, load_standard_functions, standard_registry, ConstantDef, FunctionDef,
    FunctionMeta, FunctionRegistry, NativeFn,
};
pub use parser::{parse, parse_with, MAX_DEPTH};
pub use simplify::simplify;

/// Compile against the standard registry
pub fn compile(source: &str) -> CompiledExpr {
    CompiledExpr::compile(source)
}
