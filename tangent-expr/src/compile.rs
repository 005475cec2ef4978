//! Compiled numeric expressions
//!
//! `compile` never fails: a bad expression yields a `CompiledExpr` whose
//! `error()` is set and whose evaluation is always NaN.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::functions::{FunctionRegistry, NativeFn};
use crate::parser;
use std::collections::HashMap;
use tangent_core::TangentError;

/// Tree with functions and constants resolved to native values
#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    /// Bound variable, falling back to a named constant when unbound
    Var(String, Option<f64>),
    Binary(Box<Node>, BinOp, Box<Node>),
    Neg(Box<Node>),
    Call(NativeFn, Vec<Node>),
}

impl Node {
    fn resolve(expr: &Expr, registry: &FunctionRegistry) -> Result<Node, TangentError> {
        Ok(match expr {
            Expr::Number(n) => Node::Const(*n),
            Expr::Variable(name) => {
                Node::Var(name.clone(), registry.get_constant(name).map(|c| c.value))
            }
            Expr::BinaryOp(l, op, r) => Node::Binary(
                Box::new(Node::resolve(l, registry)?),
                *op,
                Box::new(Node::resolve(r, registry)?),
            ),
            Expr::UnaryOp(UnaryOp::Neg, inner) => Node::Neg(Box::new(Node::resolve(inner, registry)?)),
            Expr::FunctionCall(name, args) => {
                let def = registry.resolve(name, args.len())?;
                let args = args
                    .iter()
                    .map(|a| Node::resolve(a, registry))
                    .collect::<Result<Vec<_>, _>>()?;
                Node::Call(def.eval, args)
            }
        })
    }

    fn eval(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> f64 {
        match self {
            Node::Const(n) => *n,
            Node::Var(name, constant) => lookup(name).or(*constant).unwrap_or(f64::NAN),
            Node::Binary(l, op, r) => {
                let l = l.eval(lookup);
                let r = r.eval(lookup);
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                }
            }
            Node::Neg(inner) => -inner.eval(lookup),
            Node::Call(f, args) => {
                let values: Vec<f64> = args.iter().map(|a| a.eval(lookup)).collect();
                f(&values)
            }
        }
    }
}

/// An expression compiled once and evaluated many times
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    node: Option<Expr>,
    program: Option<Node>,
    error: Option<TangentError>,
}

impl CompiledExpr {
    /// Compile against the standard registry
    pub fn compile(source: &str) -> Self {
        Self::compile_with(source, FunctionRegistry::standard())
    }

    pub fn compile_with(source: &str, registry: &FunctionRegistry) -> Self {
        match parser::parse_with(source, registry) {
            Ok(expr) => Self::build(source.to_string(), expr, registry),
            Err(error) => Self { source: source.to_string(), node: None, program: None, error: Some(error) },
        }
    }

    /// Compile an already built tree
    pub fn from_node(expr: Expr) -> Self {
        Self::build(expr.to_string(), expr, FunctionRegistry::standard())
    }

    fn build(source: String, expr: Expr, registry: &FunctionRegistry) -> Self {
        match Node::resolve(&expr, registry) {
            Ok(program) => Self { source, node: Some(expr), program: Some(program), error: None },
            Err(error) => Self {
                error: Some(error.with_expression(source.clone())),
                source,
                node: Some(expr),
                program: None,
            },
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self) -> Option<&Expr> {
        self.node.as_ref()
    }

    pub fn error(&self) -> Option<&TangentError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Evaluate with named bindings. NaN when anything is undefined.
    pub fn evaluate(&self, bindings: &HashMap<String, f64>) -> f64 {
        match &self.program {
            Some(program) => program.eval(&|name| bindings.get(name).copied()),
            None => f64::NAN,
        }
    }

    /// Evaluate with a single variable bound
    pub fn eval_at(&self, var: &str, x: f64) -> f64 {
        match &self.program {
            Some(program) => program.eval(&|name| (name == var).then_some(x)),
            None => f64::NAN,
        }
    }

    /// View as a function of one variable
    pub fn bind<'a>(&'a self, var: &'a str) -> BoundExpr<'a> {
        BoundExpr { expr: self, var }
    }
}

/// A real function of one real variable
pub trait Univariate {
    fn at(&self, x: f64) -> f64;
}

impl<F: Fn(f64) -> f64> Univariate for F {
    fn at(&self, x: f64) -> f64 {
        self(x)
    }
}

/// A compiled expression with its free variable chosen
#[derive(Debug, Clone, Copy)]
pub struct BoundExpr<'a> {
    expr: &'a CompiledExpr,
    var: &'a str,
}

impl Univariate for BoundExpr<'_> {
    fn at(&self, x: f64) -> f64 {
        self.expr.eval_at(self.var, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangent_core::codes;

    #[test]
    fn test_eval_polynomial() {
        let e = CompiledExpr::compile("3x^2 + 2x + 1");
        assert!(e.is_ok());
        assert_eq!(e.eval_at("x", 2.0), 17.0);
    }

    #[test]
    fn test_eval_with_bindings() {
        let e = CompiledExpr::compile("a * x");
        let mut bindings = HashMap::new();
        bindings.insert("a".to_string(), 4.0);
        bindings.insert("x".to_string(), 2.5);
        assert_eq!(e.evaluate(&bindings), 10.0);
    }

    #[test]
    fn test_constants_resolve() {
        let e = CompiledExpr::compile("sin(pi/2) + ln(e)");
        assert!((e.eval_at("x", 0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_variable_is_nan() {
        let e = CompiledExpr::compile("y + 1");
        assert!(e.eval_at("x", 1.0).is_nan());
    }

    #[test]
    fn test_domain_errors_follow_ieee() {
        let e = CompiledExpr::compile("1/x");
        assert_eq!(e.eval_at("x", 0.0), f64::INFINITY);
        assert!(CompiledExpr::compile("sqrt(x)").eval_at("x", -1.0).is_nan());
        assert!(CompiledExpr::compile("log(x)").eval_at("x", 0.0).is_infinite());
    }

    #[test]
    fn test_bad_expression_never_panics() {
        let e = CompiledExpr::compile("sin(");
        assert!(!e.is_ok());
        assert!(e.error().unwrap().is(codes::PARSE_ERROR));
        assert!(e.node().is_none());
        assert!(e.eval_at("x", 1.0).is_nan());
        assert!(e.evaluate(&HashMap::new()).is_nan());
    }

    #[test]
    fn test_deeply_nested_source_is_rejected() {
        let e = CompiledExpr::compile(&format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000)));
        assert!(e.error().unwrap().is(codes::PARSE_ERROR));
        assert!(e.eval_at("x", 1.0).is_nan());
    }

    #[test]
    fn test_bound_expr_is_univariate() {
        let e = CompiledExpr::compile("x^3");
        let f = e.bind("x");
        assert_eq!(f.at(2.0), 8.0);

        let g = |x: f64| x + 1.0;
        assert_eq!(g.at(1.0), 2.0);
    }

    #[test]
    fn test_from_node_renders_source() {
        let e = CompiledExpr::from_node(Expr::mul(Expr::num(2.0), Expr::var("x")));
        assert_eq!(e.source(), "2 * x");
        assert_eq!(e.eval_at("x", 4.0), 8.0);
    }
}
