//! Symbolic differentiation
//!
//! Returns `None` when the tree uses a function without a local rule
//! (`floor`, `ceil`, `sign`) on a subexpression that depends on the
//! variable.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::compile::CompiledExpr;
use crate::parser;
use crate::simplify::simplify;

/// Differentiate `expr` with respect to `var` (unsimplified)
pub fn differentiate(expr: &Expr, var: &str) -> Option<Expr> {
    if !expr.depends_on(var) {
        return Some(Expr::num(0.0));
    }

    match expr {
        Expr::Number(_) => Some(Expr::num(0.0)),
        Expr::Variable(name) => Some(Expr::num(if name == var { 1.0 } else { 0.0 })),
        Expr::UnaryOp(UnaryOp::Neg, inner) => Some(Expr::neg(differentiate(inner, var)?)),
        Expr::BinaryOp(l, op, r) => {
            let (u, v) = (l.as_ref(), r.as_ref());
            match op {
                BinOp::Add => Some(Expr::add(differentiate(u, var)?, differentiate(v, var)?)),
                BinOp::Sub => Some(Expr::sub(differentiate(u, var)?, differentiate(v, var)?)),
                BinOp::Mul => {
                    let du = differentiate(u, var)?;
                    let dv = differentiate(v, var)?;
                    Some(Expr::add(Expr::mul(du, v.clone()), Expr::mul(u.clone(), dv)))
                }
                BinOp::Div => {
                    let du = differentiate(u, var)?;
                    let dv = differentiate(v, var)?;
                    Some(Expr::div(
                        Expr::sub(Expr::mul(du, v.clone()), Expr::mul(u.clone(), dv)),
                        Expr::pow(v.clone(), Expr::num(2.0)),
                    ))
                }
                BinOp::Pow => power_rule(u, v, var),
            }
        }
        Expr::FunctionCall(name, args) => match args.as_slice() {
            [u] => {
                let outer = outer_derivative(name, u)?;
                let du = differentiate(u, var)?;
                Some(Expr::mul(outer, du))
            }
            // log(u, b) = ln(u) / ln(b)
            [u, base] if name == "log" => {
                let rewritten = Expr::div(Expr::call("ln", u.clone()), Expr::call("ln", base.clone()));
                differentiate(&rewritten, var)
            }
            _ => None,
        },
    }
}

fn power_rule(u: &Expr, v: &Expr, var: &str) -> Option<Expr> {
    let u_var = u.depends_on(var);
    let v_var = v.depends_on(var);

    if !v_var {
        // d(u^n) = n * u^(n-1) * u'
        let du = differentiate(u, var)?;
        return Some(Expr::mul(
            Expr::mul(v.clone(), Expr::pow(u.clone(), Expr::sub(v.clone(), Expr::num(1.0)))),
            du,
        ));
    }

    let dv = differentiate(v, var)?;
    let power = Expr::pow(u.clone(), v.clone());
    if !u_var {
        // d(c^v) = c^v * ln(c) * v'
        return Some(Expr::mul(Expr::mul(power, Expr::call("ln", u.clone())), dv));
    }

    // d(u^v) = u^v * (v' * ln(u) + v * u' / u)
    let du = differentiate(u, var)?;
    Some(Expr::mul(
        power,
        Expr::add(
            Expr::mul(dv, Expr::call("ln", u.clone())),
            Expr::div(Expr::mul(v.clone(), du), u.clone()),
        ),
    ))
}

/// f'(u) for a unary function f
fn outer_derivative(name: &str, u: &Expr) -> Option<Expr> {
    let u = || u.clone();
    let one = || Expr::num(1.0);
    let two = || Expr::num(2.0);
    let squared = |e: Expr| Expr::pow(e, two());

    Some(match name {
        "sin" => Expr::call("cos", u()),
        "cos" => Expr::neg(Expr::call("sin", u())),
        "tan" => Expr::div(one(), squared(Expr::call("cos", u()))),
        "sec" => Expr::mul(Expr::call("sec", u()), Expr::call("tan", u())),
        "csc" => Expr::neg(Expr::mul(Expr::call("csc", u()), Expr::call("cot", u()))),
        "cot" => Expr::neg(squared(Expr::call("csc", u()))),
        "asin" => Expr::div(one(), Expr::call("sqrt", Expr::sub(one(), squared(u())))),
        "acos" => Expr::neg(Expr::div(one(), Expr::call("sqrt", Expr::sub(one(), squared(u()))))),
        "atan" => Expr::div(one(), Expr::add(one(), squared(u()))),
        "sinh" => Expr::call("cosh", u()),
        "cosh" => Expr::call("sinh", u()),
        "tanh" => Expr::sub(one(), squared(Expr::call("tanh", u()))),
        "exp" => Expr::call("exp", u()),
        "ln" | "log" => Expr::div(one(), u()),
        "log10" => Expr::div(one(), Expr::mul(u(), Expr::call("ln", Expr::num(10.0)))),
        "log2" => Expr::div(one(), Expr::mul(u(), Expr::call("ln", two()))),
        "sqrt" => Expr::div(one(), Expr::mul(two(), Expr::call("sqrt", u()))),
        "cbrt" => Expr::div(one(), Expr::mul(Expr::num(3.0), squared(Expr::call("cbrt", u())))),
        "abs" => Expr::div(u(), Expr::call("abs", u())),
        _ => return None,
    })
}

/// Differentiate and simplify
pub fn derivative(expr: &Expr, var: &str) -> Option<Expr> {
    differentiate(expr, var).map(|d| simplify(&d))
}

/// Simplified derivative text of a source expression, if one can be derived
pub fn derivative_text(source: &str, var: &str) -> Option<String> {
    let expr = parser::parse(source).ok()?;
    derivative(&expr, var).map(|d| d.to_string())
}

impl CompiledExpr {
    /// Compiled simplified derivative. `None` without a tree or a rule.
    pub fn derivative(&self, var: &str) -> Option<CompiledExpr> {
        let node = self.node()?;
        derivative(node, var).map(CompiledExpr::from_node)
    }
}
