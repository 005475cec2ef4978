//! Algebraic simplification
//!
//! Constant folding plus identity elimination. Enough to keep derivative
//! text readable; not a canonical form.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::functions::FunctionRegistry;

const MAX_PASSES: usize = 8;

/// Simplify until a fixed point (bounded)
pub fn simplify(expr: &Expr) -> Expr {
    let mut current = expr.clone();
    for _ in 0..MAX_PASSES {
        let next = simplify_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn simplify_once(expr: &Expr) -> Expr {
    match expr {
        Expr::Number(_) | Expr::Variable(_) => expr.clone(),
        Expr::UnaryOp(UnaryOp::Neg, inner) => simplify_neg(simplify_once(inner)),
        Expr::BinaryOp(l, op, r) => simplify_binary(simplify_once(l), *op, simplify_once(r)),
        Expr::FunctionCall(name, args) => {
            let args: Vec<Expr> = args.iter().map(simplify_once).collect();
            fold_call(name, &args).unwrap_or_else(|| Expr::FunctionCall(name.clone(), args))
        }
    }
}

fn simplify_neg(inner: Expr) -> Expr {
    match inner {
        Expr::Number(n) => Expr::Number(-n),
        Expr::UnaryOp(UnaryOp::Neg, e) => *e,
        other => Expr::neg(other),
    }
}

fn fold(l: f64, op: BinOp, r: f64) -> Option<f64> {
    let v = match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        BinOp::Pow => l.powf(r),
    };
    v.is_finite().then_some(v)
}

// Only whole results, so ln(10) stays symbolic but cos(0) becomes 1
fn fold_call(name: &str, args: &[Expr]) -> Option<Expr> {
    let values: Option<Vec<f64>> = args.iter().map(Expr::as_number).collect();
    let values = values?;
    let def = FunctionRegistry::standard().get_function(name)?;
    let v = (def.eval)(&values);
    (v.is_finite() && v.fract() == 0.0).then_some(Expr::Number(v))
}

fn simplify_binary(l: Expr, op: BinOp, r: Expr) -> Expr {
    if let (Some(a), Some(b)) = (l.as_number(), r.as_number()) {
        if let Some(v) = fold(a, op, b) {
            return Expr::Number(v);
        }
    }

    match op {
        BinOp::Add => {
            if l.is_number(0.0) {
                return r;
            }
            if r.is_number(0.0) {
                return l;
            }
            match r {
                Expr::UnaryOp(UnaryOp::Neg, inner) => Expr::sub(l, *inner),
                Expr::Number(n) if n < 0.0 => Expr::sub(l, Expr::Number(-n)),
                r => Expr::add(l, r),
            }
        }
        BinOp::Sub => {
            if r.is_number(0.0) {
                return l;
            }
            if l.is_number(0.0) {
                return simplify_neg(r);
            }
            match r {
                Expr::UnaryOp(UnaryOp::Neg, inner) => Expr::add(l, *inner),
                Expr::Number(n) if n < 0.0 => Expr::add(l, Expr::Number(-n)),
                r => Expr::sub(l, r),
            }
        }
        BinOp::Mul => {
            if l.is_number(0.0) || r.is_number(0.0) {
                return Expr::num(0.0);
            }
            if l.is_number(1.0) {
                return r;
            }
            if r.is_number(1.0) {
                return l;
            }
            if l.is_number(-1.0) {
                return simplify_neg(r);
            }
            if r.is_number(-1.0) {
                return simplify_neg(l);
            }
            // Keep numeric coefficients in front
            if r.as_number().is_some() && l.as_number().is_none() {
                return Expr::mul(r, l);
            }
            Expr::mul(l, r)
        }
        BinOp::Div => {
            if r.is_number(1.0) {
                return l;
            }
            Expr::div(l, r)
        }
        BinOp::Pow => {
            if r.is_number(1.0) {
                return l;
            }
            if r.is_number(0.0) || l.is_number(1.0) {
                return Expr::num(1.0);
            }
            Expr::pow(l, r)
        }
    }
}
