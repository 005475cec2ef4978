//! Rendering back to infix text

use crate::ast::{BinOp, Expr, UnaryOp};
use std::fmt;

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_NEG: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(n) if n.is_sign_negative() && *n != 0.0 => PREC_NEG,
        Expr::Number(_) | Expr::Variable(_) | Expr::FunctionCall(..) => PREC_ATOM,
        Expr::UnaryOp(UnaryOp::Neg, _) => PREC_NEG,
        Expr::BinaryOp(_, op, _) => match op {
            BinOp::Add | BinOp::Sub => PREC_ADD,
            BinOp::Mul | BinOp::Div => PREC_MUL,
            BinOp::Pow => PREC_POW,
        },
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, expr: &Expr, wrap: bool) -> fmt::Result {
    if wrap {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write_number(f, *n),
            Expr::Variable(name) => f.write_str(name),
            Expr::FunctionCall(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::UnaryOp(UnaryOp::Neg, inner) => {
                f.write_str("-")?;
                write_wrapped(f, inner, precedence(inner) <= PREC_NEG)
            }
            Expr::BinaryOp(l, op, r) => {
                let prec = precedence(self);
                let (lp, rp) = (precedence(l), precedence(r));
                let (wrap_l, wrap_r) = match op {
                    // (a^b)^c and (-a)^b keep their parentheses
                    BinOp::Pow => (lp <= PREC_POW, rp < PREC_POW),
                    BinOp::Sub | BinOp::Div => (lp < prec, rp <= prec),
                    BinOp::Add | BinOp::Mul => (lp < prec, rp < prec),
                };
                write_wrapped(f, l, wrap_l)?;
                let sym = match op {
                    BinOp::Add => " + ",
                    BinOp::Sub => " - ",
                    BinOp::Mul => " * ",
                    BinOp::Div => " / ",
                    BinOp::Pow => "^",
                };
                f.write_str(sym)?;
                write_wrapped(f, r, wrap_r)
            }
        }
    }
}
