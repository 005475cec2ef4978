//! Abstract Syntax Tree

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    /// Free variable or named constant (resolved at evaluation time)
    Variable(String),
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),
    UnaryOp(UnaryOp, Box<Expr>),
    FunctionCall(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
}

impl Expr {
    pub fn num(n: f64) -> Self {
        Expr::Number(n)
    }

    pub fn var(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }

    pub fn add(l: Expr, r: Expr) -> Self {
        Expr::BinaryOp(Box::new(l), BinOp::Add, Box::new(r))
    }

    pub fn sub(l: Expr, r: Expr) -> Self {
        Expr::BinaryOp(Box::new(l), BinOp::Sub, Box::new(r))
    }

    pub fn mul(l: Expr, r: Expr) -> Self {
        Expr::BinaryOp(Box::new(l), BinOp::Mul, Box::new(r))
    }

    pub fn div(l: Expr, r: Expr) -> Self {
        Expr::BinaryOp(Box::new(l), BinOp::Div, Box::new(r))
    }

    pub fn pow(l: Expr, r: Expr) -> Self {
        Expr::BinaryOp(Box::new(l), BinOp::Pow, Box::new(r))
    }

    pub fn neg(e: Expr) -> Self {
        Expr::UnaryOp(UnaryOp::Neg, Box::new(e))
    }

    pub fn call(name: &str, arg: Expr) -> Self {
        Expr::FunctionCall(name.to_string(), vec![arg])
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self, n: f64) -> bool {
        self.as_number() == Some(n)
    }

    /// Height of the tree, a lone leaf being 1. Walks with an explicit stack
    /// so it is safe on trees of any shape.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            match node {
                Expr::Number(_) | Expr::Variable(_) => {}
                Expr::BinaryOp(l, _, r) => {
                    stack.push((l, level + 1));
                    stack.push((r, level + 1));
                }
                Expr::UnaryOp(_, inner) => stack.push((inner, level + 1)),
                Expr::FunctionCall(_, args) => stack.extend(args.iter().map(|a| (a, level + 1))),
            }
        }
        deepest
    }

    /// True if `name` occurs anywhere in the tree
    pub fn depends_on(&self, name: &str) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Variable(v) => v == name,
            Expr::BinaryOp(l, _, r) => l.depends_on(name) || r.depends_on(name),
            Expr::UnaryOp(_, inner) => inner.depends_on(name),
            Expr::FunctionCall(_, args) => args.iter().any(|a| a.depends_on(name)),
        }
    }
}
