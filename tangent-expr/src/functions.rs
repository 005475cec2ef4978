//! Function and constant registry

use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tangent_core::TangentError;

/// Native implementation of a function
pub type NativeFn = fn(&[f64]) -> f64;

/// Metadata for a registered function
#[derive(Debug, Clone, Serialize)]
pub struct FunctionMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub category: &'static str,
    pub min_args: usize,
    pub max_args: usize,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub meta: FunctionMeta,
    pub eval: NativeFn,
}

/// Definition of a named constant
#[derive(Debug, Clone, Serialize)]
pub struct ConstantDef {
    pub name: &'static str,
    pub value: f64,
    pub description: &'static str,
}

/// Central function registry
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
    constants: HashMap<String, ConstantDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            constants: HashMap::new(),
        }
    }

    /// Shared registry with the standard vocabulary
    pub fn standard() -> &'static FunctionRegistry {
        static STANDARD: OnceLock<FunctionRegistry> = OnceLock::new();
        STANDARD.get_or_init(standard_registry)
    }

    pub fn with_function(mut self, def: FunctionDef) -> Self {
        self.functions.insert(def.meta.name.to_lowercase(), def);
        self
    }

    pub fn with_constant(mut self, def: ConstantDef) -> Self {
        self.constants.insert(def.name.to_lowercase(), def);
        self
    }

    pub fn get_function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.get_function(name).is_some()
    }

    pub fn get_constant(&self, name: &str) -> Option<&ConstantDef> {
        self.constants.get(&name.to_lowercase())
    }

    /// Resolve a function for a call site, checking its arity
    pub fn resolve(&self, name: &str, argc: usize) -> Result<&FunctionDef, TangentError> {
        let def = match self.get_function(name) {
            Some(def) => def,
            None => {
                let similar = self.find_similar_functions(name);
                let mut err = TangentError::undefined_func(name);
                if !similar.is_empty() {
                    let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
                    err = err.with_suggestion(format!("Similar: {}", suggestions.join(", ")));
                }
                return Err(err);
            }
        };
        if argc < def.meta.min_args || argc > def.meta.max_args {
            return Err(TangentError::arg_count(def.meta.name, def.meta.min_args, argc));
        }
        Ok(def)
    }

    pub fn list_functions(&self, category: Option<&str>) -> Vec<&FunctionMeta> {
        let mut funcs: Vec<&FunctionMeta> = self
            .functions
            .values()
            .map(|f| &f.meta)
            .filter(|m| category.map_or(true, |c| m.category == c))
            .collect();
        funcs.sort_by_key(|m| m.name);
        funcs
    }

    pub fn list_constants(&self) -> Vec<&ConstantDef> {
        let mut consts: Vec<&ConstantDef> = self.constants.values().collect();
        consts.sort_by_key(|c| c.name);
        consts
    }

    /// Find function names similar to the given name (for error suggestions)
    fn find_similar_functions(&self, name: &str) -> Vec<String> {
        let name_lower = name.to_lowercase();
        let mut matches: Vec<(String, usize)> = self
            .functions
            .keys()
            .filter_map(|func_name| {
                let score = Self::similarity_score(&name_lower, func_name);
                if score > 0 {
                    Some((func_name.clone(), score))
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }

    fn similarity_score(query: &str, candidate: &str) -> usize {
        let mut score = 0;

        if candidate.starts_with(query) {
            score += 100;
        } else if candidate.contains(query) {
            score += 50;
        } else if query.contains(candidate) {
            score += 30;
        }

        // Shared characters only count once something else matched
        if score > 0 {
            let query_chars: std::collections::HashSet<char> = query.chars().collect();
            let candidate_chars: std::collections::HashSet<char> = candidate.chars().collect();
            score += query_chars.intersection(&candidate_chars).count() * 2;
        }

        score
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const fn unary(
    name: &'static str,
    description: &'static str,
    usage: &'static str,
    category: &'static str,
    eval: NativeFn,
) -> FunctionDef {
    FunctionDef {
        meta: FunctionMeta { name, description, usage, category, min_args: 1, max_args: 1 },
        eval,
    }
}

fn log(args: &[f64]) -> f64 {
    match args {
        [x] => x.ln(),
        [x, base] => x.ln() / base.ln(),
        _ => f64::NAN,
    }
}

fn sign(args: &[f64]) -> f64 {
    let x = args[0];
    if x.is_nan() {
        f64::NAN
    } else if x == 0.0 {
        0.0
    } else {
        x.signum()
    }
}

/// Load the standard vocabulary into a registry
pub fn load_standard_functions(registry: FunctionRegistry) -> FunctionRegistry {
    registry
        .with_function(unary("sin", "Sine", "sin(x)", "trig", |a| a[0].sin()))
        .with_function(unary("cos", "Cosine", "cos(x)", "trig", |a| a[0].cos()))
        .with_function(unary("tan", "Tangent", "tan(x)", "trig", |a| a[0].tan()))
        .with_function(unary("sec", "Secant", "sec(x)", "trig", |a| 1.0 / a[0].cos()))
        .with_function(unary("csc", "Cosecant", "csc(x)", "trig", |a| 1.0 / a[0].sin()))
        .with_function(unary("cot", "Cotangent", "cot(x)", "trig", |a| a[0].cos() / a[0].sin()))
        .with_function(unary("asin", "Inverse sine", "asin(x)", "trig", |a| a[0].asin()))
        .with_function(unary("acos", "Inverse cosine", "acos(x)", "trig", |a| a[0].acos()))
        .with_function(unary("atan", "Inverse tangent", "atan(x)", "trig", |a| a[0].atan()))
        .with_function(unary("sinh", "Hyperbolic sine", "sinh(x)", "hyperbolic", |a| a[0].sinh()))
        .with_function(unary("cosh", "Hyperbolic cosine", "cosh(x)", "hyperbolic", |a| a[0].cosh()))
        .with_function(unary("tanh", "Hyperbolic tangent", "tanh(x)", "hyperbolic", |a| a[0].tanh()))
        .with_function(unary("exp", "Exponential", "exp(x)", "math", |a| a[0].exp()))
        .with_function(FunctionDef {
            meta: FunctionMeta {
                name: "log",
                description: "Natural logarithm, or logarithm in the given base",
                usage: "log(x) | log(x, base)",
                category: "math",
                min_args: 1,
                max_args: 2,
            },
            eval: log,
        })
        .with_function(unary("ln", "Natural logarithm", "ln(x)", "math", |a| a[0].ln()))
        .with_function(unary("log10", "Base-10 logarithm", "log10(x)", "math", |a| a[0].log10()))
        .with_function(unary("log2", "Base-2 logarithm", "log2(x)", "math", |a| a[0].log2()))
        .with_function(unary("sqrt", "Square root", "sqrt(x)", "math", |a| a[0].sqrt()))
        .with_function(unary("cbrt", "Cube root", "cbrt(x)", "math", |a| a[0].cbrt()))
        .with_function(unary("abs", "Absolute value", "abs(x)", "math", |a| a[0].abs()))
        .with_function(unary("sign", "Sign (-1, 0 or 1)", "sign(x)", "math", sign))
        .with_function(unary("floor", "Round down", "floor(x)", "rounding", |a| a[0].floor()))
        .with_function(unary("ceil", "Round up", "ceil(x)", "rounding", |a| a[0].ceil()))
}

/// Load named constants into a registry
pub fn load_constants(registry: FunctionRegistry) -> FunctionRegistry {
    registry
        .with_constant(ConstantDef { name: "pi", value: std::f64::consts::PI, description: "Ratio of circumference to diameter" })
        .with_constant(ConstantDef { name: "π", value: std::f64::consts::PI, description: "Ratio of circumference to diameter" })
        .with_constant(ConstantDef { name: "e", value: std::f64::consts::E, description: "Euler's number" })
}

/// Create registry with the standard vocabulary and constants
pub fn standard_registry() -> FunctionRegistry {
    load_constants(load_standard_functions(FunctionRegistry::new()))
}
