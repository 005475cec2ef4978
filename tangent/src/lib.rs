//! Tangent - Explore a function of one real variable
//!
//! The `Tangent` engine answers limit, derivative and integral questions by
//! running an ordered list of stages per capability: local symbolic work,
//! the remote symbolic engine under a timeout, then numeric estimates.
//! `Explorer` wraps an engine for interactive use, committing only the
//! newest answer per capability and debouncing plot resampling.
//!
//! ```no_run
//! use tangent::{Tangent, TangentConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tangent = Tangent::new(TangentConfig::load()?);
//! let slope = tangent.derivative("x^2", 3.0, "x").await;
//! println!("{}", slope);
//! # Ok(())
//! # }
//! ```

mod config;
mod derivative;
mod engine;
mod explorer;
mod generation;
mod integral;
mod limit;
mod resample;
mod stages;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, SolverConfig, TangentConfig, CONFIG_ENV};
pub use engine::Tangent;
pub use explorer::Explorer;
pub use generation::{GenerationGate, Ticket};
pub use integral::Antiderivative;
pub use resample::{plot, PlotFrame, PlotRequest, PlotResult, Resampler};
pub use stages::{BoxFuture, FallbackChain, StageOutcome};

pub use tangent_core::{Derivative, Integral, Limit, Outcome, Provenance, TangentError, Verdict};
pub use tangent_expr::FunctionRegistry;
pub use tangent_numeric::{parse_point, Side, Viewport};
