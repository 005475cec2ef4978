//! The Tangent engine

use crate::config::TangentConfig;
use std::sync::Arc;
use tangent_core::{Derivative, Integral, Limit};
use tangent_solver::{SymbolicEngineClient, WorkerFactory};

/// Orchestrates local and remote computation for every capability
///
/// Holds one symbolic engine client per capability. Clients start their
/// worker on first use, so building an engine is cheap.
pub struct Tangent {
    pub(crate) config: TangentConfig,
    pub(crate) limits: SymbolicEngineClient<Limit>,
    pub(crate) derivatives: SymbolicEngineClient<Derivative>,
    pub(crate) integrals: SymbolicEngineClient<Integral>,
}

impl Tangent {
    /// Engine reaching the symbolic engine configured in `config`
    pub fn new(config: TangentConfig) -> Self {
        let factory = config.factory();
        Self::with_factory(config, factory)
    }

    /// Engine using an explicit worker factory
    pub fn with_factory(config: TangentConfig, factory: Arc<dyn WorkerFactory>) -> Self {
        tracing::debug!(engine = %factory.describe(), "tangent engine created");
        Self {
            limits: SymbolicEngineClient::new(Arc::clone(&factory)),
            derivatives: SymbolicEngineClient::new(Arc::clone(&factory)),
            integrals: SymbolicEngineClient::new(factory),
            config,
        }
    }

    pub fn config(&self) -> &TangentConfig {
        &self.config
    }

    /// Stop every started worker, rejecting pending requests
    pub async fn shutdown(&self) {
        tokio::join!(self.limits.shutdown(), self.derivatives.shutdown(), self.integrals.shutdown());
    }
}

impl Default for Tangent {
    fn default() -> Self {
        Self::new(TangentConfig::default())
    }
}
