//! Tangent Solver - Symbolic engine plumbing
//!
//! The symbolic engine is an opaque service reached by message passing.
//! This crate provides:
//! - the JSON line protocol of each capability (limit, derivative, integral)
//! - `SymbolicEngineClient`, one persistent worker per capability
//! - worker factories: external process, in-process handler, unavailable
//! - `within`, the "first of {future, timer}" combinator

mod client;
mod error;
mod protocol;
mod race;
mod worker;

pub use client::SymbolicEngineClient;
pub use error::SolverError;
pub use protocol::{
    decode, directional, encode, postprocess, preprocess, reply, Capability, DerivativeReply,
    DerivativeRequest, Envelope, IntegralReply, IntegralRequest, LimitReply, LimitRequest,
    UNDEFINED_LIMIT,
};
pub use race::within;
pub use worker::{HandlerWorker, ProcessWorker, Scripted, Unavailable, WorkerFactory, WorkerLink};
