//! Automated Decision Making (ADM) scoring: the data quality / relevance
//! / intelligence triple that feeds a memory's importance score, plus
//! the evolution hint decision table derived from it.

mod engine;
mod evolution;
mod factors;
mod formula;

pub use engine::AdmEngine;
pub use formula::AdmContext;
