pub mod generation;
pub mod metrics;
pub mod provider;

pub use generation::*;
pub use metrics::*;
