pub mod equity;
pub mod metrics;
pub mod orchestrator;
pub mod simulator;
pub mod synthetic;

pub use equity::*;
pub use metrics::*;
pub use orchestrator::*;
pub use simulator::*;
pub use synthetic::*;
