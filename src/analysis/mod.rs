pub mod montecarlo;
pub mod reality;
pub mod walkforward;

pub use montecarlo::*;
pub use reality::*;
pub use walkforward::*;
