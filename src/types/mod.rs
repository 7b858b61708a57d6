pub mod bar;
pub mod signal;
pub mod trade;

pub use bar::*;
pub use signal::*;
pub use trade::*;
