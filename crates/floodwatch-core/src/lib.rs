pub mod assessment;
pub mod coerce;
pub mod config;
pub mod drainage;
pub mod factors;

pub use assessment::*;
pub use coerce::*;
pub use config::*;
pub use drainage::*;
pub use factors::*;
