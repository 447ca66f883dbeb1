pub mod config;
pub mod error;
pub mod factory;
pub mod providers;
pub mod report;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::ProviderError;
pub use factory::*;
pub use report::summarize_forecast;
pub use traits::*;
pub use types::*;
