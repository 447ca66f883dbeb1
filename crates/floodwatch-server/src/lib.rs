pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use http::{HttpRequest, HttpResponse};
pub use server::FloodServer;
