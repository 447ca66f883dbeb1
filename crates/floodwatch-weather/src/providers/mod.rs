pub mod open_meteo;
pub mod weatherapi;

pub use open_meteo::OpenMeteoElevationProvider;
pub use weatherapi::WeatherApiProvider;
