pub mod cache;
pub mod conditions;
pub mod open_meteo;
pub mod service;
pub mod snapshot;

pub use cache::{CacheStats, TtlCache};
pub use conditions::{briefing, Briefing};
pub use open_meteo::{Forecast, ForecastSource, OpenMeteoClient};
pub use service::WeatherService;
pub use snapshot::{derive_snapshot, fallback_snapshot};
