// playhist - streaming-history ingestion, caching and analytics core
// Module declarations
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod session;

pub use aggregate::{Dimension, FilterOptions, FilterSelection};
pub use config::AppConfig;
pub use ingest::{IngestError, IngestReport};
pub use models::{Dataset, PlayEvent, ProfileData};
pub use session::{Engine, EngineError, LoadedProfile};
