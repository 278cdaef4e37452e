pub mod config;
pub mod data;
pub mod errors;
pub mod etl;
pub mod osm_data;
pub mod source;
pub mod translation;
pub mod writer;

pub use config::{load_user_config, UserConfig};
pub use errors::{Error, Result};
pub use osm_data::OsmData;
