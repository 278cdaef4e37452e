use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::errors::Result;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UserConfig {
    pub source_path: String,
    pub output_path: String,
    pub source_encoding: String,
    /// Decimal digits kept when matching coordinates of way nodes.
    pub rounding_digits: u32,
    /// Longer ways are split. Values below 2 disable splitting.
    pub max_points_in_way: usize,
    pub add_bounds: bool,
    /// Id counter start.
    pub id: i64,
    pub positive_id: bool,
    /// Decimal digits written for node coordinates.
    pub significant_digits: usize,
    pub add_version: bool,
    pub add_timestamp: bool,
    pub never_upload: bool,
    pub never_download: bool,
    pub locked: bool,
    pub force: bool,
    pub merge_duplicates: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            source_path: String::new(),
            output_path: String::new(),
            source_encoding: "utf-8".to_string(),
            rounding_digits: 7,
            max_points_in_way: 1800,
            add_bounds: false,
            id: 0,
            positive_id: false,
            significant_digits: 9,
            add_version: false,
            add_timestamp: false,
            never_upload: false,
            never_download: false,
            locked: false,
            force: false,
            merge_duplicates: true,
        }
    }
}

pub fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}
