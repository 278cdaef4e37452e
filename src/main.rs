use std::io;
use std::path::PathBuf;

use clap::Parser;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use geo2osm::etl::convert::ConvertEtl;
use geo2osm::etl::Etl;
use geo2osm::{load_user_config, Result, UserConfig};

/// Convert GeoJSON data to OSM XML.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// GeoJSON file to convert
    source: PathBuf,

    /// Output file; `.xz` output is compressed [default: SOURCE with .osm extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with default options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(short, long)]
    force: bool,

    /// Decimal digits kept when matching node coordinates
    #[arg(long)]
    rounding_digits: Option<u32>,

    /// Split ways with more nodes; values below 2 disable splitting
    #[arg(long)]
    max_points_in_way: Option<usize>,

    /// Write a bounds element
    #[arg(long)]
    add_bounds: bool,

    /// Start element ids at this value
    #[arg(long)]
    id: Option<i64>,

    /// Count ids upwards instead of downwards
    #[arg(long)]
    positive_id: bool,

    /// Decimal digits written for coordinates
    #[arg(long)]
    significant_digits: Option<usize>,

    /// Add version="1" to every element
    #[arg(long)]
    add_version: bool,

    /// Add the conversion time to every element
    #[arg(long)]
    add_timestamp: bool,

    #[arg(long)]
    never_upload: bool,

    #[arg(long)]
    never_download: bool,

    #[arg(long)]
    locked: bool,

    /// Encoding of text attributes in the source
    #[arg(long)]
    encoding: Option<String>,

    /// Keep duplicate nodes, ways and relations apart
    #[arg(long)]
    no_merge: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn user_config(self) -> Result<UserConfig> {
        let mut config = match &self.config {
            Some(path) => load_user_config(path)?,
            None => UserConfig::default(),
        };

        config.source_path = self.source.to_string_lossy().into_owned();
        if let Some(output) = self.output {
            config.output_path = output.to_string_lossy().into_owned();
        }
        if let Some(digits) = self.rounding_digits {
            config.rounding_digits = digits;
        }
        if let Some(max_points) = self.max_points_in_way {
            config.max_points_in_way = max_points;
        }
        if let Some(id) = self.id {
            config.id = id;
        }
        if let Some(digits) = self.significant_digits {
            config.significant_digits = digits;
        }
        if let Some(encoding) = self.encoding {
            config.source_encoding = encoding;
        }
        config.force |= self.force;
        config.add_bounds |= self.add_bounds;
        config.positive_id |= self.positive_id;
        config.add_version |= self.add_version;
        config.add_timestamp |= self.add_timestamp;
        config.never_upload |= self.never_upload;
        config.never_download |= self.never_download;
        config.locked |= self.locked;
        config.merge_duplicates &= !self.no_merge;
        Ok(config)
    }
}

fn setup_logging(verbose: bool) {
    Builder::with_level(if verbose { "debug" } else { "info" })
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let user_config = args.user_config()?;
    let mut etl = ConvertEtl::new(&user_config);
    etl.process()
}
