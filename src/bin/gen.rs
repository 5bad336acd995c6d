//! mmdbgen: CLI tool for generating MMDB city databases from CSV tables.

use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use mmdbgen::{BlockSource, LocationTable, MmdbWriter, RecordSize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mmdbgen")]
#[command(author = "Singular Labs")]
#[command(version = "0.1.0")]
#[command(about = "Generate a GeoIP2-City MMDB file from CSV geolocation tables", long_about = None)]
struct Cli {
    /// IPv4 blocks CSV file (network, geoname_id, ..., latitude, longitude)
    #[arg(short, long)]
    blocks: PathBuf,

    /// Locations CSV file keyed by geoname_id
    #[arg(short, long)]
    locations: PathBuf,

    /// Output MMDB file; gzip compressed when the name ends in .gz
    #[arg(short, long, default_value = "GeoIP2-City.mmdb")]
    output: PathBuf,

    /// Search-tree record size in bits (24, 28 or 32)
    #[arg(short, long, default_value_t = 28)]
    record_size: u16,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> mmdbgen::Result<()> {
    let record_size = RecordSize::from_bits(cli.record_size)?;

    let locations = LocationTable::from_path(&cli.locations)?;

    let mut writer = MmdbWriter::new();
    let mut blocks = BlockSource::open(&cli.blocks)?;
    let mut block_count = 0u64;
    while let Some((begin, end, geo)) = blocks.next_range(&locations)? {
        writer.push_range(begin, end, &geo)?;
        block_count += 1;
    }
    info!(
        "built search tree: {} blocks, {} nodes, {} data bytes",
        block_count,
        writer.node_count(),
        writer.data_section_len()
    );

    let is_gzip = cli
        .output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "gz")
        .unwrap_or(false);

    if is_gzip {
        let file = File::create(&cli.output)?;
        let mut encoder = GzEncoder::new(file, Compression::best());
        writer.write_to(&mut encoder, record_size)?;
        encoder.finish()?.flush()?;
    } else {
        let file = File::create(&cli.output)?;
        let mut out = BufWriter::new(file);
        writer.write_to(&mut out, record_size)?;
        out.flush()?;
    }

    info!("wrote {:?}", cli.output);
    Ok(())
}
