use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use rust_decimal::Decimal;
use tick_lob::{codec, feed, run_pipeline, EngineConfig};
use tracing::info;

/// Replay an order CSV through the matching pipeline and write the fills
#[derive(Parser, Debug)]
#[command(name = "replay")]
struct Args {
    /// Order CSV with header `id,side,price,quantity`
    input: PathBuf,

    /// Fills CSV destination (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Price increment of one tick
    #[arg(long, default_value = "0.01")]
    tick_size: Decimal,

    #[arg(long, default_value_t = 1_000_000)]
    arena_capacity: u32,

    #[arg(long, default_value_t = 1 << 16)]
    pipeline_slots: usize,

    /// Pin the matching thread to the last core
    #[arg(long)]
    pin: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let orders = feed::read_orders(BufReader::new(File::open(&args.input)?), args.tick_size)?;
    info!(orders = orders.len(), input = %args.input.display(), "loaded orders");

    let config = EngineConfig {
        arena_capacity: args.arena_capacity,
        pipeline_slots: args.pipeline_slots,
        pin_to_core: args.pin,
        record_fills: true,
        ..EngineConfig::default()
    };
    let run = run_pipeline(config, &codec::encode_all(&orders))?;

    match &args.output {
        Some(path) => feed::write_fills(BufWriter::new(File::create(path)?), &run.report.fill_log, args.tick_size)?,
        None => feed::write_fills(io::stdout().lock(), &run.report.fill_log, args.tick_size)?,
    }

    info!(
        processed = run.report.processed,
        rejected = run.report.rejected,
        fills = run.report.fills,
        traded_qty = run.report.traded_qty,
        resting = run.engine.order_count(),
        best_bid = ?run.engine.best_bid(),
        best_ask = ?run.engine.best_ask(),
        "replay finished"
    );
    Ok(())
}
