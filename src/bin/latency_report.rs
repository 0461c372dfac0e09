use std::error::Error;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use tick_lob::{codec, run_pipeline, Engine, EngineConfig, Order, Side};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Decode and match on one thread, timing every order
    Direct,
    /// Decode and match on two threads joined by the ring buffer
    Pipeline,
}

/// Latency and throughput report over a synthetic order stream
#[derive(Parser, Debug)]
#[command(name = "latency-report")]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Direct)]
    mode: Mode,

    /// Number of orders in the stream
    #[arg(long, default_value_t = 1_000_000)]
    orders: u64,

    /// Quantity of every order
    #[arg(long, default_value_t = 10)]
    quantity: u32,

    /// Center of the 21-tick price band
    #[arg(long, default_value_t = 10_000, allow_hyphen_values = true)]
    mid_price: i32,

    #[arg(long, default_value_t = 100_000)]
    arena_capacity: u32,

    /// Ring buffer cells (pipeline mode)
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
        .with_writer(std::io::stderr)
        .init();
}

/// Ascending ids, alternating sides, prices cycling through a 21-tick band.
fn synthetic_stream(count: u64, mid_price: i32, quantity: u32) -> Vec<Order> {
    (1..=count)
        .map(|id| {
            let side = if id % 2 == 0 { Side::Buy } else { Side::Sell };
            let offset = (id % 21) as i32 - 10;
            Order::new(id, mid_price.saturating_add(offset), quantity, side)
        })
        .collect()
}

fn run_direct(config: EngineConfig, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    let mut engine = Engine::with_config(config);
    if engine.config().pin_to_core {
        engine.pin_to_core();
    }
    engine.warm_up();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3)?;
    let mut total_duration = Duration::ZERO;
    let mut ops = 0u64;

    for record in codec::records(bytes) {
        // Critical measurement section
        let start = Instant::now();
        let order = record?;
        std::hint::black_box(engine.process(order).ok());
        let elapsed = start.elapsed();

        // Saturate outliers into the top bucket rather than dropping them
        histogram.saturating_record(elapsed.as_nanos() as u64);
        total_duration += elapsed;
        ops += 1;
    }

    let report = engine.report();
    println!("\n=== Latency Report (ns) ===");
    println!("Total Ops:  {}", ops);
    println!("Throughput: {:.2} ops/sec", ops as f64 / total_duration.as_secs_f64());
    println!("Fills:      {}", report.fills);
    println!("Rejected:   {}", report.rejected);
    println!("Resting:    {}", engine.order_count());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    println!("\nDistribution:");
    for v in histogram.iter_log(100, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("<= {:6} ns: {:10} count", v.value_iterated_to(), count);
        }
    }
    Ok(())
}

fn run_threaded(config: EngineConfig, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let run = run_pipeline(config, bytes)?;
    let wall = start.elapsed();

    println!("\n=== Pipeline Report ===");
    println!("Total Ops:    {}", run.report.processed);
    println!("Wall time:    {:.3} ms", wall.as_secs_f64() * 1e3);
    println!("Throughput:   {:.2} ops/sec", run.report.processed as f64 / wall.as_secs_f64());
    println!("Matcher busy: {:.2} ops/sec", run.report.throughput());
    println!("Full retries: {}", run.ingest.full_retries);
    println!("Fills:        {}", run.report.fills);
    println!("Traded qty:   {}", run.report.traded_qty);
    println!("Resting:      {}", run.engine.order_count());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = EngineConfig {
        arena_capacity: args.arena_capacity,
        pipeline_slots: args.pipeline_slots,
        pin_to_core: args.pin,
        ..EngineConfig::default()
    };

    info!(orders = args.orders, mode = ?args.mode, "preparing stream");
    let stream = synthetic_stream(args.orders, args.mid_price, args.quantity);
    let bytes = codec::encode_all(&stream);
    drop(stream);

    match args.mode {
        Mode::Direct => run_direct(config, &bytes),
        Mode::Pipeline => run_threaded(config, &bytes),
    }
}
