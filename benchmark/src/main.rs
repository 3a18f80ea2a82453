use std::{
    collections::BTreeMap,
    num::{NonZeroU64, NonZeroUsize},
    ops::ControlFlow,
    path::PathBuf,
    process::ExitCode,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Barrier, Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

use clap::Parser;
use crossbeam_utils::CachePadded;
use error::Error;
use hdrhistogram::Histogram;
use itertools::Itertools;
use lazy_memo::Strategy;
use result_matrix::{
    format_as_matrix,
    json::{self, PrimaryMetric, Record},
    BenchmarkResult, ResultMatrix,
};
use tracing::{error, info, warn};
use workloads::{setup_workload, Workload};

mod error;
mod workloads;

/// Contend memoizer strategies and render benchmark results as matrices.
#[derive(clap::Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run one round per strategy and thread count, then print the ns/op matrix.
    Run(RunArgs),
    /// Print the matrix of a results file (JMH-style json).
    Matrix(MatrixArgs),
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    #[clap(value_enum)]
    workload: WorkloadKind,
    #[clap(long, value_delimiter = ',', default_value = "1,2,4,8")]
    threads: Vec<NonZeroUsize>,
    /// Defaults to all strategies.
    #[clap(long, value_delimiter = ',')]
    strategies: Vec<Strategy>,
    #[clap(long, default_value = "100k-ops-per-thread")]
    run_duration: RunDuration,
    #[clap(long, default_value = "benchmark.output.json")]
    output: PathBuf,
}

#[derive(clap::Args)]
struct MatrixArgs {
    path: PathBuf,
    /// The parameter whose values become columns.
    #[clap(long, default_value = "threads")]
    param: String,
    /// Shorten qualified benchmark names to their last two segments.
    #[clap(long)]
    short_names: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
enum WorkloadKind {
    SharedAccess,
    FreshInit,
}

impl WorkloadKind {
    fn name(&self) -> &'static str {
        match self {
            WorkloadKind::SharedAccess => "shared-access",
            WorkloadKind::FreshInit => "fresh-init",
        }
    }
}

/// How long each round runs.
#[derive(Clone, Copy, Debug, PartialEq)]
enum RunDuration {
    FixedDuration(Duration),
    FixedPerThreadOpCount(u64),
}

impl FromStr for RunDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix("ops-per-thread") {
            Some(stripped) => {
                let (stripped, multiplier) = if let Some(n) = stripped.strip_suffix("k-") {
                    (n, 1000)
                } else if let Some(n) = stripped.strip_suffix("m-") {
                    (n, 1000 * 1000)
                } else if let Some(n) = stripped.strip_suffix("g-") {
                    (n, 1000 * 1000 * 1000)
                } else {
                    (stripped.strip_suffix('-').unwrap_or(stripped), 1)
                };
                match stripped.parse::<NonZeroU64>() {
                    Ok(n) => match n.get().checked_mul(multiplier) {
                        Some(ops) => Ok(RunDuration::FixedPerThreadOpCount(ops)),
                        None => Err(format!("op count overflows u64: {s:?}")),
                    },
                    Err(e) => Err(format!("invalid op count: {e}: {s:?}")),
                }
            }
            None => match humantime::parse_duration(s) {
                Ok(d) => Ok(RunDuration::FixedDuration(d)),
                Err(e) => Err(format!("invalid duration: {e}: {s:?}")),
            },
        }
    }
}

impl RunDuration {
    fn ops_left_for_client(&self) -> OpsLeft {
        match self {
            RunDuration::FixedDuration(_) => OpsLeft(None),
            RunDuration::FixedPerThreadOpCount(n) => OpsLeft(Some(*n)),
        }
    }
}

struct OpsLeft(Option<u64>);

impl OpsLeft {
    fn take_one_op(&mut self) -> ControlFlow<()> {
        match &mut self.0 {
            None => ControlFlow::Continue(()),
            Some(0) => ControlFlow::Break(()),
            Some(ops_left) => {
                *ops_left -= 1;
                ControlFlow::Continue(())
            }
        }
    }
}

struct StatsState {
    ops: Vec<CachePadded<AtomicU64>>,
    latencies_histo: Vec<CachePadded<Mutex<Histogram<u64>>>>,
}

impl StatsState {
    fn new(num_clients: usize) -> Result<Self, Error> {
        Ok(StatsState {
            ops: (0..num_clients)
                .map(|_| CachePadded::new(AtomicU64::new(0)))
                .collect(),
            latencies_histo: (0..num_clients)
                .map(|_| Ok(CachePadded::new(Mutex::new(Self::make_latency_histogram()?))))
                .collect::<Result<_, Error>>()?,
        })
    }

    fn make_latency_histogram() -> Result<Histogram<u64>, Error> {
        Ok(Histogram::new_with_bounds(1, 1_000_000_000, 3)?)
    }

    fn merged_latencies(&self) -> Result<Histogram<u64>, Error> {
        let mut total = Self::make_latency_histogram()?;
        for h in &self.latencies_histo {
            total += &*h.lock().unwrap_or_else(PoisonError::into_inner);
        }
        Ok(total)
    }
}

const LATENCY_PERCENTILES: [f64; 4] = [50.0, 90.0, 99.0, 99.9];

struct RoundSummary {
    benchmark: String,
    threads: usize,
    elapsed: Duration,
    op_count: u64,
    factory_runs: u64,
    latency_min_ns: u64,
    latency_mean_ns: f64,
    latency_max_ns: u64,
    latency_percentiles: [u64; LATENCY_PERCENTILES.len()],
}

impl std::fmt::Display for RoundSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} threads={} t{:.2} ops={} TP: ops/s={:.0} factory_runs={} LAT(ns): min={} mean={:.1} max={} {}",
            self.benchmark,
            self.threads,
            self.elapsed.as_secs_f64(),
            self.op_count,
            (self.op_count as f64) / self.elapsed.as_secs_f64(),
            self.factory_runs,
            self.latency_min_ns,
            self.latency_mean_ns,
            self.latency_max_ns,
            self.latency_percentiles
                .iter()
                .zip(LATENCY_PERCENTILES.iter())
                .map(|(v, p)| format!("p{p}={v}"))
                .join(" "),
        )
    }
}

impl RoundSummary {
    fn into_record(self) -> Record {
        Record {
            benchmark: self.benchmark,
            mode: Some("avgt".to_owned()),
            threads: u64::try_from(self.threads).ok(),
            params: BTreeMap::from([("threads".to_owned(), self.threads.to_string())]),
            primary_metric: PrimaryMetric {
                score: self.latency_mean_ns,
                score_unit: "ns/op".to_owned(),
                score_percentiles: LATENCY_PERCENTILES
                    .iter()
                    .zip(self.latency_percentiles.iter())
                    .map(|(p, v)| (format!("{p:.1}"), *v as f64))
                    .collect(),
            },
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let res = match &cli.command {
        Command::Run(args) => run(args),
        Command::Matrix(args) => matrix(args),
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RunArgs) -> Result<(), Error> {
    let stop = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let stop = Arc::clone(&stop);
        move || {
            info!("ctrl-c, setting stop flag");
            if stop.fetch_or(true, Ordering::Relaxed) {
                error!("stop flag was already set, aborting");
                std::process::abort();
            } else {
                info!("first ctrl-c, stop flag set");
            }
        }
    })?;

    let strategies = if args.strategies.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        args.strategies.clone()
    };

    let mut records = Vec::new();
    'rounds: for strategy in strategies {
        for threads in &args.threads {
            if stop.load(Ordering::Relaxed) {
                warn!("stop flag set, skipping remaining rounds");
                break 'rounds;
            }
            let summary = run_round(args, strategy, *threads, &stop)?;
            info!("{summary}");
            records.push(summary.into_record());
        }
    }

    let output = json::to_string_pretty(&records)?;
    std::fs::write(&args.output, output).map_err(|source| Error::Io {
        path: args.output.clone(),
        source,
    })?;
    info!("wrote results to {:?}", args.output);

    let results: Vec<BenchmarkResult> = records.into_iter().map(Into::into).collect();
    print!("{}", format_as_matrix(&results, "threads")?);
    Ok(())
}

fn run_round(
    args: &RunArgs,
    strategy: Strategy,
    threads: NonZeroUsize,
    stop: &AtomicBool,
) -> Result<RoundSummary, Error> {
    let benchmark = format!("{}::{}", args.workload.name(), strategy);
    info!(%benchmark, threads = threads.get(), "round starting");

    let workload = setup_workload(args.workload, strategy);
    let stats_state = StatsState::new(threads.get())?;
    // clients plus us, so the clock starts when everyone is ready
    let clients_ready = Barrier::new(threads.get() + 1);
    let round_over = AtomicBool::new(false);

    let elapsed = std::thread::scope(|scope| {
        let handles = (0..threads.get())
            .map(|i| {
                let ops_left = args.run_duration.ops_left_for_client();
                let workload = &*workload;
                let (clients_ready, round_over, stats_state) =
                    (&clients_ready, &round_over, &stats_state);
                scope.spawn(move || {
                    client(
                        i,
                        workload,
                        clients_ready,
                        ops_left,
                        stop,
                        round_over,
                        stats_state,
                    )
                })
            })
            .collect_vec();

        clients_ready.wait();
        let start = Instant::now();
        if let RunDuration::FixedDuration(duration) = args.run_duration {
            // short naps so that ctrl-c ends the round promptly
            while !stop.load(Ordering::Relaxed) {
                let remaining = duration.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    break;
                }
                std::thread::sleep(remaining.min(Duration::from_millis(10)));
            }
            round_over.store(true, Ordering::Relaxed);
        }
        for handle in handles {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }
        start.elapsed()
    });

    if stop.load(Ordering::Relaxed) {
        warn!(%benchmark, threads = threads.get(), "round interrupted, results are partial");
    }

    let histo = stats_state.merged_latencies()?;
    let op_count = stats_state
        .ops
        .iter()
        .map(|ops| ops.load(Ordering::Relaxed))
        .sum();
    let mut latency_percentiles = [0; LATENCY_PERCENTILES.len()];
    for (value, p) in latency_percentiles.iter_mut().zip(LATENCY_PERCENTILES) {
        *value = histo.value_at_percentile(p);
    }
    Ok(RoundSummary {
        benchmark,
        threads: threads.get(),
        elapsed,
        op_count,
        factory_runs: workload.factory_runs(),
        latency_min_ns: histo.min(),
        latency_mean_ns: histo.mean(),
        latency_max_ns: histo.max(),
        latency_percentiles,
    })
}

fn client(
    i: usize,
    workload: &dyn Workload,
    clients_ready: &Barrier,
    mut ops_left: OpsLeft,
    stop: &AtomicBool,
    round_over: &AtomicBool,
    stats_state: &StatsState,
) {
    // only this client records into its histogram
    let mut histo = stats_state.latencies_histo[i]
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    clients_ready.wait();
    while !stop.load(Ordering::Relaxed) && !round_over.load(Ordering::Relaxed) {
        let ControlFlow::Continue(()) = ops_left.take_one_op() else {
            break;
        };
        let start = Instant::now();
        workload.op();
        histo.saturating_record(u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX));
        stats_state.ops[i].fetch_add(1, Ordering::Relaxed);
    }
}

fn matrix(args: &MatrixArgs) -> Result<(), Error> {
    let matrix = load_matrix(args)?;
    if matrix.is_empty() {
        warn!("no results in {:?}", args.path);
    }
    print!("{matrix}");
    Ok(())
}

fn load_matrix(args: &MatrixArgs) -> Result<ResultMatrix, Error> {
    let file = std::fs::File::open(&args.path).map_err(|source| Error::Io {
        path: args.path.clone(),
        source,
    })?;
    let mut results = json::read_results(std::io::BufReader::new(file))?;
    if args.short_names {
        for result in &mut results {
            result.name = result.short_name().to_owned();
        }
    }
    Ok(format_as_matrix(&results, &args.param)?)
}
