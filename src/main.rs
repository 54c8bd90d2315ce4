use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cpu_glow::config::Cli;
use cpu_glow::daemon::{self, Gauge, Sample, StopSignals};
use cpu_glow::led::PiGlow;
use cpu_glow::monitor::Monitor;
use cpu_glow::report::Reporter;
use cpu_glow::stat::ProcStat;
use cpu_glow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cpu_glow={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let stop = StopSignals::install();
    let config = cli.into_config()?;

    info!("Starting cpu-glow {}", env!("CARGO_PKG_VERSION"));
    info!("config: {}", serde_json::to_string(&config).unwrap_or_default());
    info!("host: {}", Monitor::new().host_info().to_json());

    let location = format!("i2c-{} (0x{:02x})", config.i2c_bus, config.i2c_address);
    let mut board = match PiGlow::open(config.i2c_bus, config.i2c_address) {
        Ok(board) => board,
        Err(err) => {
            debug!("unable to open {}: {}", location, err);
            return Err(daemon::board_absent(&location, config.absent_delay).await);
        }
    };
    daemon::check_board(&mut board, &location, config.absent_delay).await?;

    let gauge = Gauge::start(ProcStat::new(&config.stat_path), board, config.brightness)?;

    let mut reporter = config.report.then(|| Reporter::new(io::stdout()));
    let on_sample = move |sample: &Sample| {
        if let Some(reporter) = reporter.as_mut() {
            if let Err(err) = reporter.emit(sample) {
                warn!("report write failed: {}", err);
            }
        }
    };

    info!("sampling every {}ms", config.period.as_millis());
    daemon::supervise(gauge, config.period, stop.wait(), on_sample).await?;
    Ok(())
}
