// SCHEDPIPE v1.0.0 -- SCHEDULER PIPE BENCHMARK AND REPORTING
// PIN CPUFREQ GOVERNOR, RUN `perf bench sched pipe` FOR 1..N TASK PAIRS,
// WRITE THE STATISTICS TABLE, PLOT IT, RESTORE THE GOVERNOR.
//
// EXIT CODES: 0 OK / HELP, 1 BENCHMARK FAILURE, 2 NOT ROOT OR BAD ARGUMENTS

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use schedpipe::bench::Driver;
use schedpipe::cli::{self, Cli, CliOutcome};
use schedpipe::governor::{Cpufreq, GovernorScope};
use schedpipe::host::{self, HostInfo};
use schedpipe::plot;
use schedpipe::report::{self, ReportHeader, ReportWriter};
use schedpipe::BenchError;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = match cli::parse(std::env::args_os()) {
        CliOutcome::Run(cli) => cli,
        CliOutcome::Help(usage) => {
            print!("{}", usage);
            return ExitCode::SUCCESS;
        }
        CliOutcome::ArgError(msg) => {
            eprint!("{}", msg);
            eprintln!("for help use --help");
            return ExitCode::from(2);
        }
    };

    init_logging(cli.verbose);
    for arg in &cli.args {
        tracing::debug!("processing argument {}", arg);
    }

    if !host::is_root() {
        eprintln!("#\n# {}.", BenchError::Privilege);
        return ExitCode::from(2);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("schedpipe: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    let host = HostInfo::detect();
    let config = cli.bench_config(host.cpus);
    config.validate()?;

    println!("SCHEDPIPE v1.0.0");
    println!("CPUS:            {}", host.cpu_system());
    println!("PLATFORM:        {}", host.platform);
    println!("GOVERNOR:        {} -> {}",
             if host.governor.is_empty() { "unknown" } else { &host.governor },
             cli.governor);
    println!("TASK PAIRS:      1..{}", config.tasks);
    println!("LOOPS x RUNS:    {} x {}", config.loops, config.runs);
    println!();

    let cpufreq = Cpufreq::new(host.cpus);
    let scope = GovernorScope::enter(&cpufreq, &cli.governor)?;

    // ANY ERROR BELOW DROPS scope, WHICH RESTORES THE GOVERNOR
    let data = benchmark(cli, &host)?;
    scope.restore()?;

    println!("\nSCHED PIPE DATA: {}", data.display());

    if cli.no_plot {
        return Ok(());
    }
    let cpu_system = host.cpu_system();
    let subtitles = [cpu_system.as_str(), host.platform.as_str()];
    let pdf = plot::render(&data, &subtitles, &cli.plot_options())
        .with_context(|| format!("plotting {}", data.display()))?;
    if let Some(pdf) = pdf {
        println!("SCHED PIPE PLOT: {}", pdf.display());
    }
    Ok(())
}

fn benchmark(cli: &Cli, host: &HostInfo) -> Result<PathBuf> {
    let config = cli.bench_config(host.cpus);
    let now = Local::now();
    let path = report::report_path(&cli.output_dir, &now);
    tracing::debug!("output on {}", path.display());

    let mut writer = ReportWriter::create(&path)
        .with_context(|| format!("creating {}", path.display()))?
        .echo(true);
    writer.write_header(&ReportHeader::capture(config, host.cpus, now))?;

    let driver = Driver::new(config, cli.measure_command(), &SHUTDOWN).progress(true);
    driver.run(&mut writer)?;

    tracing::info!("sched pipe data: {}", path.display());
    Ok(path)
}
