// SCHEDPIPE COMMAND LINE
// PARSING NEVER EXITS THE PROCESS: THE CALLER GETS RUN / HELP / ARGUMENT ERROR AND PICKS THE EXIT CODE.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::bench::{BenchConfig, MeasureCommand, DEFAULT_LOOPS, DEFAULT_RUNS};
use crate::governor::BENCH_GOVERNOR;
use crate::plot::PlotOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "schedpipe")]
#[command(about = "SCHEDPIPE -- SCHEDULER PIPE BENCHMARK AND REPORTING")]
#[command(long_about = "Runs `perf bench sched pipe` for 1..N concurrent task pairs, \
    repeating each point several times, writes a timestamped statistics table \
    (test_YYYYmmdd_HHMMSS_pipe.dat) and plots task/run completion time and the \
    fairness index.\n\nRequires ROOT to pin the CPUfreq governor during the test.")]
pub struct Cli {
    /// Display the plot interactively instead of saving a PDF
    #[arg(short, long)]
    pub show: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Upper bound of concurrent task pairs [default: 4 x online CPUs]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub tasks: Option<u64>,

    /// Ping-pong loops per task pair
    #[arg(short, long, default_value_t = DEFAULT_LOOPS, value_parser = clap::value_parser!(u64).range(1..))]
    pub loops: u64,

    /// Repetitions per task-pair count
    #[arg(short, long, default_value_t = DEFAULT_RUNS, value_parser = clap::value_parser!(u64).range(1..))]
    pub runs: u64,

    /// Directory for the report and the plot
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// CPUfreq governor held during the benchmark
    #[arg(short, long, default_value = BENCH_GOVERNOR)]
    pub governor: String,

    /// perf executable
    #[arg(long, default_value = "perf")]
    pub perf: String,

    /// gnuplot executable
    #[arg(long, default_value = "gnuplot")]
    pub gnuplot: String,

    /// Skip plotting
    #[arg(long)]
    pub no_plot: bool,

    /// Extra arguments (accepted, not used)
    pub args: Vec<String>,
}

#[derive(Debug)]
pub enum CliOutcome {
    Run(Box<Cli>),
    // RENDERED USAGE, FOR STDOUT
    Help(String),
    // RENDERED ERROR, FOR STDERR
    ArgError(String),
}

pub fn parse<I, T>(args: I) -> CliOutcome
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => CliOutcome::Run(Box::new(cli)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliOutcome::Help(e.to_string()),
            _ => CliOutcome::ArgError(e.to_string()),
        },
    }
}

impl Cli {
    pub fn bench_config(&self, cpus: usize) -> BenchConfig {
        let defaults = BenchConfig::for_host(cpus);
        BenchConfig {
            tasks: self.tasks.unwrap_or(defaults.tasks),
            loops: self.loops,
            runs: self.runs,
        }
    }

    pub fn measure_command(&self) -> MeasureCommand {
        MeasureCommand::perf_sched_pipe(&self.perf)
    }

    pub fn plot_options(&self) -> PlotOptions {
        PlotOptions {
            show: self.show,
            gnuplot: self.gnuplot.clone(),
        }
    }
}
