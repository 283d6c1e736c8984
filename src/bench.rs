// SCHEDPIPE BENCHMARK DRIVER
// FOR k = 1..=tasks: `runs` ROUNDS OF k CONCURRENT `perf bench sched pipe` PAIRS.
// ONE LATENCY SAMPLE PER PAIR, ONE WALL-CLOCK SAMPLE PER ROUND, ONE REPORT ROW PER k.
//
// ORDERING: k STRICTLY INCREASING, ROUNDS STRICTLY SEQUENTIAL.
// WITHIN A ROUND ALL k CHILDREN ARE LAUNCHED BACK-TO-BACK, THEN JOINED IN LAUNCH ORDER.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::{BenchError, Result};
use crate::report::{Row, RowSink};
use crate::stats::Accumulator;

pub const DEFAULT_LOOPS: u64 = 1_000_000;
pub const DEFAULT_RUNS: u64 = 30;
// DEFAULT UPPER BOUND: 4 PAIRS PER CPU
pub const TASKS_PER_CPU: u64 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    pub tasks: u64,
    pub loops: u64,
    pub runs: u64,
}

impl BenchConfig {
    pub fn for_host(cpus: usize) -> Self {
        Self {
            tasks: TASKS_PER_CPU * cpus.max(1) as u64,
            loops: DEFAULT_LOOPS,
            runs: DEFAULT_RUNS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("tasks", self.tasks), ("loops", self.loops), ("runs", self.runs)] {
            if v == 0 {
                return Err(BenchError::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

// ONE TASK-PAIR MEASUREMENT: <program> <args..> -l<loops>
// MUST PRINT EXACTLY ONE NUMBER ON STDOUT
#[derive(Clone, Debug)]
pub struct MeasureCommand {
    program: String,
    args: Vec<String>,
}

impl MeasureCommand {
    pub fn new<S: Into<String>>(program: S, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn perf_sched_pipe(perf: &str) -> Self {
        Self::new(perf, &["bench", "--format=simple", "sched", "pipe"])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn spawn(&self, loops: u64) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(format!("-l{}", loops))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| BenchError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

pub fn parse_measurement(stdout: &str) -> Result<f64> {
    let bad = || BenchError::Parse {
        output: stdout.to_string(),
    };
    let mut tokens = stdout.split_whitespace();
    let value = match (tokens.next(), tokens.next()) {
        (Some(tok), None) => tok.parse::<f64>().map_err(|_| bad())?,
        _ => return Err(bad()),
    };
    if !value.is_finite() {
        return Err(bad());
    }
    Ok(value)
}

// JOIN-ALL OVER INDEPENDENTLY SPAWNED CHILDREN.
// ANY CHILD STILL HELD AT DROP (EARLIER SPAWN OR JOIN FAILED) IS KILLED AND REAPED.
pub struct TaskGroup {
    program: String,
    children: Vec<Child>,
}

impl TaskGroup {
    pub fn launch(cmd: &MeasureCommand, loops: u64, count: u64) -> Result<Self> {
        let mut group = Self {
            program: cmd.program().to_string(),
            children: Vec::with_capacity(count as usize),
        };
        for _ in 0..count {
            let child = cmd.spawn(loops)?;
            group.children.push(child);
        }
        Ok(group)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    // BLOCKS ON EACH CHILD IN LAUNCH ORDER. FIRST FAILURE WINS.
    pub fn join(mut self) -> Result<Vec<f64>> {
        let mut samples = Vec::with_capacity(self.children.len());
        while !self.children.is_empty() {
            let child = self.children.remove(0);
            let output = child.wait_with_output()?;
            if !output.status.success() {
                return Err(BenchError::ExitStatus {
                    program: self.program.clone(),
                    status: output.status,
                });
            }
            samples.push(parse_measurement(&String::from_utf8_lossy(&output.stdout))?);
        }
        Ok(samples)
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for child in self.children.iter_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub struct Driver<'a> {
    config: BenchConfig,
    cmd: MeasureCommand,
    shutdown: &'a AtomicBool,
    progress: bool,
}

impl<'a> Driver<'a> {
    pub fn new(config: BenchConfig, cmd: MeasureCommand, shutdown: &'a AtomicBool) -> Self {
        Self {
            config,
            cmd,
            shutdown,
            progress: false,
        }
    }

    // "      k ...\r" ON STDOUT BEFORE EACH TASK-PAIR COUNT
    pub fn progress(mut self, on: bool) -> Self {
        self.progress = on;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run<S: RowSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        self.config.validate()?;
        tracing::debug!(
            tasks = self.config.tasks,
            loops = self.config.loops,
            runs = self.config.runs,
            "running sched pipe benchmark"
        );
        for pairs in 1..=self.config.tasks {
            if self.progress {
                print!("{:7} ...\r", pairs);
                let _ = std::io::stdout().flush();
            }
            let row = self.measure_pairs(pairs)?;
            sink.emit(&row)?;
        }
        Ok(())
    }

    pub fn measure_pairs(&self, pairs: u64) -> Result<Row> {
        let mut latency = Accumulator::new();
        let mut run_time = Accumulator::new();

        for run in 0..self.config.runs {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(BenchError::Interrupted);
            }

            let start = Instant::now();
            let group = TaskGroup::launch(&self.cmd, self.config.loops, pairs)?;
            for sample in group.join()? {
                latency.add_sample(sample);
            }
            let elapsed = start.elapsed().as_secs_f64();
            run_time.add_sample(elapsed);

            tracing::debug!(pairs, run, elapsed, "run complete");
        }

        Ok(Row::from_stats(
            &latency.stats()?,
            &run_time.stats()?,
            self.config.runs,
        ))
    }
}
