// SCHEDPIPE REPORT FILE
// FIXED-WIDTH TEXT TABLE. '#' LINES ARE METADATA, EVERYTHING ELSE IS ONE ROW PER TASK-PAIR COUNT.
// EACH ROW IS FLUSHED AS SOON AS IT EXISTS: AN ABORTED BENCHMARK LEAVES A VALID PARTIAL REPORT.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::bench::BenchConfig;
use crate::error::{BenchError, Result};
use crate::host;
use crate::stats::Stats;

pub const BENCHMARK_NAME: &str = "Perf Sched FIFO";
const RULE_WIDTH: usize = 152;
const COLUMNS: usize = 13;

// SIX FIELDS PER SERIES. THE SAMPLE COUNT ONLY SURVIVES AS THE pairs COLUMN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub avg: f64,
    pub var: f64,
    pub std: f64,
    pub ste: f64,
    pub c95: f64,
    pub c99: f64,
}

impl From<&Stats> for Summary {
    fn from(s: &Stats) -> Self {
        Self {
            avg: s.avg,
            var: s.var,
            std: s.std,
            ste: s.ste,
            c95: s.c95,
            c99: s.c99,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Row {
    pub pairs: u64,
    pub latency: Summary,
    pub run: Summary,
}

impl Row {
    // pairs = LATENCY SAMPLES PER RUN, WHICH IS THE TASK-PAIR COUNT
    pub fn from_stats(latency: &Stats, run: &Stats, runs: u64) -> Self {
        Self {
            pairs: latency.count / runs.max(1),
            latency: latency.into(),
            run: run.into(),
        }
    }

    pub fn format(&self) -> String {
        let l = &self.latency;
        let r = &self.run;
        format!(
            "{:7} {:012.9} {:11.9} {:11.9} {:11.9} {:11.9} {:11.9} \
             {:012.9} {:11.9} {:11.9} {:11.9} {:11.9} {:11.9}",
            self.pairs, l.avg, l.var, l.std, l.ste, l.c95, l.c99,
            r.avg, r.var, r.std, r.ste, r.c95, r.c99
        )
    }
}

// WHERE ROWS GO AS THE DRIVER PRODUCES THEM
pub trait RowSink {
    fn emit(&mut self, row: &Row) -> Result<()>;
}

impl RowSink for Vec<Row> {
    fn emit(&mut self, row: &Row) -> Result<()> {
        self.push(*row);
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ReportHeader {
    pub config: BenchConfig,
    pub cpus: usize,
    pub governor: String,
    pub cur_freq: String,
    pub timestamp: DateTime<Local>,
}

impl ReportHeader {
    // READ AFTER THE GOVERNOR SWITCH: THE HEADER DESCRIBES THE CONDITIONS OF THE RUN
    pub fn capture(config: BenchConfig, cpus: usize, timestamp: DateTime<Local>) -> Self {
        Self {
            config,
            cpus,
            governor: host::read_cpufreq("scaling_governor"),
            cur_freq: host::read_cpufreq("scaling_cur_freq"),
            timestamp,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let rule = hrule();
        vec![
            rule.clone(),
            format!("# Benchmark              : {}", BENCHMARK_NAME),
            format!("# Number of task pairs   : {}", self.config.tasks),
            format!("# Number of loops        : {}", self.config.loops),
            format!("# Number of runs         : {}", self.config.runs),
            format!("# Number of CPUs         : {}", self.cpus),
            format!("# CPUfreq governor       : {}", self.governor),
            format!("# CPUfreq frequency (kHz): {}", self.cur_freq),
            format!("# Test date              : {}", self.timestamp.format("%Y-%m-%d %H:%M:%S")),
            "#".to_string(),
            format!(
                "#       /{} Test Stats {}\\ /{} Run Stats {}\\",
                "=".repeat(30),
                "=".repeat(28),
                "=".repeat(30),
                "=".repeat(29)
            ),
            format!(
                "# pairs{}{}",
                "          avg         var         std         ste         c95         c99",
                "          avg         var         std         ste         c95         c99"
            ),
            rule,
        ]
    }
}

fn hrule() -> String {
    format!("#{}", "=".repeat(RULE_WIDTH))
}

pub fn report_path(dir: &Path, timestamp: &DateTime<Local>) -> PathBuf {
    dir.join(timestamp.format("test_%Y%m%d_%H%M%S_pipe.dat").to_string())
}

pub fn plot_path(report: &Path) -> PathBuf {
    report.with_extension("pdf")
}

pub struct ReportWriter<W: Write> {
    out: W,
    echo: bool,
}

impl ReportWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, echo: false }
    }

    // MIRROR EVERYTHING WRITTEN TO THE FILE ON STDOUT
    pub fn echo(mut self, on: bool) -> Self {
        self.echo = on;
        self
    }

    pub fn write_header(&mut self, header: &ReportHeader) -> Result<()> {
        for line in header.lines() {
            self.write_line(&line)?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line)?;
        if self.echo {
            println!("{}", line);
        }
        Ok(())
    }
}

impl<W: Write> RowSink for ReportWriter<W> {
    fn emit(&mut self, row: &Row) -> Result<()> {
        self.write_line(&row.format())?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let text = std::fs::read_to_string(path)?;
    parse_rows(&text, path)
}

// path IS ONLY USED TO LABEL ERRORS
pub fn parse_rows(text: &str, path: &Path) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let bad = |reason: String| BenchError::Report {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        };
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != COLUMNS {
            return Err(bad(format!("expected {} columns, found {}", COLUMNS, fields.len())));
        }
        let pairs = fields[0]
            .parse::<u64>()
            .map_err(|e| bad(format!("pairs {:?}: {}", fields[0], e)))?;
        let mut vals = [0.0f64; COLUMNS - 1];
        for (slot, raw) in vals.iter_mut().zip(&fields[1..]) {
            *slot = raw
                .parse::<f64>()
                .map_err(|e| bad(format!("value {:?}: {}", raw, e)))?;
        }
        let summary = |v: &[f64]| Summary {
            avg: v[0],
            var: v[1],
            std: v[2],
            ste: v[3],
            c95: v[4],
            c99: v[5],
        };
        rows.push(Row {
            pairs,
            latency: summary(&vals[..6]),
            run: summary(&vals[6..]),
        });
    }
    Ok(rows)
}
