// SCHEDPIPE PLOT RENDERER
// READS THE REPORT TABLE BACK AND HANDS GNUPLOT A SELF-CONTAINED SCRIPT (DATA INLINED).
//
// TOP PANEL (3/4):    TASK TIME AND RUN TIME MEANS, c99 ERROR BARS, VS TASK PAIRS
// BOTTOM PANEL (1/4): FAIRNESS INDEX = 1 - TASK TIME / RUN TIME, BARS, Y FIXED TO [0,1]

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{BenchError, Result};
use crate::report::{self, Row};

pub const TITLE: &str = "Sched PIPE Test Analysis";

#[derive(Clone, Debug)]
pub struct PlotOptions {
    // INTERACTIVE WINDOW INSTEAD OF A PDF NEXT TO THE REPORT
    pub show: bool,
    pub gnuplot: String,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            show: false,
            gnuplot: "gnuplot".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Fairness {
    pub pairs: u64,
    pub index: f64,
    // OUTSIDE [0,1]: TASK TIME EXCEEDED RUN TIME (OR RUN TIME WAS ZERO)
    pub anomalous: bool,
}

pub fn fairness_index(latency_avg: f64, run_avg: f64) -> f64 {
    1.0 - latency_avg / run_avg
}

// UNCLAMPED. ANOMALIES ARE REPORTED, NOT HIDDEN.
pub fn fairness(rows: &[Row]) -> Vec<Fairness> {
    rows.iter()
        .map(|r| {
            let index = fairness_index(r.latency.avg, r.run.avg);
            let anomalous = !(0.0..=1.0).contains(&index);
            if anomalous {
                tracing::warn!(
                    pairs = r.pairs,
                    task_time = r.latency.avg,
                    run_time = r.run.avg,
                    "fairness index {} outside [0,1]",
                    index
                );
            }
            Fairness {
                pairs: r.pairs,
                index,
                anomalous,
            }
        })
        .collect()
}

// GNUPLOT DOUBLE-QUOTED STRING
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

// output = None -> DEFAULT (INTERACTIVE) TERMINAL
pub fn gnuplot_script(rows: &[Row], subtitles: &[&str], output: Option<&Path>) -> String {
    let index = fairness(rows);
    let max_pairs = rows.iter().map(|r| r.pairs).max().unwrap_or(1);
    let mut s = String::new();

    // WRITES TO A String CANNOT FAIL
    let _ = writeln!(s, "$data << EOD");
    for (r, f) in rows.iter().zip(&index) {
        let _ = writeln!(
            s,
            "{} {:.9} {:.9} {:.9} {:.9} {:.9}",
            r.pairs, r.latency.avg, r.latency.c99, r.run.avg, r.run.c99, f.index
        );
    }
    let _ = writeln!(s, "EOD");

    if let Some(path) = output {
        // A3 PORTRAIT
        let _ = writeln!(s, "set terminal pdfcairo noenhanced size 29.7cm,42cm font \"Sans,11\"");
        let _ = writeln!(s, "set output {}", quote(&path.to_string_lossy()));
    }
    let mut title = TITLE.to_string();
    for sub in subtitles {
        title.push('\n');
        title.push_str(sub);
    }
    let _ = writeln!(s, "set termoption noenhanced");
    let _ = writeln!(s, "set multiplot title {}", quote(&title));
    let _ = writeln!(s, "set lmargin 12");
    let _ = writeln!(s, "set xrange [0.5:{}.5]", max_pairs);
    let _ = writeln!(s, "set grid ytics");

    let _ = writeln!(s, "set origin 0,0.25");
    let _ = writeln!(s, "set size 1,0.63");
    let _ = writeln!(s, "set ylabel \"Time [s]\"");
    let _ = writeln!(s, "set key bottom right");
    let _ = writeln!(
        s,
        "plot $data using 1:2:3 with yerrorlines title \"Task time\", \
         $data using 1:4:5 with yerrorlines title \"Run time\""
    );

    let _ = writeln!(s, "set origin 0,0");
    let _ = writeln!(s, "set size 1,0.25");
    let _ = writeln!(s, "set xlabel \"Number of task pairs\"");
    let _ = writeln!(s, "set ylabel \"Index\"");
    let _ = writeln!(s, "set yrange [0:1]");
    let _ = writeln!(s, "set key top right");
    let _ = writeln!(s, "set style fill solid 0.6");
    let _ = writeln!(s, "set boxwidth 0.8");
    let _ = writeln!(s, "plot $data using 1:6 with boxes title \"Fairness index\"");
    let _ = writeln!(s, "unset multiplot");
    if output.is_some() {
        let _ = writeln!(s, "set output");
    }
    s
}

// RETURNS THE PDF PATH, OR None WHEN SHOWN INTERACTIVELY
pub fn render(report: &Path, subtitles: &[&str], opts: &PlotOptions) -> Result<Option<PathBuf>> {
    tracing::debug!("parsing {}", report.display());
    let rows = report::read_rows(report)?;
    if rows.is_empty() {
        return Err(BenchError::Report {
            path: report.to_path_buf(),
            line: 0,
            reason: "no data rows to plot".to_string(),
        });
    }

    let output = if opts.show {
        None
    } else {
        Some(report::plot_path(report))
    };
    let script = gnuplot_script(&rows, subtitles, output.as_deref());

    match &output {
        Some(pdf) => tracing::info!("plotting {}", pdf.display()),
        None => tracing::debug!("plotting..."),
    }

    let mut cmd = Command::new(&opts.gnuplot);
    if opts.show {
        cmd.arg("-persist");
    }
    let mut child = cmd
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|source| BenchError::Spawn {
            program: opts.gnuplot.clone(),
            source,
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(script.as_bytes())?;
    }
    let status = child.wait()?;
    if !status.success() {
        return Err(BenchError::ExitStatus {
            program: opts.gnuplot.clone(),
            status,
        });
    }
    Ok(output)
}
