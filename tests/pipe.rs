// SCHEDPIPE LIVE BENCHMARK
// REAL `perf bench sched pipe` UNDER A PINNED GOVERNOR, SHORT CONFIGURATION.
//
// REQUIRES ROOT + perf + cpufreq-set.
// RUN: sudo cargo test --test pipe --release -- --ignored --test-threads=1 --nocapture

use std::fs;
use std::process::Command;
use std::sync::atomic::AtomicBool;

use chrono::Local;

use schedpipe::bench::{BenchConfig, Driver, MeasureCommand};
use schedpipe::governor::{Cpufreq, GovernorControl, GovernorScope, BENCH_GOVERNOR};
use schedpipe::host::{self, HostInfo};
use schedpipe::plot;
use schedpipe::report::{self, ReportHeader, ReportWriter};

const LOG_DIR: &str = "/tmp/schedpipe";

fn have_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[test]
#[ignore]
fn live_sched_pipe() {
    assert!(host::is_root(), "LIVE BENCHMARK REQUIRES ROOT (CPUFREQ)");
    assert!(have_tool("perf"), "perf NOT FOUND");
    assert!(have_tool("cpufreq-set"), "cpufreq-set NOT FOUND");

    let host = HostInfo::detect();
    let cpufreq = Cpufreq::new(host.cpus);
    let before = cpufreq.current().expect("CPUFREQ NOT EXPOSED");
    println!("CPUS: {}  GOVERNOR: {}", host.cpu_system(), before);

    fs::create_dir_all(LOG_DIR).expect("FAILED TO CREATE LOG DIR");
    let config = BenchConfig { tasks: 2u64.min(host.cpus as u64).max(1), loops: 10_000, runs: 3 };
    let now = Local::now();
    let path = report::report_path(std::path::Path::new(LOG_DIR), &now);

    {
        let scope = GovernorScope::enter(&cpufreq, BENCH_GOVERNOR).expect("GOVERNOR SWITCH FAILED");
        assert_eq!(host::read_cpufreq("scaling_governor"), BENCH_GOVERNOR);

        let mut writer = ReportWriter::create(&path).unwrap().echo(true);
        writer
            .write_header(&ReportHeader::capture(config, host.cpus, now))
            .unwrap();
        let shutdown = AtomicBool::new(false);
        Driver::new(config, MeasureCommand::perf_sched_pipe("perf"), &shutdown)
            .run(&mut writer)
            .expect("BENCHMARK FAILED");

        scope.restore().expect("GOVERNOR RESTORE FAILED");
    }
    assert_eq!(cpufreq.current().unwrap(), before);

    let rows = report::read_rows(&path).unwrap();
    assert_eq!(rows.len() as u64, config.tasks);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.pairs, i as u64 + 1);
        assert!(row.latency.avg > 0.0);
        assert!(row.run.avg > 0.0);
    }
    for f in plot::fairness(&rows) {
        println!("PAIRS {:>3}  FAIRNESS {:.3}{}", f.pairs, f.index,
                 if f.anomalous { "  (ANOMALY)" } else { "" });
    }
    println!("\nSAVED TO {}", path.display());
}
