// SCHEDPIPE CPUFREQ GOVERNOR CONTROL
// THE GOVERNOR IS HOST-WIDE STATE. SET ONCE BEFORE THE BENCHMARK, RESTORED ONCE AFTER.
// GovernorScope OWNS THE SNAPSHOT AND RESTORES IT ON EVERY EXIT PATH (Ok, Err, UNWIND).

use std::process::{Command, Stdio};

use crate::error::{BenchError, Result};
use crate::host;

pub const BENCH_GOVERNOR: &str = "performance";
const CPUFREQ_SET: &str = "cpufreq-set";

pub trait GovernorControl {
    // GOVERNOR CURRENTLY ACTIVE (CPU0 IS REPRESENTATIVE)
    fn current(&self) -> Result<String>;

    // APPLY TO EVERY LOGICAL CPU. FIRST FAILURE ABORTS.
    fn apply(&self, governor: &str) -> Result<()>;
}

pub struct Cpufreq {
    cpus: usize,
}

impl Cpufreq {
    pub fn new(cpus: usize) -> Self {
        Self { cpus }
    }
}

impl GovernorControl for Cpufreq {
    fn current(&self) -> Result<String> {
        let gov = host::read_cpufreq("scaling_governor");
        if gov.is_empty() {
            return Err(BenchError::Governor(format!(
                "no scaling_governor under {}",
                host::CPUFREQ_DIR
            )));
        }
        Ok(gov)
    }

    fn apply(&self, governor: &str) -> Result<()> {
        for cpu in 0..self.cpus {
            tracing::debug!(cpu, governor, "{} -c {} -g {}", CPUFREQ_SET, cpu, governor);
            let status = Command::new(CPUFREQ_SET)
                .args(["-c", &cpu.to_string(), "-g", governor])
                .stdout(Stdio::null())
                .status()
                .map_err(|e| BenchError::Governor(format!("{}: {}", CPUFREQ_SET, e)))?;
            if !status.success() {
                return Err(BenchError::Governor(format!(
                    "{} -c {} -g {} exited with {}",
                    CPUFREQ_SET, cpu, governor, status
                )));
            }
        }
        Ok(())
    }
}

pub struct GovernorScope<'a, G: GovernorControl + ?Sized> {
    ctl: &'a G,
    previous: String,
    restored: bool,
}

impl<'a, G: GovernorControl + ?Sized> GovernorScope<'a, G> {
    pub fn enter(ctl: &'a G, profile: &str) -> Result<Self> {
        let previous = ctl.current()?;
        tracing::info!(previous = %previous, profile, "switching cpufreq governor");
        // BUILT BEFORE apply(): A PARTIAL APPLY IS STILL ROLLED BACK BY Drop
        let scope = Self {
            ctl,
            previous,
            restored: false,
        };
        scope.ctl.apply(profile)?;
        Ok(scope)
    }

    pub fn previous(&self) -> &str {
        &self.previous
    }

    // EXPLICIT RESTORE ON THE SUCCESS PATH SO THE ERROR IS NOT SWALLOWED
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        tracing::info!(governor = %self.previous, "restoring cpufreq governor");
        self.ctl.apply(&self.previous)
    }
}

impl<G: GovernorControl + ?Sized> Drop for GovernorScope<'_, G> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        tracing::info!(governor = %self.previous, "restoring cpufreq governor");
        if let Err(e) = self.ctl.apply(&self.previous) {
            tracing::error!("failed to restore governor {}: {}", self.previous, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeGovernor {
        active: RefCell<String>,
        applied: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl FakeGovernor {
        fn new(active: &str) -> Self {
            Self {
                active: RefCell::new(active.to_string()),
                applied: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    impl GovernorControl for FakeGovernor {
        fn current(&self) -> Result<String> {
            Ok(self.active.borrow().clone())
        }

        fn apply(&self, governor: &str) -> Result<()> {
            self.applied.borrow_mut().push(governor.to_string());
            if self.fail_on == Some(governor) {
                return Err(BenchError::Governor(format!("cannot set {}", governor)));
            }
            *self.active.borrow_mut() = governor.to_string();
            Ok(())
        }
    }

    #[test]
    fn explicit_restore() {
        let gov = FakeGovernor::new("powersave");
        let scope = GovernorScope::enter(&gov, BENCH_GOVERNOR).unwrap();
        assert_eq!(scope.previous(), "powersave");
        assert_eq!(*gov.active.borrow(), "performance");
        scope.restore().unwrap();
        assert_eq!(*gov.active.borrow(), "powersave");
        // RESTORE RAN ONCE, DROP DID NOT REPEAT IT
        assert_eq!(*gov.applied.borrow(), vec!["performance", "powersave"]);
    }

    #[test]
    fn restores_on_error_path() {
        let gov = FakeGovernor::new("schedutil");
        let run = || -> Result<()> {
            let _scope = GovernorScope::enter(&gov, BENCH_GOVERNOR)?;
            Err(BenchError::Interrupted)
        };
        assert!(matches!(run(), Err(BenchError::Interrupted)));
        assert_eq!(*gov.active.borrow(), "schedutil");
    }

    #[test]
    fn failed_apply_rolls_back() {
        let mut gov = FakeGovernor::new("ondemand");
        gov.fail_on = Some("performance");
        let res = GovernorScope::enter(&gov, BENCH_GOVERNOR);
        assert!(matches!(res, Err(BenchError::Governor(_))));
        assert_eq!(*gov.applied.borrow(), vec!["performance", "ondemand"]);
    }
}
