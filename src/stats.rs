// SCHEDPIPE SAMPLE ACCUMULATOR
// SINGLE-PASS STREAMING MOMENTS: SUM, SUM OF SQUARES, COUNT.
// NO SAMPLE STORAGE. NOT NUMERICALLY STABLE FOR HUGE COUNTS (NOT NEEDED HERE).

use crate::error::{BenchError, Result};

// NORMAL QUANTILES FOR TWO-SIDED 95% / 99% INTERVALS
pub const Z95: f64 = 1.96;
pub const Z99: f64 = 2.58;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Accumulator {
    sum: f64,
    sum_sq: f64,
    count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub count: u64,
    pub avg: f64,
    pub var: f64,
    pub std: f64,
    pub ste: f64,
    pub c95: f64,
    pub c99: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    // REBUILD FROM PREVIOUSLY COLLECTED MOMENTS
    pub fn from_parts(sum: f64, sum_sq: f64, count: u64) -> Self {
        Self { sum, sum_sq, count }
    }

    pub fn add_sample(&mut self, x: f64) {
        self.sum += x;
        self.sum_sq += x * x;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn stats(&self) -> Result<Stats> {
        if self.count == 0 {
            return Err(BenchError::EmptyAccumulator);
        }
        let n = self.count as f64;
        let avg = self.sum / n;
        // CANCELLATION CAN LEAVE -1e-18 FOR CONSTANT SAMPLES
        let var = (self.sum_sq / n - avg * avg).max(0.0);
        let std = var.sqrt();
        let ste = std / n.sqrt();
        Ok(Stats {
            count: self.count,
            avg,
            var,
            std,
            ste,
            c95: Z95 * ste,
            c99: Z99 * ste,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_fails() {
        let acc = Accumulator::new();
        assert!(matches!(acc.stats(), Err(BenchError::EmptyAccumulator)));
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let mut acc = Accumulator::new();
        acc.add_sample(3.5);
        let s = acc.stats().unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.avg, 3.5);
        assert_eq!(s.var, 0.0);
        assert_eq!(s.c95, 0.0);
    }

    #[test]
    fn known_moments() {
        // 2, 4, 4, 4, 5, 5, 7, 9 -> MEAN 5, POPULATION VARIANCE 4
        let mut acc = Accumulator::new();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add_sample(x);
        }
        let s = acc.stats().unwrap();
        assert_eq!(s.count, 8);
        assert!((s.avg - 5.0).abs() < 1e-12);
        assert!((s.var - 4.0).abs() < 1e-12);
        assert!((s.std - 2.0).abs() < 1e-12);
        assert!((s.ste - 2.0 / 8f64.sqrt()).abs() < 1e-12);
        assert!((s.c95 - 1.96 * s.ste).abs() < 1e-12);
        assert!((s.c99 - 2.58 * s.ste).abs() < 1e-12);
    }

    #[test]
    fn constant_samples_never_negative_variance() {
        let mut acc = Accumulator::new();
        for _ in 0..1000 {
            acc.add_sample(0.1);
        }
        let s = acc.stats().unwrap();
        assert!(s.var >= 0.0);
        assert!(!s.std.is_nan());
    }

    #[test]
    fn from_parts_matches_streaming() {
        let mut acc = Accumulator::new();
        for x in [1.0, 2.0, 3.0] {
            acc.add_sample(x);
        }
        let rebuilt = Accumulator::from_parts(6.0, 14.0, 3);
        assert_eq!(acc, rebuilt);
        assert_eq!(acc.stats().unwrap(), rebuilt.stats().unwrap());
    }
}
