use std::cmp::Reverse;
use std::time::{Duration, Instant};

use crate::instance::VmInstance;

pub const PROFILE_INTERVAL: Duration = Duration::from_millis(100);
pub const PROFILE_LINES: usize = 10;

/// Reports the `n` busiest functions as `"{count:7}:{name}"` lines, highest
/// count first with ties in table order, and zeroes exactly those counters.
pub fn drain_top(vm: &mut VmInstance, n: usize) -> Vec<String> {
    let mut hot: Vec<(usize, u32)> = vm
        .image()
        .functions
        .iter()
        .enumerate()
        .filter(|(_, f)| f.profile > 0)
        .map(|(i, f)| (i, f.profile))
        .collect();
    // stable: equal counts keep table order
    hot.sort_by_key(|&(_, count)| Reverse(count));
    hot.truncate(n);

    let lines = hot
        .iter()
        .map(|&(i, count)| {
            let name = vm.image().string(vm.image().functions[i].name);
            format!("{count:7}:{name}")
        })
        .collect();

    let functions = vm.functions_mut();
    for &(i, _) in &hot {
        functions[i].profile = 0;
    }
    lines
}

/// Samples function call counters at a fixed wall-clock interval and keeps
/// the last report for display.
#[derive(Debug, Clone)]
pub struct Profiler {
    interval: Duration,
    last: Option<Instant>,
    lines: Vec<String>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::with_interval(PROFILE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            lines: Vec::new(),
        }
    }

    /// Refreshes the report if the interval has passed since the previous
    /// sample. Returns whether it did.
    pub fn sample(&mut self, vm: &mut VmInstance, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) <= self.interval {
                return false;
            }
        }
        self.last = Some(now);
        self.lines = drain_top(vm, PROFILE_LINES);
        true
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
