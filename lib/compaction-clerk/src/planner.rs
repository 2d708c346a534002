//! Selects the best contiguous run of candidates to compact.

use crate::candidate::{Candidate, JournalHandle};
use crate::config::{MRCT, SFCT};

/// The target liveness mean a run of length `length` must beat, under a cap of `max_run_length`.
///
/// Longer runs get a laxer target: amortized I/O per reclaimed byte improves with run length, so
/// the bar for "worth compacting" relaxes from `SFCT` at length 1 up to `MRCT` at
/// `max_run_length`.
fn target(length: usize, max_run_length: usize) -> f64 {
    if max_run_length > 1 {
        SFCT + (MRCT - SFCT) * ((length - 1) as f64) / ((max_run_length - 1) as f64)
    } else {
        SFCT
    }
}

/// Scores a candidate run: higher is more worth compacting. An empty run scores exactly `0.0`.
pub fn score_run<H: JournalHandle>(run: &[Candidate<H>], max_run_length: usize) -> f64 {
    if run.is_empty() {
        return 0.0;
    }
    let mean = run.iter().map(|c| c.compaction_perc).sum::<f64>() / (run.len() as f64);
    target(run.len(), max_run_length) - mean
}

/// A chosen contiguous run, expressed as a half-open index range into the candidate list that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: usize,
    end: usize,
}

impl Window {
    fn len(self) -> usize {
        self.end - self.start
    }
}

/// One greedy forward scan starting at `start_offset`: extends the window by one candidate at a
/// time, resetting to a fresh singleton whenever extending would exceed `max_run_length`, and
/// tracks the best-scoring window seen.
fn scan<H: JournalHandle>(candidates: &[Candidate<H>], max_run_length: usize, start_offset: usize) -> Option<(Window, f64)> {
    if start_offset >= candidates.len() {
        return None;
    }

    let mut best: Option<(Window, f64)> = None;
    let mut window = Window {
        start: start_offset,
        end: start_offset,
    };

    for i in start_offset..candidates.len() {
        let candidate_window = Window {
            start: window.start,
            end: i + 1,
        };

        window = if candidate_window.len() <= max_run_length {
            candidate_window
        } else {
            // Can't extend past the cap; keep whatever we had, and start a new singleton here.
            Window { start: i, end: i + 1 }
        };

        let score = score_run(&candidates[window.start..window.end], max_run_length);
        let better = match best {
            // Ties keep the earlier (first-seen) run.
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if better {
            best = Some((window, score));
        }
    }

    best
}

/// Selects the best contiguous run of length `<= max_run_length` under the length-aware target
/// score, repeating the greedy scan at every starting offset `1..max_run_length - 1` to recover
/// from a poor choice at offset 0 (bounded back-tracking).
///
/// `candidates` must be in manifest order (ascending `low_sqn`).
pub fn plan<H: JournalHandle + Clone>(candidates: &[Candidate<H>], max_run_length: usize) -> Vec<Candidate<H>> {
    if candidates.is_empty() || max_run_length == 0 {
        return Vec::new();
    }

    let mut best = scan(candidates, max_run_length, 0);

    for start_offset in 1..max_run_length.saturating_sub(1).max(1) {
        if let Some((window, score)) = scan(candidates, max_run_length, start_offset) {
            let replace = match best {
                Some((_, best_score)) => score > best_score,
                None => true,
            };
            if replace {
                best = Some((window, score));
            }
        }
    }

    match best {
        Some((window, _)) => {
            let run = candidates[window.start..window.end].to_vec();
            #[cfg(feature = "metrics")]
            metrics::counter!("compaction_runs_planned").increment(1);
            run
        }
        None => Vec::new(),
    }
}
