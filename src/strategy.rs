//! Reduction strategies: algorithms that repeatedly propose removals from a
//! `Testcase`'s reducible region and keep only the ones the oracle accepts.

use error;
use logger::Logger;
use oracle::{OracleDriver, Predicate};
use std::fmt;
use test_case::Testcase;

/// What repetition policy a chunk-halving pass uses once it reaches its
/// minimum chunk size; set via the `--repeat` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Re-run the whole pass at the same chunk size whenever it removed
    /// anything, at every chunk size, not only the minimum.
    Always,
    /// Re-run only the pass at the minimum chunk size, for as long as it
    /// keeps removing something. This is the default.
    Last,
    /// Run every chunk size exactly once.
    Never,
}

/// A record of what a strategy did, for the run controller's summary line
/// and JSON sidecar.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReductionReport {
    /// How many atoms were removed in total.
    pub atoms_removed: usize,
    /// How many oracle calls were `Interesting`.
    pub interesting_calls: usize,
    /// How many oracle calls were `Uninteresting`.
    pub uninteresting_calls: usize,
}

/// The largest power of two less than or equal to `n`, or `1` if `n` is 0.
/// Used to derive the default `chunk_max` from a test case's atom count.
pub fn largest_pow2_leq(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let mut p = 1usize;
    while p.checked_shl(1).map(|next| next <= n).unwrap_or(false) {
        p <<= 1;
    }
    p
}

/// A pluggable reduction algorithm.
pub trait Strategy: fmt::Debug {
    /// This strategy's name, as used on the CLI and in the registry.
    fn name(&self) -> &'static str;

    /// Run this strategy to completion (a local fixed point, or a single
    /// pass, depending on the strategy), repeatedly calling `oracle.test`
    /// and keeping only changes that stay interesting. Every oracle call
    /// is reported to `logger`.
    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport>;
}

/// Speculatively remove `range`, test, and keep the removal only if the
/// oracle still says interesting. Returns whether the removal stuck.
fn attempt_remove<P: Predicate, W: ::std::io::Write>(
    testcase: &mut Testcase,
    oracle: &mut OracleDriver<P>,
    range: ::std::ops::Range<usize>,
    report: &mut ReductionReport,
    logger: &mut Logger<W>,
) -> error::Result<bool> {
    if range.start == range.end {
        return Ok(false);
    }

    let snapshot = testcase.snapshot();
    let removed_len = range.end - range.start;
    let position = range.start;
    testcase.remove(range);
    testcase.save()?;

    let verdict = oracle.test(testcase.path())?;
    logger.oracle_call(oracle.call_count(), removed_len, position, verdict, testcase);
    match verdict {
        ::oracle::OracleVerdict::Interesting => {
            report.interesting_calls += 1;
            report.atoms_removed += removed_len;
            Ok(true)
        }
        ::oracle::OracleVerdict::Uninteresting => {
            report.uninteresting_calls += 1;
            testcase.restore(snapshot);
            testcase.save()?;
            Ok(false)
        }
    }
}

/// Drive the chunk-halving outer loop: call
/// `sweep_at(c)` for a shrinking sequence of chunk sizes from `chunk_max`
/// down to `chunk_min`, honoring `repeat` at each step. `sweep_at` must
/// perform one left-to-right pass at the given chunk size and report
/// whether it removed anything.
fn chunk_loop<F>(
    chunk_max: usize,
    chunk_min: usize,
    repeat: RepeatPolicy,
    mut sweep_at: F,
) -> error::Result<()>
where
    F: FnMut(usize) -> error::Result<bool>,
{
    let mut c = chunk_max;
    loop {
        if ::sigint::interrupted() {
            break;
        }
        let any_removed = sweep_at(c)?;

        let repeat_same = match repeat {
            RepeatPolicy::Always => any_removed,
            RepeatPolicy::Last => c == chunk_min && any_removed,
            RepeatPolicy::Never => false,
        };
        if repeat_same {
            continue;
        }

        if c == chunk_min {
            break;
        }
        c = ::std::cmp::max(c / 2, chunk_min);
    }
    Ok(())
}

/// Verify the initial test case is interesting, and otherwise do nothing.
#[derive(Clone, Copy, Debug)]
pub struct CheckOnly;

impl Strategy for CheckOnly {
    fn name(&self) -> &'static str {
        "check-only"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        _testcase: &mut Testcase,
        _oracle: &mut OracleDriver<P>,
        _logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        Ok(ReductionReport::default())
    }
}

/// Chunk-halving greedy minimization: the default strategy.
#[derive(Clone, Copy, Debug)]
pub struct Minimize {
    /// The largest chunk size to start from. Must be a power of two.
    pub max_chunk_size: usize,
    /// The smallest chunk size to stop at. Must be a power of two no
    /// greater than `max_chunk_size`.
    pub min_chunk_size: usize,
    /// What to do once a pass at a given chunk size removes something.
    pub repeat: RepeatPolicy,
}

impl Minimize {
    /// One left-to-right sweep at a fixed `chunk_size`: try removing each
    /// chunk `[i, i+chunk_size)` in turn; on acceptance, stay at `i` since
    /// the remaining atoms have shifted down into it; on rejection, advance
    /// past the chunk.
    fn sweep<P: Predicate, W: ::std::io::Write>(
        &self,
        chunk_size: usize,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        report: &mut ReductionReport,
        logger: &mut Logger<W>,
    ) -> error::Result<bool> {
        let mut any_removed = false;
        let mut start = 0;

        loop {
            if start >= testcase.len() || ::sigint::interrupted() {
                break;
            }
            let end = ::std::cmp::min(start + chunk_size, testcase.len());

            if attempt_remove(testcase, oracle, start..end, report, logger)? {
                any_removed = true;
            } else {
                start = end;
            }
        }

        Ok(any_removed)
    }
}

impl Strategy for Minimize {
    fn name(&self) -> &'static str {
        "minimize"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        let mut report = ReductionReport::default();
        chunk_loop(
            self.max_chunk_size,
            self.min_chunk_size,
            self.repeat,
            |c| self.sweep(c, testcase, oracle, &mut report, logger),
        )?;
        Ok(report)
    }
}

/// At each chunk position, attempt to remove the chunk and its mirror
/// image from the opposite end of the reducible region simultaneously.
/// Useful for balanced prefix/suffix pairs (matching open/close tags at
/// mirrored positions) that must disappear together.
#[derive(Clone, Copy, Debug)]
pub struct MinimizeSurroundingPairs {
    /// The largest chunk size to start from. Must be a power of two.
    pub max_chunk_size: usize,
    /// The smallest chunk size to stop at. Must be a power of two no
    /// greater than `max_chunk_size`.
    pub min_chunk_size: usize,
    /// What to do once a pass at a given chunk size removes something.
    pub repeat: RepeatPolicy,
}

impl MinimizeSurroundingPairs {
    fn sweep<P: Predicate, W: ::std::io::Write>(
        &self,
        chunk_size: usize,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        report: &mut ReductionReport,
        logger: &mut Logger<W>,
    ) -> error::Result<bool> {
        let mut any_removed = false;
        let mut start = 0;

        loop {
            if ::sigint::interrupted() {
                break;
            }
            let n = testcase.len();
            if start >= n {
                break;
            }
            let end = ::std::cmp::min(start + chunk_size, n);
            let mirror_start = n - end;
            let mirror_end = n - start;

            if mirror_start < end {
                // The chunk and its mirror overlap: we've reached the
                // center of the reducible region.
                break;
            }

            let snapshot = testcase.snapshot();
            // Remove the higher range first so the lower range's indices
            // stay valid.
            testcase.remove(mirror_start..mirror_end);
            testcase.remove(start..end);
            testcase.save()?;

            let verdict = oracle.test(testcase.path())?;
            logger.oracle_call(oracle.call_count(), end - start, start, verdict, testcase);
            match verdict {
                ::oracle::OracleVerdict::Interesting => {
                    report.interesting_calls += 1;
                    report.atoms_removed += (end - start) + (mirror_end - mirror_start);
                    any_removed = true;
                }
                ::oracle::OracleVerdict::Uninteresting => {
                    report.uninteresting_calls += 1;
                    testcase.restore(snapshot);
                    testcase.save()?;
                    start = end;
                }
            }
        }

        Ok(any_removed)
    }
}

impl Strategy for MinimizeSurroundingPairs {
    fn name(&self) -> &'static str {
        "minimize-around"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        let mut report = ReductionReport::default();
        chunk_loop(
            self.max_chunk_size,
            self.min_chunk_size,
            self.repeat,
            |c| self.sweep(c, testcase, oracle, &mut report, logger),
        )?;
        Ok(report)
    }
}

fn all_matching_pairs(testcase: &Testcase) -> Vec<(usize, usize)> {
    const PAIRS: [(u8, u8); 4] = [(b'(', b')'), (b'{', b'}'), (b'[', b']'), (b'<', b'>')];

    let parts = testcase.parts();
    let mut pairs = Vec::new();

    for &(open, close) in &PAIRS {
        let mut stack = Vec::new();
        for (i, atom) in parts.iter().enumerate() {
            if atom.is_byte(open) {
                stack.push(i);
            } else if atom.is_byte(close) {
                if let Some(open_idx) = stack.pop() {
                    pairs.push((open_idx, i));
                }
            }
        }
    }

    pairs.sort();
    pairs
}

/// Remove ranges bounded by a matched pair of bracket-like atoms
/// (`(`/`)`, `{`/`}`, `[`/`]`, `<`/`>`) with nesting respected. If no
/// matched range starts at a given position, that position is skipped
/// without consulting the oracle.
#[derive(Clone, Copy, Debug)]
pub struct MinimizeBalancedPairs;

impl Strategy for MinimizeBalancedPairs {
    fn name(&self) -> &'static str {
        "minimize-balanced"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        let mut report = ReductionReport::default();

        'restart: loop {
            if ::sigint::interrupted() {
                break;
            }
            let pairs = all_matching_pairs(testcase);

            for (open_idx, close_idx) in pairs {
                if ::sigint::interrupted() {
                    break 'restart;
                }
                // Remove the whole bracketed range, including both
                // delimiters.
                if attempt_remove(testcase, oracle, open_idx..close_idx + 1, &mut report, logger)?
                {
                    continue 'restart;
                }
            }

            break;
        }

        Ok(report)
    }
}

/// Collapse `{ ... }` pairs whose interior is empty of further matched
/// pairs (i.e. adjacent open/close atoms with nothing between them left to
/// reduce) by deleting both delimiters simultaneously. Intended as a
/// post-pass after another strategy has already minimized the interior.
#[derive(Clone, Copy, Debug)]
pub struct CollapseEmptyBraces;

impl Strategy for CollapseEmptyBraces {
    fn name(&self) -> &'static str {
        "minimize-collapse-brace"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        let mut report = ReductionReport::default();

        'restart: loop {
            if ::sigint::interrupted() {
                break;
            }
            let parts = testcase.parts();
            let mut adjacent_pair = None;
            for i in 0..parts.len().saturating_sub(1) {
                if parts[i].is_byte(b'{') && parts[i + 1].is_byte(b'}') {
                    adjacent_pair = Some(i);
                    break;
                }
            }

            let open_idx = match adjacent_pair {
                Some(i) => i,
                None => break,
            };

            if ::sigint::interrupted() {
                break;
            }
            if attempt_remove(testcase, oracle, open_idx..open_idx + 2, &mut report, logger)? {
                continue 'restart;
            } else {
                // Can't collapse this pair; there's no other chunk size to
                // retry at, so stop to avoid looping forever on the same
                // rejected pair.
                break;
            }
        }

        Ok(report)
    }
}

/// Replace references to object properties with references to global
/// variables of the same name.
///
/// The exact rewrite semantics are JavaScript-specific follow-up work not
/// yet built, so this is a documented no-op: `run` performs zero rewrites
/// and reports an empty `ReductionReport`. Registered so
/// `--strategy=replace-properties-by-globals` is valid configuration, not
/// a `Config` error.
#[derive(Clone, Copy, Debug)]
pub struct ReplacePropertiesByGlobals;

impl Strategy for ReplacePropertiesByGlobals {
    fn name(&self) -> &'static str {
        "replace-properties-by-globals"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        _testcase: &mut Testcase,
        _oracle: &mut OracleDriver<P>,
        _logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        Ok(ReductionReport::default())
    }
}

/// Replace references to function arguments with references to global
/// variables of the same name. See `ReplacePropertiesByGlobals` for why
/// this is a documented no-op.
#[derive(Clone, Copy, Debug)]
pub struct ReplaceArgumentsByGlobals;

impl Strategy for ReplaceArgumentsByGlobals {
    fn name(&self) -> &'static str {
        "replace-arguments-by-globals"
    }

    fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        _testcase: &mut Testcase,
        _oracle: &mut OracleDriver<P>,
        _logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        Ok(ReductionReport::default())
    }
}

/// An enum dispatching to one of the concrete strategies, so the run
/// controller can hold a single strategy value chosen at runtime without
/// boxing a non-object-safe generic trait.
#[derive(Clone, Copy, Debug)]
pub enum AnyStrategy {
    /// See `CheckOnly`.
    CheckOnly(CheckOnly),
    /// See `Minimize`.
    Minimize(Minimize),
    /// See `MinimizeSurroundingPairs`.
    MinimizeSurroundingPairs(MinimizeSurroundingPairs),
    /// See `MinimizeBalancedPairs`.
    MinimizeBalancedPairs(MinimizeBalancedPairs),
    /// See `CollapseEmptyBraces`.
    CollapseEmptyBraces(CollapseEmptyBraces),
    /// See `ReplacePropertiesByGlobals`.
    ReplacePropertiesByGlobals(ReplacePropertiesByGlobals),
    /// See `ReplaceArgumentsByGlobals`.
    ReplaceArgumentsByGlobals(ReplaceArgumentsByGlobals),
}

impl AnyStrategy {
    /// This strategy's name.
    pub fn name(&self) -> &'static str {
        match *self {
            AnyStrategy::CheckOnly(s) => s.name(),
            AnyStrategy::Minimize(s) => s.name(),
            AnyStrategy::MinimizeSurroundingPairs(s) => s.name(),
            AnyStrategy::MinimizeBalancedPairs(s) => s.name(),
            AnyStrategy::CollapseEmptyBraces(s) => s.name(),
            AnyStrategy::ReplacePropertiesByGlobals(s) => s.name(),
            AnyStrategy::ReplaceArgumentsByGlobals(s) => s.name(),
        }
    }

    /// Run the wrapped strategy.
    pub fn run<P: Predicate, W: ::std::io::Write>(
        &self,
        testcase: &mut Testcase,
        oracle: &mut OracleDriver<P>,
        logger: &mut Logger<W>,
    ) -> error::Result<ReductionReport> {
        match *self {
            AnyStrategy::CheckOnly(s) => s.run(testcase, oracle, logger),
            AnyStrategy::Minimize(s) => s.run(testcase, oracle, logger),
            AnyStrategy::MinimizeSurroundingPairs(s) => s.run(testcase, oracle, logger),
            AnyStrategy::MinimizeBalancedPairs(s) => s.run(testcase, oracle, logger),
            AnyStrategy::CollapseEmptyBraces(s) => s.run(testcase, oracle, logger),
            AnyStrategy::ReplacePropertiesByGlobals(s) => s.run(testcase, oracle, logger),
            AnyStrategy::ReplaceArgumentsByGlobals(s) => s.run(testcase, oracle, logger),
        }
    }
}

/// Look up a strategy by its CLI name, with the chunk bounds resolved by
/// the caller (the run controller resolves `Minimize`'s/
/// `MinimizeSurroundingPairs`'s default `max_chunk_size` from the loaded
/// test case's length).
pub fn lookup(
    name: &str,
    min_chunk_size: usize,
    max_chunk_size: usize,
    repeat: RepeatPolicy,
) -> Option<AnyStrategy> {
    match name {
        "check-only" => Some(AnyStrategy::CheckOnly(CheckOnly)),
        "minimize" => Some(AnyStrategy::Minimize(Minimize {
            max_chunk_size,
            min_chunk_size,
            repeat,
        })),
        "minimize-around" => Some(AnyStrategy::MinimizeSurroundingPairs(
            MinimizeSurroundingPairs {
                max_chunk_size,
                min_chunk_size,
                repeat,
            },
        )),
        "minimize-balanced" => Some(AnyStrategy::MinimizeBalancedPairs(MinimizeBalancedPairs)),
        "minimize-collapse-brace" => {
            Some(AnyStrategy::CollapseEmptyBraces(CollapseEmptyBraces))
        }
        "replace-properties-by-globals" => Some(AnyStrategy::ReplacePropertiesByGlobals(
            ReplacePropertiesByGlobals,
        )),
        "replace-arguments-by-globals" => Some(AnyStrategy::ReplaceArgumentsByGlobals(
            ReplaceArgumentsByGlobals,
        )),
        _ => None,
    }
}
