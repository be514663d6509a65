//! Progress reporting: a line per oracle call in `--verbose` mode, and a
//! summary line at exit. The reduction loop runs synchronously on a
//! single thread, so a plain struct is enough; there is no worker pool or
//! channel to fan progress messages in from.

use oracle::OracleVerdict;
use std::io::Write;
use std::time::Duration;
use strategy::ReductionReport;
use test_case::Testcase;

/// Reports reduction progress to a writer, typically stderr.
#[derive(Debug)]
pub struct Logger<W: Write> {
    out: W,
    verbose: bool,
}

impl<W: Write> Logger<W> {
    /// Construct a logger writing to `out`. When `verbose` is false, only
    /// the final summary is printed.
    pub fn new(out: W, verbose: bool) -> Logger<W> {
        Logger { out, verbose }
    }

    /// Record the verdict of a single oracle call: the chunk size and
    /// starting position of the atom range that call tested (both `0` for
    /// a call that isn't a removal attempt, such as the initial
    /// interestingness check), and the test case's resulting size.
    pub fn oracle_call(
        &mut self,
        call_count: u64,
        chunk_size: usize,
        position: usize,
        verdict: OracleVerdict,
        testcase: &Testcase,
    ) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.out,
            "[{:>5}] chunk={:<6} pos={:<6} {:<13} {} atoms, {} bytes",
            call_count,
            chunk_size,
            position,
            verdict,
            testcase.len(),
            testcase.byte_len()
        );
    }

    /// Print the final summary: how many atoms were removed, how many
    /// oracle calls it took in total, and how long the run took.
    pub fn summary(
        &mut self,
        strategy_name: &str,
        report: &ReductionReport,
        final_size: usize,
        total_oracle_calls: u64,
        elapsed: Duration,
    ) {
        let _ = writeln!(
            self.out,
            "{}: removed {} atoms in {} oracle calls ({} interesting, {} uninteresting); \
             final size {} atoms; {:.2}s wallclock",
            strategy_name,
            report.atoms_removed,
            total_oracle_calls,
            report.interesting_calls,
            report.uninteresting_calls,
            final_size,
            elapsed.as_secs_f64()
        );
    }
}
