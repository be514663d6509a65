//! The run controller: wires configuration, test case, oracle, and
//! strategy together into a single end-to-end run.

use config::Config;
use error;
use logger::Logger;
use oracle::{OracleDriver, Predicate, Script};
use std::io;
use std::time::Instant;
use strategy;
use test_case::Testcase;

/// Run `lithium` to completion with the given configuration, returning the
/// process exit code.
///
/// Steps:
/// 1. Parse configuration (done by the caller, which built `config`).
/// 2. Load and atomize the test case.
/// 3. Select the atomizer and strategy (done by `config`/`strategy::lookup`).
/// 4. Call the oracle's `init`.
/// 5. Verify the initial test case is interesting.
/// 6. Execute the strategy.
/// 7. Call the oracle's `cleanup`, unconditionally.
/// 8. Write the final state and a summary line.
/// 9. Return the mapped exit code.
pub fn run(config: &Config) -> i32 {
    match try_run(config) {
        Ok(()) => 0,
        Err(e) => {
            let stderr = io::stderr();
            let _ = ::std::io::Write::write_fmt(
                &mut stderr.lock(),
                format_args!("lithium: error: {}\n", e),
            );
            error::exit_code(&e)
        }
    }
}

fn try_run(config: &Config) -> error::Result<()> {
    let start = Instant::now();
    let atomizer = config.atomizer.build();
    let mut testcase = Testcase::load(&config.test_case, &*atomizer)?;

    let max_chunk_size = config
        .max_chunk_size
        .unwrap_or_else(|| strategy::largest_pow2_leq(testcase.len() / 2));
    if config.min_chunk_size > max_chunk_size {
        return Err(error::Error::Config(format!(
            "--min ({}) must not be greater than --max ({})",
            config.min_chunk_size, max_chunk_size
        )));
    }

    let strategy = strategy::lookup(
        &config.strategy,
        config.min_chunk_size,
        max_chunk_size,
        config.repeat,
    )
    .ok_or_else(|| error::Error::Config(format!("unknown strategy '{}'", config.strategy)))?;

    let predicate = Script::new(&config.oracle, config.oracle_args.clone())?;
    let mut oracle = OracleDriver::new(predicate)?;

    let stderr = io::stderr();
    let mut logger = Logger::new(stderr.lock(), config.verbose);

    let result = run_with_oracle(&mut testcase, &mut oracle, &strategy, &mut logger);

    oracle.cleanup();

    let report = result?;
    logger.summary(
        strategy.name(),
        &report,
        testcase.len(),
        oracle.call_count(),
        start.elapsed(),
    );
    write_summary_sidecar(&config.test_case, strategy.name(), &report)?;
    Ok(())
}

/// A small machine-readable record of the run, written next to the final
/// test case as `<test-case>.lithium-summary.json`. This is the only
/// on-disk artifact beyond the reduced test case itself; there is no
/// cross-run resume state, since every strategy recomputes its walk from
/// the current file on each invocation.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    strategy: &'a str,
    atoms_removed: usize,
    interesting_calls: usize,
    uninteresting_calls: usize,
}

fn write_summary_sidecar(
    test_case: &::std::path::Path,
    strategy_name: &str,
    report: &strategy::ReductionReport,
) -> error::Result<()> {
    use std::io::Write as IoWrite;

    let summary = Summary {
        strategy: strategy_name,
        atoms_removed: report.atoms_removed,
        interesting_calls: report.interesting_calls,
        uninteresting_calls: report.uninteresting_calls,
    };
    let path = test_case.with_extension("lithium-summary.json");
    let contents = ::serde_json::to_vec_pretty(&summary)
        .map_err(|e| error::Error::Config(format!("failed to serialize summary: {}", e)))?;
    ::std::fs::File::create(&path)?.write_all(&contents)?;
    Ok(())
}

fn run_with_oracle<P, W>(
    testcase: &mut Testcase,
    oracle: &mut OracleDriver<P>,
    strategy: &strategy::AnyStrategy,
    logger: &mut Logger<W>,
) -> error::Result<strategy::ReductionReport>
where
    P: Predicate,
    W: ::std::io::Write,
{
    oracle.init()?;

    let verdict = oracle.test(testcase.path())?;
    logger.oracle_call(oracle.call_count(), 0, 0, verdict, testcase);
    if !verdict.is_interesting() {
        return Err(error::Error::NotInteresting);
    }

    // The initial check above is an oracle call too, but it isn't a
    // removal attempt a strategy tracks in its own `ReductionReport`, so
    // fold it in here to keep `interesting_calls + uninteresting_calls`
    // equal to the true number of oracle calls made.
    let mut report = strategy.run(testcase, oracle, logger)?;
    report.interesting_calls += 1;
    Ok(report)
}
