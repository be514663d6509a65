//! The oracle driver: invokes the user-supplied interestingness predicate
//! and caches nothing across calls beyond a monotonic counter.

use error;
use is_executable::IsExecutable;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process;
use tempdir::TempDir;

/// The verdict of a single interestingness test. There is no third state:
/// timeouts and crashes of the external test are mapped to `Uninteresting`
/// by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OracleVerdict {
    /// The candidate test case reproduces the property under test.
    Interesting,
    /// It does not (or the predicate failed transiently).
    Uninteresting,
}

impl OracleVerdict {
    /// Is this verdict `Interesting`?
    pub fn is_interesting(&self) -> bool {
        *self == OracleVerdict::Interesting
    }
}

impl fmt::Display for OracleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            OracleVerdict::Interesting => write!(f, "interesting"),
            OracleVerdict::Uninteresting => write!(f, "uninteresting"),
        }
    }
}

/// The user-supplied interestingness predicate's plugin contract:
/// `init`/`interesting`/`cleanup`.
///
/// `interesting` returning `Err` is treated by the driver as a `Transient`
/// failure (mapped to `Uninteresting`) unless the predicate also reports
/// that its own infrastructure is broken, via `Err(Error::OracleFatal(_))`.
pub trait Predicate: fmt::Debug {
    /// Called once per run, before any call to `interesting`. Failure here
    /// is always fatal.
    fn init(&mut self) -> error::Result<()> {
        Ok(())
    }

    /// Decide whether the candidate test case at `path` is interesting.
    /// `tempdir_prefix` is a workspace private to this call; the predicate
    /// may use it for scratch files, but must not rely on state surviving
    /// between calls.
    fn interesting(&mut self, path: &Path, tempdir_prefix: &Path) -> error::Result<bool>;

    /// Called once at the end of the run, regardless of outcome.
    fn cleanup(&mut self) {}
}

/// A `Predicate` that spawns the oracle-spec as a subprocess: exit code
/// `0` is interesting, any other exit code is uninteresting.
#[derive(Debug)]
pub struct Script {
    program: OsString,
    args: Vec<OsString>,
}

impl Script {
    /// Construct a new subprocess oracle, given the oracle-spec program and
    /// its fixed `oracle-args`.
    pub fn new<S, I, A>(program: S, args: I) -> error::Result<Script>
    where
        S: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let program = program.into();
        let program_path = Path::new(&program);
        if program_path.is_file() && !program_path.is_executable() {
            return Err(error::Error::NotExecutable(program_path.to_path_buf()));
        }

        Ok(Script {
            program,
            args: args.into_iter().map(Into::into).collect(),
        })
    }
}

impl Predicate for Script {
    fn interesting(&mut self, _path: &Path, tempdir_prefix: &Path) -> error::Result<bool> {
        let mut cmd = process::Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(tempdir_prefix)
            .stdin(process::Stdio::null());

        match cmd.spawn() {
            Ok(mut child) => Ok(child.wait()?.success()),
            Err(e) => {
                if e.kind() == ::std::io::ErrorKind::NotFound {
                    Err(error::Error::OracleFatal(format!(
                        "could not find or execute oracle program: {}",
                        e
                    )))
                } else {
                    // A transient spawn failure: logged by the driver and
                    // mapped to `Uninteresting`, not fatal by itself.
                    Ok(false)
                }
            }
        }
    }
}

/// Wraps a `Predicate`, minting a fresh temp workspace per call and
/// enforcing the fatal-failure policy: three consecutive infrastructure
/// failures abort the run with `OracleFatal`.
#[derive(Debug)]
pub struct OracleDriver<P: Predicate> {
    predicate: P,
    workdir: TempDir,
    call_count: u64,
    consecutive_infra_failures: u32,
}

const MAX_CONSECUTIVE_INFRA_FAILURES: u32 = 3;

impl<P: Predicate> OracleDriver<P> {
    /// Wrap `predicate` in a driver with a fresh top-level workspace.
    pub fn new(predicate: P) -> error::Result<OracleDriver<P>> {
        let workdir = TempDir::new("lithium")?;
        Ok(OracleDriver {
            predicate,
            workdir,
            call_count: 0,
            consecutive_infra_failures: 0,
        })
    }

    /// Call the predicate's `init`. Failure is fatal.
    pub fn init(&mut self) -> error::Result<()> {
        self.predicate.init().map_err(|e| match e {
            error::Error::OracleFatal(_) => e,
            other => error::Error::OracleFatal(format!("oracle init failed: {}", other)),
        })
    }

    /// Test whether the test case currently on disk at `path` is
    /// interesting. Mints a fresh `tempdir_prefix` for this call.
    pub fn test(&mut self, path: &Path) -> error::Result<OracleVerdict> {
        self.call_count += 1;
        let prefix = self.workdir.path().join(format!("{}-", self.call_count));
        ::std::fs::create_dir_all(&prefix)?;

        match self.predicate.interesting(path, &prefix) {
            Ok(true) => {
                self.consecutive_infra_failures = 0;
                Ok(OracleVerdict::Interesting)
            }
            Ok(false) => {
                self.consecutive_infra_failures = 0;
                Ok(OracleVerdict::Uninteresting)
            }
            Err(error::Error::OracleFatal(details)) => {
                self.consecutive_infra_failures += 1;
                if self.consecutive_infra_failures >= MAX_CONSECUTIVE_INFRA_FAILURES {
                    Err(error::Error::OracleFatal(details))
                } else {
                    Ok(OracleVerdict::Uninteresting)
                }
            }
            Err(_) => {
                // A transient failure: absorbed here, not reported upward.
                Ok(OracleVerdict::Uninteresting)
            }
        }
    }

    /// The number of `test` calls made so far.
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Call the predicate's `cleanup`. Always safe to call, even after an
    /// error; the run controller calls this unconditionally on every exit
    /// path.
    pub fn cleanup(&mut self) {
        self.predicate.cleanup();
    }
}

impl<F> Predicate for F
where
    F: FnMut(&Path) -> error::Result<bool>,
{
    fn interesting(&mut self, path: &Path, _tempdir_prefix: &Path) -> error::Result<bool> {
        (self)(path)
    }
}
