//! Custom errors and results.

use clap;
use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// The kinds of errors that can happen when running `lithium`.
#[derive(Debug)]
pub enum Error {
    /// A bad flag combination, a non-power-of-two `--min`/`--max`, or an
    /// unknown strategy/atomizer name. Maps to exit code 2.
    Config(String),

    /// DDBEGIN appeared with no matching later DDEND.
    MissingDdend,

    /// The atomizer found no atoms in the reducible region.
    EmptyReducibleRegion,

    /// The initial test case did not satisfy the oracle. Maps to exit code 1.
    NotInteresting,

    /// The oracle's `init` call failed, or three consecutive infrastructure
    /// failures occurred during `test` calls. Maps to exit code 3.
    OracleFatal(String),

    /// We could not find or execute the oracle-spec program.
    NotExecutable(PathBuf),

    /// An I/O error while reading and atomizing the test case at load time.
    /// Maps to exit code 2, grouped with the rest of the `Load` family.
    LoadIo(io::Error),

    /// An I/O error while atomically saving the test case, or any other I/O
    /// failure after the test case was successfully loaded. Fatal: the last
    /// successfully saved state remains on disk. Maps to exit code 3.
    Io(io::Error),

    /// A command line argument parsing error.
    Clap(clap::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Config(ref details) => write!(f, "Configuration error: {}", details),
            Error::MissingDdend => {
                write!(f, "DDBEGIN marker found with no matching DDEND marker")
            }
            Error::EmptyReducibleRegion => {
                write!(f, "The reducible region of the test case is empty")
            }
            Error::NotInteresting => write!(f, "The initial test case is not interesting"),
            Error::OracleFatal(ref details) => write!(f, "Oracle failure: {}", details),
            Error::NotExecutable(ref path) => {
                write!(f, "Not an executable file: {}", path.display())
            }
            Error::LoadIo(ref e) => write!(f, "Failed to load the test case: {}", e),
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            Error::Clap(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Config(_) => "Configuration error",
            Error::MissingDdend => "Missing DDEND marker",
            Error::EmptyReducibleRegion => "Empty reducible region",
            Error::NotInteresting => "Initial test case is not interesting",
            Error::OracleFatal(_) => "Oracle failure",
            Error::NotExecutable(_) => "Not an executable file",
            Error::LoadIo(ref e) => error::Error::description(e),
            Error::Io(ref e) => error::Error::description(e),
            Error::Clap(ref e) => error::Error::description(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<clap::Error> for Error {
    fn from(e: clap::Error) -> Self {
        Error::Clap(e)
    }
}

/// The process exit code `lithium` should terminate with for a given error,
/// per the mapping fixed by the CLI surface: 0 success, 1
/// initial-uninteresting, 2 configuration error, 3 oracle-fatal.
pub fn exit_code(err: &Error) -> i32 {
    match *err {
        Error::Config(_)
        | Error::MissingDdend
        | Error::EmptyReducibleRegion
        | Error::Clap(_)
        | Error::LoadIo(_) => 2,
        Error::NotInteresting => 1,
        Error::OracleFatal(_) | Error::NotExecutable(_) | Error::Io(_) => 3,
    }
}

/// A `Result` whose `Err` variant is `lithium::error::Error`.
pub type Result<T> = ::std::result::Result<T, Error>;
