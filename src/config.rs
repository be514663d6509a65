//! Command line parsing and the resolved run configuration.

use clap;
use error;
use std::ffi::OsString;
use std::path::PathBuf;
use strategy::RepeatPolicy;

/// Which atomizer to use, resolved from `--char`/`--symbol`, or (for the
/// `js-str` and `attribute` atomizers, which have no dedicated flag)
/// `--atomizer=NAME`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomizerName {
    /// See `atomizer::Line`.
    Line,
    /// See `atomizer::Char`.
    Char,
    /// See `atomizer::Symbol`.
    Symbol,
    /// See `atomizer::JsStr`.
    JsStr,
    /// See `atomizer::Attribute`.
    Attribute,
}

impl AtomizerName {
    fn parse(s: &str) -> error::Result<AtomizerName> {
        match s {
            "line" => Ok(AtomizerName::Line),
            "char" => Ok(AtomizerName::Char),
            "symbol" => Ok(AtomizerName::Symbol),
            "js-str" => Ok(AtomizerName::JsStr),
            "attribute" => Ok(AtomizerName::Attribute),
            other => Err(error::Error::Config(format!(
                "unknown atomizer '{}'",
                other
            ))),
        }
    }

    /// Construct the atomizer this name refers to.
    pub fn build(&self) -> Box<::atomizer::Atomizer> {
        match *self {
            AtomizerName::Line => Box::new(::atomizer::Line),
            AtomizerName::Char => Box::new(::atomizer::Char),
            AtomizerName::Symbol => Box::new(::atomizer::Symbol),
            AtomizerName::JsStr => Box::new(::atomizer::JsStr),
            AtomizerName::Attribute => Box::new(::atomizer::Attribute),
        }
    }
}

fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// The fully resolved configuration for a single `lithium` run.
///
/// `max_chunk_size` is left unresolved (`None`) unless `--max` or
/// `--chunk-size` was given: its default (the largest power of two less
/// than or equal to half the atom count) depends on the loaded test
/// case's atom count, which is not known until the test case is loaded,
/// so the run controller resolves it once the `Testcase` exists.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the oracle-spec program.
    pub oracle: PathBuf,
    /// The full, unchanged-between-calls argument list passed to the
    /// oracle-spec program.
    pub oracle_args: Vec<OsString>,
    /// Path to the file to reduce in place: `--testcase=PATH`, or the last
    /// element of `oracle_args` if not given.
    pub test_case: PathBuf,
    /// Which atomizer to use.
    pub atomizer: AtomizerName,
    /// Which strategy to run.
    pub strategy: String,
    /// The largest chunk size `Minimize`-family strategies start from.
    /// `None` means "derive from the loaded test case's length".
    pub max_chunk_size: Option<usize>,
    /// The smallest chunk size `Minimize`-family strategies stop at.
    pub min_chunk_size: usize,
    /// The repeat policy at `min_chunk_size`.
    pub repeat: RepeatPolicy,
    /// Whether to print a progress line per oracle call.
    pub verbose: bool,
}

impl Config {
    /// Parse `lithium`'s command line arguments from `args`.
    pub fn from_args<I, T>(args: I) -> error::Result<Config>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_app().get_matches_from_safe(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &clap::ArgMatches) -> error::Result<Config> {
        let oracle = PathBuf::from(matches.value_of_os("oracle-spec").unwrap());
        let oracle_args: Vec<OsString> = matches
            .values_of_os("oracle-args")
            .map(|vs| vs.map(OsString::from).collect())
            .unwrap_or_else(Vec::new);

        let test_case = match matches.value_of_os("testcase") {
            Some(p) => PathBuf::from(p),
            None => match oracle_args.last() {
                Some(p) => PathBuf::from(p),
                None => {
                    return Err(error::Error::Config(
                        "no --testcase given and oracle-args is empty; cannot locate the test case"
                            .into(),
                    ))
                }
            },
        };

        let atomizer = if let Some(name) = matches.value_of("atomizer") {
            AtomizerName::parse(name)?
        } else if matches.is_present("char") && matches.is_present("symbol") {
            return Err(error::Error::Config(
                "--char and --symbol are mutually exclusive".into(),
            ));
        } else if matches.is_present("char") {
            AtomizerName::Char
        } else if matches.is_present("symbol") {
            AtomizerName::Symbol
        } else {
            AtomizerName::Line
        };

        let strategy = matches
            .value_of("strategy")
            .unwrap_or("minimize")
            .to_string();
        if ::strategy::lookup(&strategy, 1, 1, RepeatPolicy::Never).is_none() {
            return Err(error::Error::Config(format!(
                "unknown strategy '{}'",
                strategy
            )));
        }

        let repeat = match matches.value_of("repeat") {
            Some("always") => RepeatPolicy::Always,
            Some("last") => RepeatPolicy::Last,
            Some("never") => RepeatPolicy::Never,
            Some(other) => {
                return Err(error::Error::Config(format!(
                    "unknown --repeat value '{}'",
                    other
                )))
            }
            // `--chunk-size` is shorthand for `--repeat=never --min=N --max=N`;
            // an explicit `--repeat` always overrides the shorthand.
            None if matches.is_present("chunk-size") => RepeatPolicy::Never,
            None => RepeatPolicy::Last,
        };

        let (min_chunk_size, max_chunk_size) = if let Some(n) = matches.value_of("chunk-size") {
            let n = parse_chunk_size(n)?;
            (n, Some(n))
        } else {
            let min = match matches.value_of("min") {
                Some(n) => parse_chunk_size(n)?,
                None => 1,
            };
            let max = match matches.value_of("max") {
                Some(n) => Some(parse_chunk_size(n)?),
                None => None,
            };
            if let Some(max) = max {
                if min > max {
                    return Err(error::Error::Config(format!(
                        "--min ({}) must not be greater than --max ({})",
                        min, max
                    )));
                }
            }
            (min, max)
        };

        let verbose = matches.is_present("verbose");

        Ok(Config {
            oracle,
            oracle_args,
            test_case,
            atomizer,
            strategy,
            max_chunk_size,
            min_chunk_size,
            repeat,
            verbose,
        })
    }
}

fn parse_chunk_size(s: &str) -> error::Result<usize> {
    let n: usize = s
        .parse()
        .map_err(|_| error::Error::Config(format!("'{}' is not a valid chunk size", s)))?;
    if !is_power_of_two(n) {
        return Err(error::Error::Config(format!(
            "chunk size {} is not a power of two",
            n
        )));
    }
    Ok(n)
}

fn build_app() -> clap::App<'static, 'static> {
    clap::App::new("lithium")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A language agnostic, local-minimum automatic test case reducer.")
        .arg(
            clap::Arg::with_name("oracle-spec")
                .required(true)
                .help("The interestingness oracle-spec program."),
        )
        .arg(
            clap::Arg::with_name("oracle-args")
                .multiple(true)
                .help("Fixed arguments passed through to the oracle-spec program, unchanged between calls."),
        )
        .arg(
            clap::Arg::with_name("testcase")
                .long("testcase")
                .takes_value(true)
                .help("Path to the file to reduce; default: last element of oracle-args."),
        )
        .arg(
            clap::Arg::with_name("char")
                .short("c")
                .long("char")
                .conflicts_with("symbol")
                .help("Use the Char atomizer."),
        )
        .arg(
            clap::Arg::with_name("symbol")
                .long("symbol")
                .conflicts_with("char")
                .help("Use the Symbol-delimiter atomizer."),
        )
        .arg(
            clap::Arg::with_name("atomizer")
                .long("atomizer")
                .takes_value(true)
                .possible_values(&["line", "char", "symbol", "js-str", "attribute"])
                .conflicts_with_all(&["char", "symbol"])
                .help("Select an atomizer by name, including js-str/attribute which have no dedicated flag."),
        )
        .arg(
            clap::Arg::with_name("strategy")
                .long("strategy")
                .takes_value(true)
                .possible_values(&[
                    "check-only",
                    "minimize",
                    "minimize-around",
                    "minimize-balanced",
                    "minimize-collapse-brace",
                    "replace-arguments-by-globals",
                    "replace-properties-by-globals",
                ])
                .help("Which reduction strategy to run."),
        )
        .arg(
            clap::Arg::with_name("min")
                .long("min")
                .takes_value(true)
                .conflicts_with("chunk-size")
                .help("The smallest chunk size to stop at. Must be a power of two. Default 1."),
        )
        .arg(
            clap::Arg::with_name("max")
                .long("max")
                .takes_value(true)
                .conflicts_with("chunk-size")
                .help("The largest chunk size to start from. Must be a power of two."),
        )
        .arg(
            clap::Arg::with_name("chunk-size")
                .long("chunk-size")
                .takes_value(true)
                .conflicts_with_all(&["min", "max"])
                .help("Shorthand for --repeat=never --min=N --max=N."),
        )
        .arg(
            clap::Arg::with_name("repeat")
                .long("repeat")
                .takes_value(true)
                .possible_values(&["always", "last", "never"])
                .help("Repeat policy at the minimum chunk size. Default 'last'."),
        )
        .arg(
            clap::Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Print a progress line for every oracle call."),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::from_args(&["lithium", "oracle.sh", "test.js"]).unwrap();
        assert_eq!(cfg.atomizer, AtomizerName::Line);
        assert_eq!(cfg.strategy, "minimize");
        assert_eq!(cfg.min_chunk_size, 1);
        assert_eq!(cfg.max_chunk_size, None);
        assert_eq!(cfg.repeat, RepeatPolicy::Last);
        assert_eq!(cfg.test_case, PathBuf::from("test.js"));
    }

    #[test]
    fn explicit_testcase_overrides_last_oracle_arg() {
        let cfg = Config::from_args(&[
            "lithium",
            "oracle.sh",
            "--testcase=real.js",
            "fixture.js",
        ])
        .unwrap();
        assert_eq!(cfg.test_case, PathBuf::from("real.js"));
    }

    #[test]
    fn chunk_size_shorthand() {
        let cfg =
            Config::from_args(&["lithium", "oracle.sh", "test.js", "--chunk-size=4"]).unwrap();
        assert_eq!(cfg.min_chunk_size, 4);
        assert_eq!(cfg.max_chunk_size, Some(4));
        assert_eq!(cfg.repeat, RepeatPolicy::Never);
    }

    #[test]
    fn chunk_size_shorthand_is_overridden_by_explicit_repeat() {
        let cfg = Config::from_args(&[
            "lithium",
            "oracle.sh",
            "test.js",
            "--chunk-size=4",
            "--repeat=always",
        ])
        .unwrap();
        assert_eq!(cfg.repeat, RepeatPolicy::Always);
    }

    #[test]
    fn rejects_non_power_of_two() {
        let err =
            Config::from_args(&["lithium", "oracle.sh", "test.js", "--min=3"]).unwrap_err();
        match err {
            error::Error::Config(_) => {}
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_strategy() {
        let err =
            Config::from_args(&["lithium", "oracle.sh", "test.js", "--strategy=nonsense"])
                .unwrap_err();
        match err {
            error::Error::Config(_) => {}
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn char_flag_selects_char_atomizer() {
        let cfg = Config::from_args(&["lithium", "oracle.sh", "test.js", "--char"]).unwrap();
        assert_eq!(cfg.atomizer, AtomizerName::Char);
    }

    #[test]
    fn missing_testcase_with_no_oracle_args_is_a_config_error() {
        let err = Config::from_args(&["lithium", "oracle.sh"]).unwrap_err();
        match err {
            error::Error::Config(_) => {}
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
