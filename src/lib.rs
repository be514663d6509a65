//! A language agnostic, local-minimum automatic test case reducer.

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

extern crate clap;
extern crate ctrlc;
extern crate is_executable;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate tempdir;

pub mod atom;
pub mod atomizer;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod oracle;
pub mod sigint;
pub mod strategy;
pub mod test_case;
