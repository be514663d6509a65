//! The `lithium` executable.

#![deny(missing_docs)]

extern crate lithium;

use lithium::config::Config;
use lithium::controller;
use lithium::sigint;
use std::env;
use std::io::{self, Write};
use std::process;

fn main() {
    if let Err(e) = sigint::install() {
        let stderr = io::stderr();
        let _ = writeln!(&mut stderr.lock(), "lithium: warning: could not install Ctrl-C handler: {}", e);
    }

    let config = match Config::from_args(env::args_os()) {
        Ok(config) => config,
        Err(e) => {
            let stderr = io::stderr();
            let _ = writeln!(&mut stderr.lock(), "lithium: error: {}", e);
            process::exit(lithium::error::exit_code(&e));
        }
    };

    process::exit(controller::run(&config));
}
