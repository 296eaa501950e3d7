//! Library side of the `entify` command-line tool.

pub mod logging;
pub mod run;
