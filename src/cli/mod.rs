//! Command line surface for the `filecore` binary

pub mod args;
pub mod output;
