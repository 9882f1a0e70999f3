//! # CLI Command Implementations
//!
//! `extlibs` has a single action, synchronizing the libraries of one
//! configuration file, implemented in [`sync`].
//!
//! The command module contains:
//! - An `Args` struct that defines the arguments and options, derived using
//!   `clap`.
//! - An `execute` function that takes the parsed `Args` and drives the
//!   `extlibs` library to perform the run.

pub mod sync;
