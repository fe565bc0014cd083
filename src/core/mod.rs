// Core modules: session output, argument resolution, descriptor tables, errors.
pub mod args;
pub mod command;
pub mod error;
#[cfg(feature = "libipset")]
pub mod libipset;
pub mod output;
pub mod settype;
