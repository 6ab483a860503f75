extern crate self as nestedset_core;

pub mod log;
