// Copyright 2025 Cornell University
// released under MIT License

pub mod buffer;
pub mod config;
pub mod decls;
pub mod diagnostic;
pub mod errors;
pub mod ir;
pub mod naming;
pub mod network;
pub mod parser;
pub mod serialize;
pub mod setup;
pub mod signal;
pub mod static_checks;
pub mod stub;
