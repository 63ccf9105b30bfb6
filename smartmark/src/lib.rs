// src/lib.rs
#![crate_type = "lib"]
#![crate_name = "smartmark"]

// Core modules
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// CLI modules
pub mod cli;
pub mod config;
pub mod exitcode;
pub mod util;
