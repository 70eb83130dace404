//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod dump;
pub mod hex_utils;
pub mod matching;
pub mod ps;
pub mod regions;
pub mod scan;
