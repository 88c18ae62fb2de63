#![doc = include_str!("../README.md")]

mod error;

pub mod bridge;
pub mod config;
pub mod envelope;
pub mod framing;
pub mod packet;
pub mod sink;
pub mod site;
pub mod source;

pub use error::{Error, Result};
