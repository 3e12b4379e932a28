//! IRC protocol layer: connecting and registering with one network.

pub mod connection;
