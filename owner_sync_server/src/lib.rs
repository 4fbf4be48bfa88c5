#![forbid(unsafe_code)]

pub mod cli;
pub mod routes;
pub mod server;
