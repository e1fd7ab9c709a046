// src/lib.rs
pub mod ingest {
    use crate::config::Config;

    pub struct Options {
        pub config: Config,
    }

    /// Async entry-point; returns when stopped (Ctrl-C or socket error)
    pub async fn run(opts: Options) -> anyhow::Result<()> {
        crate::core::run(opts).await
    }
}

pub mod buffer;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod demux;
pub mod error;
pub mod filename;
pub mod framer;
pub mod klv;
pub mod logging;
pub mod network;
pub mod packet;
pub mod parsers;
pub mod pes;
pub mod processor;
pub mod psi;
pub mod stats;
pub mod types;

mod core;
#[cfg(test)]
mod test_support;
