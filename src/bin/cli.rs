use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use mpegts_ingest::config::Config;
use mpegts_ingest::ingest::{Options, run};
use mpegts_ingest::logging::init_logging;

#[derive(Parser)]
struct Opt {
    /// TOML configuration file; flags below override it
    #[clap(long)]
    config: Option<PathBuf>,

    /// UDP socket to bind + listen (IPv4, unicast or multicast)
    #[clap(long)]
    addr: Option<String>,

    /// Interface address used to join the multicast group
    #[clap(long)]
    interface: Option<Ipv4Addr>,

    /// Directory receiving the rollover files
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// Refresh interval for the JSON snapshot (0 disables it)
    #[clap(long)]
    refresh: Option<u64>,

    /// Roll over once a file holds this many megabytes
    #[clap(long)]
    megabytes: Option<u64>,

    /// Roll over once a file is this old (milliseconds)
    #[clap(long)]
    elapsed_ms: Option<u64>,

    /// Skip KLV metadata decoding
    #[clap(long, default_value_t = false)]
    no_klv: bool,

    /// Print every decoded metadata record as JSON
    #[clap(long, default_value_t = false)]
    print_metadata: bool,

    /// Debug logging
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

impl Opt {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(addr) = self.addr {
            config.network.addr = addr;
        }
        if self.interface.is_some() {
            config.network.interface = self.interface;
        }
        if let Some(dir) = self.output_dir {
            config.output.directory = dir;
        }
        if let Some(refresh) = self.refresh {
            config.report.refresh_secs = refresh;
        }
        if let Some(mb) = self.megabytes {
            config.rollover.megabyte_count = mb;
        }
        if let Some(ms) = self.elapsed_ms {
            config.rollover.elapsed_time_ms = ms;
        }
        if self.no_klv {
            config.decoder.klv_enabled = false;
        }
        if self.print_metadata {
            config.report.print_metadata = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    init_logging(opt.verbose).map_err(anyhow::Error::msg)?;

    run(Options { config: opt.into_config()? }).await
}
