use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::buffer::{PacketBuffer, SystemTempFiles};
use crate::config::Config;
use crate::constants::UDP_RECV_BUFFER_SIZE;
use crate::decoder::{ApplicationDataDecoder, DecodedStreamData};
use crate::error::Error;
use crate::filename::{DateTemplateFilenameGenerator, FileExtensionFilenameGenerator, ListFilenameGenerator};
use crate::network::bind_udp;
use crate::processor::{DirectoryRolloverAction, StreamProcessor, StreamRotator};

/// Streams not seen for this long are dropped from the report.
const STALE_STREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run(opts: crate::ingest::Options) -> anyhow::Result<()> {
    let config = opts.config;
    config.validate()?;

    let sock = bind_udp(&config.network.addr, config.network.interface)?;
    info!("Listening for transport stream on {}", config.network.addr);

    let mut buffer = PacketBuffer::new(config.buffer_config());
    if let Some(dir) = &config.buffer.temp_dir {
        buffer = buffer.with_temp_files(SystemTempFiles::in_dir(dir));
    }
    let buffer = buffer.into_shared();

    let rotator = Arc::new(Mutex::new(StreamRotator::new(
        Arc::clone(&buffer),
        config.rollover_condition()?,
        rollover_action(&config)?,
    )));
    let rollover_task = tokio::spawn(rollover_loop(Arc::clone(&rotator), config.check_interval()));

    let print_metadata = config.report.print_metadata;
    let sink = move |data: &DecodedStreamData| {
        if print_metadata && !data.is_video() {
            match serde_json::to_string(&data.summary()) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("Unable to serialize metadata: {e}"),
            }
        }
    };
    let decoder = ApplicationDataDecoder::new(config.decoder.klv_enabled);
    let mut processor = StreamProcessor::new(decoder, Arc::clone(&buffer), sink);

    let mut report = (config.report.refresh_secs > 0).then(|| {
        let period = Duration::from_secs(config.report.refresh_secs);
        tokio::time::interval_at(Instant::now() + period, period)
    });
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
    let outcome: anyhow::Result<()> = loop {
        tokio::select! {
            received = sock.recv(&mut buf) => {
                let n = match received {
                    Ok(n) => n,
                    Err(e) => break Err(e.into()),
                };
                if n == 0 {
                    continue;
                }
                match processor.process_datagram(&buf[..n]) {
                    Ok(()) => {}
                    Err(Error::NoPrograms) if !config.decoder.abort_on_empty_pat => {}
                    Err(e) => break Err(e.into()),
                }
            }
            _ = tick(&mut report) => {
                processor.stats_mut().cleanup_old_streams(STALE_STREAM_TIMEOUT);
                let snapshot = processor.stats().snapshot(buffer.lock().stats());
                match serde_json::to_string_pretty(&snapshot) {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!("Unable to serialize stats report: {e}"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break Ok(());
            }
        }
    };

    rollover_task.abort();
    processor.finish();
    tokio::task::spawn_blocking(move || rotator.lock().shutdown()).await?;
    outcome
}

fn rollover_action(config: &Config) -> crate::error::Result<DirectoryRolloverAction> {
    let filenames = ListFilenameGenerator::default()
        .push(DateTemplateFilenameGenerator::new(config.output.filename_template.as_str())?)
        .push(FileExtensionFilenameGenerator::default());
    DirectoryRolloverAction::new(&config.output.directory, filenames)
}

/// Checks the rollover condition on every tick, off the async workers.
async fn rollover_loop(rotator: Arc<Mutex<StreamRotator>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let rotator = Arc::clone(&rotator);
        match tokio::task::spawn_blocking(move || rotator.lock().check_for_rollover()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("Rollover check failed: {e}"),
            Err(e) => {
                error!("Rollover task failed: {e}");
                break;
            }
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Options;

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let mut config = Config::default();
        config.rollover.megabyte_count = 0;
        assert!(run(Options { config }).await.is_err());
    }
}
