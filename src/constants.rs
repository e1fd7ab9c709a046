//! Constants for MPEG-TS ingest

use std::time::Duration;

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;
pub const TS_HEADER_SIZE: usize = 4;

/// PES packet constants
pub const PES_START_CODE: [u8; 3] = [0x00, 0x00, 0x01];
pub const PES_FIXED_HEADER_SIZE: usize = 6; // start code + stream id + length
pub const PES_OPTIONAL_HEADER_SIZE: usize = 9; // fixed + flags + header_data_length

/// PTS reported when a PES carries none
pub const PTS_UNKNOWN: i64 = -1;

/// Well-known PIDs
pub mod pid {
    pub const PAT: u16 = 0x0000;
}

/// PMT stream_type values handled by the decoder
pub mod stream_type {
    pub const MPEG2_VIDEO: u8 = 0x02;
    pub const PRIVATE_DATA: u8 = 0x06;
    pub const METADATA_PES: u8 = 0x15;
    pub const H264: u8 = 0x1B;
}

/// PES stream_id values
pub mod stream_id {
    pub const PRIVATE_STREAM_1: u8 = 0xBD;
    pub const PADDING: u8 = 0xBE;
    pub const PRIVATE_STREAM_2: u8 = 0xBF;
    pub const ECM: u8 = 0xF0;
    pub const EMM: u8 = 0xF1;
    pub const DSMCC: u8 = 0xF2;
    pub const H222_TYPE_E: u8 = 0xF8;
    pub const METADATA: u8 = 0xFC;
    pub const PROGRAM_STREAM_DIRECTORY: u8 = 0xFF;
    pub const PROGRAM_STREAM_MAP: u8 = 0xBC;
}

/// Synchronous metadata: PES header is always 14 bytes (PTS present)
pub const SYNC_METADATA_PES_HEADER_SIZE: usize = 14;
/// Metadata access unit cell header: service id, sequence, flags, cell length
pub const METADATA_AU_HEADER_SIZE: usize = 5;

/// Buffer defaults
pub const DEFAULT_MAX_INCOMPLETE_FRAME_BYTES: u64 = 50_000_000;
pub const DEFAULT_MAX_FRAMESET_SIZE: usize = 1000;
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(1);
pub const ACTIVITY_LOG_PERIOD: Duration = Duration::from_secs(10);
pub const BYTES_PER_MEGABYTE: u64 = 1_000_000;

/// Rollover defaults
pub const DEFAULT_MEGABYTE_COUNT: u64 = 10;
pub const DEFAULT_ELAPSED_TIME: Duration = Duration::from_secs(60);
pub const DEFAULT_ROLLOVER_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Temp files handed to the rollover action
pub const TEMP_FILE_PREFIX: &str = "mpegts-stream-";
pub const TEMP_FILE_SUFFIX: &str = ".ts";

/// Largest UDP payload read per datagram
pub const UDP_RECV_BUFFER_SIZE: usize = 65_536;
