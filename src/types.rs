use serde::Serialize;

use crate::constants::stream_type;

/// PMT stream_type of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamType {
    H264,
    Mpeg2Video,
    PrivateData,
    MetadataPes,
    Other(u8),
}

impl StreamType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            stream_type::H264 => Self::H264,
            stream_type::MPEG2_VIDEO => Self::Mpeg2Video,
            stream_type::PRIVATE_DATA => Self::PrivateData,
            stream_type::METADATA_PES => Self::MetadataPes,
            other => Self::Other(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::H264 => stream_type::H264,
            Self::Mpeg2Video => stream_type::MPEG2_VIDEO,
            Self::PrivateData => stream_type::PRIVATE_DATA,
            Self::MetadataPes => stream_type::METADATA_PES,
            Self::Other(tag) => tag,
        }
    }

    /// Streams that may carry KLV metadata.
    pub fn is_metadata(self) -> bool {
        matches!(self, Self::PrivateData | Self::MetadataPes)
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::H264 | Self::Mpeg2Video)
    }
}

/// Kind of a completed frame as reported to the packet buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameKind {
    Idr,
    NonIdr,
    /// Bytes pushed out without a frame boundary (size limit or timeout).
    Unknown,
}

/// Video format pulled from a sequence parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub codec: String,
    pub width: u16,
    pub height: u16,
    pub fps: f32,
    pub chroma: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_type_tags() {
        for tag in [0x02, 0x06, 0x15, 0x1B, 0x0F] {
            assert_eq!(StreamType::from_tag(tag).tag(), tag);
        }
        assert!(StreamType::from_tag(0x15).is_metadata());
        assert!(StreamType::from_tag(0x06).is_metadata());
        assert!(StreamType::from_tag(0x1B).is_video());
        assert_eq!(StreamType::from_tag(0x0F), StreamType::Other(0x0F));
    }
}
