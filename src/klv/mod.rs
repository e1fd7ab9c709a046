//! KLV metadata: BER primitives, the ST 0601 element table, decoding and
//! checksum validation of metadata PES packets.

pub mod ber;
pub mod decoder;
pub mod encoder;
pub mod packet;
pub mod schema;
pub mod st0601;
mod value;

pub use decoder::{KlvDecoder, UniversalEntry, UniversalSetDef, split_universal};
pub use encoder::KlvEncoder;
pub use packet::{
    DecodedKlvPacket, MetadataForm, MetadataPayload, compute_checksum, decode_metadata_pes,
    extract_metadata, validate_checksum,
};
pub use value::{KlvContext, KlvValue};
