pub mod section;
pub mod pat;
pub mod pmt;

pub use section::{skip_pointer_field, SectionReader};
pub use pat::{parse_pat, PatEntry, PatSection};
pub use pmt::{parse_pmt, PmtSection, StreamInfo};
