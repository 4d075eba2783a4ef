//! Cartridge image analysis.
//!
//! A raw dump is not self-describing: the header may sit at one of three
//! locations, may be duplicated, and may be partially garbage. This crate
//! recovers the metadata the core loader needs:
//!
//! - [`score_candidate`] / [`locate_header`]: heuristic header location
//! - [`Header`]: decoded header fields
//! - [`classify`]: co-processor/peripheral classification
//! - [`analyze`]: full pipeline producing a [`RomDescriptor`]
//!
//! Location is a scored best guess. When nothing plausible is found,
//! [`analyze`] still returns a size-only descriptor and the caller proceeds
//! with defaults.

mod chips;
mod descriptor;
mod header;

pub use chips::{classify, is_pal_region, ChipClassification, ClassifyInput, Coprocessor};
pub use descriptor::{analyze, strip_copier_header, Mapping, RomDescriptor, COPIER_HEADER_LEN};
pub use header::{
    locate_header, score_candidate, Header, EXHIROM_HEADER, HIROM_HEADER, LOROM_HEADER,
};
