// Map document model and the reader/merger for existing documents

pub mod differ;
pub mod model;

pub use differ::{
    merge_maps, parse_existing_map, parse_map_content, MergeOutcome, ParsedMapFile, ParsedSection,
};
pub use model::*;
