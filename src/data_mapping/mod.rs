pub mod channel_mapping;

pub use channel_mapping::RemapTable;
