//! Core machinery: block headers, backing regions and the strategy registry.

pub(crate) mod header;
pub(crate) mod region;
pub(crate) mod registry;
