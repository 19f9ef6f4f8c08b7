//! Internal utilities.

pub(crate) mod layout;
pub(crate) mod size;
