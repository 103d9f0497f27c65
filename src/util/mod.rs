//! Internal helpers.

pub(crate) mod layout;
pub(crate) mod size;
