//! Terminal commands. Each one loads what it needs, prints, and exits.

pub mod ask;
pub mod capabilities;
pub mod memory;
