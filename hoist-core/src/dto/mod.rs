//! Data transfer objects
//!
//! Serializable views handed out once a run is over.

pub mod report;
