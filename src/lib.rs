//! bids-mirror: validate BIDS datasets and mirror them into a Girder folder
//! hierarchy, preserving layout and attaching sidecar JSON documents as
//! item/folder metadata.

pub mod classify;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod load_config;
pub mod mirror;
pub mod reset;
pub mod resolve;
pub mod store;
pub mod validate;
