//! Domain model, attribute marshalling, repositories and order broadcasting
//! for the Raven order backend.

pub mod attribute;
pub mod broadcast;
pub mod catalog;
pub mod keys;
pub mod orders;
pub mod storage;
