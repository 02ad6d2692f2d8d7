//! Durable on-disk state

pub mod journal;
