//! Core services for categorization, trash, transfers and storage analysis

pub mod analyzer;
pub mod catalog;
pub mod category;
pub mod format;
pub mod fsops;
pub mod size;
pub mod space;
pub mod transfer;
pub mod trash;
