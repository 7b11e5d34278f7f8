// src/db/models/mod.rs

//! Data models for the registry tables

mod receipt;
mod receipt_file;

pub use receipt::Receipt;
pub use receipt_file::ReceiptFile;
