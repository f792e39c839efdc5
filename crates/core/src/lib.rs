//! `recordkeep-core` — shared building blocks.
//!
//! This crate contains the error catalog, document identifiers and the
//! `Document` trait (no store or transport concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Document;
pub use error::{AppError, AppResult, ErrorKind};
pub use id::{DocumentId, InvalidDocumentId};
