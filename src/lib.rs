//! docqa - Document-grounded question answering
//!
//! Splits technical documentation into overlapping chunks, embeds them into a
//! nearest-neighbour index built once per load, and answers questions from the
//! top-K most relevant chunks, optionally phrasing the answer with a local
//! language model restricted to that context.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retrieval;
pub mod session;
pub mod synthesis;

pub use error::{DocqaError, Result};
