//! Problem/solution storage
//!
//! One JSON document holds every open problem and every solved problem,
//! both keyed by file name. Each record operation reads the whole document
//! and writes it back.

mod document;
mod records;

pub use document::{Document, Problem, Solution};
pub use records::ProblemStore;
