//! Local structural optimizations of an AIG.
//!
//! Each pass reads a network and returns a brand new, structurally hashed one with the same
//! inputs and outputs. The source network is left untouched.
//!
//! - [`rewrite`]: two-level rewriting rules applied while rebuilding
//! - [`refactor`]: cut-based functional simplification
//! - [`balance`]: depth reduction of AND trees.

mod balance;
mod refactor;
mod rewrite;

pub use balance::balance;
pub use refactor::{RefactorParams, refactor, refactor_with};
pub use rewrite::rewrite;
