pub mod aig;
pub mod bdd;
pub mod cnf;
pub mod fraig;
pub mod miter;
pub mod opt;
pub mod prove;
pub mod sat;

// Re-exporting symbols and modules.
pub use aig::dfs;
pub use aig::sim;
pub use aig::{Aig, AigEdge, AigError, AigNode, AigNodeRef, NodeId, ParserError, Result};
