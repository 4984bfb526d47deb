//! Builds the in-memory class relationship graph: one node per uniquely
//! named scanned class, direct edges for extends/implements/references/
//! annotations, and reachability-based queries over the result.

mod filter;
mod linker;
mod node;
mod query;
mod result;

pub use filter::Filter;
pub use linker::RelationshipLinker;
pub use node::{ClassNode, ClassRecord, ConstantValue, Edge, EdgeKind, FieldRecord, MethodRecord};
pub use query::{NodePredicate, NodeSet, Query};
pub use result::ScanResult;
