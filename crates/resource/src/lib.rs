//! # taplock resource analysis
//!
//! Works out which resources (instruments, DUTs, result listeners) a test
//! plan needs and in which order to open them. Resources and test steps
//! expose their members through [`Reflect`]; the analyzer follows
//! resource-typed members, builds a graph of weak and strong dependencies,
//! closes it transitively and reports self references and circular
//! references before anything is opened. [`LockManager`] runs hooks around
//! the open/close sequence.

pub mod analyzer;
pub mod config;
pub mod cycle;
pub mod error;
pub mod graph;
pub mod lock;
pub mod member;
pub mod reference;
pub mod resource;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analyzer::DependencyAnalyzer;
pub use config::{AnalyzerConfig, Config, LockConfig};
pub use cycle::{CycleReport, Diagnostic};
pub use error::{Error, Result};
pub use graph::{NodeId, ResourceGraph, ResourceNode, Root, expand_strong_dependencies};
pub use lock::{AuditHook, LockHook, LockManager};
pub use member::{Member, MemberDescriptor, MemberValue, OpenBehavior, Reflect};
pub use reference::{ResourceReference, collect_references};
pub use resource::{Resource, ResourceHandle};
