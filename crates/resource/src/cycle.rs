//! Self-reference and circular-reference detection over strong edges.
//!
//! Runs after closure expansion. A resource that (transitively) strongly
//! depends on itself is reported on its own; circular chains are found with
//! Tarjan's strongly-connected-components algorithm and reported once per
//! component. Nothing here fails: findings are accumulated so the whole
//! picture can be reported in one go.

use std::fmt;

use crate::graph::{NodeId, ResourceNode};

/// A resource wiring error found during analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A resource strongly depends on itself.
    SelfReference {
        /// Display name of the resource
        resource: String,
    },
    /// Two or more resources strongly depend on each other.
    CircularReference {
        /// Display names of every resource in the cycle
        resources: Vec<String>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfReference { resource } => {
                write!(f, "Resource is referencing itself: {resource}")
            }
            Self::CircularReference { resources } => {
                write!(
                    f,
                    "Circular references between resources: {}",
                    resources.join(",")
                )
            }
        }
    }
}

/// Raw findings of [`detect`], as node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Nodes whose strong dependencies contain themselves.
    pub self_references: Vec<NodeId>,
    /// Strongly connected components with more than one member.
    pub components: Vec<Vec<NodeId>>,
}

impl CycleReport {
    /// `true` if anything was found.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.self_references.is_empty() || !self.components.is_empty()
    }

    /// Resolve the findings to named diagnostics, self references first.
    #[must_use]
    pub fn diagnostics(&self, nodes: &[ResourceNode]) -> Vec<Diagnostic> {
        let self_refs = self.self_references.iter().map(|id| Diagnostic::SelfReference {
            resource: nodes[id.index()].display_name(),
        });
        let cycles = self.components.iter().map(|component| Diagnostic::CircularReference {
            resources: component
                .iter()
                .map(|id| nodes[id.index()].display_name())
                .collect(),
        });
        self_refs.chain(cycles).collect()
    }
}

/// Run both checks over `nodes`.
#[must_use]
pub fn detect(nodes: &[ResourceNode]) -> CycleReport {
    CycleReport {
        self_references: self_references(nodes),
        components: strongly_connected_components(nodes),
    }
}

/// Nodes listing themselves among their strong dependencies.
#[must_use]
pub fn self_references(nodes: &[ResourceNode]) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|node| node.strong_dependencies().contains(&node.id()))
        .map(ResourceNode::id)
        .collect()
}

/// Tarjan's SCC over strong edges, keeping components of size > 1.
///
/// Roots are visited in arena order; each component lists its root first,
/// followed by the other members in discovery order.
#[must_use]
pub fn strongly_connected_components(nodes: &[ResourceNode]) -> Vec<Vec<NodeId>> {
    let mut tarjan = Tarjan::new(nodes);
    for node in nodes {
        if tarjan.index[node.id().index()].is_none() {
            tarjan.strong_connect(node.id());
        }
    }
    tarjan.components
}

struct Tarjan<'a> {
    nodes: &'a [ResourceNode],
    next_index: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    components: Vec<Vec<NodeId>>,
}

impl<'a> Tarjan<'a> {
    fn new(nodes: &'a [ResourceNode]) -> Self {
        Self {
            nodes,
            next_index: 0,
            index: vec![None; nodes.len()],
            lowlink: vec![0; nodes.len()],
            on_stack: vec![false; nodes.len()],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    // Recursion depth is bounded by the number of resources on the bench.
    fn strong_connect(&mut self, v: NodeId) {
        let vi = v.index();
        self.index[vi] = Some(self.next_index);
        self.lowlink[vi] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[vi] = true;

        let nodes = self.nodes;
        for &w in nodes[vi].strong_dependencies() {
            let wi = w.index();
            match self.index[wi] {
                None => {
                    self.strong_connect(w);
                    self.lowlink[vi] = self.lowlink[vi].min(self.lowlink[wi]);
                }
                Some(w_index) if self.on_stack[wi] => {
                    self.lowlink[vi] = self.lowlink[vi].min(w_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[vi]) == self.index[vi] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w.index()] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            if component.len() > 1 {
                component.reverse();
                self.components.push(component);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ResourceGraph, Root};
    use crate::member::OpenBehavior;
    use crate::testing::TestResource;

    #[test]
    fn diagnostic_messages() {
        let self_ref = Diagnostic::SelfReference {
            resource: "DMM".into(),
        };
        assert_eq!(self_ref.to_string(), "Resource is referencing itself: DMM");

        let circular = Diagnostic::CircularReference {
            resources: vec!["A".into(), "B".into(), "C".into()],
        };
        assert_eq!(
            circular.to_string(),
            "Circular references between resources: A,B,C"
        );
    }

    #[test]
    fn three_node_cycle_is_one_component() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        let c = TestResource::new("C");
        a.depends_on("Next", &b.handle());
        b.depends_on("Next", &c.handle());
        c.depends_on("Next", &a.handle());

        let graph = ResourceGraph::build(&[Root::from(a.handle())]);
        let components = strongly_connected_components(graph.nodes());
        assert_eq!(components.len(), 1);
        assert_eq!(graph.names(&components[0]), vec!["A", "B", "C"]);
    }

    #[test]
    fn separate_cycles_reported_separately() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        let c = TestResource::new("C");
        let d = TestResource::new("D");
        a.depends_on("Next", &b.handle());
        b.depends_on("Next", &a.handle());
        c.depends_on("Next", &d.handle());
        d.depends_on("Next", &c.handle());

        let graph = ResourceGraph::build(&[Root::from(a.handle()), Root::from(c.handle())]);
        let report = detect(graph.nodes());
        assert_eq!(report.components.len(), 2);
        assert_eq!(graph.names(&report.components[0]), vec!["A", "B"]);
        assert_eq!(graph.names(&report.components[1]), vec!["C", "D"]);
    }

    #[test]
    fn self_reference_without_component() {
        let a = TestResource::new("A");
        a.depends_on("Me", &a.handle());

        let graph = ResourceGraph::build(&[Root::from(a.handle())]);
        let report = detect(graph.nodes());
        assert_eq!(graph.names(&report.self_references), vec!["A"]);
        assert!(report.components.is_empty());
        assert!(report.has_errors());
    }

    #[test]
    fn weak_only_cycle_is_clean() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        a.set_dependency("Peer", Some(b.handle()), OpenBehavior::InParallel);
        b.set_dependency("Peer", Some(a.handle()), OpenBehavior::InParallel);

        let graph = ResourceGraph::build(&[Root::from(a.handle())]);
        let report = detect(graph.nodes());
        assert!(!report.has_errors());
        assert!(report.diagnostics(graph.nodes()).is_empty());
    }

    #[test]
    fn acyclic_chain_has_no_components() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        let c = TestResource::new("C");
        a.depends_on("Next", &b.handle());
        b.depends_on("Next", &c.handle());
        a.depends_on("Skip", &c.handle());

        let graph = ResourceGraph::build(&[Root::from(a.handle())]);
        assert_eq!(detect(graph.nodes()), CycleReport::default());
    }
}
