//! Resource dependency graph.
//!
//! One analysis pass turns a set of roots (test steps, or resources) into an
//! arena of [`ResourceNode`]s:
//!
//! 1. breadth-first discovery of every reachable resource, with strong
//!    (`Before`) and weak (`InParallel`) edges;
//! 2. expansion of strong dependencies to a fixed point;
//! 3. cycle detection over strong edges (see [`crate::cycle`]);
//! 4. a second pass over the roots attaching the references that justify
//!    opening each resource.
//!
//! Edges are [`NodeId`]s into the arena; the graph never holds back-pointers.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::cycle::{self, CycleReport, Diagnostic};
use crate::error::{Error, Result};
use crate::member::{MemberDescriptor, Reflect};
use crate::reference::{ResourceReference, collect_references};
use crate::resource::ResourceHandle;

// ---------------------------------------------------------------------------
// NodeId / ResourceNode
// ---------------------------------------------------------------------------

/// Index of a node within one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in [`ResourceGraph::nodes`].
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One distinct resource discovered during analysis.
///
/// A node without a resource is a placeholder for an unset slot; it is keyed
/// by the member that was expected to hold a resource.
#[derive(Clone)]
pub struct ResourceNode {
    id: NodeId,
    resource: Option<ResourceHandle>,
    depender: Option<MemberDescriptor>,
    weak: IndexSet<NodeId>,
    strong: IndexSet<NodeId>,
    references: Vec<ResourceReference>,
}

impl ResourceNode {
    fn new(id: NodeId, resource: Option<ResourceHandle>, depender: Option<MemberDescriptor>) -> Self {
        Self {
            id,
            resource,
            depender,
            weak: IndexSet::new(),
            strong: IndexSet::new(),
            references: Vec::new(),
        }
    }

    /// Arena index of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The resource, or `None` for a placeholder.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceHandle> {
        self.resource.as_ref()
    }

    /// Member through which this node was first reached as a dependency of
    /// another resource (always set for placeholders).
    #[must_use]
    pub fn depender(&self) -> Option<&MemberDescriptor> {
        self.depender.as_ref()
    }

    /// Dependencies that may be opened concurrently with this resource.
    #[must_use]
    pub fn weak_dependencies(&self) -> &IndexSet<NodeId> {
        &self.weak
    }

    /// Dependencies that must be open before this resource.
    #[must_use]
    pub fn strong_dependencies(&self) -> &IndexSet<NodeId> {
        &self.strong
    }

    /// Why this resource has to be opened: the `(instance, member)` pairs of
    /// the roots that use it.
    #[must_use]
    pub fn references(&self) -> &[ResourceReference] {
        &self.references
    }

    /// `true` for a node standing in for an unset resource slot.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.resource.is_none()
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.resource, &self.depender) {
            (Some(resource), _) => resource.name(),
            (None, Some(member)) => format!("<unset {member}>"),
            (None, None) => "<unset>".to_string(),
        }
    }
}

impl fmt::Debug for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNode")
            .field("id", &self.id)
            .field("name", &self.display_name())
            .field("weak", &self.weak)
            .field("strong", &self.strong)
            .field("references", &self.references.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// An object handed to the analyzer: a test step (or any plugin object), or a
/// resource that needs a node even if nothing references it.
#[derive(Clone)]
pub enum Root {
    /// Arbitrary plugin object; only its references are analyzed.
    Object(Arc<dyn Reflect>),
    /// A resource; it always gets a node.
    Resource(ResourceHandle),
}

impl Root {
    /// The root as a metadata object.
    #[must_use]
    pub fn object(&self) -> Arc<dyn Reflect> {
        match self {
            Self::Object(object) => Arc::clone(object),
            Self::Resource(resource) => resource.as_reflect(),
        }
    }
}

impl From<Arc<dyn Reflect>> for Root {
    fn from(object: Arc<dyn Reflect>) -> Self {
        Self::Object(object)
    }
}

impl From<ResourceHandle> for Root {
    fn from(resource: ResourceHandle) -> Self {
        Self::Resource(resource)
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
            Self::Resource(resource) => f.debug_tuple("Resource").field(resource).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Resource(ResourceHandle),
    Unset(MemberDescriptor),
}

impl NodeKey {
    fn of(reference: &ResourceReference) -> Self {
        match reference.resource() {
            Some(resource) => Self::Resource(resource.clone()),
            None => Self::Unset(reference.member().clone()),
        }
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<ResourceNode>,
    index: HashMap<NodeKey, NodeId>,
    queue: VecDeque<NodeId>,
}

impl GraphBuilder {
    fn push(
        &mut self,
        key: NodeKey,
        resource: Option<ResourceHandle>,
        depender: Option<MemberDescriptor>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        if resource.is_some() {
            self.queue.push_back(id);
        }
        self.nodes.push(ResourceNode::new(id, resource, depender));
        self.index.insert(key, id);
        id
    }

    fn ensure_root(&mut self, resource: &ResourceHandle) -> NodeId {
        let key = NodeKey::Resource(resource.clone());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        self.push(key, Some(resource.clone()), None)
    }

    /// Node for the target of `reference`, created (and queued) on first
    /// sight. `from_resource` marks references read off another resource,
    /// whose member becomes the node's depender.
    fn ensure_target(&mut self, reference: &ResourceReference, from_resource: bool) -> NodeId {
        let key = NodeKey::of(reference);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let resource = reference.resource().cloned();
        let depender = (from_resource || resource.is_none()).then(|| reference.member().clone());
        self.push(key, resource, depender)
    }

    fn discover(mut self, roots: &[Root]) -> Self {
        for root in roots {
            match root {
                Root::Resource(resource) => {
                    self.ensure_root(resource);
                }
                Root::Object(object) => {
                    for reference in collect_references(object) {
                        if !reference.behavior().is_ignored() {
                            self.ensure_target(&reference, false);
                        }
                    }
                }
            }
        }

        while let Some(id) = self.queue.pop_front() {
            let Some(resource) = self.nodes[id.0].resource.clone() else {
                continue;
            };
            for reference in collect_references(&resource.as_reflect()) {
                if reference.behavior().is_ignored() {
                    continue;
                }
                let target = self.ensure_target(&reference, true);
                let node = &mut self.nodes[id.0];
                if reference.behavior().is_strong() {
                    node.strong.insert(target);
                } else {
                    node.weak.insert(target);
                }
            }
        }

        self
    }
}

// ---------------------------------------------------------------------------
// Closure expansion
// ---------------------------------------------------------------------------

/// Propagate strong dependencies until nothing changes.
///
/// For every strong dependency `d` of a node, `d`'s own strong and weak
/// dependencies become strong dependencies of the node. Sets only grow, so
/// the loop terminates; a node may end up depending on itself, which cycle
/// detection reports. Returns the number of passes taken, including the
/// final pass that changed nothing.
pub fn expand_strong_dependencies(nodes: &mut [ResourceNode]) -> usize {
    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;

        for i in 0..nodes.len() {
            let direct: Vec<NodeId> = nodes[i].strong.iter().copied().collect();
            for dependency in direct {
                let dep = &nodes[dependency.0];
                let inherited: Vec<NodeId> = dep.strong.iter().chain(&dep.weak).copied().collect();
                for id in inherited {
                    changed |= nodes[i].strong.insert(id);
                }
            }
        }

        if !changed {
            return passes;
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceGraph
// ---------------------------------------------------------------------------

/// Outcome of one analysis pass.
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<NodeKey, NodeId>,
    report: CycleReport,
    diagnostics: Vec<Diagnostic>,
}

impl ResourceGraph {
    /// Run discovery, closure expansion, cycle detection and reference
    /// attachment for `roots`. Never fails; problems are recorded as
    /// [`Diagnostic`]s.
    pub fn build(roots: &[Root]) -> Self {
        let GraphBuilder {
            mut nodes, index, ..
        } = GraphBuilder::default().discover(roots);

        expand_strong_dependencies(&mut nodes);
        let report = cycle::detect(&nodes);
        let diagnostics = report.diagnostics(&nodes);

        let mut graph = Self {
            nodes,
            index,
            report,
            diagnostics,
        };
        graph.attach_references(roots);
        graph
    }

    /// Second pass: record, on each node, the root references that use it.
    fn attach_references(&mut self, roots: &[Root]) {
        for root in roots {
            for reference in collect_references(&root.object()) {
                if reference.behavior().is_ignored() {
                    continue;
                }
                if let Some(&id) = self.index.get(&NodeKey::of(&reference)) {
                    self.nodes[id.0].references.push(reference);
                }
            }
        }
    }

    /// All nodes in discovery order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Consume the graph, keeping only the nodes.
    #[must_use]
    pub fn into_nodes(self) -> Vec<ResourceNode> {
        self.nodes
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id.0)
    }

    /// Node holding `resource`, if it was discovered.
    #[must_use]
    pub fn find(&self, resource: &ResourceHandle) -> Option<&ResourceNode> {
        self.index
            .get(&NodeKey::Resource(resource.clone()))
            .map(|id| &self.nodes[id.0])
    }

    /// Placeholder node for an unset `member`, if any root left it unset.
    #[must_use]
    pub fn find_unset(&self, member: &MemberDescriptor) -> Option<&ResourceNode> {
        self.index
            .get(&NodeKey::Unset(member.clone()))
            .map(|id| &self.nodes[id.0])
    }

    /// Resources whose own members point at `id` (not inherited through
    /// closure expansion).
    #[must_use]
    pub fn direct_dependents(&self, id: NodeId) -> Vec<&ResourceNode> {
        self.nodes
            .iter()
            .filter(|node| node.strong.contains(&id) || node.weak.contains(&id))
            .filter(|node| {
                node.resource.as_ref().is_some_and(|resource| {
                    collect_references(&resource.as_reflect())
                        .iter()
                        .filter(|reference| !reference.behavior().is_ignored())
                        .any(|reference| self.index.get(&NodeKey::of(reference)) == Some(&id))
                })
            })
            .collect()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if no resource was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Circular references among strong dependencies (components of size > 1).
    #[must_use]
    pub fn components(&self) -> &[Vec<NodeId>] {
        &self.report.components
    }

    /// Nodes that strongly depend on themselves.
    #[must_use]
    pub fn self_references(&self) -> &[NodeId] {
        &self.report.self_references
    }

    /// Every problem found, self references first.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `true` if the resource wiring must not be opened.
    #[must_use]
    pub fn errors_detected(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Display names of the members of `component`.
    #[must_use]
    pub fn names(&self, component: &[NodeId]) -> Vec<String> {
        component
            .iter()
            .map(|id| self.nodes[id.0].display_name())
            .collect()
    }

    /// Refuse a graph with errors.
    pub fn into_result(self) -> Result<Self> {
        if self.errors_detected() {
            return Err(Error::DependencyErrors {
                diagnostics: self.diagnostics,
            });
        }
        Ok(self)
    }

    /// Levels of resources to open; every strong dependency of a resource
    /// sits in an earlier level, and resources within a level may be opened
    /// concurrently. Weak dependencies impose no ordering. Placeholders are
    /// skipped.
    pub fn open_order(&self) -> Result<Vec<Vec<ResourceHandle>>> {
        if self.errors_detected() {
            let cycle = self
                .diagnostics
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::CircularDependency { cycle });
        }

        // Arena order is preserved, so NodeIndex::new(i) is node i.
        let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(self.nodes.len(), 0);
        for node in &self.nodes {
            graph.add_node(node.id);
        }
        for node in &self.nodes {
            for dependency in &node.strong {
                graph.add_edge(NodeIndex::new(dependency.0), NodeIndex::new(node.id.0), ());
            }
        }

        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();
        let mut remaining: Vec<NodeIndex> = graph.node_indices().collect();
        let mut levels = Vec::new();

        while !remaining.is_empty() {
            let current: Vec<NodeIndex> = remaining
                .iter()
                .filter(|idx| in_degree[idx.index()] == 0)
                .copied()
                .collect();

            if current.is_empty() {
                let stuck: Vec<NodeId> = remaining.iter().map(|idx| graph[*idx]).collect();
                return Err(Error::CircularDependency {
                    cycle: self.names(&stuck).join(","),
                });
            }

            for &idx in &current {
                for dependent in graph.neighbors_directed(idx, Direction::Outgoing) {
                    in_degree[dependent.index()] -= 1;
                }
            }
            remaining.retain(|idx| !current.contains(idx));

            let level: Vec<ResourceHandle> = current
                .iter()
                .filter_map(|idx| self.nodes[idx.index()].resource.clone())
                .collect();
            if !level.is_empty() {
                levels.push(level);
            }
        }

        Ok(levels)
    }

    /// [`open_order`](Self::open_order) reversed: dependents close first.
    pub fn close_order(&self) -> Result<Vec<Vec<ResourceHandle>>> {
        let mut levels = self.open_order()?;
        levels.reverse();
        Ok(levels)
    }
}

impl fmt::Debug for ResourceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGraph")
            .field("nodes", &self.nodes)
            .field("components", &self.report.components)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}
