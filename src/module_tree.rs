//! Package topology inferred from every destination module path.
//!
//! Nodes live in an arena; children are owned through the arena and the
//! parent link is a plain index. Classification only looks at the finished
//! tree, so paths may be inserted in any order.

use std::collections::HashMap;
use std::fmt;

use crate::naming::{ModuleKind, is_dunder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub name: String,
    /// Number of segments from the root; top-level packages are level 1.
    pub level: usize,
    pub parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
}

impl ModuleNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }
}

#[derive(Debug, Clone)]
pub struct ModuleTree {
    nodes: Vec<ModuleNode>,
}

impl Default for ModuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleTree {
    const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![ModuleNode {
                name: String::new(),
                level: 0,
                parent: None,
                children: HashMap::new(),
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> &ModuleNode {
        &self.nodes[id.0]
    }

    /// Registered modules, not counting the unnamed root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_or_get_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent.0].children.get(name) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        let level = self.nodes[parent.0].level + 1;
        self.nodes.push(ModuleNode {
            name: name.to_string(),
            level,
            parent: Some(parent),
            children: HashMap::new(),
        });
        self.nodes[parent.0].children.insert(name.to_string(), id);
        id
    }

    /// Adds every prefix of `dotted`. Inserting a path twice is a no-op.
    pub fn insert(&mut self, dotted: &str) -> NodeId {
        dotted
            .split('.')
            .fold(Self::ROOT, |node, segment| self.add_or_get_child(node, segment))
    }

    pub fn find(&self, dotted: &str) -> Option<NodeId> {
        dotted.split('.').try_fold(Self::ROOT, |node, segment| {
            self.nodes[node.0].children.get(segment).copied()
        })
    }

    pub fn full_name(&self, id: NodeId) -> String {
        let mut parts = Vec::with_capacity(self.node(id).level);
        let mut current = Some(id);
        while let Some(node) = current.filter(|n| *n != Self::ROOT) {
            parts.push(self.node(node).name.as_str());
            current = self.node(node).parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Package iff the node has children, except dunder names which are always leaves.
    pub fn kind_of(&self, id: NodeId) -> ModuleKind {
        let node = self.node(id);
        if node.is_leaf() || is_dunder(&node.name) {
            ModuleKind::Leaf
        } else {
            ModuleKind::Package
        }
    }

    pub fn classify(&self, dotted: &str) -> Option<ModuleKind> {
        self.find(dotted).map(|id| self.kind_of(id))
    }

    /// Depth-first visit of every registered module.
    pub fn walk(&self, mut cb: impl FnMut(NodeId, &ModuleNode)) {
        let mut stack: Vec<NodeId> = self.node(Self::ROOT).children().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            cb(id, node);
            stack.extend(node.children());
        }
    }

    /// Sorted full names of all leaf modules.
    pub fn leaves(&self) -> Vec<String> {
        let mut leaves = Vec::new();
        self.walk(|id, node| {
            if node.is_leaf() {
                leaves.push(self.full_name(id));
            }
        });
        leaves.sort();
        leaves
    }
}

impl fmt::Display for ModuleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::with_capacity(self.len());
        self.walk(|id, _| names.push(self.full_name(id)));
        names.sort();
        for name in names {
            writeln!(f, "{name}")?;
        }
        Ok(())
    }
}
