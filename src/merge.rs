//! Grouping of source trees by destination module.

use std::collections::BTreeMap;

use crate::error::ExtractError;
use crate::utils::SourceTree;

/// Everything that lands in one destination module.
#[derive(Debug, Clone, Default)]
pub struct DestinationGroup {
    plain: Option<SourceTree>,
    relocated: Vec<SourceTree>,
}

impl DestinationGroup {
    pub fn len(&self) -> usize {
        usize::from(self.plain.is_some()) + self.relocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One destination with its trees in final order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedModule {
    pub module: String,
    pub trees: Vec<SourceTree>,
}

impl MergedModule {
    /// Statement sequences of all trees, one after the other.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for tree in self.trees.iter().filter(|tree| !tree.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&tree.code);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// Destination module → trees. Built by the single-threaded aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct DestinationGroups {
    groups: BTreeMap<String, DestinationGroup>,
}

impl DestinationGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the one plain source of `module`; a second one is a hard error.
    pub fn add_plain(&mut self, module: &str, tree: SourceTree) -> Result<(), ExtractError> {
        let group = self.groups.entry(module.to_string()).or_default();
        if let Some(existing) = &group.plain {
            return Err(ExtractError::DuplicateModule {
                module: module.to_string(),
                first: existing.origin.clone(),
                second: tree.origin,
            });
        }
        group.plain = Some(tree);
        Ok(())
    }

    /// Appends a relocated tree; call order is the final order.
    pub fn add_relocated(&mut self, module: &str, tree: SourceTree) {
        self.groups
            .entry(module.to_string())
            .or_default()
            .relocated
            .push(tree);
    }

    pub fn get(&self, module: &str) -> Option<&DestinationGroup> {
        self.groups.get(module)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Plain tree first, then relocated trees in registration order.
    pub fn into_merged(self) -> Vec<MergedModule> {
        self.groups
            .into_iter()
            .map(|(module, group)| MergedModule {
                module,
                trees: group.plain.into_iter().chain(group.relocated).collect(),
            })
            .collect()
    }
}
