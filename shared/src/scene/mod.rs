/*!
Scene graph: an arena of named, typed nodes linked into a tree.

Nodes own their children through the arena; the parent link is a plain key (a non-owning
back reference). The graph knows nothing about physics. Anything that must react to a
hierarchy change (the physics binding) is driven by [`crate::World`], which calls
[`SceneGraph::set_parent`] and then synchronizes the moved subtree.
*/

mod solid_body;

pub use solid_body::{BodyShape, SolidBody};

use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

new_key_type! {
    /// Generational key of a node in the [`SceneGraph`] arena.
    pub struct NodeId;
}

/// Type tag of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Instance,
    Folder,
    Model,
    Part,
    SpawnLocation,
    /// The data-model root.
    Game,
    /// Physics root: solid bodies below it are simulated.
    Workspace,
    Lighting,
    /// Container for 2D overlay elements.
    CoreGui,
}

impl NodeClass {
    /// Class-name factory lookup. Only user-constructible classes resolve; services such as
    /// `Workspace` exist once per world and cannot be created by name.
    pub fn from_name(class_name: &str) -> Option<Self> {
        match class_name {
            "Instance" => Some(Self::Instance),
            "Folder" => Some(Self::Folder),
            "Model" => Some(Self::Model),
            "Part" => Some(Self::Part),
            "SpawnLocation" => Some(Self::SpawnLocation),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Instance => "Instance",
            Self::Folder => "Folder",
            Self::Model => "Model",
            Self::Part => "Part",
            Self::SpawnLocation => "SpawnLocation",
            Self::Game => "Game",
            Self::Workspace => "Workspace",
            Self::Lighting => "Lighting",
            Self::CoreGui => "CoreGui",
        }
    }

    fn default_body(self) -> Option<SolidBody> {
        match self {
            Self::Part => Some(SolidBody::block()),
            Self::SpawnLocation => Some(SolidBody::spawn_location()),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0:?} cannot be its own parent")]
    SelfParent(NodeId),
    #[error("parenting {node:?} under {parent:?} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("node {0:?} is not a solid body")]
    NotASolidBody(NodeId),
    #[error("node {0:?} is a service and cannot be destroyed or moved")]
    Protected(NodeId),
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    class: NodeClass,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    body: Option<SolidBody>,
}

impl Node {
    fn new(class: NodeClass) -> Self {
        Self {
            name: class.name().to_string(),
            class,
            parent: None,
            children: Vec::new(),
            body: class.default_body(),
        }
    }

    pub fn class(&self) -> NodeClass {
        self.class
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn body(&self) -> Option<&SolidBody> {
        self.body.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached node of `class`.
    pub fn insert(&mut self, class: NodeClass) -> NodeId {
        self.nodes.insert(Node::new(class))
    }

    /// Allocate a detached node by class name. Unknown names yield `None`.
    pub fn create(&mut self, class_name: &str) -> Option<NodeId> {
        NodeClass::from_name(class_name).map(|class| self.insert(class))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every live node, in arena order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.name.as_str())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        node.name = name.into();
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn body(&self, id: NodeId) -> Option<&SolidBody> {
        self.nodes.get(id).and_then(|n| n.body.as_ref())
    }

    pub(crate) fn body_mut(&mut self, id: NodeId) -> Option<&mut SolidBody> {
        self.nodes.get_mut(id).and_then(|n| n.body.as_mut())
    }

    /// First direct child named `name`, in child order.
    pub fn find_first_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.name(child) == Some(name))
    }

    /// Is `ancestor` a strict ancestor of `id`?
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// `id` followed by all of its descendants, depth first, in child order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Move `id` under `new_parent` (or detach it with `None`).
    ///
    /// The node leaves its old parent's child list before it is appended to the new one.
    /// Returns whether the parent actually changed.
    pub fn set_parent(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<bool, SceneError> {
        let old_parent = self.nodes.get(id).ok_or(SceneError::UnknownNode(id))?.parent;
        if old_parent == new_parent {
            return Ok(false);
        }

        if let Some(parent) = new_parent {
            if !self.contains(parent) {
                return Err(SceneError::UnknownNode(parent));
            }
            if parent == id {
                return Err(SceneError::SelfParent(id));
            }
            if self.is_descendant_of(parent, id) {
                return Err(SceneError::Cycle { node: id, parent });
            }
        }

        if let Some(old) = old_parent
            && let Some(old_node) = self.nodes.get_mut(old)
        {
            old_node.children.retain(|&child| child != id);
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = new_parent;
        }

        if let Some(parent) = new_parent
            && let Some(parent_node) = self.nodes.get_mut(parent)
        {
            parent_node.children.push(id);
        }

        Ok(true)
    }

    /// Detach `id` and free it together with every descendant.
    ///
    /// Returns the removed nodes so callers can release anything still bound to them.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<(NodeId, Node)> {
        if self.set_parent(id, None).is_err() {
            return Vec::new();
        }

        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.nodes.remove(node).map(|n| (node, n)))
            .collect()
    }
}
