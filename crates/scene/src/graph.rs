use core::mem::take;

use indextree::{Arena, NodeId};
use thiserror::Error;

use crate::color::Color;
use crate::geometry::Vector3;
use crate::node::{ImageSource, NodeData, NodeKind};

/// Opaque reference to a node in a [`SceneGraph`].
///
/// Handles are generation-checked: once the node is destroyed, every
/// outstanding handle to it (or to anything in its subtree) is rejected
/// with [`SceneError::InvalidHandle`], even if the arena slot is reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    id: NodeId,
    generation: u32,
}

/// Tree-structure errors, surfaced synchronously by the mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("operation on a destroyed or unknown node")]
    InvalidHandle,
    #[error("attach would create a cycle")]
    Cycle,
    #[error("child already has a parent; detach it first")]
    AlreadyParented,
    #[error("the root node cannot be moved or mutated")]
    RootImmutable,
    #[error("operation requires an {expected:?} node, found {found:?}")]
    KindMismatch { expected: NodeKind, found: NodeKind },
    #[error("geometry values must be finite")]
    NonFiniteGeometry,
}

/// One structural or attribute delta, recorded in call order.
///
/// The graph applies mutations immediately; these records exist so the
/// render loop can reconcile side effects (image requests, texture
/// references) at the next tick boundary without rescanning the tree.
#[derive(Debug, Clone)]
pub enum SceneUpdate {
    Created { node: NodeHandle, kind: NodeKind },
    Attached { parent: NodeHandle, child: NodeHandle },
    Detached { node: NodeHandle },
    Removed { node: NodeHandle },
    ImageSourceSet { node: NodeHandle, source: ImageSource },
    ImageSourceCleared { node: NodeHandle },
    GeometryChanged { node: NodeHandle },
    ColorChanged { node: NodeHandle },
}

/// Retained tree of visual nodes.
///
/// Nodes are owned by the arena and structured by parent/child links; a
/// node has at most one parent and the root never moves. All mutating
/// calls validate first and only then touch the tree, so a returned error
/// leaves the graph unchanged.
#[derive(Debug)]
pub struct SceneGraph {
    arena: Arena<NodeData>,
    root: NodeId,
    root_generation: u32,
    next_generation: u32,
    updates: Vec<SceneUpdate>,
}

impl SceneGraph {
    /// Create a graph whose root is a `Group` sized to the viewport.
    ///
    /// The root's geometry mirrors the render surface and is fixed for
    /// the lifetime of the graph.
    #[must_use]
    pub fn new(viewport: Vector3) -> Self {
        let mut arena = Arena::new();
        let mut root_data = NodeData::new(NodeKind::Group, 0);
        root_data.size = viewport;
        let root = arena.new_node(root_data);
        Self {
            arena,
            root,
            root_generation: 0,
            next_generation: 1,
            updates: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        NodeHandle {
            id: self.root,
            generation: self.root_generation,
        }
    }

    /// Allocate a detached node of the given kind with default attributes.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeHandle {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let id = self.arena.new_node(NodeData::new(kind, generation));
        let handle = NodeHandle { id, generation };
        self.updates.push(SceneUpdate::Created { node: handle, kind });
        handle
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// Fails with [`SceneError::Cycle`] if `child` is `parent` or an
    /// ancestor of it, and with [`SceneError::AlreadyParented`] if `child`
    /// is already attached somewhere (detach it first).
    pub fn attach(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<(), SceneError> {
        let parent_id = self.resolve(parent)?;
        let child_id = self.resolve(child)?;
        if child_id == self.root {
            return Err(SceneError::RootImmutable);
        }
        // Ancestors of the parent include the parent itself, so this
        // covers self-attachment as well.
        if parent_id.ancestors(&self.arena).any(|id| id == child_id) {
            return Err(SceneError::Cycle);
        }
        if self.parent_id_of(child_id).is_some() {
            return Err(SceneError::AlreadyParented);
        }
        parent_id.append(child_id, &mut self.arena);
        self.updates.push(SceneUpdate::Attached { parent, child });
        Ok(())
    }

    /// Remove `node` from its parent, keeping the node and its subtree
    /// alive for later re-attachment. Detaching a node with no parent is
    /// a no-op.
    pub fn detach(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        let id = self.resolve(node)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        if self.parent_id_of(id).is_none() {
            return Ok(());
        }
        id.detach(&mut self.arena);
        self.updates.push(SceneUpdate::Detached { node });
        Ok(())
    }

    /// Destroy `node` and its whole subtree.
    ///
    /// Every destroyed node is recorded as [`SceneUpdate::Removed`] so the
    /// render loop can cancel in-flight image requests and drop texture
    /// references. All handles into the subtree become invalid.
    pub fn destroy(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        let id = self.resolve(node)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        let doomed: Vec<NodeHandle> = id
            .descendants(&self.arena)
            .filter_map(|desc| {
                self.arena.get(desc).map(|n| NodeHandle {
                    id: desc,
                    generation: n.get().generation,
                })
            })
            .collect();
        for handle in &doomed {
            self.updates.push(SceneUpdate::Removed { node: *handle });
        }
        id.remove_subtree(&mut self.arena);
        Ok(())
    }

    pub fn set_position(&mut self, node: NodeHandle, position: Vector3) -> Result<(), SceneError> {
        self.set_geometry(node, |data| data.position = position, position)
    }

    pub fn set_size(&mut self, node: NodeHandle, size: Vector3) -> Result<(), SceneError> {
        self.set_geometry(node, |data| data.size = size, size)
    }

    pub fn set_parent_origin(
        &mut self,
        node: NodeHandle,
        origin: Vector3,
    ) -> Result<(), SceneError> {
        self.set_geometry(node, |data| data.parent_origin = origin, origin)
    }

    pub fn set_anchor_point(
        &mut self,
        node: NodeHandle,
        anchor: Vector3,
    ) -> Result<(), SceneError> {
        self.set_geometry(node, |data| data.anchor_point = anchor, anchor)
    }

    pub fn set_color(&mut self, node: NodeHandle, color: Color) -> Result<(), SceneError> {
        let id = self.resolve(node)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        self.data_mut(id).color = color;
        self.updates.push(SceneUpdate::ColorChanged { node });
        Ok(())
    }

    /// Point an `ImageView` at a new source.
    ///
    /// Setting the source a node already has is a no-op, so re-assigning a
    /// URI that is already resolved (or still in flight) never triggers a
    /// duplicate fetch. A genuinely new source supersedes the old one; the
    /// render loop cancels the previous request when it sees the update.
    pub fn set_image_source(
        &mut self,
        node: NodeHandle,
        source: impl Into<ImageSource>,
    ) -> Result<(), SceneError> {
        let id = self.resolve(node)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        let data = self.data(id);
        if data.kind != NodeKind::ImageView {
            return Err(SceneError::KindMismatch {
                expected: NodeKind::ImageView,
                found: data.kind,
            });
        }
        let source = source.into();
        if data.image_source.as_ref() == Some(&source) {
            return Ok(());
        }
        self.data_mut(id).image_source = Some(source.clone());
        self.updates.push(SceneUpdate::ImageSourceSet { node, source });
        Ok(())
    }

    /// Clear an `ImageView`'s source, cancelling any in-flight request and
    /// releasing the node's texture reference at the next tick.
    pub fn clear_image_source(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        let id = self.resolve(node)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        let data = self.data(id);
        if data.kind != NodeKind::ImageView {
            return Err(SceneError::KindMismatch {
                expected: NodeKind::ImageView,
                found: data.kind,
            });
        }
        if self.data_mut(id).image_source.take().is_some() {
            self.updates.push(SceneUpdate::ImageSourceCleared { node });
        }
        Ok(())
    }

    pub fn kind(&self, node: NodeHandle) -> Result<NodeKind, SceneError> {
        Ok(self.data(self.resolve(node)?).kind)
    }

    pub fn position(&self, node: NodeHandle) -> Result<Vector3, SceneError> {
        Ok(self.data(self.resolve(node)?).position)
    }

    pub fn size(&self, node: NodeHandle) -> Result<Vector3, SceneError> {
        Ok(self.data(self.resolve(node)?).size)
    }

    pub fn parent_origin(&self, node: NodeHandle) -> Result<Vector3, SceneError> {
        Ok(self.data(self.resolve(node)?).parent_origin)
    }

    pub fn anchor_point(&self, node: NodeHandle) -> Result<Vector3, SceneError> {
        Ok(self.data(self.resolve(node)?).anchor_point)
    }

    pub fn color(&self, node: NodeHandle) -> Result<Color, SceneError> {
        Ok(self.data(self.resolve(node)?).color)
    }

    pub fn image_source(&self, node: NodeHandle) -> Result<Option<ImageSource>, SceneError> {
        Ok(self.data(self.resolve(node)?).image_source.clone())
    }

    /// Parent handle, or `None` for the root and for detached nodes.
    pub fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, SceneError> {
        let id = self.resolve(node)?;
        Ok(self.parent_id_of(id).map(|pid| self.handle_of(pid)))
    }

    /// Children in attachment order.
    pub fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, SceneError> {
        let id = self.resolve(node)?;
        Ok(id
            .children(&self.arena)
            .map(|cid| self.handle_of(cid))
            .collect())
    }

    /// Whether the handle still points at a live node.
    #[must_use]
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.resolve(node).is_ok()
    }

    /// Live nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.count() - self.arena.iter().filter(|n| n.is_removed()).count()
    }

    /// Drain the deltas recorded since the previous call. The render loop
    /// takes one batch per tick; everything in it lands in the same frame.
    pub fn take_updates(&mut self) -> Vec<SceneUpdate> {
        take(&mut self.updates)
    }

    #[must_use]
    pub fn has_pending_updates(&self) -> bool {
        !self.updates.is_empty()
    }

    pub(crate) fn arena(&self) -> &Arena<NodeData> {
        &self.arena
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    pub(crate) fn handle_of(&self, id: NodeId) -> NodeHandle {
        let generation = self.arena.get(id).map_or(0, |n| n.get().generation);
        NodeHandle { id, generation }
    }

    fn resolve(&self, handle: NodeHandle) -> Result<NodeId, SceneError> {
        match self.arena.get(handle.id) {
            Some(node) if !node.is_removed() && node.get().generation == handle.generation => {
                Ok(handle.id)
            }
            _ => Err(SceneError::InvalidHandle),
        }
    }

    fn parent_id_of(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(indextree::Node::parent)
    }

    fn data(&self, id: NodeId) -> &NodeData {
        // Only called with ids returned by resolve().
        self.arena[id].get()
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    fn set_geometry(
        &mut self,
        node: NodeHandle,
        apply: impl FnOnce(&mut NodeData),
        value: Vector3,
    ) -> Result<(), SceneError> {
        let id = self.resolve(node)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        if !value.is_finite() {
            return Err(SceneError::NonFiniteGeometry);
        }
        apply(self.data_mut(id));
        self.updates.push(SceneUpdate::GeometryChanged { node });
        Ok(())
    }
}
