use indextree::NodeId;
use smallvec::SmallVec;

use crate::color::Color;
use crate::geometry::{Rect3, Vector3};
use crate::graph::{NodeHandle, SceneGraph};
use crate::node::{NodeData, NodeKind};

/// One node's resolved placement, in absolute stage coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutNode {
    pub node: NodeHandle,
    pub kind: NodeKind,
    pub rect: Rect3,
    pub color: Color,
}

/// Immutable result of a layout pass.
///
/// Nodes appear in paint order (parents before children, siblings in
/// attachment order), so consumers can draw the list front to back as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub viewport: Vector3,
    pub items: Vec<LaidOutNode>,
}

impl LayoutSnapshot {
    /// Resolved rect for a single node, if it was part of this pass.
    #[must_use]
    pub fn rect_of(&self, node: NodeHandle) -> Option<Rect3> {
        self.items
            .iter()
            .find(|item| item.node == node)
            .map(|item| item.rect)
    }
}

/// Resolve absolute placements for every node reachable from the root.
///
/// A child's origin combines its parent's resolved rect with its own
/// `parent_origin`, `position`, `size`, and `anchor_point`: the parent
/// origin picks a reference point inside the parent, position offsets
/// from there, and the anchor picks which point of the child lands on the
/// result. Detached subtrees are not visited. The graph is not modified.
#[must_use]
pub fn compute_layout(graph: &SceneGraph) -> LayoutSnapshot {
    let arena = graph.arena();
    let root = graph.root_id();

    let root_rect = match arena.get(root) {
        Some(node) => Rect3::from_origin_size(Vector3::zero(), node.get().size),
        None => Rect3::from_origin_size(Vector3::zero(), Vector3::zero()),
    };

    let mut items = Vec::new();
    let mut stack: SmallVec<(NodeId, Rect3), 16> = SmallVec::new();
    stack.push((root, root_rect));

    while let Some((id, rect)) = stack.pop() {
        let Some(node) = arena.get(id) else { continue };
        let data = node.get();
        items.push(LaidOutNode {
            node: graph.handle_of(id),
            kind: data.kind,
            rect,
            color: data.color,
        });

        // Push in reverse so pops come back in attachment order.
        let children: SmallVec<NodeId, 8> = id.children(arena).collect();
        for child in children.iter().rev() {
            if let Some(child_node) = arena.get(*child) {
                stack.push((*child, place(child_node.get(), rect)));
            }
        }
    }

    LayoutSnapshot {
        viewport: root_rect.size,
        items,
    }
}

fn place(child: &NodeData, parent: Rect3) -> Rect3 {
    let origin = parent.origin + parent.size.scaled_by(child.parent_origin) + child.position
        - child.size.scaled_by(child.anchor_point);
    Rect3::from_origin_size(origin, child.size)
}
