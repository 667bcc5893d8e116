//! Tree-structure invariants under randomized and adversarial mutation.

use anyhow::Result;
use scene::{NodeHandle, NodeKind, SceneError, SceneGraph, Vector3};

mod common;

/// Deterministic pseudo-random stream; no external dependency needed.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick(&mut self, bound: usize) -> usize {
        (self.next() as usize) % bound
    }
}

/// Every live node's ancestor chain must terminate (at the root or at a
/// detached subtree's top) within the node count, or the tree has a cycle.
fn assert_acyclic_and_single_rooted(graph: &SceneGraph, pool: &[NodeHandle]) -> Result<()> {
    let root = graph.root();
    for &node in pool {
        if !graph.contains(node) {
            continue;
        }
        let mut current = node;
        let mut steps = 0;
        while current != root {
            match graph.parent(current)? {
                Some(parent) => current = parent,
                None => break,
            }
            steps += 1;
            assert!(
                steps <= graph.node_count(),
                "ancestor chain from {node:?} does not terminate"
            );
        }
    }
    Ok(())
}

#[test]
fn randomized_mutation_keeps_one_acyclic_tree() -> Result<()> {
    common::init_test_logs();
    let mut graph = SceneGraph::new(Vector3::new(800.0, 600.0, 0.0));
    let mut rng = Lcg(0x5eed_cafe);

    let kinds = [NodeKind::Group, NodeKind::ColorView, NodeKind::ImageView];
    let mut pool = vec![graph.root()];
    for index in 0..48 {
        pool.push(graph.create_node(kinds[index % kinds.len()]));
    }

    for step in 0..2_000 {
        let parent = pool[rng.pick(pool.len())];
        let child = pool[rng.pick(pool.len())];
        match rng.pick(5) {
            0 | 1 => {
                if let Err(err) = graph.attach(parent, child) {
                    assert!(
                        matches!(
                            err,
                            SceneError::Cycle
                                | SceneError::AlreadyParented
                                | SceneError::RootImmutable
                                | SceneError::InvalidHandle
                        ),
                        "attach failed with an unexpected error: {err}"
                    );
                }
            }
            2 => {
                if let Err(err) = graph.detach(child) {
                    assert!(matches!(
                        err,
                        SceneError::RootImmutable | SceneError::InvalidHandle
                    ));
                }
            }
            3 => {
                if let Err(err) = graph.destroy(child) {
                    assert!(matches!(
                        err,
                        SceneError::RootImmutable | SceneError::InvalidHandle
                    ));
                }
            }
            _ => pool.push(graph.create_node(kinds[rng.pick(kinds.len())])),
        }

        if step % 64 == 0 {
            assert_acyclic_and_single_rooted(&graph, &pool)?;
        }
    }
    assert_acyclic_and_single_rooted(&graph, &pool)?;
    Ok(())
}

#[test]
fn attach_rejects_every_cycle_shape() -> Result<()> {
    common::init_test_logs();
    let mut graph = SceneGraph::new(Vector3::new(800.0, 600.0, 0.0));
    let root = graph.root();
    let a = graph.create_node(NodeKind::Group);
    let b = graph.create_node(NodeKind::Group);
    let c = graph.create_node(NodeKind::Group);
    graph.attach(root, a)?;
    graph.attach(a, b)?;
    graph.attach(b, c)?;

    assert!(matches!(graph.attach(a, a), Err(SceneError::Cycle)));
    assert!(matches!(graph.attach(c, a), Err(SceneError::Cycle)));
    assert!(matches!(graph.attach(b, root), Err(SceneError::RootImmutable)));

    // The failed attempts must leave the chain intact.
    assert_eq!(graph.parent(c)?, Some(b));
    assert_eq!(graph.parent(b)?, Some(a));
    assert_eq!(graph.parent(a)?, Some(root));
    Ok(())
}

#[test]
fn destroying_a_subtree_invalidates_every_handle_in_it() -> Result<()> {
    common::init_test_logs();
    let mut graph = SceneGraph::new(Vector3::new(800.0, 600.0, 0.0));
    let root = graph.root();
    let group = graph.create_node(NodeKind::Group);
    let leaf = graph.create_node(NodeKind::ColorView);
    graph.attach(root, group)?;
    graph.attach(group, leaf)?;
    assert_eq!(graph.node_count(), 3);

    graph.destroy(group)?;
    assert_eq!(graph.node_count(), 1);
    assert!(!graph.contains(group));
    assert!(!graph.contains(leaf));
    assert!(matches!(
        graph.set_size(leaf, Vector3::new(10.0, 10.0, 0.0)),
        Err(SceneError::InvalidHandle)
    ));
    Ok(())
}
