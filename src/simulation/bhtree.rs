//! Barnes–Hut quadtree.
//!
//! The tree is rebuilt from scratch every step from a snapshot of the
//! owning process's bodies, read-only once force evaluation starts, and
//! dropped at step end. Nodes come in three variants:
//!
//! - `Empty`: a quadrant holding nothing,
//! - `External`: a leaf holding exactly one body,
//! - `Internal`: an aggregate pseudo-body (summed mass at the mass-weighted
//!   mean position) plus four exclusively-owned child subtrees.
//!
//! Force evaluation replaces a whole subtree by its aggregate whenever the
//! subtree's angular extent `s / d` falls below the acceptance ratio theta.

use crate::simulation::body::{Body, NVec2};
use crate::simulation::quadrant::Quadrant;

/// Subdivision stops at this depth; further bodies landing in the same leaf
/// are folded into it with `Body::plus`. Only reachable when bodies share a
/// position to ~2^-64 of the root side.
const MAX_DEPTH: u32 = 64;

enum Node {
    Empty(Quadrant),
    External {
        quad: Quadrant,
        body: Body,
    },
    Internal {
        quad: Quadrant,
        aggregate: Body,
        children: Box<[Node; 4]>,
    },
}

impl Node {
    fn quad(&self) -> Quadrant {
        match self {
            Node::Empty(quad) => *quad,
            Node::External { quad, .. } => *quad,
            Node::Internal { quad, .. } => *quad,
        }
    }

    fn insert(&mut self, b: Body, depth: u32) {
        match self {
            Node::Empty(quad) => {
                *self = Node::External { quad: *quad, body: b };
            }
            Node::External { quad, body } => {
                if depth >= MAX_DEPTH {
                    // Coincident bodies collapse into one leaf pseudo-body.
                    *body = body.plus(&b);
                    return;
                }
                let quad = *quad;
                let occupant = body.clone();
                let aggregate = occupant.plus(&b);
                let (nw, ne, sw, se) = quad.subdivide();
                let mut children = Box::new([
                    Node::Empty(nw),
                    Node::Empty(ne),
                    Node::Empty(sw),
                    Node::Empty(se),
                ]);
                Self::route(&mut children, occupant, depth + 1);
                Self::route(&mut children, b, depth + 1);
                *self = Node::Internal {
                    quad,
                    aggregate,
                    children,
                };
            }
            Node::Internal {
                aggregate,
                children,
                ..
            } => {
                *aggregate = aggregate.plus(&b);
                Self::route(children, b, depth + 1);
            }
        }
    }

    /// Send `b` into the first child whose quadrant contains it. Containment
    /// bounds are closed, so the four children tile the parent with shared
    /// edges and the scan order (NW, NE, SW, SE) breaks edge ties.
    fn route(children: &mut [Node; 4], b: Body, depth: u32) {
        if let Some(i) = children.iter().position(|c| b.inside(&c.quad())) {
            children[i].insert(b, depth);
        }
    }

    fn update_force(&self, probe: &mut Body, theta: f64) {
        match self {
            Node::Empty(_) => {}
            Node::External { body, .. } => {
                // The same physical body must not pull on itself.
                if body.id != probe.id {
                    probe.accumulate_force_from(body);
                }
            }
            Node::Internal {
                quad,
                aggregate,
                children,
            } => {
                let d = probe.distance_to(aggregate);
                if quad.length() / d < theta {
                    probe.accumulate_force_from(aggregate);
                } else {
                    for child in children.iter() {
                        child.update_force(probe, theta);
                    }
                }
            }
        }
    }
}

pub struct BHTree {
    root: Node,
    theta: f64,
}

impl BHTree {
    /// Create an empty tree over the root region. `theta` is the acceptance
    /// ratio; `0.0` disables approximation entirely (every traversal reaches
    /// the leaves).
    pub fn new(root: Quadrant, theta: f64) -> Self {
        debug_assert!(theta >= 0.0, "acceptance ratio must be non-negative");
        Self {
            root: Node::Empty(root),
            theta,
        }
    }

    /// Insert a body. The caller guarantees `b.inside(root)`; bodies outside
    /// the root region are filtered out before insertion.
    pub fn insert(&mut self, b: Body) {
        debug_assert!(b.inside(&self.root.quad()));
        self.root.insert(b, 0);
    }

    /// Accumulate onto `probe` the approximate gravitational force exerted
    /// by every body in the tree, skipping `probe` itself if present.
    pub fn update_force(&self, probe: &mut Body) {
        self.root.update_force(probe, self.theta);
    }

    /// Total mass and center of mass of the whole tree, or `None` when the
    /// tree is empty.
    pub fn aggregate(&self) -> Option<(f64, NVec2)> {
        match &self.root {
            Node::Empty(_) => None,
            Node::External { body, .. } => Some((body.m, body.r)),
            Node::Internal { aggregate, .. } => Some((aggregate.m, aggregate.r)),
        }
    }
}
