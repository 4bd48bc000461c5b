//! The assembly graph consumed from the host CAD
//!
//! The exporter never mutates the host document; it walks a snapshot of it.
//! A `SourceGraph` holds the tessellated bodies, the joints between them
//! (with their host-side motion kinds), and the designated root body. The
//! graph may contain redundant connectivity: multiple joints between the same
//! pair of bodies, and paths that revisit a body. Turning that into a tree is
//! the builder's job, not a precondition here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mesh::SubMesh;
use crate::skeleton::JointLimits;

/// Motion kind as reported by the host CAD joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionKind {
    /// Revolute motion about an axis
    Rotational,
    /// Sliding motion along an axis
    Linear,
    /// Rigid connection
    #[default]
    Fixed,
    /// Any other host joint kind (ball, planar, ...)
    Other,
}

impl MotionKind {
    /// Whether this kind becomes a tree edge during classification
    pub fn is_supported(&self) -> bool {
        matches!(self, MotionKind::Rotational | MotionKind::Linear)
    }
}

/// One tessellated body from the host assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: Uuid,
    /// Host-side occurrence name, e.g. "Part2:1"
    pub name: String,
    /// Geometry already tessellated upstream; copied verbatim into the
    /// owning node's mesh
    pub geometry: Vec<SubMesh>,
}

impl Body {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            geometry: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, geometry: Vec<SubMesh>) -> Self {
        self.geometry = geometry;
        self
    }
}

/// One host joint between two bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceJoint {
    pub id: Uuid,
    pub name: String,
    pub motion: MotionKind,
    pub parent_body: Uuid,
    pub child_body: Uuid,
    pub limits: Option<JointLimits>,
}

impl SourceJoint {
    pub fn new(
        name: impl Into<String>,
        motion: MotionKind,
        parent_body: Uuid,
        child_body: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            motion,
            parent_body,
            child_body,
            limits: None,
        }
    }

    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Read-only snapshot of the host assembly's rigid-body/joint graph
#[derive(Debug, Clone, Default)]
pub struct SourceGraph {
    bodies: Vec<Body>,
    body_index: HashMap<Uuid, usize>,
    joints: Vec<SourceJoint>,
    root: Option<Uuid>,
}

impl SourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body, returning its id
    pub fn add_body(&mut self, body: Body) -> Uuid {
        let id = body.id;
        self.body_index.insert(id, self.bodies.len());
        self.bodies.push(body);
        id
    }

    /// Add a joint, returning its id
    pub fn add_joint(&mut self, joint: SourceJoint) -> Uuid {
        let id = joint.id;
        self.joints.push(joint);
        id
    }

    /// Designate the root body of the assembly
    pub fn set_root(&mut self, body: Uuid) {
        self.root = Some(body);
    }

    pub fn root(&self) -> Option<Uuid> {
        self.root
    }

    pub fn body(&self, id: Uuid) -> Option<&Body> {
        self.body_index.get(&id).map(|&i| &self.bodies[i])
    }

    /// Position of a body in insertion order
    pub fn body_position(&self, id: Uuid) -> Option<usize> {
        self.body_index.get(&id).copied()
    }

    /// Bodies in insertion order
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Joints in insertion order
    pub fn joints(&self) -> &[SourceJoint] {
        &self.joints
    }

    /// Only the joints whose motion kind becomes a tree edge
    pub fn motion_joints(&self) -> impl Iterator<Item = &SourceJoint> {
        self.joints.iter().filter(|j| j.motion.is_supported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_joint_filtering() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(Body::new("a"));
        let b = graph.add_body(Body::new("b"));
        graph.add_joint(SourceJoint::new("hinge", MotionKind::Rotational, a, b));
        graph.add_joint(SourceJoint::new("weld", MotionKind::Fixed, a, b));
        graph.add_joint(SourceJoint::new("slide", MotionKind::Linear, a, b));
        graph.add_joint(SourceJoint::new("ball", MotionKind::Other, a, b));

        let names: Vec<&str> = graph.motion_joints().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["hinge", "slide"]);
    }

    #[test]
    fn test_body_lookup() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(Body::new("base"));
        assert_eq!(graph.body(a).unwrap().name, "base");
        assert_eq!(graph.body_position(a), Some(0));
        assert!(graph.body(Uuid::new_v4()).is_none());
    }
}
