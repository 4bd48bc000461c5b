//! The exported node hierarchy
//!
//! Rigid nodes live in an arena (`NodeTree`) and reference each other by
//! index, so the tree carries no object cycles even though the source
//! assembly graph may. Each node owns its mesh and the ordered joints to its
//! children; a joint connects a parent node to exactly one child.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mesh::Mesh;
use crate::driver::Driver;

/// Index of a node within its `NodeTree`
pub type NodeId = usize;

/// Kinematic classification of a tree joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JointKind {
    /// Angular motion only (hinge)
    Rotational,
    /// Linear motion only (slider)
    Linear,
    /// Both angular and linear motion. Reserved: the current classification
    /// policy never emits it.
    Both,
    /// Neither angular nor linear motion
    #[default]
    Neither,
}

impl JointKind {
    /// Wire-format token
    pub fn token(&self) -> &'static str {
        match self {
            JointKind::Rotational => "ROTATIONAL",
            JointKind::Linear => "LINEAR",
            JointKind::Both => "BOTH",
            JointKind::Neither => "NONE",
        }
    }

    /// Whether this kind carries a degree of freedom
    pub fn has_motion(&self) -> bool {
        !matches!(self, JointKind::Neither)
    }
}

impl std::str::FromStr for JointKind {
    type Err = crate::driver::TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROTATIONAL" => Ok(JointKind::Rotational),
            "LINEAR" => Ok(JointKind::Linear),
            "BOTH" => Ok(JointKind::Both),
            "NONE" => Ok(JointKind::Neither),
            _ => Err(crate::driver::TokenError {
                what: "joint kind",
                token: s.to_string(),
            }),
        }
    }
}

/// Motion limits along the joint's degree of freedom (rad or m)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f32,
    pub upper: f32,
}

impl JointLimits {
    pub fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }
}

/// A classified connection from a parent node to one child node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub kind: JointKind,
    pub limits: Option<JointLimits>,
    pub driver: Option<Driver>,
    /// The child node on the far side of this joint
    pub child: NodeId,
}

/// One rigid grouping of parts, the unit of the exported hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidNode {
    pub guid: Uuid,
    /// None only for the root
    pub parent: Option<NodeId>,
    /// Ordered joints to child nodes
    pub joints: Vec<Joint>,
    /// Geometry owned by this node, tagged with `guid`
    pub mesh: Mesh,
    /// Host-side model identifier of the grouping's primary body
    pub model_id: String,
}

/// Arena-allocated node tree; index 0 is always the root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    nodes: Vec<RigidNode>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its id
    pub fn push(&mut self, node: RigidNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&RigidNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut RigidNode> {
        self.nodes.get_mut(id)
    }

    /// The root node, if the tree is non-empty
    pub fn root(&self) -> Option<&RigidNode> {
        self.nodes.first()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RigidNode> {
        self.nodes.iter()
    }

    /// The joint connecting `id` to its parent, if `id` is not the root
    pub fn parent_joint(&self, id: NodeId) -> Option<&Joint> {
        let parent = self.nodes.get(id)?.parent?;
        self.nodes[parent].joints.iter().find(|j| j.child == id)
    }
}
