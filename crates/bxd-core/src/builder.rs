//! Graph-to-tree normalization
//!
//! The host assembly is a general graph: bodies may be connected by several
//! joints, rigid connections, and redundant constraint paths. The exported
//! skeleton is a tree. The builder bridges the two:
//!
//! - bodies connected only by unsupported joints (fixed, ball, ...) are
//!   merged into one rigid grouping, never dropped
//! - rotational and linear joints become tree edges between groupings
//! - a grouping reachable by more than one path is attached exactly once,
//!   on the first-discovered path
//!
//! Traversal is breadth-first from the root grouping, visiting joints in
//! insertion order, so identifier assignment is reproducible for an
//! unchanged source graph.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use uuid::Uuid;

use crate::driver::Driver;
use crate::guid::GuidGenerator;
use crate::mesh::Mesh;
use crate::skeleton::{Joint, JointKind, NodeId, NodeTree, RigidNode};
use crate::source::{MotionKind, SourceGraph, SourceJoint};

/// Source-graph failures; any one of these aborts the whole build
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("source graph has no designated root body")]
    MissingRoot,

    #[error("designated root body {0} is not present in the graph")]
    UnknownRoot(Uuid),

    #[error("joint '{joint}' references missing body {body}")]
    MissingBody { joint: String, body: Uuid },

    #[error("joint '{0}' connects a body to itself")]
    SelfJoint(String),

    #[error("body '{0}' has triangle indices outside its vertex count")]
    InvalidGeometry(String),
}

/// Caller-supplied per-joint export configuration
///
/// Driver assignment is an input, not inferred from geometry: a joint gets a
/// driver only when one is registered here against its source joint id.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    drivers: HashMap<Uuid, Driver>,
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver for the given source joint
    pub fn assign_driver(&mut self, joint_id: Uuid, driver: Driver) {
        self.drivers.insert(joint_id, driver);
    }

    pub fn driver_for(&self, joint_id: Uuid) -> Option<&Driver> {
        self.drivers.get(&joint_id)
    }
}

/// Classify a host motion kind; `None` means the joint merges its bodies
/// instead of becoming a tree edge
///
/// `JointKind::Both` is reserved in the model but never produced here.
fn classify(motion: MotionKind) -> Option<JointKind> {
    match motion {
        MotionKind::Rotational => Some(JointKind::Rotational),
        MotionKind::Linear => Some(JointKind::Linear),
        MotionKind::Fixed | MotionKind::Other => None,
    }
}

/// Walks a `SourceGraph` and produces the rigid-node tree
pub struct RigidNodeBuilder<'a> {
    graph: &'a SourceGraph,
    config: &'a BuildConfig,
}

impl<'a> RigidNodeBuilder<'a> {
    pub fn new(graph: &'a SourceGraph, config: &'a BuildConfig) -> Self {
        Self { graph, config }
    }

    /// Build the node tree, drawing identifiers from `generator`
    pub fn build(&self, generator: &mut GuidGenerator) -> Result<NodeTree, GraphError> {
        let root_body = self.graph.root().ok_or(GraphError::MissingRoot)?;
        if self.graph.body(root_body).is_none() {
            return Err(GraphError::UnknownRoot(root_body));
        }
        self.validate_bodies()?;
        self.validate_joints()?;

        let groups = self.rigid_groups();
        let root_group = groups.group_of[self
            .graph
            .body_position(root_body)
            .expect("root body validated above")];

        let mut tree = NodeTree::new();
        // group representative -> node id; doubles as the visited set
        let mut placed: HashMap<usize, NodeId> = HashMap::new();
        let mut queue = VecDeque::new();

        let root_id = self.make_node(&mut tree, generator, &groups, root_group, None);
        placed.insert(root_group, root_id);
        queue.push_back(root_group);

        while let Some(group) = queue.pop_front() {
            let node_id = placed[&group];
            for joint in self.graph.joints() {
                let Some(kind) = classify(joint.motion) else {
                    continue;
                };
                let Some(far) = self.far_group(&groups, group, joint) else {
                    continue;
                };
                if placed.contains_key(&far) {
                    // Redundant path back to an already-attached grouping;
                    // first-discovered path wins.
                    tracing::debug!("skipping redundant joint '{}'", joint.name);
                    continue;
                }

                let child_id = self.make_node(&mut tree, generator, &groups, far, Some(node_id));
                placed.insert(far, child_id);
                tree.get_mut(node_id)
                    .expect("parent node exists")
                    .joints
                    .push(Joint {
                        kind,
                        limits: joint.limits,
                        driver: self.config.driver_for(joint.id).cloned(),
                        child: child_id,
                    });
                queue.push_back(far);
            }
        }

        // Bodies no joint path reaches still belong to the robot: the host
        // treats the whole root component as one part set, so they ride
        // along in the root grouping rather than vanishing.
        let stray: Vec<usize> = (0..self.graph.bodies().len())
            .filter(|&pos| !placed.contains_key(&groups.group_of[pos]))
            .collect();
        if !stray.is_empty() {
            tracing::warn!(
                bodies = stray.len(),
                "merging bodies unreachable by any joint into the root grouping"
            );
            let root = tree.get_mut(root_id).expect("root node exists");
            for pos in stray {
                let body = &self.graph.bodies()[pos];
                root.mesh.sub_meshes.extend(body.geometry.iter().cloned());
            }
        }

        tracing::info!(
            nodes = tree.len(),
            bodies = self.graph.bodies().len(),
            "built rigid-node tree"
        );
        Ok(tree)
    }

    /// The grouping on the far side of `joint` from `group`, if the joint
    /// leaves the grouping at all
    fn far_group(&self, groups: &RigidGroups, group: usize, joint: &SourceJoint) -> Option<usize> {
        let p = groups.group_of[self.graph.body_position(joint.parent_body)?];
        let c = groups.group_of[self.graph.body_position(joint.child_body)?];
        if p == group && c != group {
            Some(c)
        } else if c == group && p != group {
            Some(p)
        } else {
            None
        }
    }

    /// Reject geometry that indexes outside its sub-mesh's vertex count
    /// before anything is built or written
    fn validate_bodies(&self) -> Result<(), GraphError> {
        for body in self.graph.bodies() {
            if body.geometry.iter().any(|sub| !sub.validate()) {
                return Err(GraphError::InvalidGeometry(body.name.clone()));
            }
        }
        Ok(())
    }

    fn validate_joints(&self) -> Result<(), GraphError> {
        for joint in self.graph.joints() {
            for body in [joint.parent_body, joint.child_body] {
                if self.graph.body(body).is_none() {
                    return Err(GraphError::MissingBody {
                        joint: joint.name.clone(),
                        body,
                    });
                }
            }
            if joint.parent_body == joint.child_body {
                return Err(GraphError::SelfJoint(joint.name.clone()));
            }
        }
        Ok(())
    }

    /// Merge bodies connected by unsupported joints into rigid groupings
    fn rigid_groups(&self) -> RigidGroups {
        let n = self.graph.bodies().len();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut Vec<usize>, mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for joint in self.graph.joints() {
            if classify(joint.motion).is_some() {
                continue;
            }
            let (Some(p), Some(c)) = (
                self.graph.body_position(joint.parent_body),
                self.graph.body_position(joint.child_body),
            ) else {
                continue;
            };
            let (rp, rc) = (find(&mut parent, p), find(&mut parent, c));
            if rp != rc {
                // Attach to the lower insertion index so representatives
                // stay stable regardless of joint order
                let (lo, hi) = if rp < rc { (rp, rc) } else { (rc, rp) };
                parent[hi] = lo;
            }
        }

        let group_of: Vec<usize> = (0..n).map(|i| find(&mut parent, i)).collect();
        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
        for (body, &group) in group_of.iter().enumerate() {
            members.entry(group).or_default().push(body);
        }
        RigidGroups { group_of, members }
    }

    /// Create the node for one rigid grouping: fresh GUID, copied geometry
    fn make_node(
        &self,
        tree: &mut NodeTree,
        generator: &mut GuidGenerator,
        groups: &RigidGroups,
        group: usize,
        parent: Option<NodeId>,
    ) -> NodeId {
        let guid = generator.next_id();
        let mut mesh = Mesh::new(guid);
        let members = &groups.members[&group];
        for &body_pos in members {
            let body = &self.graph.bodies()[body_pos];
            mesh.sub_meshes.extend(body.geometry.iter().cloned());
        }
        if mesh.is_empty() {
            tracing::warn!(%guid, "rigid node has no geometry");
        }
        let model_id = self.graph.bodies()[members[0]].name.clone();
        tracing::debug!(%guid, model_id, bodies = members.len(), "created rigid node");

        tree.push(RigidNode {
            guid,
            parent,
            joints: Vec::new(),
            mesh,
            model_id,
        })
    }
}

/// Rigid-grouping partition of the source bodies
struct RigidGroups {
    /// Body position -> group representative
    group_of: Vec<usize>,
    /// Group representative -> member body positions, in insertion order
    members: HashMap<usize, Vec<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverType, SignalType};
    use crate::mesh::{SubMesh, Surface, Triangle, Vertex};
    use crate::skeleton::JointLimits;
    use crate::source::Body;
    use glam::Vec3;

    fn body_with_geometry(name: &str) -> Body {
        let mut sub = SubMesh::new();
        sub.add_vertices([
            Vertex::new(Vec3::ZERO, Vec3::Z),
            Vertex::new(Vec3::X, Vec3::Z),
            Vertex::new(Vec3::Y, Vec3::Z),
        ]);
        let mut surface = Surface::new([128, 128, 128]);
        surface.add_triangles([Triangle::new(0, 1, 2)]);
        sub.add_surface(surface);
        Body::new(name).with_geometry(vec![sub])
    }

    fn build(graph: &SourceGraph, config: &BuildConfig) -> Result<NodeTree, GraphError> {
        let mut generator = GuidGenerator::new();
        RigidNodeBuilder::new(graph, config).build(&mut generator)
    }

    #[test]
    fn test_missing_root_fails() {
        let mut graph = SourceGraph::new();
        graph.add_body(body_with_geometry("a"));
        let err = build(&graph, &BuildConfig::new()).unwrap_err();
        assert!(matches!(err, GraphError::MissingRoot));
    }

    #[test]
    fn test_unknown_root_fails() {
        let mut graph = SourceGraph::new();
        graph.add_body(body_with_geometry("a"));
        graph.set_root(Uuid::new_v4());
        let err = build(&graph, &BuildConfig::new()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownRoot(_)));
    }

    #[test]
    fn test_dangling_joint_fails() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new(
            "hinge",
            MotionKind::Rotational,
            a,
            Uuid::new_v4(),
        ));
        let err = build(&graph, &BuildConfig::new()).unwrap_err();
        assert!(matches!(err, GraphError::MissingBody { .. }));
    }

    #[test]
    fn test_self_joint_fails() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("loop", MotionKind::Rotational, a, a));
        let err = build(&graph, &BuildConfig::new()).unwrap_err();
        assert!(matches!(err, GraphError::SelfJoint(_)));
    }

    #[test]
    fn test_tree_input_is_preserved() {
        // a -rot-> b -lin-> c is already a tree; output must be isomorphic
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        let c = graph.add_body(body_with_geometry("c"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("j0", MotionKind::Rotational, a, b));
        graph.add_joint(SourceJoint::new("j1", MotionKind::Linear, b, c));

        let tree = build(&graph, &BuildConfig::new()).unwrap();
        assert_eq!(tree.len(), 3);

        let root = tree.root().unwrap();
        assert_eq!(root.model_id, "a");
        assert_eq!(root.joints.len(), 1);
        assert_eq!(root.joints[0].kind, JointKind::Rotational);

        let mid = tree.get(root.joints[0].child).unwrap();
        assert_eq!(mid.model_id, "b");
        assert_eq!(mid.joints.len(), 1);
        assert_eq!(mid.joints[0].kind, JointKind::Linear);

        let leaf = tree.get(mid.joints[0].child).unwrap();
        assert_eq!(leaf.model_id, "c");
        assert!(leaf.joints.is_empty());
    }

    #[test]
    fn test_redundant_path_attaches_once() {
        // a-b, a-c, b-c: the b-c joint closes a cycle and must not become
        // a tree edge
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        let c = graph.add_body(body_with_geometry("c"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("j0", MotionKind::Rotational, a, b));
        graph.add_joint(SourceJoint::new("j1", MotionKind::Rotational, a, c));
        graph.add_joint(SourceJoint::new("j2", MotionKind::Rotational, b, c));

        let tree = build(&graph, &BuildConfig::new()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root().unwrap().joints.len(), 2);
        for node in tree.iter().skip(1) {
            assert_eq!(node.parent, Some(0));
            assert!(node.joints.is_empty());
        }
    }

    #[test]
    fn test_fixed_joint_merges_bodies() {
        // a and b are welded; c hangs off b by a hinge. Two nodes, the root
        // owning both a's and b's geometry.
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        let c = graph.add_body(body_with_geometry("c"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("weld", MotionKind::Fixed, a, b));
        graph.add_joint(SourceJoint::new("hinge", MotionKind::Rotational, b, c));

        let tree = build(&graph, &BuildConfig::new()).unwrap();
        assert_eq!(tree.len(), 2);
        let root = tree.root().unwrap();
        assert_eq!(root.mesh.sub_meshes.len(), 2);
        assert_eq!(root.model_id, "a");
        assert_eq!(root.joints[0].kind, JointKind::Rotational);
    }

    #[test]
    fn test_other_motion_merges_not_drops() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("ball", MotionKind::Other, a, b));

        let tree = build(&graph, &BuildConfig::new()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().unwrap().mesh.sub_meshes.len(), 2);
    }

    #[test]
    fn test_unjointed_bodies_merge_into_root() {
        // c and d form a welded island with no joint path to the root;
        // their geometry must end up in the root grouping, not disappear
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        let c = graph.add_body(body_with_geometry("c"));
        let d = graph.add_body(body_with_geometry("d"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("hinge", MotionKind::Rotational, a, b));
        graph.add_joint(SourceJoint::new("weld", MotionKind::Fixed, c, d));

        let tree = build(&graph, &BuildConfig::new()).unwrap();
        assert_eq!(tree.len(), 2);
        let root = tree.root().unwrap();
        assert_eq!(root.mesh.sub_meshes.len(), 3, "a + stray c + stray d");
        assert_eq!(tree.get(1).unwrap().mesh.sub_meshes.len(), 1);
    }

    #[test]
    fn test_out_of_bounds_geometry_fails() {
        let mut bad = body_with_geometry("bad");
        bad.geometry[0].surfaces[0]
            .triangles
            .push(Triangle::new(0, 1, 99));
        let mut graph = SourceGraph::new();
        let root = graph.add_body(bad);
        graph.set_root(root);

        let err = build(&graph, &BuildConfig::new()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidGeometry(name) if name == "bad"));
    }

    #[test]
    fn test_driver_comes_from_config_only() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        let c = graph.add_body(body_with_geometry("c"));
        graph.set_root(a);
        let driven = graph.add_joint(
            SourceJoint::new("j0", MotionKind::Rotational, a, b)
                .with_limits(JointLimits::new(-1.0, 1.0)),
        );
        graph.add_joint(SourceJoint::new("j1", MotionKind::Rotational, a, c));

        let mut config = BuildConfig::new();
        config.assign_driver(driven, Driver::new(DriverType::Motor, SignalType::Pwm, 0));

        let tree = build(&graph, &config).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.joints.len(), 2);
        let with_driver = root.joints[0].driver.as_ref().unwrap();
        assert_eq!(with_driver.driver_type, DriverType::Motor);
        assert!(root.joints[1].driver.is_none());
    }

    #[test]
    fn test_reseeded_builds_are_identical() {
        let mut graph = SourceGraph::new();
        let a = graph.add_body(body_with_geometry("a"));
        let b = graph.add_body(body_with_geometry("b"));
        graph.set_root(a);
        graph.add_joint(SourceJoint::new("j0", MotionKind::Linear, a, b));

        let mut generator = GuidGenerator::new();
        let config = BuildConfig::new();
        let builder = RigidNodeBuilder::new(&graph, &config);

        let first = builder.build(&mut generator).unwrap();
        generator.reset_seed();
        let second = builder.build(&mut generator).unwrap();
        assert_eq!(first, second);
    }
}
