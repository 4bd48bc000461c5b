//! BXD Robot Export Core
//!
//! This crate contains the data model and graph-to-tree engine for
//! converting a CAD assembly into an exportable robot definition:
//! - GuidGenerator: reseedable identifier generation
//! - Mesh/SubMesh/Surface: tessellated geometry owned by rigid nodes
//! - Driver: joint actuation metadata
//! - NodeTree/RigidNode/Joint: the exported hierarchy
//! - SourceGraph: the read-only assembly graph consumed from the host CAD
//! - RigidNodeBuilder: graph-to-tree normalization and joint classification

pub mod builder;
pub mod driver;
pub mod guid;
pub mod mesh;
pub mod skeleton;
pub mod source;

pub use builder::*;
pub use driver::*;
pub use guid::*;
pub use mesh::*;
pub use skeleton::*;
pub use source::*;
