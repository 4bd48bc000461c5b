//! BXDJ skeleton document
//!
//! The textual, versioned description of the exported hierarchy. One `<Node>`
//! element per rigid node, in tree order; a non-root node carries the
//! `<Joint>` that connects it to its parent, and a driven joint nests a
//! `<Driver>` element:
//!
//! ```text
//! <BXDJ Version="2.0.0">
//!   <Node GUID="...">
//!     <ParentID>-1</ParentID>
//!     <ModelFileName>node_0.bxda</ModelFileName>
//!     <ModelID>Part2:1</ModelID>
//!   </Node>
//!   <Node GUID="...">
//!     <ParentID>...</ParentID>
//!     ...
//!     <Joint Type="ROTATIONAL" LowerLimit="-1.5" UpperLimit="1.5">
//!       <Driver Type="MOTOR" Signal="PWM" PortA="0" PortB="0"
//!               InputGear="1" OutputGear="1" />
//!     </Joint>
//!   </Node>
//! </BXDJ>
//! ```
//!
//! The reader tolerates unknown elements and attributes but rejects an
//! unrecognized major version.

use std::io::Write;

use uuid::Uuid;

use bxd_core::{Driver, Joint, JointKind, JointLimits, NodeTree, RigidNode};

use crate::xml::{Element, XmlWriter, parse};
use crate::{ExportError, FormatError, major_version};

/// Skeleton document format version written by this crate
pub const BXDJ_VERSION: &str = "2.0.0";

/// Mesh container filename referenced by the node at `index`
pub fn mesh_file_name(index: usize) -> String {
    format!("node_{index}.bxda")
}

/// Serialize a node tree into one skeleton document
pub fn write_skeleton<W: Write>(out: W, tree: &NodeTree, version: &str) -> Result<(), ExportError> {
    let mut xml = XmlWriter::new(out);
    xml.start_element("BXDJ")?;
    xml.write_attribute("Version", version)?;
    for (index, node) in tree.iter().enumerate() {
        write_node(&mut xml, tree, node, index)?;
    }
    xml.end_element()?;
    xml.finish()
}

fn write_node<W: Write>(
    xml: &mut XmlWriter<W>,
    tree: &NodeTree,
    node: &RigidNode,
    index: usize,
) -> Result<(), ExportError> {
    xml.start_element("Node")?;
    xml.write_attribute("GUID", &node.guid.to_string())?;

    let parent_id = match node.parent {
        Some(parent) => tree.get(parent).map(|p| p.guid.to_string()),
        None => None,
    };
    xml.write_element("ParentID", parent_id.as_deref().unwrap_or("-1"))?;
    xml.write_element("ModelFileName", &mesh_file_name(index))?;
    xml.write_element("ModelID", &node.model_id)?;

    if let Some(joint) = tree.parent_joint(index) {
        write_joint(xml, joint)?;
    }
    xml.end_element()
}

fn write_joint<W: Write>(xml: &mut XmlWriter<W>, joint: &Joint) -> Result<(), ExportError> {
    xml.start_element("Joint")?;
    xml.write_attribute("Type", joint.kind.token())?;
    if let Some(limits) = joint.limits {
        xml.write_attribute("LowerLimit", &limits.lower.to_string())?;
        xml.write_attribute("UpperLimit", &limits.upper.to_string())?;
    }
    if let Some(driver) = &joint.driver {
        write_driver(xml, driver)?;
    }
    xml.end_element()
}

/// Render one driver as a `<Driver>` element under its owning joint
pub fn write_driver<W: Write>(xml: &mut XmlWriter<W>, driver: &Driver) -> Result<(), ExportError> {
    xml.start_element("Driver")?;
    xml.write_attribute("Type", driver.driver_type.token())?;
    xml.write_attribute("Signal", driver.signal.token())?;
    xml.write_attribute("PortA", &driver.port_a.to_string())?;
    xml.write_attribute("PortB", &driver.port_b.to_string())?;
    xml.write_attribute("InputGear", &driver.input_gear.to_string())?;
    xml.write_attribute("OutputGear", &driver.output_gear.to_string())?;
    xml.end_element()
}

/// A parsed skeleton document
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonDoc {
    pub version: String,
    pub nodes: Vec<SkeletonNode>,
}

/// One `<Node>` entry of a parsed skeleton document
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonNode {
    pub guid: Uuid,
    /// None for the root (`ParentID` of -1)
    pub parent: Option<Uuid>,
    pub model_file_name: String,
    pub model_id: String,
    /// The joint connecting this node to its parent
    pub joint: Option<SkeletonJoint>,
}

/// Joint metadata read back from a skeleton document
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonJoint {
    pub kind: JointKind,
    pub limits: Option<JointLimits>,
    pub driver: Option<Driver>,
}

/// Parse a skeleton document
pub fn read_skeleton(input: &str) -> Result<SkeletonDoc, ExportError> {
    let root = parse(input)?;
    if root.name != "BXDJ" {
        return Err(FormatError::Malformed(format!(
            "expected BXDJ document element, found {}",
            root.name
        ))
        .into());
    }
    let version = root
        .attr("Version")
        .ok_or_else(|| FormatError::Malformed("missing Version attribute".into()))?
        .to_string();
    if major_version(&version) != major_version(BXDJ_VERSION) {
        return Err(FormatError::UnsupportedVersion(version).into());
    }

    let mut nodes = Vec::new();
    for element in root.children_named("Node") {
        nodes.push(read_node(element)?);
    }
    Ok(SkeletonDoc { version, nodes })
}

fn read_node(element: &Element) -> Result<SkeletonNode, ExportError> {
    let guid = parse_guid(
        element
            .attr("GUID")
            .ok_or_else(|| FormatError::Malformed("Node missing GUID attribute".into()))?,
    )?;
    let parent = match element.child_text("ParentID") {
        None | Some("-1") => None,
        Some(text) => Some(parse_guid(text)?),
    };
    let joint = element.child("Joint").map(read_joint).transpose()?;

    Ok(SkeletonNode {
        guid,
        parent,
        model_file_name: element.child_text("ModelFileName").unwrap_or("").to_string(),
        model_id: element.child_text("ModelID").unwrap_or("").to_string(),
        joint,
    })
}

fn read_joint(element: &Element) -> Result<SkeletonJoint, ExportError> {
    let kind: JointKind = element
        .attr("Type")
        .ok_or_else(|| FormatError::Malformed("Joint missing Type attribute".into()))?
        .parse()
        .map_err(FormatError::Token)?;

    let limits = match (element.attr("LowerLimit"), element.attr("UpperLimit")) {
        (Some(lower), Some(upper)) => Some(JointLimits::new(
            parse_number(lower)?,
            parse_number(upper)?,
        )),
        _ => None,
    };

    let driver = element.child("Driver").map(read_driver).transpose()?;
    Ok(SkeletonJoint {
        kind,
        limits,
        driver,
    })
}

fn read_driver(element: &Element) -> Result<Driver, ExportError> {
    let driver_type = element
        .attr("Type")
        .ok_or_else(|| FormatError::Malformed("Driver missing Type attribute".into()))?
        .parse()
        .map_err(FormatError::Token)?;
    let signal = element
        .attr("Signal")
        .ok_or_else(|| FormatError::Malformed("Driver missing Signal attribute".into()))?
        .parse()
        .map_err(FormatError::Token)?;

    Ok(Driver {
        driver_type,
        signal,
        port_a: parse_number(element.attr("PortA").unwrap_or("0"))?,
        port_b: parse_number(element.attr("PortB").unwrap_or("0"))?,
        input_gear: parse_number(element.attr("InputGear").unwrap_or("1"))?,
        output_gear: parse_number(element.attr("OutputGear").unwrap_or("1"))?,
    })
}

fn parse_guid(text: &str) -> Result<Uuid, ExportError> {
    Uuid::parse_str(text)
        .map_err(|_| FormatError::Malformed(format!("invalid GUID: {text}")).into())
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, ExportError> {
    text.parse()
        .map_err(|_| FormatError::Malformed(format!("invalid number: {text}")).into())
}
