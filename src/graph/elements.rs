//! Graph element types: ids, operations, tensors, attributes
//!
//! Identity is id-based, not name-based: an [`OpId`] or [`TensorId`] is only
//! meaningful for the graph that created it, and names may collide across
//! graphs. A tensor is identified by its producing operation and output slot.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;

/// Identifier of an operation within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub(crate) u32);

impl OpId {
    /// Raw arena index of this operation
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Identifier of a tensor: producing operation plus output slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId {
    /// The producing operation
    pub op: OpId,
    /// Output slot index on the producer
    pub slot: u32,
}

impl TensorId {
    /// Build a tensor id from an operation and slot index
    pub fn new(op: OpId, slot: u32) -> Self {
        Self { op, slot }
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.op, self.slot)
    }
}

/// Either an operation or a tensor
///
/// Collections and result mappings hold both kinds of element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// An operation
    Op(OpId),
    /// A tensor
    Tensor(TensorId),
}

impl From<OpId> for Element {
    fn from(op: OpId) -> Self {
        Element::Op(op)
    }
}

impl From<TensorId> for Element {
    fn from(t: TensorId) -> Self {
        Element::Tensor(t)
    }
}

/// Element data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// Boolean
    Bool,
}

/// Static shape metadata for a tensor
///
/// `shape` is `None` when fully unknown; individual dimensions may be
/// `None` when dynamic.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    /// Element type
    pub dtype: DType,
    /// Optional static shape, possibly with dynamic dimensions
    pub shape: Option<Vec<Option<i64>>>,
}

impl TensorInfo {
    /// Metadata with a fully known shape
    pub fn new(dtype: DType, shape: &[i64]) -> Self {
        Self {
            dtype,
            shape: Some(shape.iter().map(|&d| Some(d)).collect()),
        }
    }

    /// Metadata with no shape information
    pub fn unknown(dtype: DType) -> Self {
        Self { dtype, shape: None }
    }
}

/// Attribute value attached to an operation's static definition
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integer attribute
    Int(i64),
    /// Float attribute
    Float(f32),
    /// String attribute
    Str(String),
    /// Boolean attribute
    Bool(bool),
    /// Repeated integer attribute
    Ints(Vec<i64>),
    /// Repeated float attribute
    Floats(Vec<f32>),
}

/// Small inline capacity for per-op edge lists; most ops have few edges
pub(crate) type InputList = SmallVec<[TensorId; 4]>;
pub(crate) type ControlList = SmallVec<[OpId; 2]>;

/// An operation stored in a graph
///
/// Owned by exactly one [`Graph`](super::Graph); reached through its
/// [`OpId`]. The `original_op` field is a non-owning provenance backlink
/// into the same graph, never a cross-graph reference.
#[derive(Debug, Clone)]
pub struct Operation {
    pub(crate) name: String,
    pub(crate) op_type: String,
    pub(crate) inputs: InputList,
    pub(crate) control_inputs: ControlList,
    pub(crate) attrs: IndexMap<String, AttrValue>,
    pub(crate) outputs: Vec<TensorInfo>,
    pub(crate) original_op: Option<OpId>,
    pub(crate) device: Option<String>,
}

/// Specification for creating a new operation
///
/// Built with the fluent helpers and handed to
/// [`Graph::create_op`](super::Graph::create_op), which uniquifies the name
/// within the destination graph.
#[derive(Debug, Clone)]
pub struct OpSpec {
    /// Requested name; uniquified on creation
    pub name: String,
    /// Operation type string
    pub op_type: String,
    /// Ordered data inputs
    pub inputs: Vec<TensorId>,
    /// Control-only predecessor operations
    pub control_inputs: Vec<OpId>,
    /// Static attribute definition
    pub attrs: IndexMap<String, AttrValue>,
    /// Per-output metadata; the length fixes the output count
    pub outputs: Vec<TensorInfo>,
    /// Optional provenance backlink
    pub original_op: Option<OpId>,
    /// Optional device placement
    pub device: Option<String>,
}

impl OpSpec {
    /// Start a spec with a name and operation type
    pub fn new(name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            control_inputs: Vec::new(),
            attrs: IndexMap::new(),
            outputs: Vec::new(),
            original_op: None,
            device: None,
        }
    }

    /// Append a data input
    pub fn input(mut self, t: TensorId) -> Self {
        self.inputs.push(t);
        self
    }

    /// Append several data inputs
    pub fn inputs(mut self, ts: impl IntoIterator<Item = TensorId>) -> Self {
        self.inputs.extend(ts);
        self
    }

    /// Append a control-only input
    pub fn control_input(mut self, op: OpId) -> Self {
        self.control_inputs.push(op);
        self
    }

    /// Set an attribute
    pub fn attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Append an output with full metadata
    pub fn output(mut self, info: TensorInfo) -> Self {
        self.outputs.push(info);
        self
    }

    /// Append `n` outputs of the given dtype with unknown shapes
    pub fn outputs_of(mut self, n: usize, dtype: DType) -> Self {
        self.outputs
            .extend(std::iter::repeat(TensorInfo::unknown(dtype)).take(n));
        self
    }

    /// Set the provenance backlink
    pub fn original_op(mut self, op: OpId) -> Self {
        self.original_op = Some(op);
        self
    }

    /// Set the device placement
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_id_display() {
        let t = TensorId::new(OpId(3), 1);
        assert_eq!(t.to_string(), "op#3:1");
    }

    #[test]
    fn test_op_spec_builder() {
        let spec = OpSpec::new("add", "Add")
            .input(TensorId::new(OpId(0), 0))
            .input(TensorId::new(OpId(1), 0))
            .attr("axis", AttrValue::Int(1))
            .outputs_of(1, DType::F32)
            .device("cpu:0");

        assert_eq!(spec.inputs.len(), 2);
        assert_eq!(spec.outputs.len(), 1);
        assert_eq!(spec.attrs.get("axis"), Some(&AttrValue::Int(1)));
        assert_eq!(spec.device.as_deref(), Some("cpu:0"));
    }

    #[test]
    fn test_element_from() {
        let e: Element = OpId(2).into();
        assert_eq!(e, Element::Op(OpId(2)));
        let e: Element = TensorId::new(OpId(2), 0).into();
        assert!(matches!(e, Element::Tensor(_)));
    }
}
