//! Flattened computation graph construction and execution.
//!
//! A [`Graph`] is an immutable, topologically ordered list of operation
//! nodes plus a designated output index. [`Graph::execute`] walks the nodes
//! in ascending index order, feeding each node the already-evaluated results
//! of its inputs, and returns the output node's array. Graphs are built once
//! and executed repeatedly with different concrete inputs.

use crate::error::{Error, Result};
use crate::ops;
use crate::tensor::{Array, Layout};

/// Operation code for a graph node.
///
/// The numeric values are the wire format used by flattened graph
/// descriptions and must stay stable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum OpCode {
    /// Externally supplied array (by position)
    Input = 0,
    /// Batched matrix multiplication
    Matmul = 1,
    /// Element-wise addition
    Add = 2,
    /// Element-wise multiplication
    Mul = 3,
    /// Element-wise division
    Div = 4,
    /// Element-wise subtraction
    Sub = 5,
}

impl OpCode {
    /// Decode a numeric op code.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedOp`] for codes outside the operation table.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Input),
            1 => Ok(Self::Matmul),
            2 => Ok(Self::Add),
            3 => Ok(Self::Mul),
            4 => Ok(Self::Div),
            5 => Ok(Self::Sub),
            _ => Err(Error::unsupported_op(format!("opcode {}", code))),
        }
    }

    /// The numeric wire value
    pub fn code(&self) -> i64 {
        *self as i64
    }

    /// The element-wise operation name, if this is a binary op
    fn binary_name(&self) -> Option<&'static str> {
        match self {
            Self::Add => Some("add"),
            Self::Sub => Some("sub"),
            Self::Mul => Some("mul"),
            Self::Div => Some("div"),
            Self::Input | Self::Matmul => None,
        }
    }
}

/// One operation in a flattened computation graph.
///
/// `inputs` holds indices of earlier nodes (strictly smaller than this
/// node's own index). For [`OpCode::Input`] nodes it may instead hold a
/// single external input slot; when empty, input nodes consume the external
/// arrays in positional order.
///
/// `shape`/`offset`/`strides` record the node's output layout. When they
/// differ from the natural contiguous layout of the computed result, the
/// result is reinterpreted as a view with this layout (a fused
/// compute-then-view step).
#[derive(Clone, Debug)]
pub struct Node {
    /// Operation code
    pub op: OpCode,
    /// Input node indices (or the external slot for input nodes)
    pub inputs: Vec<usize>,
    /// Output shape
    pub shape: Vec<usize>,
    /// Output offset into storage
    pub offset: usize,
    /// Output strides; empty means the row-major strides of `shape`
    pub strides: Vec<isize>,
}

impl Node {
    /// Create a node with the default (contiguous, offset 0) output layout
    pub fn new(op: OpCode, inputs: Vec<usize>, shape: Vec<usize>) -> Self {
        Self {
            op,
            inputs,
            shape,
            offset: 0,
            strides: Vec::new(),
        }
    }

    /// Create a node with an explicit output layout
    pub fn with_layout(
        op: OpCode,
        inputs: Vec<usize>,
        shape: Vec<usize>,
        offset: usize,
        strides: Vec<isize>,
    ) -> Self {
        Self {
            op,
            inputs,
            shape,
            offset,
            strides,
        }
    }
}

/// An immutable, topologically sorted computation graph.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    output: usize,
    num_inputs: usize,
}

impl Graph {
    /// Build a graph from its node list and output index.
    ///
    /// Validates the topological invariant: every non-input node has exactly
    /// two operands, all referring to nodes with strictly smaller indices
    /// (no back edges), and the output index is in range.
    pub fn new(nodes: Vec<Node>, output: usize) -> Result<Self> {
        if output >= nodes.len() {
            return Err(Error::InvalidArgument {
                arg: "output",
                reason: format!(
                    "output index {} out of range for {} nodes",
                    output,
                    nodes.len()
                ),
            });
        }

        let mut num_inputs = 0;
        for (i, node) in nodes.iter().enumerate() {
            match node.op {
                OpCode::Input => {
                    num_inputs += 1;
                    if node.inputs.len() > 1 {
                        return Err(Error::InvalidArgument {
                            arg: "nodes",
                            reason: format!(
                                "input node {} carries {} operands; at most one external slot is allowed",
                                i,
                                node.inputs.len()
                            ),
                        });
                    }
                }
                _ => {
                    if node.inputs.len() != 2 {
                        return Err(Error::InvalidArgument {
                            arg: "nodes",
                            reason: format!(
                                "node {} ({:?}) has {} operands, expected 2",
                                i,
                                node.op,
                                node.inputs.len()
                            ),
                        });
                    }
                    for &d in &node.inputs {
                        if d >= i {
                            return Err(Error::InvalidArgument {
                                arg: "nodes",
                                reason: format!(
                                    "node {} references node {}; inputs must have strictly smaller indices",
                                    i, d
                                ),
                            });
                        }
                    }
                }
            }
        }

        Ok(Self {
            nodes,
            output,
            num_inputs,
        })
    }

    /// Build a graph from a flattened description:
    /// `(op code, input indices, shape, offset, strides)` per node.
    pub fn from_flat(
        flat: Vec<(i64, Vec<usize>, Vec<usize>, usize, Vec<isize>)>,
        output: usize,
    ) -> Result<Self> {
        let nodes = flat
            .into_iter()
            .map(|(code, inputs, shape, offset, strides)| {
                Ok(Node::with_layout(
                    OpCode::from_code(code)?,
                    inputs,
                    shape,
                    offset,
                    strides,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(nodes, output)
    }

    /// Number of nodes in the graph
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of external inputs the graph consumes
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// The designated output node index
    pub fn output_idx(&self) -> usize {
        self.output
    }

    /// Execute the graph against concrete inputs.
    ///
    /// Nodes are evaluated strictly in ascending index order; intermediate
    /// results are retained only until their last consumer has run (the
    /// storage refcount makes releases cheap). Errors from any dispatch
    /// propagate unchanged and nothing is assigned to the output until the
    /// output node resolves.
    pub fn execute(&self, inputs: &[Array]) -> Result<Array> {
        if inputs.len() != self.num_inputs {
            return Err(Error::InvalidArgument {
                arg: "inputs",
                reason: format!(
                    "graph consumes {} inputs, got {}",
                    self.num_inputs,
                    inputs.len()
                ),
            });
        }

        // Last consumer of each node's result, for early release
        let mut last_use = vec![usize::MAX; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if node.op != OpCode::Input {
                for &d in &node.inputs {
                    last_use[d] = i;
                }
            }
        }

        let mut values: Vec<Option<Array>> = (0..self.nodes.len()).map(|_| None).collect();
        let mut next_input = 0;

        for (i, node) in self.nodes.iter().enumerate() {
            let result = match node.op {
                OpCode::Input => {
                    let slot = match node.inputs.first() {
                        Some(&slot) => slot,
                        None => {
                            let slot = next_input;
                            next_input += 1;
                            slot
                        }
                    };
                    inputs
                        .get(slot)
                        .cloned()
                        .ok_or_else(|| Error::InvalidArgument {
                            arg: "inputs",
                            reason: format!(
                                "input node {} references external slot {} but only {} inputs were supplied",
                                i,
                                slot,
                                inputs.len()
                            ),
                        })?
                }
                OpCode::Matmul => {
                    let lhs = self.value(&values, node.inputs[0])?;
                    let rhs = self.value(&values, node.inputs[1])?;
                    ops::matmul(lhs, rhs)?
                }
                _ => {
                    let name = node.op.binary_name().expect("validated binary op");
                    let lhs = self.value(&values, node.inputs[0])?;
                    let rhs = self.value(&values, node.inputs[1])?;
                    ops::binary_op(lhs, rhs, name)?
                }
            };

            let result = self.apply_node_layout(node, result)?;
            values[i] = Some(result);

            // Release intermediates no later node will read
            if node.op != OpCode::Input {
                for &d in &node.inputs {
                    if last_use[d] == i && d != self.output {
                        values[d] = None;
                    }
                }
            }
        }

        Ok(values[self.output]
            .take()
            .expect("output node evaluated in index order"))
    }

    /// Fetch an evaluated operand
    fn value<'a>(&self, values: &'a [Option<Array>], idx: usize) -> Result<&'a Array> {
        values[idx].as_ref().ok_or_else(|| Error::InvalidArgument {
            arg: "nodes",
            reason: format!("node {} was released before use", idx),
        })
    }

    /// Apply the fused compute-then-view step when the node records a layout
    /// differing from the computed result's natural one.
    fn apply_node_layout(&self, node: &Node, result: Array) -> Result<Array> {
        if node.op == OpCode::Input {
            return Ok(result);
        }

        let needs_view = node.offset != 0
            || node.shape.as_slice() != result.shape()
            || (!node.strides.is_empty() && node.strides.as_slice() != result.strides());
        if !needs_view {
            return Ok(result);
        }

        let strides = if node.strides.is_empty() {
            Layout::row_major_strides(&node.shape).to_vec()
        } else {
            node.strides.clone()
        };
        result.view(&node.shape, &strides, node.offset)
    }
}
