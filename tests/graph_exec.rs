//! Integration tests for flattened graph execution.

mod common;

use common::create_context;
use stridr::graph::{Graph, Node, OpCode};
use stridr::prelude::*;

#[test]
fn test_add_mul_graph() {
    let Some(ctx) = create_context() else { return };

    // (x + y) * x with x = [2], y = [3] -> [10]
    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![1]),
            Node::new(OpCode::Input, vec![], vec![1]),
            Node::new(OpCode::Add, vec![0, 1], vec![1]),
            Node::new(OpCode::Mul, vec![2, 0], vec![1]),
        ],
        3,
    )
    .unwrap();

    let x = Array::from_slice(&[2.0], &[1], &ctx).unwrap();
    let y = Array::from_slice(&[3.0], &[1], &ctx).unwrap();

    let out = graph.execute(&[x, y]).unwrap();
    assert_eq!(out.to_vec().unwrap(), [10.0]);
}

#[test]
fn test_scalar_graph() {
    let Some(ctx) = create_context() else { return };

    // Same computation over 0-dimensional arrays
    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![]),
            Node::new(OpCode::Input, vec![], vec![]),
            Node::new(OpCode::Add, vec![0, 1], vec![]),
            Node::new(OpCode::Mul, vec![2, 0], vec![]),
        ],
        3,
    )
    .unwrap();

    let x = Array::from_slice(&[2.0], &[], &ctx).unwrap();
    let y = Array::from_slice(&[3.0], &[], &ctx).unwrap();

    let out = graph.execute(&[x, y]).unwrap();
    assert_eq!(out.item().unwrap(), 10.0);
}

#[test]
fn test_matmul_graph() {
    let Some(ctx) = create_context() else { return };

    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![2, 3]),
            Node::new(OpCode::Input, vec![], vec![3, 2]),
            Node::new(OpCode::Matmul, vec![0, 1], vec![2, 2]),
        ],
        2,
    )
    .unwrap();

    let a = Array::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], &ctx).unwrap();
    let b = Array::from_slice(&[1.0, 0.0, 0.0, 1.0, 1.0, 1.0], &[3, 2], &ctx).unwrap();

    let out = graph.execute(&[a, b]).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
    assert_eq!(out.to_vec().unwrap(), [4.0, 5.0, 10.0, 11.0]);
}

#[test]
fn test_compute_then_view() {
    let Some(ctx) = create_context() else { return };

    // The ADD node records a [2, 2] layout: its flat [4] result is
    // reinterpreted before feeding the matmul.
    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![4]),
            Node::new(OpCode::Input, vec![], vec![4]),
            Node::with_layout(OpCode::Add, vec![0, 1], vec![2, 2], 0, vec![2, 1]),
            Node::new(OpCode::Input, vec![], vec![2, 2]),
            Node::new(OpCode::Matmul, vec![2, 3], vec![2, 2]),
        ],
        4,
    )
    .unwrap();

    let x = Array::from_slice(&[1.0, 2.0, 3.0, 4.0], &[4], &ctx).unwrap();
    let y = Array::from_slice(&[0.0; 4], &[4], &ctx).unwrap();
    let identity = Array::from_slice(&[1.0, 0.0, 0.0, 1.0], &[2, 2], &ctx).unwrap();

    let out = graph.execute(&[x, y, identity]).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
    assert_eq!(out.to_vec().unwrap(), [1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_repeated_execution() {
    let Some(ctx) = create_context() else { return };

    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![2]),
            Node::new(OpCode::Input, vec![], vec![2]),
            Node::new(OpCode::Sub, vec![0, 1], vec![2]),
        ],
        2,
    )
    .unwrap();

    let a = Array::from_slice(&[5.0, 7.0], &[2], &ctx).unwrap();
    let b = Array::from_slice(&[1.0, 2.0], &[2], &ctx).unwrap();
    assert_eq!(graph.execute(&[a, b]).unwrap().to_vec().unwrap(), [4.0, 5.0]);

    // The graph is immutable; a second call with different inputs works
    let a = Array::from_slice(&[1.0, 1.0], &[2], &ctx).unwrap();
    let b = Array::from_slice(&[3.0, 0.5], &[2], &ctx).unwrap();
    assert_eq!(
        graph.execute(&[a, b]).unwrap().to_vec().unwrap(),
        [-2.0, 0.5]
    );
}

#[test]
fn test_intermediate_reused_by_two_consumers() {
    let Some(ctx) = create_context() else { return };

    // (x + y) * x + (x + y): node 2 feeds nodes 3 and 4
    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![1]),
            Node::new(OpCode::Input, vec![], vec![1]),
            Node::new(OpCode::Add, vec![0, 1], vec![1]),
            Node::new(OpCode::Mul, vec![2, 0], vec![1]),
            Node::new(OpCode::Add, vec![3, 2], vec![1]),
        ],
        4,
    )
    .unwrap();

    let x = Array::from_slice(&[2.0], &[1], &ctx).unwrap();
    let y = Array::from_slice(&[3.0], &[1], &ctx).unwrap();

    let out = graph.execute(&[x, y]).unwrap();
    assert_eq!(out.to_vec().unwrap(), [15.0]);
}

#[test]
fn test_graph_broadcast_inside() {
    let Some(ctx) = create_context() else { return };

    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![3, 1]),
            Node::new(OpCode::Input, vec![], vec![1, 4]),
            Node::new(OpCode::Add, vec![0, 1], vec![3, 4]),
        ],
        2,
    )
    .unwrap();

    let a = Array::from_slice(&[1.0, 2.0, 3.0], &[3, 1], &ctx).unwrap();
    let b = Array::from_slice(&[10.0, 20.0, 30.0, 40.0], &[1, 4], &ctx).unwrap();

    let out = graph.execute(&[a, b]).unwrap();
    assert_eq!(out.shape(), &[3, 4]);
    assert_eq!(out.to_vec().unwrap()[..4], [11.0, 21.0, 31.0, 41.0]);
}

#[test]
fn test_error_propagates_from_dispatch() {
    let Some(ctx) = create_context() else { return };

    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![3]),
            Node::new(OpCode::Input, vec![], vec![4]),
            Node::new(OpCode::Add, vec![0, 1], vec![4]),
        ],
        2,
    )
    .unwrap();

    let a = Array::from_slice(&[1.0; 3], &[3], &ctx).unwrap();
    let b = Array::from_slice(&[1.0; 4], &[4], &ctx).unwrap();

    let err = graph.execute(&[a, b]).unwrap_err();
    assert!(err.is_shape_error());
}

#[test]
fn test_input_count_mismatch() {
    let Some(ctx) = create_context() else { return };

    let graph = Graph::new(
        vec![
            Node::new(OpCode::Input, vec![], vec![1]),
            Node::new(OpCode::Input, vec![], vec![1]),
            Node::new(OpCode::Add, vec![0, 1], vec![1]),
        ],
        2,
    )
    .unwrap();

    let x = Array::from_slice(&[1.0], &[1], &ctx).unwrap();
    let err = graph.execute(&[x]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[test]
fn test_input_node_is_output() {
    let Some(ctx) = create_context() else { return };

    let graph = Graph::new(vec![Node::new(OpCode::Input, vec![], vec![2])], 0).unwrap();

    let x = Array::from_slice(&[1.5, 2.5], &[2], &ctx).unwrap();
    let out = graph.execute(&[x]).unwrap();
    assert_eq!(out.to_vec().unwrap(), [1.5, 2.5]);
}
