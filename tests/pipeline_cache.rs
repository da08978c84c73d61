//! Integration tests for the pipeline cache contract: one operation name
//! maps to exactly one compiled pipeline for the life of the cache.

mod common;

use std::sync::Arc;
use stridr::prelude::*;
use stridr::shaders::{ELEMENTWISE_SHADER, LayoutKey};

const BINARY_LAYOUT: LayoutKey = LayoutKey {
    num_read_buffers: 3,
    num_write_buffers: 1,
    num_uniform_buffers: 0,
};

#[test]
fn test_pipeline_identity() {
    // Isolated context: the cache starts empty
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("No GPU available, skipping test: {}", e);
            return;
        }
    };

    let first = ctx
        .pipelines()
        .pipeline("add_f32", "elementwise", ELEMENTWISE_SHADER, BINARY_LAYOUT)
        .unwrap();
    let second = ctx
        .pipelines()
        .pipeline("add_f32", "elementwise", ELEMENTWISE_SHADER, BINARY_LAYOUT)
        .unwrap();

    // Same object, by identity
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_pipeline_name_is_sole_key() {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("No GPU available, skipping test: {}", e);
            return;
        }
    };

    let original = ctx
        .pipelines()
        .pipeline("mul_f32", "elementwise", ELEMENTWISE_SHADER, BINARY_LAYOUT)
        .unwrap();

    // A different source string under the same name returns the original
    // compiled pipeline: one name means one fixed program.
    let same = ctx
        .pipelines()
        .pipeline("mul_f32", "elementwise", "@compute fn mul_f32() {}", BINARY_LAYOUT)
        .unwrap();

    assert!(Arc::ptr_eq(&original, &same));
}

#[test]
fn test_compile_error_names_operation() {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("No GPU available, skipping test: {}", e);
            return;
        }
    };

    let err = ctx
        .pipelines()
        .pipeline(
            "broken_op",
            "broken_module",
            "this is not valid wgsl",
            BINARY_LAYOUT,
        )
        .unwrap_err();

    match err {
        Error::Compile { op, message } => {
            assert_eq!(op, "broken_op");
            assert!(!message.is_empty());
        }
        other => panic!("expected Compile error, got {:?}", other),
    }

    // A failed compile is not cached; the name stays available
    let err = ctx
        .pipelines()
        .pipeline(
            "broken_op",
            "broken_module",
            "still not valid wgsl",
            BINARY_LAYOUT,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
}
