//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;
use stridr::prelude::*;

/// Get the shared context, or None if no GPU adapter is available.
///
/// Tests that need a device call this and return early (with a note) when it
/// yields None, so the suite passes on machines without a GPU.
pub fn create_context() -> Option<Arc<GpuContext>> {
    match GpuContext::global() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            println!("No GPU available, skipping test: {}", e);
            None
        }
    }
}

/// Assert two f32 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}
