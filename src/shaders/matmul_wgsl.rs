//! WGSL source for the batched matrix multiplication kernels.
//!
//! Two formulations over the same contiguous operand layout
//! `[batch, rows, cols]`: a plain one-thread-per-output-element kernel for
//! small problems and a tiled kernel using workgroup shared memory for
//! larger ones. The batch index rides the workgroup z dimension in both.

/// Matrix multiplication shader module source (f32)
pub const MATMUL_SHADER: &str = r#"
// Tile edge for the tiled kernel; the dispatch grid is derived from it
const TILE_SIZE: u32 = 16u;

var<workgroup> tile_a: array<array<f32, 16>, 16>;
var<workgroup> tile_b: array<array<f32, 16>, 16>;

struct MatmulParams {
    m: u32,          // Rows of A and C
    k: u32,          // Cols of A, rows of B
    n: u32,          // Cols of B and C
    batch: u32,      // Number of matrices in the batch (1 for 2D)
}

@group(0) @binding(0) var<storage, read> mat_a: array<f32>;
@group(0) @binding(1) var<storage, read> mat_b: array<f32>;
@group(0) @binding(2) var<storage, read_write> mat_c: array<f32>;
@group(0) @binding(3) var<uniform> mm: MatmulParams;

// ============================================================================
// Plain batched matmul: C[b] = A[b] @ B[b]
// ============================================================================

@compute @workgroup_size(16, 16, 1)
fn matmul_f32(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let row = global_id.y;
    let col = global_id.x;
    let batch = global_id.z;

    if (row >= mm.m || col >= mm.n || batch >= mm.batch) {
        return;
    }

    let a_base = batch * mm.m * mm.k + row * mm.k;
    let b_base = batch * mm.k * mm.n;

    var sum: f32 = 0.0;
    for (var i: u32 = 0u; i < mm.k; i = i + 1u) {
        sum = sum + mat_a[a_base + i] * mat_b[b_base + i * mm.n + col];
    }

    mat_c[batch * mm.m * mm.n + row * mm.n + col] = sum;
}

// ============================================================================
// Tiled batched matmul with shared-memory reuse
// ============================================================================

@compute @workgroup_size(16, 16, 1)
fn matmul_tiled_f32(@builtin(local_invocation_id) local_id: vec3<u32>,
                    @builtin(workgroup_id) group_id: vec3<u32>) {
    let batch = group_id.z;
    if (batch >= mm.batch) {
        return;
    }

    let row = group_id.y * TILE_SIZE + local_id.y;
    let col = group_id.x * TILE_SIZE + local_id.x;

    let a_batch = batch * mm.m * mm.k;
    let b_batch = batch * mm.k * mm.n;
    let c_batch = batch * mm.m * mm.n;

    var sum: f32 = 0.0;

    let num_tiles = (mm.k + TILE_SIZE - 1u) / TILE_SIZE;

    for (var t: u32 = 0u; t < num_tiles; t = t + 1u) {
        let a_col = t * TILE_SIZE + local_id.x;
        if (row < mm.m && a_col < mm.k) {
            tile_a[local_id.y][local_id.x] = mat_a[a_batch + row * mm.k + a_col];
        } else {
            tile_a[local_id.y][local_id.x] = 0.0;
        }

        let b_row = t * TILE_SIZE + local_id.y;
        if (b_row < mm.k && col < mm.n) {
            tile_b[local_id.y][local_id.x] = mat_b[b_batch + b_row * mm.n + col];
        } else {
            tile_b[local_id.y][local_id.x] = 0.0;
        }

        workgroupBarrier();

        for (var i: u32 = 0u; i < TILE_SIZE; i = i + 1u) {
            sum = sum + tile_a[local_id.y][i] * tile_b[i][local_id.x];
        }

        workgroupBarrier();
    }

    if (row < mm.m && col < mm.n) {
        mat_c[c_batch + row * mm.n + col] = sum;
    }
}
"#;
