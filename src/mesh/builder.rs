//! From features and a sizing field to a tagged triangular mesh.
//!
//! The builder assembles the engine request (domain rectangle plus embedded
//! breakwaters), runs the engine and turns its raw output into a [`Mesh2D`]:
//!
//! - triangles reoriented counter-clockwise, zero-area triangles dropped
//! - vertices no triangle references removed, order otherwise kept
//! - vertex tags from position, breakwater vertices from constrained edges
//! - edge tags: side markers on boundary edges, breakwater markers on
//!   constrained edges, interior otherwise
//!
//! Node numbering is fixed here; later stages only read it.

use std::collections::HashMap;

use thiserror::Error;

use super::boundary_tags::{BoundaryTag, FIRST_FEATURE_MARKER};
use super::engine::{EngineError, EngineMesh, MeshRequest, MeshingEngine};
use super::mesh2d::{sorted_pair, triangle_signed_area, Mesh2D};
use crate::features::FeatureSet;
use crate::sizing::SizeFunction;
use crate::types::Bounds2D;

/// Engine failure, with the engine name for diagnostics.
#[derive(Debug, Error)]
#[error("{engine} engine failed: {source}")]
pub struct MeshBuildError {
    pub engine: String,
    #[source]
    pub source: EngineError,
}

/// Engine request for the domain `bounds` with breakwaters from `features`.
///
/// Breakwaters with fewer than two points cannot be embedded and are skipped.
pub fn mesh_request(
    bounds: Bounds2D,
    features: &FeatureSet,
    min_size: f64,
    max_size: f64,
) -> MeshRequest {
    let mut request = MeshRequest::new(bounds, min_size, max_size);
    for bw in &features.breakwaters {
        if bw.points.len() >= 2 {
            request = request.with_curve(bw.tag(), bw.points.points.clone());
        } else {
            tracing::debug!(id = bw.id, "breakwater too short to embed");
        }
    }
    request
}

/// Run `engine` on `request` and post-process the result.
pub fn build_mesh(
    engine: &dyn MeshingEngine,
    request: &MeshRequest,
    size: &dyn SizeFunction,
) -> Result<Mesh2D, MeshBuildError> {
    let wrap = |source: EngineError| MeshBuildError {
        engine: engine.name().to_string(),
        source,
    };

    let raw = engine.triangulate(request, size).map_err(wrap)?;
    let mesh = assemble(&request.bounds, raw).map_err(wrap)?;

    tracing::info!(
        engine = engine.name(),
        nodes = mesh.n_vertices,
        elements = mesh.n_elements,
        edges = mesh.n_edges,
        h_min = mesh.h_min(),
        h_max = mesh.h_max(),
        "built mesh"
    );
    Ok(mesh)
}

/// Turn raw engine output into a tagged mesh over `bounds`.
pub fn assemble(bounds: &Bounds2D, raw: EngineMesh) -> Result<Mesh2D, EngineError> {
    let n_raw = raw.vertices.len();
    let area_floor = f64::EPSILON * bounds.area();

    let mut triangles = Vec::with_capacity(raw.triangles.len());
    let mut dropped = 0usize;
    for tri in &raw.triangles {
        if let Some(&bad) = tri.iter().find(|&&v| v >= n_raw) {
            return Err(EngineError::Rejected(format!(
                "triangle references vertex {bad} of {n_raw}"
            )));
        }
        let [a, b, c] = *tri;
        let area = triangle_signed_area(raw.vertices[a], raw.vertices[b], raw.vertices[c]);
        if area.abs() <= area_floor {
            dropped += 1;
        } else if area < 0.0 {
            triangles.push([a, c, b]);
        } else {
            triangles.push([a, b, c]);
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, "dropped zero-area triangles");
    }
    if triangles.is_empty() {
        return Err(EngineError::Rejected(
            "engine produced no usable triangles".to_string(),
        ));
    }

    // Compact vertex numbering
    let mut used = vec![false; n_raw];
    for tri in &triangles {
        for &v in tri {
            used[v] = true;
        }
    }
    let mut new_index = vec![usize::MAX; n_raw];
    let mut vertices = Vec::new();
    for (old, _) in used.iter().enumerate().filter(|&(_, &u)| u) {
        new_index[old] = vertices.len();
        vertices.push(raw.vertices[old]);
    }
    for tri in &mut triangles {
        for v in tri.iter_mut() {
            *v = new_index[*v];
        }
    }

    let tol = 1e-9 * bounds.diagonal();
    let mut vertex_tags: Vec<BoundaryTag> = vertices
        .iter()
        .map(|&(x, y)| BoundaryTag::for_vertex(bounds, x, y, tol))
        .collect();

    let mut edge_tags: HashMap<(usize, usize), BoundaryTag> = HashMap::new();
    for &([a, b], marker) in &raw.edges {
        if marker < FIRST_FEATURE_MARKER || a >= n_raw || b >= n_raw {
            continue;
        }
        let (a, b) = (new_index[a], new_index[b]);
        if a == usize::MAX || b == usize::MAX || a == b {
            continue;
        }
        let tag = BoundaryTag::from_marker(marker);
        edge_tags.insert(sorted_pair(a, b), tag);
        for v in [a, b] {
            if vertex_tags[v].is_interior() {
                vertex_tags[v] = tag;
            }
        }
    }

    let mut mesh = Mesh2D::from_parts(vertices, vertex_tags, triangles, &edge_tags);
    mesh.tag_boundary_sides(bounds, tol);
    Ok(mesh)
}
