//! Summary of a finished conversion job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::InterpolationCoverageWarning;
use crate::io::TriangleFiles;
use crate::mesh::Mesh2D;

/// An input grid that was left structured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedGrid {
    pub quantity: String,
    /// 1-based line of the `INPGRID` command.
    pub line: usize,
    pub reason: String,
}

/// Counts and output paths of a conversion job.
#[derive(Clone, Debug, Default)]
pub struct ConversionReport {
    pub n_nodes: usize,
    pub n_elements: usize,
    pub n_edges: usize,
    /// Edge count per boundary marker, interior edges excluded.
    pub marker_counts: BTreeMap<u32, usize>,
    /// Breakwaters embedded in the mesh; zero for the apply-mesh job.
    pub n_breakwaters: usize,
    /// Shoreline polylines that drove refinement; zero for the apply-mesh job.
    pub n_shoreline_polylines: usize,
    /// Mesh files written by the job, if any.
    pub mesh_files: Option<TriangleFiles>,
    pub gmsh_file: Option<PathBuf>,
    /// Node-aligned value files, by quantity keyword.
    pub value_files: Vec<(String, PathBuf)>,
    pub patched_input: PathBuf,
    pub warnings: Vec<InterpolationCoverageWarning>,
    /// Nodes inside the source coverage whose local spline failed.
    pub unstable_nodes: usize,
    pub skipped_grids: Vec<SkippedGrid>,
}

impl ConversionReport {
    pub(crate) fn for_mesh(mesh: &Mesh2D) -> Self {
        Self {
            n_nodes: mesh.n_vertices,
            n_elements: mesh.n_elements,
            n_edges: mesh.n_edges,
            marker_counts: mesh.marker_counts(),
            ..Self::default()
        }
    }

    /// Value file written for `quantity` (SWASH keyword).
    pub fn value_file(&self, quantity: &str) -> Option<&PathBuf> {
        self.value_files
            .iter()
            .find(|(q, _)| q == quantity)
            .map(|(_, path)| path)
    }

    /// Total nodes outside the source coverage, over all quantities.
    pub fn outside_nodes(&self) -> usize {
        self.warnings.iter().map(|w| w.count).sum()
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mesh: {} nodes, {} elements, {} edges",
            self.n_nodes, self.n_elements, self.n_edges
        )?;
        let markers: Vec<String> = self
            .marker_counts
            .iter()
            .map(|(m, n)| format!("{m}:{n}"))
            .collect();
        writeln!(f, "boundary markers: {}", markers.join(" "))?;
        if self.n_shoreline_polylines > 0 || self.n_breakwaters > 0 {
            writeln!(
                f,
                "features: {} shoreline polylines, {} breakwaters",
                self.n_shoreline_polylines, self.n_breakwaters
            )?;
        }
        for (quantity, path) in &self.value_files {
            writeln!(f, "{quantity}: {}", path.display())?;
        }
        for skipped in &self.skipped_grids {
            writeln!(
                f,
                "skipped {} (line {}): {}",
                skipped.quantity, skipped.line, skipped.reason
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        if self.unstable_nodes > 0 {
            writeln!(
                f,
                "{} nodes took the nearest sample after a failed local fit",
                self.unstable_nodes
            )?;
        }
        write!(f, "input: {}", self.patched_input.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds2D;

    #[test]
    fn test_report_from_mesh() {
        let mesh = Mesh2D::uniform_rectangle(Bounds2D::new(0.0, 2.0, 0.0, 1.0), 2, 1);
        let mut report = ConversionReport::for_mesh(&mesh);
        report.value_files.push(("BOTTOM".to_string(), PathBuf::from("out/mesh.bot")));
        report.warnings.push(InterpolationCoverageWarning {
            quantity: "BOTTOM".to_string(),
            count: 2,
            nodes: vec![0, 5],
        });

        assert_eq!(report.n_nodes, 6);
        assert_eq!(report.n_elements, 4);
        assert_eq!(report.marker_counts.len(), 4);
        assert_eq!(report.value_file("BOTTOM"), Some(&PathBuf::from("out/mesh.bot")));
        assert_eq!(report.value_file("POROSITY"), None);
        assert_eq!(report.outside_nodes(), 2);

        let text = report.to_string();
        assert!(text.starts_with("mesh: 6 nodes, 4 elements"));
        assert!(text.contains("warning: 2 nodes outside the BOTTOM source coverage"));
        assert!(!text.contains("failed local fit"));

        // Failed fits are reported apart from the coverage warnings
        report.unstable_nodes = 3;
        assert_eq!(report.outside_nodes(), 2);
        assert!(report
            .to_string()
            .contains("3 nodes took the nearest sample after a failed local fit"));
    }
}
