//! External `gmsh` engine.
//!
//! Writes a `.geo` script (rectangle, embedded constraint curves, physical
//! tags equal to the boundary markers) and a `.pos` background view sampled
//! from the size function, runs `gmsh -2 -format msh22` and reads the result
//! back with the MSH 2.2 reader.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::{side_marker, EngineError, EngineMesh, MeshRequest, MeshingEngine};
use crate::io::gmsh::read_gmsh_file;
use crate::sizing::SizeFunction;

/// Upper bound on background-view cells per direction.
const MAX_VIEW_CELLS: usize = 200;

/// Meshing through the `gmsh` command-line program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GmshEngine {
    executable: PathBuf,
    work_dir: Option<PathBuf>,
}

impl Default for GmshEngine {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("gmsh"),
            work_dir: None,
        }
    }
}

impl GmshEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `gmsh` binary.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Keep the `.geo`, `.pos` and `.msh` files in `dir`.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Directory for one run: the configured one, or a fresh temporary
    /// directory removed when the run ends.
    fn scratch(&self) -> Result<Scratch, EngineError> {
        match &self.work_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(Scratch::Kept(dir.clone()))
            }
            None => Ok(Scratch::Temporary(
                tempfile::Builder::new().prefix("swash-mesh-").tempdir()?,
            )),
        }
    }
}

enum Scratch {
    Kept(PathBuf),
    Temporary(TempDir),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Scratch::Kept(dir) => dir,
            Scratch::Temporary(dir) => dir.path(),
        }
    }
}

impl MeshingEngine for GmshEngine {
    fn name(&self) -> &str {
        "gmsh"
    }

    fn triangulate(
        &self,
        request: &MeshRequest,
        size: &dyn SizeFunction,
    ) -> Result<EngineMesh, EngineError> {
        request.validate()?;

        let scratch = self.scratch()?;
        let dir = scratch.path();
        let geo = dir.join("domain.geo");
        let pos = dir.join("size.pos");
        let msh = dir.join("domain.msh");

        fs::write(&pos, background_view(request, size))?;
        fs::write(&geo, geo_script(request, &pos))?;

        tracing::debug!(executable = %self.executable.display(), geo = %geo.display(), "running gmsh");
        let output = Command::new(&self.executable)
            .arg(&geo)
            .arg("-2")
            .args(["-format", "msh22"])
            .arg("-o")
            .arg(&msh)
            .output()
            .map_err(|e| {
                EngineError::Rejected(format!("cannot run {}: {e}", self.executable.display()))
            })?;

        if !output.status.success() {
            let mut diagnostic = String::from_utf8_lossy(&output.stderr).into_owned();
            diagnostic.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(EngineError::Rejected(diagnostic.trim().to_string()));
        }

        let result = read_gmsh_file(&msh)?;
        Ok(EngineMesh {
            vertices: result.vertices,
            triangles: result.triangles,
            edges: result.lines,
        })
    }
}

/// Gmsh geometry script for `request`, using `background` as size field.
pub fn geo_script(request: &MeshRequest, background: &Path) -> String {
    let mut lines = Vec::new();

    // Points 1..4: SW, NW, NE, SE; lines 1..4: West, North, East, South
    for (i, (x, y)) in request.corners().iter().enumerate() {
        lines.push(format!("Point({}) = {{{}, {}, 0}};", i + 1, x, y));
    }
    for (side, _) in request.boundary().iter() {
        let i = side.index();
        lines.push(format!("Line({}) = {{{}, {}}};", i + 1, i + 1, (i + 1) % 4 + 1));
    }
    lines.push("Curve Loop(1) = {1, 2, 3, 4};".to_string());
    lines.push("Plane Surface(1) = {1};".to_string());
    for (side, _) in request.boundary().iter() {
        lines.push(format!(
            "Physical Curve({}) = {{{}}};",
            side_marker(side),
            side.index() + 1
        ));
    }

    let mut next_point = 5;
    let mut next_line = 5;
    for curve in &request.curves {
        let first_point = next_point;
        for &(x, y) in &curve.points {
            lines.push(format!("Point({}) = {{{}, {}, 0}};", next_point, x, y));
            next_point += 1;
        }
        let mut ids = Vec::new();
        for k in 0..curve.points.len().saturating_sub(1) {
            lines.push(format!(
                "Line({}) = {{{}, {}}};",
                next_line,
                first_point + k,
                first_point + k + 1
            ));
            ids.push(next_line.to_string());
            next_line += 1;
        }
        let ids = ids.join(", ");
        lines.push(format!("Line{{{ids}}} In Surface{{1}};"));
        lines.push(format!("Physical Curve({}) = {{{ids}}};", curve.tag.marker()));
    }
    lines.push("Physical Surface(1) = {1};".to_string());

    lines.push(format!("Merge \"{}\";", background.display()));
    lines.push("Field[1] = PostView;".to_string());
    lines.push("Field[1].ViewIndex = 0;".to_string());
    lines.push("Background Field = 1;".to_string());
    lines.push("Mesh.CharacteristicLengthExtendFromBoundary = 0;".to_string());
    lines.push("Mesh.CharacteristicLengthFromPoints = 0;".to_string());
    lines.push(format!("Mesh.CharacteristicLengthMin = {};", request.min_size));
    lines.push(format!("Mesh.CharacteristicLengthMax = {};", request.max_size));

    let mut s = lines.join("\n");
    s.push('\n');
    s
}

/// Scalar-triangle (`ST`) view of the clamped size over the domain.
pub fn background_view(request: &MeshRequest, size: &dyn SizeFunction) -> String {
    let b = &request.bounds;
    let cells = |extent: f64| {
        ((extent / request.min_size).ceil() as usize).clamp(1, MAX_VIEW_CELLS)
    };
    let (nx, ny) = (cells(b.width()), cells(b.height()));
    let dx = b.width() / nx as f64;
    let dy = b.height() / ny as f64;
    let x = |i: usize| if i == nx { b.x_max } else { b.x_min + i as f64 * dx };
    let y = |j: usize| if j == ny { b.y_max } else { b.y_min + j as f64 * dy };

    let mut s = String::from("View \"size\" {\n");
    for j in 0..ny {
        for i in 0..nx {
            let p = [(x(i), y(j)), (x(i + 1), y(j)), (x(i + 1), y(j + 1)), (x(i), y(j + 1))];
            for tri in [[0, 1, 2], [0, 2, 3]] {
                let [a, b, c] = tri.map(|k| p[k]);
                s.push_str(&format!(
                    "ST({}, {}, 0, {}, {}, 0, {}, {}, 0){{{}, {}, {}}};\n",
                    a.0,
                    a.1,
                    b.0,
                    b.1,
                    c.0,
                    c.1,
                    request.clamped_size(size, a.0, a.1),
                    request.clamped_size(size, b.0, b.1),
                    request.clamped_size(size, c.0, c.1)
                ));
            }
        }
    }
    s.push_str("};\n");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoundaryTag;
    use crate::types::Bounds2D;
    use tempfile::tempdir;

    fn request() -> MeshRequest {
        MeshRequest::new(Bounds2D::new(0.0, 100.0, 0.0, 50.0), 10.0, 50.0)
            .with_curve(BoundaryTag::Breakwater(1), vec![(20.0, 20.0), (40.0, 20.0), (60.0, 25.0)])
    }

    #[test]
    fn test_geo_script_layout() {
        let script = geo_script(&request(), Path::new("size.pos"));
        assert!(script.contains("Point(1) = {0, 0, 0};"));
        assert!(script.contains("Point(2) = {0, 50, 0};"));
        assert!(script.contains("Line(1) = {1, 2};"));
        assert!(script.contains("Line(4) = {4, 1};"));
        assert!(script.contains("Physical Curve(1) = {1};"));
        assert!(script.contains("Physical Curve(4) = {4};"));
        assert!(script.contains("Line{5, 6} In Surface{1};"));
        assert!(script.contains("Physical Curve(6) = {5, 6};"));
        assert!(script.contains("Merge \"size.pos\";"));
        assert!(script.contains("Mesh.CharacteristicLengthMax = 50;"));
    }

    #[test]
    fn test_background_view() {
        let view = background_view(&request(), &|x: f64, _: f64| 5.0 + x);
        // 10 x 5 cells, two triangles each
        assert_eq!(view.matches("ST(").count(), 100);
        assert!(view.starts_with("View \"size\" {"));
        assert!(view.contains("ST(0, 0, 0, 10, 0, 0, 10, 10, 0){10, 15, 15};"));
    }

    #[test]
    fn test_missing_executable_is_rejected() {
        let dir = tempdir().unwrap();
        let engine = GmshEngine::new()
            .with_executable(dir.path().join("no-such-gmsh"))
            .with_work_dir(dir.path());
        let err = engine
            .triangulate(&request(), &|_: f64, _: f64| 20.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::Rejected(_)));
        assert!(dir.path().join("domain.geo").exists());
    }

    #[test]
    fn test_default_scratch_is_private_and_removed() {
        let engine = GmshEngine::new();
        let a = engine.scratch().unwrap();
        let b = engine.scratch().unwrap();
        let path = a.path().to_path_buf();
        assert!(path.is_dir());
        assert_ne!(path, b.path());

        drop(a);
        assert!(!path.exists());
        assert!(b.path().is_dir());
    }

    #[test]
    fn test_configured_work_dir_is_kept() {
        let dir = tempdir().unwrap();
        let work = dir.path().join("gmsh");
        let scratch = GmshEngine::new().with_work_dir(&work).scratch().unwrap();
        assert_eq!(scratch.path(), work);
        drop(scratch);
        assert!(work.is_dir());
    }
}
