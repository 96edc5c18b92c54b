//! End-to-end tests of the conversion jobs
//!
//! Verifies:
//! 1. A planar bottom is carried onto the mesh within interpolation precision
//! 2. All four side markers and the requested files are produced
//! 3. The patched input references the mesh and keeps unrelated commands
//! 4. Re-running a conversion writes byte-identical files
//! 5. A porosity run becomes an embedded breakwater with its own marker
//! 6. Failures surface as the matching conversion error

use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use swash_mesh::io::{read_triangle_mesh, read_value_file};
use swash_mesh::{
    apply_mesh, create_mesh, BoundaryTag, ConversionConfig, ConversionError, DelaunayEngine,
    ExportConfig, GmshEngine, SizingConfig, ThresholdParams,
};
use tempfile::tempdir;

/// Write a FREE-format grid, rows from the south (`idla` 3).
fn write_grid(path: &Path, n_cols: usize, n_rows: usize, spacing: f64, f: impl Fn(f64, f64) -> f64) {
    let mut text = String::new();
    for row in 0..n_rows {
        let y = row as f64 * spacing;
        let line: Vec<String> = (0..n_cols)
            .map(|col| format!("{}", f(col as f64 * spacing, y)))
            .collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

/// Harbour input on a 400 x 200 m grid with a shoreline at x = 150.
fn write_harbour(dir: &Path) -> std::path::PathBuf {
    write_grid(&dir.join("bottom.txt"), 41, 21, 10.0, |x, _| x - 150.0);
    let input = dir.join("harbour.sws");
    fs::write(
        &input,
        "\
$ harbour test case
PROJ 'harbour' '001'
SET LEVEL=0.0
MODE NONST TWOD
CGRID REGULAR 0. 0. 0. 400. 200. 40 20
VERT 1
INPGRID BOTTOM REGULAR 0. 0. 0. 40 20 10. 10. EXC -99.
READINP BOTTOM 1. 'bottom.txt' 3 0 FREE
POINTS 'gauges' 300. 100.
BLOCK 'COMPGRID' NOHEAD 'out.mat' LAY 3 BOTLEV
COMPUTE 000000.000 0.05 SEC 000100.000
STOP
",
    )
    .unwrap();
    input
}

fn harbour_config() -> ConversionConfig {
    ConversionConfig::default().with_sizing(
        SizingConfig::new(10.0, 50.0)
            .with_shoreline(ThresholdParams::new(10.0, 50.0, 0.0, 100.0))
            .with_gauges(ThresholdParams::new(10.0, 50.0, 0.0, 50.0).stop_at_dist_max()),
    )
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    assert!(n > 0, "no values to average");
    sum / n as f64
}

#[test]
fn test_create_mesh_end_to_end() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let out = dir.path().join("out");

    let report = create_mesh(&input, None, &out, &harbour_config(), &DelaunayEngine::new()).unwrap();

    assert_eq!(report.marker_counts.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(report.n_breakwaters, 0);
    assert_eq!(report.n_shoreline_polylines, 1);
    assert!(report.warnings.is_empty());
    assert_eq!(report.unstable_nodes, 0);
    assert!(report.skipped_grids.is_empty());
    for ext in ["node", "ele", "edge", "msh", "bot"] {
        assert!(out.join(format!("mesh.{ext}")).exists(), "missing mesh.{ext}");
    }

    // Values are node-aligned and reproduce the planar bottom
    let mesh = read_triangle_mesh(&out.join("mesh")).unwrap();
    let bottom = read_value_file(report.value_file("BOTTOM").unwrap()).unwrap();
    assert_eq!(mesh.n_vertices, report.n_nodes);
    assert_eq!(bottom.len(), mesh.n_vertices);
    for (&(x, _), &z) in mesh.vertices.iter().zip(&bottom) {
        assert_abs_diff_eq!(z, x - 150.0, epsilon = 1e-6);
    }

    // Finer near the shoreline than far from it
    let h = mesh.local_edge_lengths();
    let near = mean(
        mesh.vertices
            .iter()
            .zip(&h)
            .filter(|((x, _), _)| (x - 150.0).abs() < 10.0)
            .map(|(_, &h)| h),
    );
    let far = mean(
        mesh.vertices
            .iter()
            .zip(&h)
            .filter(|((x, _), _)| *x > 370.0)
            .map(|(_, &h)| h),
    );
    assert!(near < far, "shoreline spacing {near} not finer than offshore {far}");
}

#[test]
fn test_patched_input() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let out = dir.path().join("out");

    let report = create_mesh(&input, None, &out, &harbour_config(), &DelaunayEngine::new()).unwrap();
    assert_eq!(report.patched_input, out.join("harbour.sws"));

    let original = fs::read_to_string(&input).unwrap();
    let patched = fs::read_to_string(&report.patched_input).unwrap();
    assert!(patched.contains("CGRID UNSTRUCTURED\nREADGRID UNSTRUCTURED TRIANGLE 'mesh'\n"));
    assert!(patched.contains("INPGRID BOTTOM UNSTRUCTURED EXCEPTION -99\n"));
    assert!(patched.contains("READINP BOTTOM 1. 'mesh.bot' 1 0 FREE\n"));

    for line in original.lines().filter(|l| {
        !l.starts_with("CGRID") && !l.starts_with("INPGRID") && !l.starts_with("READINP")
    }) {
        assert!(patched.lines().any(|p| p == line), "lost line '{line}'");
    }
    assert!(!patched.contains("REGULAR"));
    // The source input is untouched
    assert_eq!(fs::read_to_string(&input).unwrap(), original);
}

#[test]
fn test_in_place_patching() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let config = harbour_config().with_export(ExportConfig::default().in_place().without_gmsh());

    let report = create_mesh(&input, None, dir.path(), &config, &DelaunayEngine::new()).unwrap();

    assert_eq!(report.patched_input, input);
    assert!(report.gmsh_file.is_none());
    let patched = fs::read_to_string(&input).unwrap();
    assert!(patched.contains("READINP BOTTOM 1. 'mesh.bot' 1 0 FREE"));
}

#[test]
fn test_create_mesh_is_deterministic() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let (a, b) = (dir.path().join("a"), dir.path().join("b"));

    let config = harbour_config();
    create_mesh(&input, None, &a, &config, &DelaunayEngine::new()).unwrap();
    create_mesh(&input, None, &b, &config, &DelaunayEngine::new()).unwrap();

    for name in ["mesh.node", "mesh.ele", "mesh.edge", "mesh.bot", "harbour.sws"] {
        assert_eq!(
            fs::read(a.join(name)).unwrap(),
            fs::read(b.join(name)).unwrap(),
            "{name} differs between runs"
        );
    }
}

#[test]
fn test_apply_mesh_matches_create_mesh() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let created = dir.path().join("created");
    let applied = dir.path().join("applied");

    let config = harbour_config();
    create_mesh(&input, None, &created, &config, &DelaunayEngine::new()).unwrap();
    let report = apply_mesh(&created.join("mesh"), &input, &applied, &config).unwrap();

    assert!(report.mesh_files.is_none());
    assert_eq!(
        fs::read(created.join("mesh.bot")).unwrap(),
        fs::read(applied.join("mesh.bot")).unwrap()
    );
    let patched = fs::read_to_string(applied.join("harbour.sws")).unwrap();
    let mesh_ref = created.join("mesh").display().to_string();
    assert!(patched.contains(&format!("READGRID UNSTRUCTURED TRIANGLE '{mesh_ref}'")));
    assert!(patched.contains("READINP BOTTOM 1. 'mesh.bot' 1 0 FREE"));
}

#[test]
fn test_breakwater_is_embedded() {
    let dir = tempdir().unwrap();
    // 600 x 200 m, shoreline at x = 550, porous run at y = 100 from x = 100 to 490
    write_grid(&dir.path().join("bottom.txt"), 61, 21, 10.0, |x, _| x - 550.0);
    write_grid(&dir.path().join("porosity.txt"), 61, 21, 10.0, |x, y| {
        if y == 100.0 && (100.0..=490.0).contains(&x) {
            0.5
        } else {
            1.0
        }
    });
    let input = dir.path().join("port.sws");
    fs::write(
        &input,
        "\
CGRID REGULAR 0. 0. 0. 600. 200. 60 20
INPGRID BOTTOM REGULAR 0. 0. 0. 60 20 10. 10.
READINP BOTTOM 1. 'bottom.txt' 3 0 FREE
INPGRID POROSITY REGULAR 0. 0. 0. 60 20 10. 10.
READINP POROSITY 1. 'porosity.txt' 3 0 FREE
COMPUTE
STOP
",
    )
    .unwrap();
    let config = ConversionConfig::default().with_sizing(
        SizingConfig::new(10.0, 40.0)
            .with_shoreline(ThresholdParams::new(10.0, 40.0, 0.0, 100.0))
            .with_breakwaters(ThresholdParams::new(10.0, 40.0, 0.0, 60.0)),
    );
    let out = dir.path().join("out");

    let report = create_mesh(&input, None, &out, &config, &DelaunayEngine::new()).unwrap();

    assert_eq!(report.n_breakwaters, 1);
    assert!(report.marker_counts.contains_key(&5));
    assert!(report.value_file("POROSITY").is_some());

    let mesh = read_triangle_mesh(&out.join("mesh")).unwrap();
    let tag = BoundaryTag::Breakwater(0);
    let mut length = 0.0;
    for (e, edge) in mesh.edges.iter().enumerate().filter(|(_, e)| e.tag == tag) {
        let (a, b) = edge.vertices;
        assert_eq!(mesh.vertices[a].1, 100.0);
        assert_eq!(mesh.vertices[b].1, 100.0);
        length += mesh.edge_length(e);
    }
    assert_abs_diff_eq!(length, 390.0, epsilon = 1e-6);

    // Porosity uses the nearest sample, so only sampled values appear
    let porosity = read_value_file(report.value_file("POROSITY").unwrap()).unwrap();
    assert_eq!(porosity.len(), mesh.n_vertices);
    assert!(porosity.iter().all(|&p| p == 0.5 || p == 1.0));

    let patched = fs::read_to_string(&report.patched_input).unwrap();
    assert!(patched.contains("READINP POROSITY 1. 'mesh.poro' 1 0 FREE"));
}

#[test]
fn test_submerged_grid_fails_in_features() {
    let dir = tempdir().unwrap();
    write_grid(&dir.path().join("bottom.txt"), 41, 21, 10.0, |_, _| -50.0);
    let input = dir.path().join("deep.sws");
    fs::write(
        &input,
        "INPGRID BOTTOM REGULAR 0. 0. 0. 40 20 10. 10.\nREADINP BOTTOM 1. 'bottom.txt' 3 0 FREE\n",
    )
    .unwrap();
    let out = dir.path().join("out");

    let err = create_mesh(&input, None, &out, &ConversionConfig::default(), &DelaunayEngine::new())
        .unwrap_err();

    assert!(matches!(err, ConversionError::NoShorelineFound { .. }));
    assert_eq!(err.stage(), "features");
    assert!(!out.join("mesh.node").exists());
}

#[test]
fn test_gauges_alone_do_not_make_a_shoreline() {
    // 4 km x 2 km of uniform 50 m water with a gauge at its centre
    let dir = tempdir().unwrap();
    write_grid(&dir.path().join("bottom.txt"), 41, 21, 100.0, |_, _| -50.0);
    let input = dir.path().join("open.sws");
    fs::write(
        &input,
        "INPGRID BOTTOM REGULAR -2000. -1000. 0. 40 20 100. 100.\nREADINP BOTTOM 1. 'bottom.txt' 3 0 FREE\n",
    )
    .unwrap();
    let gauges = dir.path().join("gauges.txt");
    fs::write(&gauges, "G1 0.0 0.0\n").unwrap();
    let config = ConversionConfig::default().with_sizing(
        SizingConfig::new(10.0, 100.0)
            .with_gauges(ThresholdParams::new(5.0, 50.0, 0.0, 200.0).stop_at_dist_max()),
    );
    let out = dir.path().join("out");

    let err = create_mesh(&input, Some(&gauges), &out, &config, &DelaunayEngine::new())
        .unwrap_err();

    assert!(matches!(err, ConversionError::NoShorelineFound { datum } if datum == 0.0));
    assert_eq!(err.stage(), "features");
    assert!(!out.exists());
}

#[test]
fn test_invalid_sizing_is_config_error() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let out = dir.path().join("out");
    let config = ConversionConfig::default().with_sizing(SizingConfig::new(50.0, 10.0));

    let err = create_mesh(&input, None, &out, &config, &DelaunayEngine::new()).unwrap_err();

    assert!(matches!(err, ConversionError::Config(_)));
    assert_eq!(err.stage(), "config");
    assert!(err.to_string().contains("sizing.global_max_size"));
    assert!(!out.exists());
}

#[test]
fn test_oversized_input_grid_is_input_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bottom.txt"), "-5 -5 -5 -5\n").unwrap();
    let input = dir.path().join("huge.sws");
    fs::write(
        &input,
        "INPGRID BOTTOM REG 0. 0. 0. 1000000000 1000000000 1. 1.\nREADINP BOTTOM 1. 'bottom.txt' 3 0 FREE\n",
    )
    .unwrap();

    let err = create_mesh(
        &input,
        None,
        &dir.path().join("out"),
        &ConversionConfig::default(),
        &DelaunayEngine::new(),
    )
    .unwrap_err();

    assert!(matches!(err, ConversionError::InputParse(_)));
    assert_eq!(err.stage(), "load");
}

#[test]
fn test_missing_bottom_is_input_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("empty.sws");
    fs::write(&input, "CGRID REGULAR 0. 0. 0. 400. 200. 40 20\nSTOP\n").unwrap();

    let err = create_mesh(
        &input,
        None,
        &dir.path().join("out"),
        &ConversionConfig::default(),
        &DelaunayEngine::new(),
    )
    .unwrap_err();

    assert!(matches!(err, ConversionError::InputParse(_)));
    assert_eq!(err.stage(), "load");
}

#[test]
fn test_bad_gauge_file_is_input_error() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let gauges = dir.path().join("gauges.txt");
    fs::write(&gauges, "G1 100.0 not-a-number\n").unwrap();

    let err = create_mesh(
        &input,
        Some(&gauges),
        &dir.path().join("out"),
        &harbour_config(),
        &DelaunayEngine::new(),
    )
    .unwrap_err();
    assert_eq!(err.stage(), "load");
}

#[test]
fn test_gauge_file_refines() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let gauges = dir.path().join("gauges.txt");
    fs::write(&gauges, "# name x y\nG1 300.0 50.0\n").unwrap();

    let without = create_mesh(
        &input,
        None,
        &dir.path().join("a"),
        &harbour_config(),
        &DelaunayEngine::new(),
    )
    .unwrap();
    let with = create_mesh(
        &input,
        Some(&gauges),
        &dir.path().join("b"),
        &harbour_config(),
        &DelaunayEngine::new(),
    )
    .unwrap();
    assert!(with.n_nodes > without.n_nodes);
}

#[test]
fn test_engine_failure_is_reported() {
    let dir = tempdir().unwrap();
    let input = write_harbour(dir.path());
    let engine = GmshEngine::new()
        .with_executable(dir.path().join("no-such-gmsh"))
        .with_work_dir(dir.path().join("gmsh"));

    let err = create_mesh(&input, None, &dir.path().join("out"), &harbour_config(), &engine)
        .unwrap_err();

    match &err {
        ConversionError::MeshGenerationFailed { engine, diagnostic } => {
            assert_eq!(engine, "gmsh");
            assert!(diagnostic.contains("cannot run"), "diagnostic: {diagnostic}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.stage(), "mesh");
}
