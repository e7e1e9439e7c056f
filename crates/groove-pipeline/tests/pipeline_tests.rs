use std::path::{Path, PathBuf};

use geom_kernel::{Kernel, KernelQuery, MockKernel, TruckKernel};
use groove_pipeline::{
    preview_path, run_pipeline, Pipeline, PipelineParameters, PipelineResult, PipelineState,
};
use groove_types::ShapeKind;

const INPUT: &str = "part.stp";
const OUTPUT: &str = "part_with_clips.stp";

/// Box body enclosing every reference anchor.
fn kernel_with_part() -> MockKernel {
    let mut kernel = MockKernel::new();
    kernel.register_box_model(INPUT, [580.0, 690.0, 550.0], [700.0, 750.0, 840.0]);
    kernel
}

fn reference_params() -> PipelineParameters {
    PipelineParameters {
        thickness: 2.65,
        groove_count: 5,
        groove_shape: ShapeKind::Rectangular,
        groove_height: 10.0,
        groove_width: 5.0,
        groove_depth: 2.5,
        clip_height: 20.0,
        assembly_clearance: 0.2,
        retention_offset: 0.1,
        ..Default::default()
    }
}

fn run(kernel: &mut MockKernel, params: PipelineParameters) -> PipelineResult {
    Pipeline::new(params).run(kernel, Path::new(INPUT), Path::new(OUTPUT))
}

fn all_phases() -> Vec<PipelineState> {
    vec![
        PipelineState::Imported,
        PipelineState::Thickened,
        PipelineState::GeometryChecked,
        PipelineState::FeaturesPlaced,
        PipelineState::Assembled,
        PipelineState::Validated,
        PipelineState::Exported,
    ]
}

// ── Successful runs ────────────────────────────────────────────────────────

#[test]
fn reference_run_succeeds_with_valid_solid() {
    let mut kernel = kernel_with_part();
    let result = run(&mut kernel, reference_params());

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.message, "Success");
    assert_eq!(result.state, PipelineState::Succeeded);
    assert_eq!(result.trail, all_phases());
    assert_eq!(result.placed, 5);
    assert!(result.skipped.is_empty());
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let shape = result.final_shape.unwrap();
    assert!(kernel.check_validity(&shape));
    assert_eq!(kernel.cut_sources(&shape).len(), 5);
    assert_eq!(kernel.fused_sources(&shape).len(), 5);
    assert_eq!(kernel.written_paths(), &[PathBuf::from(OUTPUT)]);
    assert_eq!(kernel.mesh_paths(), &[PathBuf::from("part_with_clips.stl")]);
}

#[test]
fn canonical_shapes_are_built_once_per_run() {
    let mut kernel = kernel_with_part();
    let result = run(&mut kernel, reference_params());
    assert!(result.succeeded);
    assert_eq!(kernel.count_operations("box"), 2);
    // One transform recesses the clip, then one per placed groove and clip.
    assert_eq!(kernel.count_operations("transform"), 1 + 2 * 5);
}

#[test]
fn run_pipeline_reports_success_tuple() {
    let mut kernel = kernel_with_part();
    let (ok, message) = run_pipeline(
        &mut kernel,
        Path::new(INPUT),
        Path::new(OUTPUT),
        &reference_params(),
    );
    assert!(ok);
    assert_eq!(message, "Success");
}

#[test]
fn every_shape_kind_completes() {
    for kind in ShapeKind::ALL {
        let mut kernel = kernel_with_part();
        let params = PipelineParameters {
            groove_shape: kind,
            ..reference_params()
        };
        let result = run(&mut kernel, params);
        assert!(result.succeeded, "{kind}: {}", result.message);
        assert_eq!(result.placed, 5);
    }
}

#[test]
fn count_beyond_anchor_list_uses_all_anchors() {
    let mut kernel = kernel_with_part();
    let params = PipelineParameters {
        groove_count: 10,
        ..reference_params()
    };
    let result = run(&mut kernel, params);
    assert!(result.succeeded);
    assert_eq!(result.placed, 7);
    assert!(result.warnings.iter().any(|w| w.contains("only 7 anchor points")));
}

#[test]
fn inward_failure_falls_back_outward() {
    let mut kernel = kernel_with_part();
    kernel.fail_inward_offset();
    let result = run(&mut kernel, reference_params());
    assert!(result.succeeded, "{}", result.message);
    assert_eq!(kernel.offset_attempts(), &[-2.65, 2.65]);
}

#[test]
fn inverted_thickening_is_corrected_with_a_warning() {
    let mut kernel = kernel_with_part();
    kernel.invert_offset_orientation();
    let result = run(&mut kernel, reference_params());
    assert!(result.succeeded);
    assert!(result.warnings.iter().any(|w| w.contains("orientation reversed")));
}

#[test]
fn faceless_input_is_only_a_warning() {
    let mut kernel = MockKernel::new();
    kernel.register_faceless_model(INPUT, [580.0, 690.0, 550.0], [700.0, 750.0, 840.0]);
    let result = run(&mut kernel, reference_params());
    assert!(result.succeeded, "{}", result.message);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("does not seem to contain faces")));
}

#[test]
fn unsupported_locations_are_skipped() {
    let mut kernel = MockKernel::new();
    kernel.register_box_model(INPUT, [0.0; 3], [100.0; 3]);
    let params = PipelineParameters {
        groove_count: 3,
        anchors: Some(vec![
            [50.0, 120.0, 50.0],  // above the +Y face
            [120.0, 120.0, 50.0], // beyond an edge
            [120.0, 120.0, 120.0], // beyond a corner
        ]),
        ..reference_params()
    };
    let result = run(&mut kernel, params);

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.placed, 1);
    let skipped: Vec<usize> = result.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert!(result.skipped[0].reason.contains("no supporting face"));
}

#[test]
fn no_placeable_location_leaves_body_unchanged() {
    let mut kernel = MockKernel::new();
    kernel.register_box_model(INPUT, [0.0; 3], [100.0; 3]);
    let params = PipelineParameters {
        groove_count: 1,
        anchors: Some(vec![[120.0, 120.0, 120.0]]),
        ..reference_params()
    };
    let result = run(&mut kernel, params);
    assert!(result.succeeded);
    assert_eq!(result.placed, 0);
    assert_eq!(kernel.count_operations("subtract"), 0);
    assert!(result.warnings.iter().any(|w| w.contains("no groove could be placed")));
}

#[test]
fn failed_bulk_boolean_is_recovered_and_reported() {
    let mut kernel = kernel_with_part();
    kernel.fail_multi_tool_booleans();
    let result = run(&mut kernel, reference_params());
    assert!(result.succeeded, "{}", result.message);
    let shape = result.final_shape.unwrap();
    assert_eq!(kernel.cut_sources(&shape).len(), 5);
    assert_eq!(kernel.fused_sources(&shape).len(), 5);
    assert!(result
        .warnings
        .iter()
        .all(|w| w.starts_with("BooleanIncomplete")));
    assert_eq!(result.warnings.len(), 2);
}

#[test]
fn preview_mesh_failure_is_not_fatal() {
    let mut kernel = kernel_with_part();
    kernel.fail_mesh_export();
    let result = run(&mut kernel, reference_params());
    assert!(result.succeeded);
    assert!(result.warnings.iter().any(|w| w.contains("preview mesh")));
    assert_eq!(kernel.written_paths().len(), 1);
}

// ── Failed runs ────────────────────────────────────────────────────────────

#[test]
fn thickening_failure_stops_everything_after_import() {
    let mut kernel = kernel_with_part();
    kernel.fail_inward_offset();
    kernel.fail_outward_offset();
    let result = run(&mut kernel, reference_params());

    assert!(!result.succeeded);
    assert!(result.message.starts_with("Thickening failed"), "{}", result.message);
    assert!(matches!(result.state, PipelineState::Failed(_)));
    assert_eq!(result.trail, vec![PipelineState::Imported]);
    assert!(result.final_shape.is_none());
    assert_eq!(kernel.operation_log(), &["read", "offset", "offset"]);
}

#[test]
fn invalid_clip_parameters_abort_before_import() {
    let mut kernel = kernel_with_part();
    let params = PipelineParameters {
        groove_width: 0.5,
        assembly_clearance: 0.9,
        ..reference_params()
    };
    let result = run(&mut kernel, params);

    assert!(!result.succeeded);
    assert_eq!(
        result.message,
        "Invalid clip parameters: Assembly clearance (0.9mm) must be less than groove width (0.5mm)"
    );
    assert!(result.trail.is_empty());
    assert!(kernel.operation_log().is_empty());
}

#[test]
fn clearance_wider_than_groove_names_the_groove_width() {
    let mut kernel = kernel_with_part();
    let params = PipelineParameters {
        groove_width: 5.0,
        assembly_clearance: 6.0,
        ..reference_params()
    };
    let (ok, message) = run_pipeline(&mut kernel, Path::new(INPUT), Path::new(OUTPUT), &params);

    assert!(!ok);
    assert!(message.starts_with("Invalid clip parameters"), "{}", message);
    assert!(message.contains("groove width"), "{}", message);
    assert!(kernel.operation_log().is_empty());
}

#[test]
fn large_retention_offset_within_depth_is_accepted() {
    let mut kernel = kernel_with_part();
    let params = PipelineParameters {
        groove_depth: 2.5,
        retention_offset: 1.0,
        ..reference_params()
    };
    let (ok, message) = run_pipeline(&mut kernel, Path::new(INPUT), Path::new(OUTPUT), &params);
    assert!(ok, "{}", message);
    assert_eq!(message, "Success");
}

#[test]
fn retention_offset_equal_to_depth_is_rejected() {
    let mut kernel = kernel_with_part();
    let params = PipelineParameters {
        groove_depth: 0.5,
        retention_offset: 0.5,
        ..reference_params()
    };
    let result = run(&mut kernel, params);
    assert!(result.message.contains("Retention offset"), "{}", result.message);
    assert!(kernel.operation_log().is_empty());
}

#[test]
fn out_of_range_configuration_is_rejected() {
    let mut kernel = kernel_with_part();
    let params = PipelineParameters {
        groove_count: 0,
        ..reference_params()
    };
    let result = run(&mut kernel, params);
    assert!(result.message.starts_with("Invalid configuration"), "{}", result.message);
    assert!(result.message.contains("groove_count"));
}

#[test]
fn corrupted_input_is_rejected() {
    let mut kernel = MockKernel::new();
    kernel.register_corrupt_model(INPUT);
    let result = run(&mut kernel, reference_params());
    assert!(result.message.starts_with("Input geometry corrupted"));
    assert!(result.trail.is_empty());
    assert_eq!(kernel.count_operations("offset"), 0);
}

#[test]
fn unreadable_input_is_rejected() {
    let mut kernel = MockKernel::new();
    let result = run(&mut kernel, reference_params());
    assert!(!result.succeeded);
    assert!(result.message.starts_with("Input geometry corrupted"));
}

#[test]
fn invalid_final_solid_fails_validation() {
    let mut kernel = kernel_with_part();
    kernel.fail_multi_tool_booleans();
    kernel.invalidate_boolean_results();
    let result = run(&mut kernel, reference_params());

    assert!(!result.succeeded);
    assert!(result.message.starts_with("Final solid is invalid"), "{}", result.message);
    assert!(result.message.contains("BooleanIncomplete"));
    assert_eq!(result.last_phase(), Some(&PipelineState::Assembled));
    assert!(kernel.written_paths().is_empty());
}

#[test]
fn export_failure_is_terminal() {
    let mut kernel = kernel_with_part();
    kernel.fail_writes();
    let result = run(&mut kernel, reference_params());

    assert!(!result.succeeded);
    assert!(result.message.starts_with("Export failed"));
    assert_eq!(result.last_phase(), Some(&PipelineState::Validated));
    assert!(kernel.mesh_paths().is_empty());
}

// ── Paths and backends ─────────────────────────────────────────────────────

#[test]
fn preview_replaces_step_extension() {
    assert_eq!(preview_path(Path::new("out.stp")), Some(PathBuf::from("out.stl")));
    assert_eq!(preview_path(Path::new("dir/OUT.STEP")), Some(PathBuf::from("dir/OUT.stl")));
    assert_eq!(preview_path(Path::new("out.stl")), None);
}

#[test]
fn truck_backend_reports_thickening_failure() {
    let dir = std::env::temp_dir().join(format!("groove-clip-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("shell.json");

    let mut kernel = TruckKernel::new();
    let part = kernel.build_box([0.0; 3], [50.0; 3]).unwrap();
    kernel.write_solid_model(&part, &input).unwrap();

    let result = Pipeline::new(reference_params()).run(&mut kernel, &input, &dir.join("out.stp"));
    assert!(result.message.starts_with("Thickening failed"), "{}", result.message);
    assert_eq!(result.trail, vec![PipelineState::Imported]);

    std::fs::remove_dir_all(&dir).unwrap();
}
