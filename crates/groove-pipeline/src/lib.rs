//! Groove/clip pipeline: thicken a shell, cut grooves at the anchor
//! points, fuse clips into them, validate and export.

pub mod anchors;
pub mod config;
pub mod types;

use std::path::{Path, PathBuf};

use feature_ops::{
    build_profile, cut_then_fuse, place, resolve_frame, thicken, DependentFeatureDeriver,
    KernelBundle, OpError, PlacementError,
};
use geom_kernel::KernelSolidHandle;
use groove_types::{PlacementFrame, ShapeKind};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

pub use config::{ConfigError, PipelineParameters, Tolerances};
pub use types::*;

impl From<OpError> for PipelineError {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Kernel(k) => PipelineError::Kernel(k),
            OpError::InvalidParameters { reason } => {
                PipelineError::InvalidFeatureParameters { reason }
            }
            failed @ OpError::ThickeningFailed { .. } => PipelineError::ThickeningFailed {
                reason: failed.to_string(),
            },
        }
    }
}

/// Where the preview mesh goes: the output path with an `.stl` extension.
/// `None` when the output already is an STL file.
pub fn preview_path(output: &Path) -> Option<PathBuf> {
    let is_stl = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("stl"));
    (!is_stl).then(|| output.with_extension("stl"))
}

/// Progress accumulated while a run executes.
#[derive(Default)]
struct Run {
    trail: Vec<PipelineState>,
    warnings: Vec<String>,
    skipped: Vec<SkippedPlacement>,
    placed: usize,
}

impl Run {
    fn reach(&mut self, state: PipelineState) {
        info!(phase = state.name(), "phase complete");
        self.trail.push(state);
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Record a location that cannot be placed. Kernel failures other than
    /// an incomplete operation end the run.
    fn skip(
        &mut self,
        index: usize,
        anchor: [f64; 3],
        err: PlacementError,
    ) -> Result<(), PipelineError> {
        match err {
            PlacementError::Kernel(e) if !e.is_incomplete() => Err(e.into()),
            other => {
                warn!(index, ?anchor, error = %other, "placement skipped");
                self.skipped.push(SkippedPlacement {
                    index,
                    anchor,
                    reason: other.to_string(),
                });
                Ok(())
            }
        }
    }
}

/// Tool shapes for one run: grooves to cut and clips to fuse, pairwise.
struct Tools {
    cavities: Vec<KernelSolidHandle>,
    protrusions: Vec<KernelSolidHandle>,
}

/// The groove/clip pipeline for one parameter set.
pub struct Pipeline {
    params: PipelineParameters,
}

impl Pipeline {
    pub fn new(params: PipelineParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PipelineParameters {
        &self.params
    }

    /// Run every phase against `kb`. Never panics; failures are reported
    /// in the result.
    pub fn run(&self, kb: &mut dyn KernelBundle, input: &Path, output: &Path) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", run_id = %run_id);
        let _guard = span.enter();
        info!(input = %input.display(), output = %output.display(), "run started");

        let mut run = Run::default();
        let outcome = self.execute(kb, input, output, &mut run);
        let Run {
            trail,
            warnings,
            skipped,
            placed,
        } = run;

        match outcome {
            Ok(shape) => {
                info!(placed, skipped = skipped.len(), warnings = warnings.len(), "Success");
                PipelineResult {
                    succeeded: true,
                    message: "Success".to_string(),
                    state: PipelineState::Succeeded,
                    trail,
                    final_shape: Some(shape),
                    placed,
                    skipped,
                    warnings,
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "run failed");
                PipelineResult {
                    succeeded: false,
                    state: PipelineState::Failed(message.clone()),
                    message,
                    trail,
                    final_shape: None,
                    placed,
                    skipped,
                    warnings,
                }
            }
        }
    }

    fn execute(
        &self,
        kb: &mut dyn KernelBundle,
        input: &Path,
        output: &Path,
        run: &mut Run,
    ) -> Result<KernelSolidHandle, PipelineError> {
        let params = &self.params;
        let tolerances = params.tolerances;

        // Clip parameters are checked before any geometry exists, and before
        // the plain range checks so a clearance/width conflict names itself.
        let deriver = DependentFeatureDeriver::new(params.clip());
        let summary = deriver.summary()?;
        params
            .validate()
            .map_err(|e| PipelineError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        info!(
            kind = %summary.kind,
            width = summary.width,
            depth = summary.depth,
            height = summary.height,
            source_width = summary.source_width,
            source_depth = summary.source_depth,
            "clip dimensions"
        );

        let body = kb
            .read_solid_model(input)
            .map_err(|e| PipelineError::InputCorrupted {
                reason: e.to_string(),
            })?;
        if !kb.check_validity(&body) {
            return Err(PipelineError::InputCorrupted {
                reason: "input failed validity analysis".to_string(),
            });
        }
        if kb.face_count(&body) == 0 {
            run.warn("input does not seem to contain faces".to_string());
        }
        run.reach(PipelineState::Imported);

        let thickened = thicken(
            kb,
            &body,
            params.thickness,
            tolerances.offset,
            tolerances.deviation,
        )?;
        info!(
            signed_thickness = thickened.signed_thickness,
            reoriented = thickened.reoriented,
            "body thickened"
        );
        run.warnings.extend(thickened.diagnostics.warnings);
        run.reach(PipelineState::Thickened);

        if !kb.check_validity(&thickened.handle) {
            return Err(PipelineError::ThickeningFailed {
                reason: "thickened solid failed validity analysis".to_string(),
            });
        }
        run.reach(PipelineState::GeometryChecked);

        let tools = self.place_features(kb, &thickened.handle, &deriver, run)?;
        run.reach(PipelineState::FeaturesPlaced);

        let assembled = cut_then_fuse(
            kb,
            &thickened.handle,
            &tools.cavities,
            &tools.protrusions,
            tolerances.fuzzy,
        )?;
        let boolean_warnings = assembled.diagnostics().warnings;
        run.warnings.extend(boolean_warnings.iter().cloned());
        run.reach(PipelineState::Assembled);

        if !kb.check_validity(&assembled.handle) {
            let reason = if boolean_warnings.is_empty() {
                "validity analysis failed".to_string()
            } else {
                format!(
                    "validity analysis failed after {}",
                    boolean_warnings.join("; ")
                )
            };
            return Err(PipelineError::InvalidResult { reason });
        }
        run.reach(PipelineState::Validated);

        kb.write_solid_model(&assembled.handle, output)
            .map_err(|e| PipelineError::ExportFailed {
                reason: e.to_string(),
            })?;
        self.export_preview(kb, &assembled.handle, output, run);
        run.reach(PipelineState::Exported);

        Ok(assembled.handle)
    }

    /// Resolve a frame at every selected anchor and place a groove and a
    /// clip there. Canonical shapes are built once and copied per placement.
    fn place_features(
        &self,
        kb: &mut dyn KernelBundle,
        body: &KernelSolidHandle,
        deriver: &DependentFeatureDeriver,
        run: &mut Run,
    ) -> Result<Tools, PipelineError> {
        let params = &self.params;
        let available = params.anchor_list();
        if params.groove_count > available.len() {
            run.warn(format!(
                "{} grooves requested but only {} anchor points are defined; using all of them",
                params.groove_count,
                available.len()
            ));
        }
        let targets = anchors::select(available, params.groove_count);

        let groove = params.groove();
        let groove_shape = build_profile(kb, &groove)?;
        let clip_shape = deriver.build(kb)?;

        let mut tools = Tools {
            cavities: Vec::with_capacity(targets.len()),
            protrusions: Vec::with_capacity(targets.len()),
        };
        for (index, &target) in targets.iter().enumerate() {
            let frame = match resolve_frame(kb.as_query(), body, target) {
                Ok(frame) => frame,
                Err(e) => {
                    run.skip(index, target, e)?;
                    continue;
                }
            };
            match place_pair(kb, &groove_shape, &clip_shape, &frame, groove.kind) {
                Ok((cavity, protrusion)) => {
                    debug!(index, cavity = cavity.id(), protrusion = protrusion.id(), "pair placed");
                    tools.cavities.push(cavity);
                    tools.protrusions.push(protrusion);
                    run.placed += 1;
                }
                Err(e) => run.skip(index, target, e)?,
            }
        }

        if run.placed == 0 {
            run.warn("no groove could be placed; body left without features".to_string());
        }
        Ok(tools)
    }

    /// Preview mesh next to the output. Failure is only a warning.
    fn export_preview(
        &self,
        kb: &mut dyn KernelBundle,
        shape: &KernelSolidHandle,
        output: &Path,
        run: &mut Run,
    ) {
        let Some(path) = preview_path(output) else {
            debug!("output is already a mesh, no preview written");
            return;
        };
        match kb.export_mesh(shape, &path, self.params.tolerances.mesh) {
            Ok(()) => info!(path = %path.display(), "preview mesh written"),
            Err(e) => run.warn(format!(
                "could not generate preview mesh {}: {}",
                path.display(),
                e
            )),
        }
    }
}

fn place_pair(
    kb: &mut dyn KernelBundle,
    groove_shape: &KernelSolidHandle,
    clip_shape: &KernelSolidHandle,
    frame: &PlacementFrame,
    kind: ShapeKind,
) -> Result<(KernelSolidHandle, KernelSolidHandle), PlacementError> {
    let cavity = place(kb, groove_shape, frame, kind)?;
    let protrusion = place(kb, clip_shape, frame, kind)?;
    Ok((cavity, protrusion))
}

/// Run the pipeline and reduce the outcome to `(success, message)`.
pub fn run_pipeline(
    kb: &mut dyn KernelBundle,
    input: &Path,
    output: &Path,
    params: &PipelineParameters,
) -> (bool, String) {
    let result = Pipeline::new(params.clone()).run(kb, input, output);
    (result.succeeded, result.message)
}
