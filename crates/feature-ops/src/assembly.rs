//! Boolean assembly of tool shapes into a body.
//!
//! Each combination runs in two tiers. The bulk tier unions every tool
//! into one compound and applies a single body-vs-compound boolean. If any
//! step of that does not complete, the sequential tier applies the tools
//! one at a time to a running result, and a tool whose boolean does not
//! complete is left out. Kernel errors other than `Incomplete` propagate.

use geom_kernel::{KernelError, KernelSolidHandle};
use tracing::{debug, info, warn};

use crate::kernel_ext::KernelBundle;
use crate::types::{Diagnostics, OpError};

/// How tools are combined with the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    /// Fuse protrusions onto the body.
    Union,
    /// Cut cavities out of the body.
    Subtract,
}

impl CombineOp {
    pub fn name(self) -> &'static str {
        match self {
            CombineOp::Union => "union",
            CombineOp::Subtract => "subtract",
        }
    }

    fn apply(
        self,
        kb: &mut dyn KernelBundle,
        body: &KernelSolidHandle,
        tool: &KernelSolidHandle,
        fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        match self {
            CombineOp::Union => kb.boolean_union(body, tool, fuzzy),
            CombineOp::Subtract => kb.boolean_subtract(body, tool, fuzzy),
        }
    }
}

/// Result of one assembly tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Completed(KernelSolidHandle),
    Incomplete { reason: String },
}

/// Which tier produced the assembled body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStrategy {
    /// No tools; the body is returned as is.
    Unchanged,
    Bulk,
    Sequential,
}

/// Outcome of combining a tool list with a body.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub handle: KernelSolidHandle,
    pub op: CombineOp,
    pub strategy: AssemblyStrategy,
    /// Number of tools incorporated into `handle`.
    pub applied: usize,
    /// Indices of tools that had no effect.
    pub skipped: Vec<usize>,
    pub diagnostics: Diagnostics,
}

/// Body after cavities were cut and protrusions fused.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub handle: KernelSolidHandle,
    pub cut: AssemblyReport,
    pub fuse: AssemblyReport,
}

impl Assembled {
    pub fn diagnostics(&self) -> Diagnostics {
        let mut all = self.cut.diagnostics.clone();
        all.extend(self.fuse.diagnostics.clone());
        all
    }
}

/// Treat `Incomplete` as a tier outcome, anything else as an error.
fn tier_step(
    result: Result<KernelSolidHandle, KernelError>,
    context: impl FnOnce() -> String,
) -> Result<TierOutcome, KernelError> {
    match result {
        Ok(handle) => Ok(TierOutcome::Completed(handle)),
        Err(e) if e.is_incomplete() => Ok(TierOutcome::Incomplete {
            reason: format!("{}: {}", context(), e),
        }),
        Err(e) => Err(e),
    }
}

/// Pre-combine all tools into one compound, then one body-vs-compound boolean.
///
/// An incomplete union while pre-combining makes the whole tier
/// `Incomplete`; the failed tool is not dropped from the compound. The
/// sequential tier then runs from the untouched body and reports which tools
/// it had to skip.
pub fn bulk_tier(
    kb: &mut dyn KernelBundle,
    body: &KernelSolidHandle,
    tools: &[KernelSolidHandle],
    op: CombineOp,
    fuzzy: f64,
) -> Result<TierOutcome, KernelError> {
    let Some((first, rest)) = tools.split_first() else {
        return Ok(TierOutcome::Completed(body.clone()));
    };

    let mut compound = first.clone();
    for (i, tool) in rest.iter().enumerate() {
        let step = kb.boolean_union(&compound, tool, fuzzy);
        match tier_step(step, || format!("pre-combining tool {}", i + 1))? {
            TierOutcome::Completed(handle) => compound = handle,
            incomplete => return Ok(incomplete),
        }
    }

    let step = op.apply(kb, body, &compound, fuzzy);
    tier_step(step, || format!("{} of {}-tool compound", op.name(), tools.len()))
}

/// Apply each tool to a running result. Returns the result and the indices
/// of tools that did not complete.
pub fn sequential_tier(
    kb: &mut dyn KernelBundle,
    body: &KernelSolidHandle,
    tools: &[KernelSolidHandle],
    op: CombineOp,
    fuzzy: f64,
) -> Result<(KernelSolidHandle, Vec<usize>), KernelError> {
    let mut running = body.clone();
    let mut skipped = Vec::new();
    for (i, tool) in tools.iter().enumerate() {
        let step = op.apply(kb, &running, tool, fuzzy);
        match tier_step(step, || format!("{} of tool {}", op.name(), i))? {
            TierOutcome::Completed(handle) => running = handle,
            TierOutcome::Incomplete { reason } => {
                warn!(tool = i, %reason, "tool skipped");
                skipped.push(i);
            }
        }
    }
    Ok((running, skipped))
}

/// Combine `tools` with `body`: bulk first, sequential if bulk does not complete.
pub fn assemble(
    kb: &mut dyn KernelBundle,
    body: &KernelSolidHandle,
    tools: &[KernelSolidHandle],
    op: CombineOp,
    fuzzy: f64,
) -> Result<AssemblyReport, OpError> {
    if tools.is_empty() {
        return Ok(AssemblyReport {
            handle: body.clone(),
            op,
            strategy: AssemblyStrategy::Unchanged,
            applied: 0,
            skipped: Vec::new(),
            diagnostics: Diagnostics::default(),
        });
    }

    let mut diagnostics = Diagnostics::default();
    match bulk_tier(kb, body, tools, op, fuzzy)? {
        TierOutcome::Completed(handle) => {
            debug!(op = op.name(), tools = tools.len(), "bulk tier completed");
            return Ok(AssemblyReport {
                handle,
                op,
                strategy: AssemblyStrategy::Bulk,
                applied: tools.len(),
                skipped: Vec::new(),
                diagnostics,
            });
        }
        TierOutcome::Incomplete { reason } => {
            warn!(op = op.name(), %reason, "bulk boolean incomplete, applying tools one at a time");
            diagnostics.warn(format!("BooleanIncomplete: {}", reason));
        }
    }

    let (handle, skipped) = sequential_tier(kb, body, tools, op, fuzzy)?;
    for &i in &skipped {
        diagnostics.warn(format!("BooleanIncomplete: {} of tool {} had no effect", op.name(), i));
    }
    let applied = tools.len() - skipped.len();
    info!(op = op.name(), applied, skipped = skipped.len(), "sequential tier finished");

    Ok(AssemblyReport {
        handle,
        op,
        strategy: AssemblyStrategy::Sequential,
        applied,
        skipped,
        diagnostics,
    })
}

/// Cut every cavity, then fuse every protrusion into the cut result.
pub fn cut_then_fuse(
    kb: &mut dyn KernelBundle,
    body: &KernelSolidHandle,
    cavities: &[KernelSolidHandle],
    protrusions: &[KernelSolidHandle],
    fuzzy: f64,
) -> Result<Assembled, OpError> {
    let cut = assemble(kb, body, cavities, CombineOp::Subtract, fuzzy)?;
    let fuse = assemble(kb, &cut.handle, protrusions, CombineOp::Union, fuzzy)?;
    Ok(Assembled {
        handle: fuse.handle.clone(),
        cut,
        fuse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom_kernel::MockKernel;

    #[test]
    fn no_tools_leaves_body_untouched() {
        let mut kernel = MockKernel::new();
        let body = kernel.insert_box([0.0; 3], [10.0; 3]);
        let report = assemble(&mut kernel, &body, &[], CombineOp::Subtract, 0.1).unwrap();
        assert_eq!(report.handle, body);
        assert_eq!(report.strategy, AssemblyStrategy::Unchanged);
        assert!(kernel.operation_log().is_empty());
    }

    #[test]
    fn single_tool_bulk_is_one_boolean() {
        let mut kernel = MockKernel::new();
        let body = kernel.insert_box([0.0; 3], [10.0; 3]);
        let tool = kernel.insert_box([1.0; 3], [2.0; 3]);
        let outcome = bulk_tier(&mut kernel, &body, &[tool.clone()], CombineOp::Subtract, 0.1).unwrap();
        let TierOutcome::Completed(handle) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(kernel.cut_sources(&handle), vec![tool.id()]);
        assert_eq!(kernel.count_operations("union"), 0);
    }

    #[test]
    fn unknown_tool_is_an_error_not_a_skip() {
        let mut kernel = MockKernel::new();
        let body = kernel.insert_box([0.0; 3], [10.0; 3]);

        let mut elsewhere = MockKernel::new();
        let stranger = (0..5)
            .map(|_| elsewhere.insert_box([0.0; 3], [1.0; 3]))
            .last()
            .unwrap();

        let err = assemble(&mut kernel, &body, &[stranger], CombineOp::Union, 0.1).unwrap_err();
        assert!(matches!(err, OpError::Kernel(KernelError::EntityNotFound { .. })));
    }
}
