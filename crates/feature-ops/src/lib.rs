pub mod assembly;
pub mod derive;
pub mod kernel_ext;
pub mod placement;
pub mod profile;
pub mod thicken;
pub mod types;

pub use assembly::{
    assemble, cut_then_fuse, Assembled, AssemblyReport, AssemblyStrategy, CombineOp,
    TierOutcome,
};
pub use derive::{DependentFeatureDeriver, DimensionSummary};
pub use kernel_ext::KernelBundle;
pub use placement::{place, placement_transform, resolve_frame, PlacementError};
pub use profile::{build_profile, canonical_bounds};
pub use thicken::{check_preservation, thicken, Thickened};
pub use types::*;
