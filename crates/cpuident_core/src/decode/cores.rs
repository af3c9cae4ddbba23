use core::fmt;

use serde::Serialize;

use crate::RawLeafResult;
use super::{decode_features, BitField, FeatureFlags};

/// Fields used to count cores and threads.
pub mod core_field {
    use super::BitField;

    /// Leaf 80000008h ECX: threads in the package, minus one.
    pub const AMD_PACKAGE_THREADS:  BitField = BitField::new(0, 8);
    /// Leaf 8000001Eh EBX: threads per core, minus one.
    pub const AMD_THREADS_PER_CORE: BitField = BitField::new(8, 8);
}

/// Number of cores and logical processors in the package the query ran on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreCounts {
    pub physical_cores: u32,
    pub logical_cores:  u32,
}

impl CoreCounts {
    /// Create counts for a package with at least 1 core, and never fewer logical processors than cores.
    pub fn new(physical_cores: u32, logical_cores: u32) -> Self {
        let physical_cores = physical_cores.max(1);
        Self { physical_cores, logical_cores: logical_cores.max(physical_cores) }
    }

    /// Number of logical processors sharing a core, 0 when nothing was counted.
    pub fn threads_per_core(&self) -> u32 {
        self.logical_cores.checked_div(self.physical_cores).unwrap_or(0)
    }
}

impl fmt::Display for CoreCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cores, {} threads", self.physical_cores, self.logical_cores)
    }
}

/// Decode the number of logical processors per package from leaf 1.
///
/// Without `htt` the package has a single logical processor and EBX[23:16] is meaningless.
pub fn decode_logical_processors(leaf1: RawLeafResult) -> u32 {
    if decode_features(leaf1).contains(FeatureFlags::HTT) {
        super::additional_field::MAX_ADDRESSABLE_IDS.extract(leaf1.ebx).max(1)
    } else {
        1
    }
}

/// Decode the number of threads in the package from leaf 80000008h (AMD and Hygon only).
pub fn decode_amd_package_threads(leaf_8000_0008: RawLeafResult) -> u32 {
    core_field::AMD_PACKAGE_THREADS.extract(leaf_8000_0008.ecx) + 1
}

/// Decode the number of threads per core from leaf 8000001Eh (AMD and Hygon with `topoext` only).
pub fn decode_amd_threads_per_core(leaf_8000_001e: RawLeafResult) -> u32 {
    core_field::AMD_THREADS_PER_CORE.extract(leaf_8000_001e.ebx) + 1
}
