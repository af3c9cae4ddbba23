//! Contains traits implemented by the cpuident derive macros


/// Trait to get the number of variants in an enum
pub trait EnumCountT {
    /// Number of variants in the enum
    const COUNT : usize;
}

/// Trait to get an enum variant from a raw field value
pub trait EnumFromIndexT: Sized {
    /// Try to convert an index to an enum
    fn from_idx(idx: usize) -> Option<Self>;

    /// Try to convert an index to an enum, if it couldn't convert it, return a default value
    fn from_idx_or(idx: usize, default: Self) -> Self;
}
