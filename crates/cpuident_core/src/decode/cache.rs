use core::fmt::{self, Write};

use cpuident_base::EnumFromIndexT;
use cpuident_macros::{EnumDisplay, EnumFromIndex};
use serde::Serialize;

use crate::{fmt::Indenter, RawLeafResult};
use super::BitField;

/// Fields of the deterministic cache parameter leaves (4 and 8000001Dh).
pub mod cache_field {
    use super::BitField;

    // eax
    pub const CACHE_TYPE:        BitField = BitField::new(0, 5);
    pub const LEVEL:             BitField = BitField::new(5, 3);
    pub const SELF_INITIALIZING: BitField = BitField::new(8, 1);
    pub const FULLY_ASSOCIATIVE: BitField = BitField::new(9, 1);
    pub const SHARING_THREADS:   BitField = BitField::new(14, 12);
    pub const CORES_PER_PACKAGE: BitField = BitField::new(26, 6);

    // ebx
    pub const LINE_SIZE:         BitField = BitField::new(0, 12);
    pub const PARTITIONS:        BitField = BitField::new(12, 10);
    pub const WAYS:              BitField = BitField::new(22, 10);

    // edx
    pub const WBINVD:            BitField = BitField::new(0, 1);
    pub const INCLUSIVE:         BitField = BitField::new(1, 1);
    pub const COMPLEX_INDEXING:  BitField = BitField::new(2, 1);
}

/// Cache type, a type of `Null` marks the end of the cache list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, EnumDisplay, EnumFromIndex, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheType {
    #[default]
    #[display("Null")]
    Null,
    #[display("Data")]
    Data,
    #[display("Instruction")]
    Instruction,
    #[display("Unified")]
    Unified,
    #[display("Reserved")]
    Reserved,
}

/// Description of a single cache, from one sub-leaf of a deterministic cache parameter leaf.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheTopologyEntry {
    /// Cache level, starting at 1.
    pub level:               u8,
    #[serde(rename = "type")]
    pub cache_type:          CacheType,
    /// Does not need software initialization.
    pub self_initializing:   bool,
    pub fully_associative:   bool,
    /// Maximum number of logical processors sharing this cache.
    pub sharing_threads:     u16,
    /// Maximum number of cores in the physical package, not reported by leaf 8000001Dh.
    pub cores_per_package:   Option<u16>,
    /// Coherency line size, in bytes.
    pub line_size:           u16,
    pub partitions:          u16,
    /// Number of ways of associativity.
    pub associativity:       u16,
    pub sets:                u64,
    /// `WBINVD`/`INVD` from any thread sharing this cache does not guarantee invalidation of lower level caches of other threads.
    pub wbinvd_not_inclusive: bool,
    /// Cache is inclusive of lower cache levels.
    pub inclusive:           bool,
    /// A complex function is used to index the cache.
    pub complex_indexing:    bool,
    /// Total size of the cache in bytes, saturating at `u64::MAX`.
    pub size:                u64,
}

impl fmt::Display for CacheTopologyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "L{} {} cache: {}", self.level, self.cache_type, FormatSize(self.size))?;

        let mut indenter = Indenter::new(f);
        writeln!(indenter, "Line size:         {} bytes", self.line_size)?;
        if self.fully_associative {
            writeln!(indenter, "Associativity:     fully associative")?;
        } else {
            writeln!(indenter, "Associativity:     {}-way", self.associativity)?;
        }
        writeln!(indenter, "Sets:              {}", self.sets)?;
        writeln!(indenter, "Partitions:        {}", self.partitions)?;
        write!  (indenter, "Sharing threads:   {}", self.sharing_threads)?;
        if let Some(cores) = self.cores_per_package {
            write!(indenter, "\nCores per package: {cores}")?;
        }
        if self.inclusive {
            write!(indenter, "\nInclusive")?;
        }
        Ok(())
    }
}

struct FormatSize(u64);

impl fmt::Display for FormatSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KIB: u64 = 1024;
        const MIB: u64 = 1024 * KIB;

        match self.0 {
            size if size >= MIB && size % MIB == 0 => write!(f, "{} MiB", size / MIB),
            size if size >= KIB && size % KIB == 0 => write!(f, "{} KiB", size / KIB),
            size => write!(f, "{size} bytes"),
        }
    }
}

fn decode_entry(raw: RawLeafResult, cores_per_package: bool) -> Option<CacheTopologyEntry> {
    use cache_field::*;

    let cache_type = CacheType::from_idx_or(CACHE_TYPE.extract(raw.eax) as usize, CacheType::Reserved);
    if cache_type == CacheType::Null {
        return None;
    }

    let line_size = LINE_SIZE.extract(raw.ebx) as u16 + 1;
    let partitions = PARTITIONS.extract(raw.ebx) as u16 + 1;
    let associativity = WAYS.extract(raw.ebx) as u16 + 1;
    let sets = raw.ecx as u64 + 1;
    let size = (associativity as u64 * partitions as u64 * line_size as u64).saturating_mul(sets);

    Some(CacheTopologyEntry {
        level: LEVEL.extract(raw.eax) as u8,
        cache_type,
        self_initializing: SELF_INITIALIZING.extract(raw.eax) != 0,
        fully_associative: FULLY_ASSOCIATIVE.extract(raw.eax) != 0,
        sharing_threads: SHARING_THREADS.extract(raw.eax) as u16 + 1,
        cores_per_package: cores_per_package.then(|| CORES_PER_PACKAGE.extract(raw.eax) as u16 + 1),
        line_size,
        partitions,
        associativity,
        sets,
        wbinvd_not_inclusive: WBINVD.extract(raw.edx) != 0,
        inclusive: INCLUSIVE.extract(raw.edx) != 0,
        complex_indexing: COMPLEX_INDEXING.extract(raw.edx) != 0,
        size,
    })
}

/// Decode one sub-leaf of leaf 4, returns `None` for the null entry ending the list.
pub fn decode_cache_entry(leaf4_sub: RawLeafResult) -> Option<CacheTopologyEntry> {
    decode_entry(leaf4_sub, true)
}

/// Decode one sub-leaf of leaf 8000001Dh, returns `None` for the null entry ending the list.
/// 
/// The layout matches leaf 4, except that the cores per package field is reserved.
pub fn decode_amd_cache_entry(leaf_8000_001d_sub: RawLeafResult) -> Option<CacheTopologyEntry> {
    decode_entry(leaf_8000_001d_sub, false)
}

#[cfg(test)]
mod test {
    use crate::RawLeafResult;
    use super::*;

    #[test]
    fn l1_data() {
        let entry = decode_cache_entry(RawLeafResult::new(0x1C00_4121, 0x01C0_003F, 0x0000_003F, 0)).expect("entry");
        assert_eq!(entry.level, 1);
        assert_eq!(entry.cache_type, CacheType::Data);
        assert!(entry.self_initializing);
        assert!(!entry.fully_associative);
        assert_eq!(entry.sharing_threads, 2);
        assert_eq!(entry.cores_per_package, Some(8));
        assert_eq!(entry.line_size, 64);
        assert_eq!(entry.partitions, 1);
        assert_eq!(entry.associativity, 8);
        assert_eq!(entry.sets, 64);
        assert_eq!(entry.size, 32 * 1024);
    }

    #[test]
    fn l3_unified() {
        // 16-way, 64-byte lines, 8192 sets, inclusive with complex indexing
        let entry = decode_cache_entry(RawLeafResult::new(0x1C03_C163, 0x03C0_003F, 0x0000_1FFF, 0x0000_0006)).expect("entry");
        assert_eq!(entry.level, 3);
        assert_eq!(entry.cache_type, CacheType::Unified);
        assert_eq!(entry.sharing_threads, 16);
        assert_eq!(entry.associativity, 16);
        assert_eq!(entry.sets, 8192);
        assert!(entry.inclusive);
        assert!(entry.complex_indexing);
        assert!(!entry.wbinvd_not_inclusive);
        assert_eq!(entry.size, 8 * 1024 * 1024);
        assert!(entry.to_string().starts_with("L3 Unified cache: 8 MiB"));
    }

    #[test]
    fn null_terminates() {
        assert_eq!(decode_cache_entry(RawLeafResult::new(0, 0x01C0_003F, 0x3F, 0)), None);
        assert_eq!(decode_amd_cache_entry(RawLeafResult::default()), None);
    }

    #[test]
    fn unknown_type_is_reserved() {
        let entry = decode_cache_entry(RawLeafResult::new(0x0000_0025, 0, 0, 0)).expect("entry");
        assert_eq!(entry.cache_type, CacheType::Reserved);
        assert_eq!(entry.level, 1);
    }

    #[test]
    fn amd_has_no_cores_per_package() {
        let entry = decode_amd_cache_entry(RawLeafResult::new(0xFC00_4122, 0x01C0_003F, 0x3F, 0)).expect("entry");
        assert_eq!(entry.cache_type, CacheType::Instruction);
        assert_eq!(entry.cores_per_package, None);
        assert_eq!(entry.sharing_threads, 2);
        assert_eq!(entry.size, 32 * 1024);
    }

    #[test]
    fn max_sets_do_not_overflow() {
        let entry = decode_cache_entry(RawLeafResult::new(0x21, u32::MAX, u32::MAX, 0)).expect("entry");
        assert_eq!(entry.sets, 1 << 32);
        assert_eq!(entry.line_size, 4096);
        assert_eq!(entry.partitions, 1024);
        assert_eq!(entry.associativity, 1024);
        assert_eq!(entry.size, u64::MAX);
    }
}
