//! Sub-leaf iteration over the deterministic cache parameter leaves.

use cpuident_logging::{log_debug, log_warning, LogCategory};

use crate::{
    decode::{decode_amd_cache_entry, decode_cache_entry, CacheTopologyEntry},
    invoke::leaf,
    CpuidInvoker, RawLeafResult,
};

const LOG_CAT: LogCategory = LogCategory::new_with_sub("Cpuid", "Topology");

/// Maximum number of sub-leaves queried before the walk is stopped, even if no null entry was found.
pub const MAX_CACHE_SUBLEAVES: u32 = 32;

fn walk<I, F>(invoker: &I, leaf: u32, decode: F) -> Vec<CacheTopologyEntry>
where
    I: CpuidInvoker + ?Sized,
    F: Fn(RawLeafResult) -> Option<CacheTopologyEntry>,
{
    let mut entries = Vec::new();
    for subleaf in 0..MAX_CACHE_SUBLEAVES {
        let raw = invoker.invoke(leaf, subleaf);
        log_debug!(LOG_CAT, "cpuid({leaf:#X}, {subleaf}): {raw:X?}");

        match decode(raw) {
            Some(entry) => entries.push(entry),
            None => return entries,
        }
    }

    log_warning!(LOG_CAT, "cpuid({leaf:#X}) did not report the end of the cache list within {MAX_CACHE_SUBLEAVES} sub-leaves, ignoring the remaining sub-leaves");
    entries
}

/// Collect the caches reported by leaf 4, in sub-leaf order.
pub fn walk_cache_topology<I: CpuidInvoker + ?Sized>(invoker: &I) -> Vec<CacheTopologyEntry> {
    walk(invoker, leaf::CACHE_PARAMETERS, decode_cache_entry)
}

/// Collect the caches reported by leaf 8000001Dh, in sub-leaf order.
pub fn walk_amd_cache_topology<I: CpuidInvoker + ?Sized>(invoker: &I) -> Vec<CacheTopologyEntry> {
    walk(invoker, leaf::AMD_CACHE_TOPOLOGY, decode_amd_cache_entry)
}

#[cfg(test)]
mod test {
    use crate::{decode::CacheType, invoke::leaf, FnInvoker, RawLeafResult, RecordingInvoker, TableInvoker};
    use super::*;

    const L1D: RawLeafResult = RawLeafResult::new(0x1C00_4121, 0x01C0_003F, 0x3F, 0);
    const L1I: RawLeafResult = RawLeafResult::new(0x1C00_4122, 0x01C0_003F, 0x3F, 0);
    const L2: RawLeafResult = RawLeafResult::new(0x1C00_4143, 0x00C0_003F, 0x3FF, 0);

    #[test]
    fn stops_at_sentinel() {
        let invoker = TableInvoker::new()
            .with(leaf::CACHE_PARAMETERS, 0, L1D)
            .with(leaf::CACHE_PARAMETERS, 1, L1I)
            .with(leaf::CACHE_PARAMETERS, 2, L2)
            // Past the sentinel, must never be read
            .with(leaf::CACHE_PARAMETERS, 4, L2);

        let recording = RecordingInvoker::new(invoker);
        let entries = walk_cache_topology(&recording);
        assert_eq!(entries.iter().map(|entry| (entry.level, entry.cache_type)).collect::<Vec<_>>(), [
            (1, CacheType::Data),
            (1, CacheType::Instruction),
            (2, CacheType::Unified),
        ]);
        assert_eq!(recording.records().iter().map(|rec| rec.subleaf).collect::<Vec<_>>(), [0, 1, 2, 3]);
    }

    #[test]
    fn single_entry() {
        let invoker = TableInvoker::new().with(leaf::CACHE_PARAMETERS, 0, L1D);
        assert_eq!(walk_cache_topology(&invoker).len(), 1);
    }

    #[test]
    fn empty_on_immediate_sentinel() {
        assert!(walk_cache_topology(&TableInvoker::new()).is_empty());
        assert!(walk_amd_cache_topology(&TableInvoker::new()).is_empty());
    }

    #[test]
    fn capped_without_sentinel() {
        let recording = RecordingInvoker::new(FnInvoker(|_: u32, _: u32| L2));
        let entries = walk_cache_topology(&recording);
        assert_eq!(entries.len(), MAX_CACHE_SUBLEAVES as usize);
        assert_eq!(recording.records().len(), MAX_CACHE_SUBLEAVES as usize);
    }

    #[test]
    fn amd_leaf() {
        let recording = RecordingInvoker::new(TableInvoker::new().with(leaf::AMD_CACHE_TOPOLOGY, 0, L1D));
        let entries = walk_amd_cache_topology(&recording);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cores_per_package, None);
        assert!(recording.records().iter().all(|rec| rec.leaf == leaf::AMD_CACHE_TOPOLOGY));
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn cap_warning_reaches_default_logger() {
        let buffer = SharedBuffer::default();
        let Ok(writer) = cpuident_logging::get_logger().add_writer(Box::new(buffer.clone())) else {
            panic!("no free writer slot");
        };

        let entries = walk_amd_cache_topology(&FnInvoker(|_: u32, _: u32| L1D));
        cpuident_logging::get_logger().remove_writer(writer);

        assert_eq!(entries.len(), MAX_CACHE_SUBLEAVES as usize);
        let contents = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
        assert!(contents.contains("did not report the end of the cache list"), "log: {contents:?}");
    }
}
