//! Processor identification through the `cpuid` instruction.
//! 
//! The engine is split in layers:
//! - [`invoke`]: executes the instruction, or replays/synthesizes register values.
//! - [`decode`]: turns raw registers into typed values, one decoder per leaf.
//! - [`walk`]: iterates the sub-leaves of the cache topology leaves.
//! - [`aggregate`]: queries every supported leaf and assembles an [`IdentificationRecord`].
//! 
//! Most users only need [`get_identification`].

use cpuident_logging::LogCategory;
use static_assertions as sa;

mod error;
mod record;

pub mod aggregate;
pub mod decode;
pub mod fmt;
pub mod invoke;
pub mod walk;

pub use error::*;
pub use record::*;
pub use invoke::{CpuidInvoker, FnInvoker, NativeInvoker, RawLeafRecord, RawLeafResult, RecordingInvoker, TableInvoker};
pub use aggregate::aggregate;

pub const LOG_CPUID_CAT: LogCategory = LogCategory::new("Cpuid");

sa::assert_eq_size!(RawLeafResult, [u32; 4]);
sa::assert_impl_all!(IdentificationRecord: Send, Sync, Clone, Eq);
sa::assert_impl_all!(NativeInvoker: Send, Sync, Copy);

/// Identify the processor the calling thread is currently running on.
/// 
/// Every call executes the instruction again, nothing is cached.
/// Fails only when the crate was compiled for an architecture without a `cpuid` instruction.
pub fn get_identification() -> Result<IdentificationRecord, UnsupportedPlatform> {
    let invoker = NativeInvoker::new()?;
    Ok(aggregate(&invoker))
}

/// Identify the processor described by any invoker, e.g. a captured register dump.
pub fn identify_with<I: CpuidInvoker + ?Sized>(invoker: &I) -> IdentificationRecord {
    aggregate(invoker)
}

#[cfg(test)]
mod test {
    use super::*;

    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    #[test]
    fn identify_host() {
        let record = get_identification().expect("cpuid is available on x86");
        assert!(record.max_standard_leaf >= 1);
        assert_eq!(record.vendor_id.as_string().chars().count(), 12);
        // Every x86-64 processor has SSE2
        #[cfg(target_arch = "x86_64")]
        assert!(record.features.contains(decode::FeatureFlags::SSE2));

        // Replaying the captured leaves gives the same record
        let recording = RecordingInvoker::new(NativeInvoker::new().expect("native invoker"));
        let first = identify_with(&recording);
        let replay = recording.take_records().into_iter().collect::<TableInvoker>();
        let second = identify_with(&replay);
        assert_eq!(first.vendor_id, second.vendor_id);
        assert_eq!(first.features, second.features);
        assert_eq!(first.cache_info, second.cache_info);
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    #[test]
    fn identify_from_many_threads() {
        let reference = get_identification().expect("cpuid is available on x86");

        let records = std::thread::scope(|scope| {
            let handles = (0..8).map(|_| scope.spawn(get_identification)).collect::<Vec<_>>();
            handles.into_iter().map(|handle| handle.join().expect("thread panicked")).collect::<Vec<_>>()
        });

        // Threads can land on different logical processors, only per-package values are compared
        for record in records {
            let record = record.expect("cpuid is available on x86");
            assert_eq!(record.vendor_id, reference.vendor_id);
            assert_eq!(record.brand, reference.brand);
            assert_eq!(record.stepping, reference.stepping);
            assert_eq!(record.features, reference.features);
            assert_eq!(record.max_standard_leaf, reference.max_standard_leaf);
            assert_eq!(record.cache_info.len(), reference.cache_info.len());
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
    #[test]
    fn unsupported_platform() {
        let err = get_identification().expect_err("no cpuid on this architecture");
        assert_eq!(err.arch(), std::env::consts::ARCH);
    }
}
