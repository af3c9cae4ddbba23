//! Execution of the `cpuid` instruction.
//! 
//! Everything that touches the hardware lives behind [`CpuidInvoker`], the rest of the crate only ever sees [`RawLeafResult`]s.
//! 
//! https://en.wikipedia.org/wiki/CPUID

use core::cell::RefCell;
use std::collections::HashMap;

use cfg_if::cfg_if;
use serde::Serialize;

use crate::UnsupportedPlatform;

/// Leaves queried by the aggregator.
pub mod leaf {
    /// Highest standard leaf and vendor identity (EAX=0).
    pub const VENDOR: u32 = 0x0000_0000;
    /// Version information and basic feature flags (EAX=1).
    pub const VERSION_AND_FEATURES: u32 = 0x0000_0001;
    /// Deterministic cache parameters (EAX=4), one sub-leaf per cache.
    pub const CACHE_PARAMETERS: u32 = 0x0000_0004;
    /// Structured extended feature flags (EAX=7).
    pub const EXTENDED_FEATURES: u32 = 0x0000_0007;
    /// Hypervisor signature and highest hypervisor leaf (EAX=40000000h).
    pub const HYPERVISOR: u32 = 0x4000_0000;
    /// Highest extended leaf (EAX=80000000h).
    pub const EXTENDED_MAX: u32 = 0x8000_0000;
    /// Extended processor info and feature flags (EAX=80000001h).
    pub const EXTENDED_PROCESSOR_FEATURES: u32 = 0x8000_0001;
    /// Processor brand string (EAX=80000002h-80000004h).
    pub const BRAND_STRING: [u32; 3] = [0x8000_0002, 0x8000_0003, 0x8000_0004];
    /// Advanced power management information (EAX=80000007h).
    pub const POWER_MANAGEMENT: u32 = 0x8000_0007;
    /// Address sizes, and the package thread count on AMD (EAX=80000008h).
    pub const ADDRESS_SIZES: u32 = 0x8000_0008;
    /// AMD cache topology (EAX=8000001Dh), same layout as [`CACHE_PARAMETERS`].
    pub const AMD_CACHE_TOPOLOGY: u32 = 0x8000_001D;
    /// AMD processor topology (EAX=8000001Eh).
    pub const AMD_PROCESSOR_TOPOLOGY: u32 = 0x8000_001E;
}

/// Verbatim register output of a single `cpuid` invocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct RawLeafResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl RawLeafResult {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }

    /// Check if all registers are zero, which is what most processors return for leaves they don't know.
    pub const fn is_zero(&self) -> bool {
        self.eax == 0 && self.ebx == 0 && self.ecx == 0 && self.edx == 0
    }
}

/// Something that can answer a `cpuid` query.
/// 
/// Invocation never fails, unsupported leaves return whatever the processor returns for them (usually zeros),
/// it's up to the caller to only interpret leaves the processor reports as supported.
pub trait CpuidInvoker {
    /// Execute `cpuid` with `EAX=leaf` and `ECX=subleaf`.
    fn invoke(&self, leaf: u32, subleaf: u32) -> RawLeafResult;
}

impl<I: CpuidInvoker + ?Sized> CpuidInvoker for &I {
    fn invoke(&self, leaf: u32, subleaf: u32) -> RawLeafResult {
        (**self).invoke(leaf, subleaf)
    }
}

cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        fn check_native_support() -> Result<(), UnsupportedPlatform> {
            Ok(())
        }

        #[inline]
        fn native_cpuid(leaf: u32, subleaf: u32) -> RawLeafResult {
            #[allow(unused_unsafe)]
            let res = unsafe { core::arch::x86_64::__cpuid_count(leaf, subleaf) };
            RawLeafResult::new(res.eax, res.ebx, res.ecx, res.edx)
        }
    } else if #[cfg(target_arch = "x86")] {
        fn check_native_support() -> Result<(), UnsupportedPlatform> {
            // Pre-Pentium processors (and some embedded ones) don't have the instruction at all
            if core::arch::x86::has_cpuid() {
                Ok(())
            } else {
                Err(UnsupportedPlatform::new("x86"))
            }
        }

        #[inline]
        fn native_cpuid(leaf: u32, subleaf: u32) -> RawLeafResult {
            #[allow(unused_unsafe)]
            let res = unsafe { core::arch::x86::__cpuid_count(leaf, subleaf) };
            RawLeafResult::new(res.eax, res.ebx, res.ecx, res.edx)
        }
    } else {
        fn check_native_support() -> Result<(), UnsupportedPlatform> {
            Err(UnsupportedPlatform::new(std::env::consts::ARCH))
        }

        // Unreachable in practice, `NativeInvoker::new` never succeeds on these architectures
        fn native_cpuid(_leaf: u32, _subleaf: u32) -> RawLeafResult {
            RawLeafResult::default()
        }
    }
}

/// Invoker executing the actual instruction on the logical processor the calling thread currently runs on.
#[derive(Clone, Copy, Debug)]
pub struct NativeInvoker {
    _private: (),
}

impl NativeInvoker {
    /// Create a native invoker, fails if the architecture the crate was compiled for doesn't have a `cpuid` instruction.
    pub fn new() -> Result<Self, UnsupportedPlatform> {
        check_native_support()?;
        Ok(Self { _private: () })
    }
}

impl CpuidInvoker for NativeInvoker {
    #[inline]
    fn invoke(&self, leaf: u32, subleaf: u32) -> RawLeafResult {
        native_cpuid(leaf, subleaf)
    }
}

/// Invoker answering from a fixed table, anything not in the table returns all zeros.
/// 
/// Used to replay captured register dumps and to feed synthetic processors to the engine.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TableInvoker {
    entries: HashMap<(u32, u32), RawLeafResult>,
}

impl TableInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style version of [`TableInvoker::insert`].
    pub fn with(mut self, leaf: u32, subleaf: u32, result: RawLeafResult) -> Self {
        self.insert(leaf, subleaf, result);
        self
    }

    /// Set the result for a leaf/sub-leaf pair, returning the previous one if there was any.
    pub fn insert(&mut self, leaf: u32, subleaf: u32, result: RawLeafResult) -> Option<RawLeafResult> {
        self.entries.insert((leaf, subleaf), result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CpuidInvoker for TableInvoker {
    fn invoke(&self, leaf: u32, subleaf: u32) -> RawLeafResult {
        self.entries.get(&(leaf, subleaf)).copied().unwrap_or_default()
    }
}

impl FromIterator<RawLeafRecord> for TableInvoker {
    fn from_iter<T: IntoIterator<Item = RawLeafRecord>>(iter: T) -> Self {
        let entries = iter.into_iter()
            .map(|record| ((record.leaf, record.subleaf), record.result))
            .collect();
        Self { entries }
    }
}

/// Invoker calling a closure.
#[derive(Clone, Copy, Debug)]
pub struct FnInvoker<F>(pub F);

impl<F: Fn(u32, u32) -> RawLeafResult> CpuidInvoker for FnInvoker<F> {
    fn invoke(&self, leaf: u32, subleaf: u32) -> RawLeafResult {
        (self.0)(leaf, subleaf)
    }
}

/// A single recorded invocation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct RawLeafRecord {
    pub leaf:    u32,
    pub subleaf: u32,
    pub result:  RawLeafResult,
}

/// Invoker wrapping another invoker and remembering every invocation, in order.
#[derive(Debug)]
pub struct RecordingInvoker<I> {
    inner:   I,
    records: RefCell<Vec<RawLeafRecord>>,
}

impl<I: CpuidInvoker> RecordingInvoker<I> {
    pub fn new(inner: I) -> Self {
        Self { inner, records: RefCell::new(Vec::new()) }
    }

    /// Get a copy of all invocations made so far.
    pub fn records(&self) -> Vec<RawLeafRecord> {
        self.records.borrow().clone()
    }

    /// Take the recorded invocations, leaving the record empty.
    pub fn take_records(&self) -> Vec<RawLeafRecord> {
        self.records.take()
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I: CpuidInvoker> CpuidInvoker for RecordingInvoker<I> {
    fn invoke(&self, leaf: u32, subleaf: u32) -> RawLeafResult {
        let result = self.inner.invoke(leaf, subleaf);
        self.records.borrow_mut().push(RawLeafRecord { leaf, subleaf, result });
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_invoker_defaults_to_zero() {
        let table = TableInvoker::new()
            .with(0, 0, RawLeafResult::new(1, 2, 3, 4))
            .with(4, 1, RawLeafResult::new(5, 6, 7, 8));

        assert_eq!(table.len(), 2);
        assert_eq!(table.invoke(0, 0), RawLeafResult::new(1, 2, 3, 4));
        assert_eq!(table.invoke(4, 1), RawLeafResult::new(5, 6, 7, 8));
        assert!(table.invoke(4, 0).is_zero());
        assert!(table.invoke(0x8000_0000, 0).is_zero());
    }

    #[test]
    fn recording_invoker_keeps_call_order() {
        let recorder = RecordingInvoker::new(FnInvoker(|leaf: u32, subleaf: u32| RawLeafResult::new(leaf, subleaf, 0, 0)));
        recorder.invoke(7, 0);
        recorder.invoke(4, 2);

        let records = recorder.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].leaf, records[0].subleaf), (7, 0));
        assert_eq!(records[1].result, RawLeafResult::new(4, 2, 0, 0));
        assert!(recorder.records().is_empty());

        // Replaying the records answers the same
        let replay: TableInvoker = records.into_iter().collect();
        assert_eq!(replay.invoke(4, 2), RawLeafResult::new(4, 2, 0, 0));
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn native_invoker_is_available_on_x86_64() {
        let invoker = NativeInvoker::new().expect("x86_64 always has cpuid");
        // Every x86_64 processor supports at least leaf 1
        assert!(invoker.invoke(leaf::VENDOR, 0).eax >= 1);
    }
}
