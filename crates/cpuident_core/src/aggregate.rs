//! Assembly of the [`IdentificationRecord`] from all supported leaves.

use cpuident_logging::{log_debug, log_verbose};

use crate::{
    decode::*,
    invoke::leaf,
    walk::{walk_amd_cache_topology, walk_cache_topology},
    CpuidInvoker, HypervisorInfo, IdentificationRecord, RawLeafResult, LOG_CPUID_CAT,
};

/// Bit 31 of leaf 80000000h EAX is set when the value is a valid extended leaf.
const EXTENDED_LEAF_BASE: u32 = 0x8000_0000;

fn query<I: CpuidInvoker + ?Sized>(invoker: &I, leaf: u32, subleaf: u32) -> RawLeafResult {
    let raw = invoker.invoke(leaf, subleaf);
    log_debug!(LOG_CPUID_CAT, "cpuid({leaf:#X}, {subleaf}): {raw:X?}");
    raw
}

fn is_amd_like(record: &IdentificationRecord) -> bool {
    matches!(record.vendor, Manufacturer::AMD | Manufacturer::Hygon)
}

/// Cores per package on AMD and Hygon, where leaf 80000008h counts threads rather than cores.
fn count_amd_cores<I: CpuidInvoker + ?Sized>(invoker: &I, record: &IdentificationRecord) -> u32 {
    if record.max_extended_leaf < leaf::ADDRESS_SIZES {
        log_verbose!(LOG_CPUID_CAT, "Leaf 80000008h not supported, assuming a single core");
        return 1;
    }

    let threads = decode_amd_package_threads(query(invoker, leaf::ADDRESS_SIZES, 0));
    if record.ext_processor_features.contains(ExtProcessorFeatureFlags::TopoExt) &&
        record.max_extended_leaf >= leaf::AMD_PROCESSOR_TOPOLOGY
    {
        threads / decode_amd_threads_per_core(query(invoker, leaf::AMD_PROCESSOR_TOPOLOGY, 0))
    } else {
        threads
    }
}

/// Query all leaves the processor reports as supported and decode them.
/// 
/// Leaves beyond the reported maximum are never interpreted, the corresponding fields keep their default values.
pub fn aggregate<I: CpuidInvoker + ?Sized>(invoker: &I) -> IdentificationRecord {
    let mut record = IdentificationRecord::default();

    let leaf0 = query(invoker, leaf::VENDOR, 0);
    record.max_standard_leaf = leaf0.eax;
    record.vendor_id = decode_vendor(leaf0);
    record.vendor = Manufacturer::from_identity(&record.vendor_id);
    log_verbose!(LOG_CPUID_CAT, "Vendor \"{}\" ({}), highest standard leaf {:#X}", record.vendor_id.as_string().escape_debug(), record.vendor.short_name(), record.max_standard_leaf);

    let mut logical_cores = None;
    if record.max_standard_leaf >= leaf::VERSION_AND_FEATURES {
        let leaf1 = query(invoker, leaf::VERSION_AND_FEATURES, 0);
        record.stepping = decode_stepping(leaf1);
        record.additional = decode_additional_info(leaf1);
        record.features = decode_features(leaf1);
        logical_cores = Some(decode_logical_processors(leaf1));
    } else {
        log_verbose!(LOG_CPUID_CAT, "Leaf 1 not supported, no version info or feature flags");
    }

    if record.max_standard_leaf >= leaf::EXTENDED_FEATURES {
        let mut block = decode_extended_features(query(invoker, leaf::EXTENDED_FEATURES, 0));
        if block.max_subleaf >= 1 {
            block.flags1 = decode_extended_features_sub1(query(invoker, leaf::EXTENDED_FEATURES, 1));
        } else {
            log_verbose!(LOG_CPUID_CAT, "Leaf 7 sub-leaf 1 not supported");
        }
        record.extended_features = block;
    } else {
        log_verbose!(LOG_CPUID_CAT, "Leaf 7 not supported, no extended feature flags");
    }

    if record.max_standard_leaf >= leaf::CACHE_PARAMETERS {
        record.cache_info = walk_cache_topology(invoker);
    } else {
        log_verbose!(LOG_CPUID_CAT, "Leaf 4 not supported, no deterministic cache parameters");
    }

    let ext_max = query(invoker, leaf::EXTENDED_MAX, 0).eax;
    record.max_extended_leaf = if ext_max & EXTENDED_LEAF_BASE != 0 { ext_max } else { 0 };
    log_verbose!(LOG_CPUID_CAT, "Highest extended leaf {:#X}", record.max_extended_leaf);

    if record.max_extended_leaf >= leaf::EXTENDED_PROCESSOR_FEATURES {
        record.ext_processor_features = decode_ext_processor_features(query(invoker, leaf::EXTENDED_PROCESSOR_FEATURES, 0));
    }

    if record.max_extended_leaf >= leaf::BRAND_STRING[2] {
        let leaves = leaf::BRAND_STRING.map(|brand_leaf| query(invoker, brand_leaf, 0));
        record.brand = decode_brand(&leaves);
    } else {
        log_verbose!(LOG_CPUID_CAT, "Brand string leaves not supported");
    }

    if record.max_extended_leaf >= leaf::POWER_MANAGEMENT {
        record.power_management = decode_power_management(query(invoker, leaf::POWER_MANAGEMENT, 0));
    }

    if record.cache_info.is_empty() &&
        is_amd_like(&record) &&
        record.ext_processor_features.contains(ExtProcessorFeatureFlags::TopoExt) &&
        record.max_extended_leaf >= leaf::AMD_CACHE_TOPOLOGY
    {
        log_verbose!(LOG_CPUID_CAT, "Using leaf 8000001Dh for the cache topology");
        record.cache_info = walk_amd_cache_topology(invoker);
    }

    if let Some(logical_cores) = logical_cores {
        let physical_cores = if is_amd_like(&record) {
            count_amd_cores(invoker, &record)
        } else {
            record.cache_info.first().and_then(|entry| entry.cores_per_package).map_or(1, u32::from)
        };
        record.cores = CoreCounts::new(physical_cores, logical_cores);
        log_verbose!(LOG_CPUID_CAT, "Package has {}", record.cores);
    }

    if record.features.contains(FeatureFlags::Hypervisor) {
        let raw = query(invoker, leaf::HYPERVISOR, 0);
        let signature = VendorIdentity::from_registers([raw.ebx, raw.ecx, raw.edx]);
        record.hypervisor = Some(HypervisorInfo {
            signature,
            vendor: Manufacturer::from_identity(&signature),
            max_leaf: raw.eax,
        });
    }

    record
}
