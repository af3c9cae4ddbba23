use core::fmt::{self, Write};

use serde::Serialize;

use crate::{
    decode::*,
    fmt::{checkbox, Indenter},
};

/// Hypervisor signature, only present when the processor reports running under a hypervisor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HypervisorInfo {
    /// Raw signature from leaf 40000000h EBX, ECX, EDX.
    pub signature: VendorIdentity,
    pub vendor:    Manufacturer,
    /// Highest hypervisor leaf (leaf 40000000h EAX).
    pub max_leaf:  u32,
}

/// Everything the engine knows about the processor.
/// 
/// Fields for leaves the processor doesn't report keep their default (zero, empty, or `None`),
/// `max_standard_leaf` and `max_extended_leaf` tell which leaves were actually available.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationRecord {
    /// Vendor identification string of leaf 0.
    pub vendor_id:              VendorIdentity,
    /// Manufacturer matching `vendor_id`.
    pub vendor:                 Manufacturer,
    /// Processor brand string, empty when leaves 80000002h-80000004h are not reported.
    pub brand:                  String,
    #[serde(flatten)]
    pub stepping:               SteppingInfo,
    pub additional:             AdditionalFeatureInfo,
    /// Cores and logical processors per package, zero when leaf 1 is not reported.
    #[serde(flatten)]
    pub cores:                  CoreCounts,
    pub features:               FeatureFlags,
    pub extended_features:      ExtendedFeatureBlock,
    pub ext_processor_features: ExtProcessorFeatureFlags,
    pub power_management:       PowerManagementFlags,
    /// Caches, in the order the processor reports them.
    pub cache_info:             Vec<CacheTopologyEntry>,
    pub hypervisor:             Option<HypervisorInfo>,
    pub max_standard_leaf:      u32,
    /// Highest extended leaf, 0 if the processor doesn't report any extended leaves.
    pub max_extended_leaf:      u32,
}

impl IdentificationRecord {
    /// Look up a feature flag by name across all flag sets.
    /// 
    /// Returns `None` if no flag set knows a flag with the given name.
    pub fn has_feature(&self, name: &str) -> Option<bool> {
        self.features.get_named(name)
            .or_else(|| self.extended_features.get_named(name))
            .or_else(|| self.ext_processor_features.get_named(name))
            .or_else(|| self.power_management.get_named(name))
    }

    /// Iterate over the names of all set flags, across all flag sets.
    pub fn iter_features(&self) -> impl Iterator<Item = &'static str> {
        self.features.iter_set()
            .chain(self.extended_features.flags.iter_set())
            .chain(self.extended_features.flags1.iter_set())
            .chain(self.ext_processor_features.iter_set())
            .chain(self.power_management.iter_set())
    }

    /// Check if a processor is running under a hypervisor.
    pub fn is_virtualized(&self) -> bool {
        self.features.contains(FeatureFlags::Hypervisor)
    }

    /// Find the cache for a given level and type.
    pub fn cache(&self, level: u8, cache_type: CacheType) -> Option<&CacheTopologyEntry> {
        self.cache_info.iter().find(|entry| entry.level == level && entry.cache_type == cache_type)
    }
}

fn write_flags(f: &mut Indenter<'_, '_>, title: &str, named: impl Iterator<Item = (&'static str, bool)>) -> fmt::Result {
    writeln!(f, "{title}:")?;
    f.set_spaces(8);
    for (name, set) in named {
        writeln!(f, "{} {name}", checkbox(set))?;
    }
    f.set_spaces(4);
    Ok(())
}

impl fmt::Display for IdentificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPUID info:")?;

        let mut indenter = Indenter::new(f);
        writeln!(indenter, "Vendor ID:           \"{}\"", self.vendor_id.as_string().escape_debug())?;
        writeln!(indenter, "Manufacturer:        {}", self.vendor)?;
        if !self.brand.is_empty() {
            writeln!(indenter, "Brand:               {}", self.brand)?;
        }
        writeln!(indenter, "Highest leaf:        {:#X}", self.max_standard_leaf)?;
        writeln!(indenter, "Highest ext. leaf:   {:#X}", self.max_extended_leaf)?;
        writeln!(indenter, "{}", self.stepping)?;
        writeln!(indenter, "Brand index:         {}", self.additional.brand_index)?;
        writeln!(indenter, "CLFLUSH line size:   {} bytes", self.additional.clflush_line_size as u16 * 8)?;
        writeln!(indenter, "Max addressable IDs: {}", self.additional.max_addressable_ids)?;
        writeln!(indenter, "Local APIC ID:       {}", self.additional.local_apic_id)?;
        writeln!(indenter, "Cores:               {}", self.cores)?;

        if let Some(hypervisor) = &self.hypervisor {
            writeln!(indenter, "Hypervisor:          {} (\"{}\", highest leaf {:#X})", hypervisor.vendor, hypervisor.signature.as_string().escape_debug(), hypervisor.max_leaf)?;
        }

        write_flags(&mut indenter, "Features (CPUID(EAX=1))", self.features.iter_named())?;
        write_flags(&mut indenter, "Extended features (CPUID(EAX=7))", self.extended_features.iter_named())?;
        write_flags(&mut indenter, "Extended processor features (CPUID(EAX=80000001h))", self.ext_processor_features.iter_named())?;
        write_flags(&mut indenter, "Power management (CPUID(EAX=80000007h))", self.power_management.iter_named())?;

        if self.cache_info.is_empty() {
            write!(indenter, "Caches: none reported")
        } else {
            writeln!(indenter, "Caches:")?;
            indenter.set_spaces(8);
            for entry in &self.cache_info {
                writeln!(indenter, "{entry}")?;
            }
            Ok(())
        }
    }
}
