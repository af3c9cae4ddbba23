use core::fmt::{self, Write};

use cpuident_base::{EnumCountT, EnumFromIndexT};
use cpuident_macros::{EnumCount, EnumDisplay, EnumFromIndex};
use static_assertions as sa;
use serde::Serialize;

use crate::{fmt::Indenter, RawLeafResult};
use super::BitField;

/// Fields of leaf 1 EAX.
pub mod version_field {
    use super::BitField;

    pub const STEPPING:        BitField = BitField::new(0, 4);
    pub const MODEL:           BitField = BitField::new(4, 4);
    pub const FAMILY:          BitField = BitField::new(8, 4);
    pub const PROCESSOR_TYPE:  BitField = BitField::new(12, 2);
    pub const EXTENDED_MODEL:  BitField = BitField::new(16, 4);
    pub const EXTENDED_FAMILY: BitField = BitField::new(20, 8);
}

/// Fields of leaf 1 EBX.
pub mod additional_field {
    use super::BitField;

    pub const BRAND_INDEX:         BitField = BitField::new(0, 8);
    pub const CLFLUSH_LINE_SIZE:   BitField = BitField::new(8, 8);
    pub const MAX_ADDRESSABLE_IDS: BitField = BitField::new(16, 8);
    pub const LOCAL_APIC_ID:       BitField = BitField::new(24, 8);
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, EnumCount, EnumDisplay, EnumFromIndex, Serialize)]
pub enum ProcessorType {
    #[default]
    #[display("Original OEM processor")]
    OEM,
    #[display("Intel OverDrive processor")]
    IntelOverdrive,
    #[display("Dual processor")]
    DualProcessor,
    #[display("Reserved")]
    Reserved,
}
sa::const_assert_eq!(ProcessorType::COUNT, 1 << version_field::PROCESSOR_TYPE.width);

/// Family, model and stepping, as reported by leaf 1.
/// 
/// `family` and `model` are the display values, the raw fields they are computed from are kept alongside them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SteppingInfo {
    /// Display family: `base_family + ext_family` when the base family is 0xF, `base_family` otherwise.
    pub family:         u16,
    /// Display model: `(ext_model << 4) + base_model` when the base family is 0x6 or 0xF, `base_model` otherwise.
    pub model:          u16,
    pub stepping_id:    u8,
    #[serde(rename = "type")]
    pub processor_type: ProcessorType,
    pub base_family:    u8,
    pub base_model:     u8,
    /// Raw extended family field, serialized as `extendedFamilyId`.
    #[serde(rename = "extendedFamilyId")]
    pub ext_family:     u8,
    /// Raw extended model field, serialized as `extendedModelId`.
    #[serde(rename = "extendedModelId")]
    pub ext_model:      u8,
}

impl fmt::Display for SteppingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Family info:")?;

        let mut indenter = Indenter::new(f);
        writeln!(indenter, "Family:         {:#X} (base {:#X}, extended {:#X})", self.family, self.base_family, self.ext_family)?;
        writeln!(indenter, "Model:          {:#X} (base {:#X}, extended {:#X})", self.model, self.base_model, self.ext_model)?;
        writeln!(indenter, "Processor type: {}", self.processor_type)?;
        write!  (indenter, "Stepping ID:    {}", self.stepping_id)
    }
}

/// Additional info from leaf 1 EBX.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFeatureInfo {
    /// Brand index
    pub brand_index:         u8,
    /// `CLFLUSH` line size, in quadwords (multiply by 8 for the size in bytes).
    /// 
    /// # Note
    /// 
    /// Only valid when the `clfsh` feature flag is set.
    pub clflush_line_size:   u8,
    /// Maximum number of addressable IDs for logical processors in this physical package.
    /// 
    /// The nearest power-of-2 integer that is not smaller than this value is the number of unique initial APIC IDs
    /// reserved for addressing different logical processors in a physical package.
    pub max_addressable_ids: u8,
    /// Initial local APIC ID of the logical processor that executed the query.
    pub local_apic_id:       u8,
}

/// Decode family, model and stepping from leaf 1.
pub fn decode_stepping(leaf1: RawLeafResult) -> SteppingInfo {
    use version_field::*;

    let base_family = FAMILY.extract(leaf1.eax) as u8;
    let base_model = MODEL.extract(leaf1.eax) as u8;
    let ext_family = EXTENDED_FAMILY.extract(leaf1.eax) as u8;
    let ext_model = EXTENDED_MODEL.extract(leaf1.eax) as u8;

    let family = if base_family == 0xF {
        base_family as u16 + ext_family as u16
    } else {
        base_family as u16
    };
    let model = if base_family == 0x6 || base_family == 0xF {
        ((ext_model as u16) << 4) + base_model as u16
    } else {
        base_model as u16
    };

    SteppingInfo {
        family,
        model,
        stepping_id: STEPPING.extract(leaf1.eax) as u8,
        processor_type: ProcessorType::from_idx_or(PROCESSOR_TYPE.extract(leaf1.eax) as usize, ProcessorType::Reserved),
        base_family,
        base_model,
        ext_family,
        ext_model,
    }
}

/// Decode the additional info from leaf 1.
pub fn decode_additional_info(leaf1: RawLeafResult) -> AdditionalFeatureInfo {
    use additional_field::*;

    AdditionalFeatureInfo {
        brand_index: BRAND_INDEX.extract(leaf1.ebx) as u8,
        clflush_line_size: CLFLUSH_LINE_SIZE.extract(leaf1.ebx) as u8,
        max_addressable_ids: MAX_ADDRESSABLE_IDS.extract(leaf1.ebx) as u8,
        local_apic_id: LOCAL_APIC_ID.extract(leaf1.ebx) as u8,
    }
}

#[cfg(test)]
mod test {
    use crate::RawLeafResult;
    use super::*;

    fn eax(stepping: u32, model: u32, family: u32, ty: u32, ext_model: u32, ext_family: u32) -> RawLeafResult {
        RawLeafResult::new(stepping | model << 4 | family << 8 | ty << 12 | ext_model << 16 | ext_family << 20, 0, 0, 0)
    }

    #[test]
    fn skylake_desktop() {
        // Family 6, model 0x5E, stepping 3
        let info = decode_stepping(RawLeafResult::new(0x0005_06E3, 0, 0, 0));
        assert_eq!(info.family, 6);
        assert_eq!(info.model, 0x5E);
        assert_eq!(info.stepping_id, 3);
        assert_eq!(info.processor_type, ProcessorType::OEM);
        assert_eq!(info.ext_model, 5);
        assert_eq!(info.base_model, 0xE);
    }

    #[test]
    fn zen_family() {
        // Family 0x17 (0xF + 0x8), model 0x71
        let info = decode_stepping(RawLeafResult::new(0x0087_0F10, 0, 0, 0));
        assert_eq!(info.family, 0x17);
        assert_eq!(info.model, 0x71);
        assert_eq!(info.stepping_id, 0);
    }

    #[test]
    fn family_law() {
        for family in 0..=0xF {
            for ext_family in [0, 1, 0x8, 0xFF] {
                let info = decode_stepping(eax(0, 0, family, 0, 0, ext_family));
                let expected = if family == 0xF { family + ext_family } else { family };
                assert_eq!(info.family as u32, expected, "family {family:#X} extended {ext_family:#X}");
            }
        }
    }

    #[test]
    fn model_law() {
        for family in 0..=0xF {
            for (model, ext_model) in [(0, 0), (0x3, 0x1), (0xF, 0xF), (0x5, 0x0)] {
                let info = decode_stepping(eax(0, model, family, 0, ext_model, 0));
                let expected = if family == 0x6 || family == 0xF { (ext_model << 4) + model } else { model };
                assert_eq!(info.model as u32, expected, "family {family:#X} model {model:#X} extended {ext_model:#X}");
            }
        }
    }

    #[test]
    fn processor_types() {
        assert_eq!(decode_stepping(eax(0, 0, 6, 1, 0, 0)).processor_type, ProcessorType::IntelOverdrive);
        assert_eq!(decode_stepping(eax(0, 0, 6, 2, 0, 0)).processor_type, ProcessorType::DualProcessor);
        assert_eq!(decode_stepping(eax(0, 0, 6, 3, 0, 0)).processor_type, ProcessorType::Reserved);
    }

    #[test]
    fn additional_info() {
        let info = decode_additional_info(RawLeafResult::new(0, 0x0A10_0800, 0, 0));
        assert_eq!(info, AdditionalFeatureInfo {
            brand_index: 0,
            clflush_line_size: 8,
            max_addressable_ids: 0x10,
            local_apic_id: 0x0A,
        });
    }
}
