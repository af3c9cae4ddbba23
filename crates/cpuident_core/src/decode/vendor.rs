use core::fmt;

use serde::{Serialize, Serializer};

use crate::RawLeafResult;

/// The 12 byte vendor identification string, as reported by leaf 0 (or the hypervisor signature of leaf 40000000h).
/// 
/// The bytes are kept verbatim, no filtering or trimming is done.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VendorIdentity([u8; 12]);

impl VendorIdentity {
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Assemble the identity from 3 registers, in the order they make up the string.
    pub fn from_registers(regs: [u32; 3]) -> Self {
        let mut bytes = [0u8; 12];
        for (chunk, reg) in bytes.chunks_exact_mut(4).zip(regs) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Characters of the identity, each byte maps to the character with the same code point.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().map(|&byte| char::from(byte))
    }

    /// Identity as a string of exactly 12 characters.
    pub fn as_string(&self) -> String {
        self.chars().collect()
    }
}

impl fmt::Display for VendorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for c in self.chars() {
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for VendorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VendorIdentity({:?})", self.as_string())
    }
}

impl Serialize for VendorIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decode the vendor identity from leaf 0: EBX, EDX, ECX.
pub fn decode_vendor(leaf0: RawLeafResult) -> VendorIdentity {
    VendorIdentity::from_registers([leaf0.ebx, leaf0.edx, leaf0.ecx])
}

/// CPU manufacturer, or hypervisor vendor for identities read from the hypervisor leaf.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Manufacturer {
    /// AMD: "AuthenticAMD"
    AMD,
    /// Early engineering samples of the AMD K5: "AMDisbetter!"
    EarlyAMD,
    /// IDT WinChip/Centaur (including some VIA and Zhaoxin CPUs): "CentaurHauls"
    Centaur,
    /// Cyrix/early STMicroelectronics and IBM: "CyrixInstead"
    Cyrix,
    /// Intel: "GenuineIntel"
    Intel,
    /// Intel (rare): "GenuineIotel"
    Iotel,
    /// Transmeta: "TransmetaCPU" or "GenuineTMx86"
    Transmeta,
    /// National Semiconductor: "Geode by NSC"
    NationalSemiconductor,
    /// NexGen: "NexGenDriven"
    NexGen,
    /// Rise: "RiseRiseRise"
    Rise,
    /// SiS (Silicon Integrated Systems): "SiS SiS SiS "
    SIS,
    /// UMC (United Microelectronics Corporation): "UMC UMC UMC "
    UMC,
    /// VIA: "VIA VIA VIA "
    VIA,
    /// DM&P Vortex86: "Vortex86 SoC"
    Vortex86,
    /// Zhaoxin: "  Shanghai  "
    Zhaoxin,
    /// Hygon: "HygonGenuine"
    Hygon,
    /// RDC Semiconductor: "Genuine  RDC"
    RDC,
    /// MCST Elbrus: "E2K MACHINE\0"
    MCST,
    /// ao486 soft CPU: "MiSTer AO486" or "GenuineAO486"
    AO486,
    /// bhyve: "bhyve bhyve "
    Bhyve,
    /// KVM: "KVMKVMKVM\0\0\0"
    KVM,
    /// QEMU TCG: "TCGTCGTCGTCG"
    QEMU,
    /// Microsoft Hyper-V or Windows Virtual PC: "Microsoft Hv"
    HyperV,
    /// Microsoft x86-to-ARM: "MicrosoftXTA"
    MicrosoftXTA,
    /// Parallels: " lrpepyh  vr"
    Parallels,
    /// VMware: "VMwareVMware"
    VMware,
    /// Xen HVM: "XenVMMXenVMM"
    Xen,
    /// Project ACRN: "ACRNACRNACRN"
    ACRN,
    /// QNX hypervisor: " QNXQVMBSQG "
    QNX,
    /// Apple Rosetta 2: "VirtualApple"
    AppleRosetta,
    /// Any identity not in the list above.
    Unknown([u8; 12]),
}

const KNOWN_VENDORS: &[(&[u8; 12], Manufacturer)] = &[
    (b"AuthenticAMD", Manufacturer::AMD),
    (b"AMDisbetter!", Manufacturer::EarlyAMD),
    (b"CentaurHauls", Manufacturer::Centaur),
    (b"CyrixInstead", Manufacturer::Cyrix),
    (b"GenuineIntel", Manufacturer::Intel),
    (b"GenuineIotel", Manufacturer::Iotel),
    (b"TransmetaCPU", Manufacturer::Transmeta),
    (b"GenuineTMx86", Manufacturer::Transmeta),
    (b"Geode by NSC", Manufacturer::NationalSemiconductor),
    (b"NexGenDriven", Manufacturer::NexGen),
    (b"RiseRiseRise", Manufacturer::Rise),
    (b"SiS SiS SiS ", Manufacturer::SIS),
    (b"UMC UMC UMC ", Manufacturer::UMC),
    (b"VIA VIA VIA ", Manufacturer::VIA),
    (b"Vortex86 SoC", Manufacturer::Vortex86),
    (b"  Shanghai  ", Manufacturer::Zhaoxin),
    (b"HygonGenuine", Manufacturer::Hygon),
    (b"Genuine  RDC", Manufacturer::RDC),
    (b"E2K MACHINE\0", Manufacturer::MCST),
    (b"MiSTer AO486", Manufacturer::AO486),
    (b"GenuineAO486", Manufacturer::AO486),
    (b"bhyve bhyve ", Manufacturer::Bhyve),
    (b"KVMKVMKVM\0\0\0", Manufacturer::KVM),
    (b"TCGTCGTCGTCG", Manufacturer::QEMU),
    (b"Microsoft Hv", Manufacturer::HyperV),
    (b"MicrosoftXTA", Manufacturer::MicrosoftXTA),
    (b" lrpepyh  vr", Manufacturer::Parallels),
    (b"VMwareVMware", Manufacturer::VMware),
    (b"XenVMMXenVMM", Manufacturer::Xen),
    (b"ACRNACRNACRN", Manufacturer::ACRN),
    (b" QNXQVMBSQG ", Manufacturer::QNX),
    (b"VirtualApple", Manufacturer::AppleRosetta),
];

impl Manufacturer {
    /// Look up the manufacturer for a vendor identity.
    pub fn from_identity(identity: &VendorIdentity) -> Self {
        KNOWN_VENDORS.iter()
            .find(|(bytes, _)| *bytes == identity.as_bytes())
            .map_or(Manufacturer::Unknown(*identity.as_bytes()), |&(_, manufacturer)| manufacturer)
    }

    /// Short lowercase name of the manufacturer.
    pub const fn short_name(&self) -> &'static str {
        match self {
            Manufacturer::AMD | Manufacturer::EarlyAMD => "amd",
            Manufacturer::Centaur                      => "idt",
            Manufacturer::Cyrix                        => "cyrix",
            Manufacturer::Intel | Manufacturer::Iotel  => "intel",
            Manufacturer::Transmeta                    => "transmeta",
            Manufacturer::NationalSemiconductor        => "nsc",
            Manufacturer::NexGen                       => "nexgen",
            Manufacturer::Rise                         => "rise",
            Manufacturer::SIS                          => "sis",
            Manufacturer::UMC                          => "umc",
            Manufacturer::VIA                          => "via",
            Manufacturer::Vortex86                     => "vortex86",
            Manufacturer::Zhaoxin                      => "zhaoxin",
            Manufacturer::Hygon                        => "hygon",
            Manufacturer::RDC                          => "rdc",
            Manufacturer::MCST                         => "mcst",
            Manufacturer::AO486                        => "ao486",
            Manufacturer::Bhyve                        => "bhyve",
            Manufacturer::KVM                          => "kvm",
            Manufacturer::QEMU                         => "qemu",
            Manufacturer::HyperV                       => "hyperv",
            Manufacturer::MicrosoftXTA                 => "msxta",
            Manufacturer::Parallels                    => "parallels",
            Manufacturer::VMware                       => "vmware",
            Manufacturer::Xen                          => "xen",
            Manufacturer::ACRN                         => "acrn",
            Manufacturer::QNX                          => "qnx",
            Manufacturer::AppleRosetta                 => "rosetta",
            Manufacturer::Unknown(_)                   => "unknown",
        }
    }

    /// Check if this is the signature of a hypervisor instead of a hardware vendor.
    pub const fn is_hypervisor(&self) -> bool {
        matches!(self,
            Manufacturer::Bhyve |
            Manufacturer::KVM |
            Manufacturer::QEMU |
            Manufacturer::HyperV |
            Manufacturer::MicrosoftXTA |
            Manufacturer::Parallels |
            Manufacturer::VMware |
            Manufacturer::Xen |
            Manufacturer::ACRN |
            Manufacturer::QNX |
            Manufacturer::AppleRosetta
        )
    }
}

impl Default for Manufacturer {
    fn default() -> Self {
        Manufacturer::Unknown([0; 12])
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manufacturer::AMD                   => f.write_str("AMD"),
            Manufacturer::EarlyAMD              => f.write_str("AMD (early K5 engineering sample)"),
            Manufacturer::Centaur               => f.write_str("IDT WinChip/Centaur"),
            Manufacturer::Cyrix                 => f.write_str("Cyrix"),
            Manufacturer::Intel                 => f.write_str("Intel"),
            Manufacturer::Iotel                 => f.write_str("Intel (\"GenuineIotel\")"),
            Manufacturer::Transmeta             => f.write_str("Transmeta"),
            Manufacturer::NationalSemiconductor => f.write_str("National Semiconductor"),
            Manufacturer::NexGen                => f.write_str("NexGen"),
            Manufacturer::Rise                  => f.write_str("Rise"),
            Manufacturer::SIS                   => f.write_str("Silicon Integrated Systems"),
            Manufacturer::UMC                   => f.write_str("United Microelectronics Corporation"),
            Manufacturer::VIA                   => f.write_str("VIA Technologies"),
            Manufacturer::Vortex86              => f.write_str("DM&P Vortex86"),
            Manufacturer::Zhaoxin               => f.write_str("Zhaoxin"),
            Manufacturer::Hygon                 => f.write_str("Hygon"),
            Manufacturer::RDC                   => f.write_str("RDC Semiconductor"),
            Manufacturer::MCST                  => f.write_str("MCST Elbrus"),
            Manufacturer::AO486                 => f.write_str("ao486"),
            Manufacturer::Bhyve                 => f.write_str("bhyve"),
            Manufacturer::KVM                   => f.write_str("KVM (Kernel-based Virtual Machine)"),
            Manufacturer::QEMU                  => f.write_str("QEMU (Quick Emulator)"),
            Manufacturer::HyperV                => f.write_str("Microsoft Hyper-V"),
            Manufacturer::MicrosoftXTA          => f.write_str("Microsoft x86-to-ARM"),
            Manufacturer::Parallels             => f.write_str("Parallels"),
            Manufacturer::VMware                => f.write_str("VMware"),
            Manufacturer::Xen                   => f.write_str("Xen HVM"),
            Manufacturer::ACRN                  => f.write_str("Project ACRN"),
            Manufacturer::QNX                   => f.write_str("QNX hypervisor"),
            Manufacturer::AppleRosetta          => f.write_str("Apple Rosetta 2"),
            Manufacturer::Unknown(arr)          => {
                f.write_str("Unknown (")?;
                for (idx, byte) in arr.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                f.write_str(")")
            },
        }
    }
}

impl Serialize for Manufacturer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

#[cfg(test)]
mod test {
    use crate::RawLeafResult;
    use super::*;

    fn leaf0(vendor: &[u8; 12]) -> RawLeafResult {
        let reg = |idx: usize| u32::from_le_bytes([vendor[idx], vendor[idx + 1], vendor[idx + 2], vendor[idx + 3]]);
        RawLeafResult::new(0xD, reg(0), reg(8), reg(4))
    }

    #[test]
    fn genuine_intel() {
        let vendor = decode_vendor(RawLeafResult::new(0x16, 0x756E_6547, 0x6C65_746E, 0x4965_6E69));
        assert_eq!(vendor.as_string(), "GenuineIntel");
        assert_eq!(Manufacturer::from_identity(&vendor), Manufacturer::Intel);
        assert_eq!(Manufacturer::Intel.short_name(), "intel");
    }

    #[test]
    fn register_order() {
        let vendor = decode_vendor(leaf0(b"AuthenticAMD"));
        assert_eq!(vendor.to_string(), "AuthenticAMD");
        assert_eq!(Manufacturer::from_identity(&vendor).short_name(), "amd");
    }

    #[test]
    fn every_byte_is_one_char() {
        for byte in 0..=u8::MAX {
            let reg = u32::from_le_bytes([byte; 4]);
            let vendor = decode_vendor(RawLeafResult::new(0, reg, reg, reg));
            let s = vendor.as_string();
            assert_eq!(s.chars().count(), 12);
            assert!(s.chars().all(|c| c as u32 == byte as u32));
        }
    }

    #[test]
    fn bytes_are_not_filtered() {
        let vendor = decode_vendor(leaf0(b"KVMKVMKVM\0\0\0"));
        assert_eq!(vendor.as_string(), "KVMKVMKVM\0\0\0");
        assert_eq!(Manufacturer::from_identity(&vendor), Manufacturer::KVM);
        assert!(Manufacturer::KVM.is_hypervisor());
    }

    #[test]
    fn legacy_short_names() {
        let cases: [(&[u8; 12], &str); 10] = [
            (b"CentaurHauls", "idt"),
            (b"CyrixInstead", "cyrix"),
            (b"NexGenDriven", "nexgen"),
            (b"TransmetaCPU", "transmeta"),
            (b"GenuineTMx86", "transmeta"),
            (b"UMC UMC UMC ", "umc"),
            (b"RiseRiseRise", "rise"),
            (b"SiS SiS SiS ", "sis"),
            (b"Geode by NSC", "nsc"),
            (b"HygonGenuine", "hygon"),
        ];
        for (bytes, name) in cases {
            let vendor = decode_vendor(leaf0(bytes));
            assert_eq!(Manufacturer::from_identity(&vendor).short_name(), name);
        }
    }

    #[test]
    fn unknown_keeps_bytes() {
        let vendor = decode_vendor(leaf0(b"NotARealCPU!"));
        let manufacturer = Manufacturer::from_identity(&vendor);
        assert_eq!(manufacturer, Manufacturer::Unknown(*b"NotARealCPU!"));
        assert_eq!(manufacturer.short_name(), "unknown");
        assert!(manufacturer.to_string().starts_with("Unknown (4E,6F,"));
    }
}
