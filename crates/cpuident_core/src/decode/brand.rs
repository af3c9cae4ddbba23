use crate::RawLeafResult;

/// Decode the processor brand string from leaves 80000002h-80000004h.
/// 
/// The 48 bytes are read in register order EAX, EBX, ECX, EDX for each leaf, cut at the first NUL and trimmed.
pub fn decode_brand(leaves: &[RawLeafResult; 3]) -> String {
    let bytes = leaves.iter()
        .flat_map(|leaf| [leaf.eax, leaf.ebx, leaf.ecx, leaf.edx])
        .flat_map(u32::to_le_bytes)
        .take_while(|&byte| byte != 0)
        .collect::<Vec<_>>();

    String::from_utf8_lossy(&bytes).trim().to_string()
}

#[cfg(test)]
mod test {
    use crate::RawLeafResult;
    use super::decode_brand;

    fn leaves(brand: &str) -> [RawLeafResult; 3] {
        let mut bytes = [0u8; 48];
        bytes[..brand.len()].copy_from_slice(brand.as_bytes());

        let reg = |idx: usize| u32::from_le_bytes([bytes[idx], bytes[idx + 1], bytes[idx + 2], bytes[idx + 3]]);
        let leaf = |base: usize| RawLeafResult::new(reg(base), reg(base + 4), reg(base + 8), reg(base + 12));
        [leaf(0), leaf(16), leaf(32)]
    }

    #[test]
    fn intel_brand_with_padding() {
        let brand = decode_brand(&leaves("       Intel(R) Core(TM) i7-6700K CPU @ 4.00GHz"));
        assert_eq!(brand, "Intel(R) Core(TM) i7-6700K CPU @ 4.00GHz");
    }

    #[test]
    fn cut_at_nul() {
        let mut raw = leaves("AMD Ryzen 9 5950X 16-Core Processor");
        // Garbage after the terminator is not part of the brand
        raw[2].edx = 0x4141_4141;
        assert_eq!(decode_brand(&raw), "AMD Ryzen 9 5950X 16-Core Processor");
    }

    #[test]
    fn full_48_bytes() {
        let brand = "0123456789abcdef0123456789abcdef0123456789abcdef";
        assert_eq!(decode_brand(&leaves(brand)), brand);
    }

    #[test]
    fn empty() {
        assert_eq!(decode_brand(&[RawLeafResult::default(); 3]), "");
    }
}
