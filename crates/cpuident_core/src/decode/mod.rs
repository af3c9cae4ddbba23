//! Decoding of raw leaf registers into typed values.
//! 
//! All decoders are pure functions of their [`RawLeafResult`](crate::RawLeafResult) input, so they can be exercised without the hardware.
//! Multi-bit fields are described by [`BitField`]s, flag registers by `#[flags]` tables.

mod brand;
mod cache;
mod cores;
mod features;
mod vendor;
mod version;

pub use brand::*;
pub use cache::*;
pub use cores::*;
pub use features::*;
pub use vendor::*;
pub use version::*;

/// Location of a multi-bit field inside a 32-bit register.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BitField {
    pub offset: u32,
    pub width:  u32,
}

impl BitField {
    pub const fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    /// Mask of the field, after shifting it down to bit 0.
    pub const fn mask(&self) -> u32 {
        ((1u64 << self.width) - 1) as u32
    }

    /// Extract the field from a register value.
    pub const fn extract(&self, reg: u32) -> u32 {
        (reg >> self.offset) & self.mask()
    }
}

#[cfg(test)]
mod test {
    use super::BitField;

    #[test]
    fn bit_field_extract() {
        assert_eq!(BitField::new(0, 4).extract(0xABCD_1234), 0x4);
        assert_eq!(BitField::new(8, 4).extract(0xABCD_1234), 0x2);
        assert_eq!(BitField::new(20, 8).extract(0xABCD_1234), 0xBC);
        assert_eq!(BitField::new(0, 32).extract(0xABCD_1234), 0xABCD_1234);
        assert_eq!(BitField::new(31, 1).extract(0x8000_0000), 1);
    }
}
