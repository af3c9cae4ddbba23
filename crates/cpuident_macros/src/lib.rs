//! Procedural macros used throughout cpuident.
//! 
//! Generated code refers to traits in `cpuident_base`, so any crate using the derives needs to depend on it.

use proc_macro::TokenStream;

mod derive;
mod flags;

/// Turn an enum of flag bits into a transparent bit-set struct.
/// 
/// Variants without a discriminant take the next bit after the previous variant, variants with an integer discriminant use that value.
/// Each variant can be given a public name using `#[parse_name("name")]`, otherwise the variant's identifier is used.
/// The names end up in the generated `NAMED` table, which is used to iterate, look up and display the flags.
/// 
/// An explicit base type (`u8`, `u16`, `u32`, `u64`, or `u128`) can be passed as an argument, e.g. `#[flags(u32)]`,
/// otherwise the smallest type that fits all flags is used.
#[proc_macro_attribute]
pub fn flags(args: TokenStream, input: TokenStream) -> TokenStream {
    flags::flags(args.into(), input.into()).into()
}

/// Implement `cpuident_base::EnumCountT` for an enum.
#[proc_macro_derive(EnumCount)]
pub fn enum_count(item: TokenStream) -> TokenStream {
    derive::enum_count(item.into()).into()
}

/// Implement `cpuident_base::EnumFromIndexT` for a field-less enum with integer discriminants.
#[proc_macro_derive(EnumFromIndex)]
pub fn enum_from_index(item: TokenStream) -> TokenStream {
    derive::enum_from_index(item.into()).into()
}

/// Implement `core::fmt::Display` for a field-less enum, using `#[display("...")]` when present, or the variant name otherwise.
#[proc_macro_derive(EnumDisplay, attributes(display))]
pub fn enum_display(item: TokenStream) -> TokenStream {
    derive::enum_display(item.into()).into()
}
