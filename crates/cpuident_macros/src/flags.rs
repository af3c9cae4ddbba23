use proc_macro2::*;
use quote::quote;
use syn::{parse::Parser, punctuated::Punctuated, *};

const BASE_TYPES: [(&str, u128); 5] = [
	("u8", u8::MAX as u128),
	("u16", u16::MAX as u128),
	("u32", u32::MAX as u128),
	("u64", u64::MAX as u128),
	("u128", u128::MAX),
];

pub fn flags(args: TokenStream, input: TokenStream) -> TokenStream {
	// While we don't exactly are deriving, the `#[flags]` macro is close enough
	let input_parsed = match syn::parse2::<DeriveInput>(input) {
	    Ok(derived_input) => derived_input,
	    Err(err) => return err.to_compile_error(),
	};

	let vis = input_parsed.vis;
	let flag_name = input_parsed.ident;
	let enum_attrs = input_parsed.attrs;

	// Extract the body
	let body_data = match input_parsed.data {
		Data::Enum(body) => body,
		_ => return quote!( compile_error!("Not an enum"); )
	};

	let mut idents = Vec::<Ident>::new();
	let mut vals = Vec::<u128>::new();
	let mut attrs = Vec::<Vec<Attribute>>::new();
	let mut parse_names = Vec::<String>::new();
	let mut next : u128 = 1;

	// Extract each variant and the data needed
	for variant in body_data.variants {
		let ident_name = variant.ident.to_string();

		// Extract the parse_name attribute, all other attributes are forwarded to the generated constant
		let mut parse_name = None;
		let mut elem_attrs = Vec::new();
		for attr in variant.attrs {
			if attr.path().is_ident("parse_name") {
				if parse_name.is_some() {
					let error_msg = format!("Duplicate `parse_name` for member '{}'", ident_name);
					return quote!(compile_error!(#error_msg););
				}

				match attr.parse_args::<LitStr>() {
				    Ok(lit) => parse_name = Some(lit.value()),
				    Err(_) => {
						let error_msg = format!("Expected a string literal as a `parse_name` for member '{}'", ident_name);
						return quote!(compile_error!(#error_msg););
					},
				}
				continue;
			}
			elem_attrs.push(attr);
		}

		let val = match variant.discriminant {
			Some((_, Expr::Lit(ExprLit{ lit: Lit::Int(int), .. }))) => match int.base10_parse::<u128>() {
				Ok(0) => {
					let error_msg = format!("Member '{}' has no bits set, use the generated `None` instead", ident_name);
					return quote!(compile_error!(#error_msg););
				},
				Ok(val) => val,
				Err(err) => return err.to_compile_error(),
			},
			Some(_) => return quote!( compile_error!("Only integer literals are supported as flag values"); ),
			None => {
				if next == 0 || !next.is_power_of_two() {
					return quote!( compile_error!("Previous enum value needs to be a power of 2"); );
				}
				next
			},
		};

		// A single bit value continues the sequence, a multi-bit value is a mask and keeps the counter at its highest bit
		next = if val.leading_zeros() == 0 { 0 } else { 1u128 << (128 - val.leading_zeros()) };

		idents.push(variant.ident);
		vals.push(val);
		attrs.push(elem_attrs);
		parse_names.push(parse_name.unwrap_or(ident_name));
	}

	let max_val = vals.iter().fold(0u128, |acc, val| acc | val);

	let args = match Punctuated::<Ident, Token![,]>::parse_terminated.parse2(args) {
		Ok(list) => list,
		Err(err) => return err.to_compile_error(),
	};

	let mut base_type = None;
	for arg in args {
		match BASE_TYPES.iter().find(|(name, _)| arg == name) {
			Some(ty) => base_type = Some(*ty),
			None => {
				let error_msg = format!("Unknown `flags` argument '{}'", arg);
				return quote!(compile_error!(#error_msg););
			},
		}
	}

	let (base_type_name, base_type_max) = match base_type {
	    Some(ty) => ty,
	    None => match BASE_TYPES.iter().find(|(_, max)| max_val <= *max) {
	        Some(ty) => *ty,
	        None => BASE_TYPES[4],
	    },
	};
	if max_val > base_type_max {
		let error_msg = format!("Flag values do not fit in '{}'", base_type_name);
		return quote!(compile_error!(#error_msg););
	}

	let base_type = Ident::new(base_type_name, Span::call_site());
	let lits = vals.iter()
		.map(|val| LitInt::new(&format!("{val}{base_type_name}"), Span::call_site()))
		.collect::<Vec<_>>();

	// Write out the new structure
	quote!(
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
		#(#enum_attrs)*
		#[repr(transparent)]
		#vis struct #flag_name {
			bits : #base_type
		}

		#[allow(non_upper_case_globals)]
		impl #flag_name {
			/// Value representing that no flag is set.
			#vis const None : #flag_name = #flag_name { bits: 0 };

			#(#(#attrs)* #vis const #idents : #flag_name = #flag_name { bits: #lits };)*

			/// Every flag with its name, in declaration order.
			#vis const NAMED : &'static [(&'static str, #flag_name)] = &[#((#parse_names, #flag_name::#idents),)*];

			/// Create flags instance with no flag set.
			#vis const fn none() -> Self {
				Self { bits: 0 }
			}

			/// Create flags instance with all valid flags set.
			#vis const fn all() -> Self {
				Self { bits: 0 #( | #lits)* }
			}

			/// Create flags from raw bits, dropping any bit that doesn't belong to a flag.
			#vis const fn from_bits_truncate(bits: #base_type) -> Self {
				Self { bits: bits & Self::all().bits }
			}

			/// Get the flags' bits
			#vis const fn bits(&self) -> #base_type {
				self.bits
			}

			/// Check if a given flag(s) is/are set (if multiple flags are checked, all flags need to be set).
			#vis const fn contains(&self, flag: #flag_name) -> bool {
				self.bits & flag.bits == flag.bits
			}

			/// Check if any of the given flags are set.
			#vis const fn intersects(&self, flag: #flag_name) -> bool {
				self.bits & flag.bits != 0
			}

			/// Check if no flag is set.
			#vis const fn is_none(&self) -> bool {
				self.bits == 0
			}

			/// Check if any flag is set.
			#vis const fn is_any(&self) -> bool {
				self.bits != 0
			}

			/// Check if all valid flags are set.
			#vis const fn is_all(&self) -> bool {
				self.bits == Self::all().bits
			}

			/// Set the state of a given flag to `set`.
			#vis fn set(&mut self, flag: #flag_name, set: bool) {
				if set {
					self.bits |= flag.bits;
				} else {
					self.bits &= !flag.bits;
				}
			}

			/// Enable a given flag.
			#vis fn enable(&mut self, flag: #flag_name) {
				self.bits |= flag.bits;
			}

			/// Disable a given flag.
			#vis fn disable(&mut self, flag: #flag_name) {
				self.bits &= !flag.bits;
			}

			/// Iterate over every named flag, together with whether it is set.
			#vis fn iter_named(self) -> impl Iterator<Item = (&'static str, bool)> {
				Self::NAMED.iter().map(move |&(name, flag)| (name, self.contains(flag)))
			}

			/// Iterate over the names of all set flags.
			#vis fn iter_set(self) -> impl Iterator<Item = &'static str> {
				Self::NAMED.iter().filter(move |&&(_, flag)| self.contains(flag)).map(|&(name, _)| name)
			}

			/// Look up a flag by name, returns `None` if no flag has the given name.
			#vis fn get_named(&self, name: &str) -> Option<bool> {
				Self::NAMED.iter().find(|(flag_name, _)| *flag_name == name).map(|&(_, flag)| self.contains(flag))
			}
		}

		impl ::core::ops::Not for #flag_name {
			type Output = Self;
			fn not(self) -> Self {
				Self { bits: !self.bits }
			}
		}

		impl ::core::ops::BitAnd for #flag_name {
			type Output = Self;
			fn bitand(self, rhs: Self) -> Self {
				Self { bits: self.bits & rhs.bits }
			}
		}

		impl ::core::ops::BitAndAssign for #flag_name {
			fn bitand_assign(&mut self, rhs: Self) {
				self.bits &= rhs.bits;
			}
		}

		impl ::core::ops::BitOr for #flag_name {
			type Output = Self;
			fn bitor(self, rhs: Self) -> Self {
				Self { bits: self.bits | rhs.bits }
			}
		}

		impl ::core::ops::BitOrAssign for #flag_name {
			fn bitor_assign(&mut self, rhs: Self) {
				self.bits |= rhs.bits;
			}
		}

		impl ::core::ops::BitXor for #flag_name {
			type Output = Self;
			fn bitxor(self, rhs: Self) -> Self {
				Self { bits: self.bits ^ rhs.bits }
			}
		}

		impl ::core::ops::BitXorAssign for #flag_name {
			fn bitxor_assign(&mut self, rhs: Self) {
				self.bits ^= rhs.bits;
			}
		}

		impl From<#base_type> for #flag_name {
			fn from(bits: #base_type) -> Self {
				#flag_name { bits }
			}
		}

		impl From<#flag_name> for #base_type {
			fn from(val: #flag_name) -> #base_type {
				val.bits
			}
		}

		impl Default for #flag_name {
			fn default() -> #flag_name {
				#flag_name::none()
			}
		}

		impl ::core::fmt::Debug for #flag_name {
			fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
				if self.is_none() {
					if f.alternate() {
						f.write_str(concat!(stringify!(#flag_name), "::"))?;
					}
					return f.write_str("None");
				}

				let mut flags = *self;
				let mut started = false;
				#(
					if flags.contains(#flag_name::#idents) {
						if started {
							f.write_str(" | ")?;
						}
						if f.alternate() {
							f.write_str(concat!(stringify!(#flag_name), "::"))?;
						}
						f.write_str(stringify!(#idents))?;
						flags &= !#flag_name::#idents;
						started = true;
					}
				)*

				if flags.is_any() {
					if started {
						f.write_str(" | ")?;
					}
					write!(f, "{:#x}", flags.bits)?;
				}

				Ok(())
			}
		}

		/// Space separated names of all set flags
		impl ::core::fmt::Display for #flag_name {
			fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
				let mut started = false;
				for name in self.iter_set() {
					if started {
						f.write_str(" ")?;
					}
					f.write_str(name)?;
					started = true;
				}
				Ok(())
			}
		}
	)
}
