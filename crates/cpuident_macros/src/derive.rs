use proc_macro2::*;
use quote::quote;
use syn::*;

fn parse_enum(item: TokenStream) -> core::result::Result<(Ident, DataEnum), TokenStream> {
	let input_parsed = match syn::parse2::<DeriveInput>(item) {
	    Ok(derived_input) => derived_input,
	    Err(err) => return Err(err.to_compile_error()),
	};

	match input_parsed.data {
		Data::Enum(body) => Ok((input_parsed.ident, body)),
		_ => Err(quote!( compile_error!("Not an enum"); )),
	}
}

pub fn enum_count(item: TokenStream) -> TokenStream {
	let (ident, body_data) = match parse_enum(item) {
	    Ok(parsed) => parsed,
	    Err(err) => return err,
	};
    let count = body_data.variants.len();

    quote!{
        impl cpuident_base::EnumCountT for #ident {
            const COUNT: usize = #count;
        }
    }
}

pub fn enum_from_index(item: TokenStream) -> TokenStream {
	let (ident, body_data) = match parse_enum(item) {
	    Ok(parsed) => parsed,
	    Err(err) => return err,
	};

    let mut variants = Vec::with_capacity(body_data.variants.len());
    let mut indices = Vec::with_capacity(body_data.variants.len());
    let mut i = 0;
    for variant in body_data.variants { 
        let idx = match variant.discriminant {
            Some((_, Expr::Lit(ExprLit { lit: Lit::Int(int), .. }))) => match int.base10_parse::<usize>() {
                Ok(int) => int,
                Err(err) => {
                    let msg = err.to_string();
                    return quote!(compile_error!(#msg));
                },
            },
            Some(_) => return quote!(compile_error!("Only integer descriminants are supported by EnumFromIndex")),
            None => i,
        };
        
        variants.push(variant.ident);
        indices.push(idx);

        i = idx + 1;
    }

    quote!{
        impl cpuident_base::EnumFromIndexT for #ident {
            fn from_idx(idx: usize) -> Option<Self> {
                match idx {
                    #(#indices => Some(Self::#variants),)*
                    _ => None,
                }
            }
            
            fn from_idx_or(idx: usize, default: Self) -> Self {
                match idx {
                    #(#indices => Self::#variants,)*
                    _ => default,
                }
            }
        }
    }
}

pub fn enum_display(item: TokenStream) -> TokenStream {
	let (ident, body_data) = match parse_enum(item) {
	    Ok(parsed) => parsed,
	    Err(err) => return err,
	};

    let mut members = Vec::with_capacity(body_data.variants.len());
    let mut names = Vec::with_capacity(body_data.variants.len());

    for variant in &body_data.variants {
        members.push(variant.ident.clone());
        let val = variant.attrs.iter()
        .filter(|attr| attr.path().is_ident("display"))
        .map(|attr| attr.parse_args::<LitStr>().map_or_else(|err| err.to_compile_error(), |parsed| {
            let val = parsed.value();
            quote!(#val)
        }))
        .nth(0)
        .unwrap_or_else(|| {
            let val = variant.ident.to_string();
            quote!(#val)
        });
        names.push(val);
    }

    quote!{
        impl core::fmt::Display for #ident {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    #(#ident::#members => f.write_str(#names),)*
                }
            }
        }
    }
}
