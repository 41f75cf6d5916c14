extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemStruct};

/// Registers a `Processor` implementation in the global processor registry at program start.
#[proc_macro_attribute]
pub fn register_processor(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let struct_name = &input.ident;

    // Convert struct name to snake_case
    let fn_name_str = heck::ToSnakeCase::to_snake_case(struct_name.to_string().as_str());
    let fn_name = syn::Ident::new(
        &format!("register_processor_{}", fn_name_str),
        struct_name.span(),
    );

    let expanded = quote! {
        #input

        #[ctor::ctor]
        fn #fn_name() {
            crate::processors::processor::ProcessorRegistry::register_processor::<#struct_name>();
        }
    };

    TokenStream::from(expanded)
}
