//! Provides derive macros for `form::HasDependencies`.
use quote::{format_ident, quote};
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, FieldsNamed};

fn struct_body(fields: &FieldsNamed) -> syn::Result<proc_macro2::TokenStream> {
    let mut merges = vec![];
    for field in fields.named.iter() {
        // UNWRAP: safe because these are named fields
        let ident = field.ident.clone().unwrap();
        merges.push(quote! {
            .merge(form::HasDependencies::dependencies(&self.#ident))
        });
    }
    Ok(quote! {
        form::Dependencies::default()
            #(#merges)*
    })
}

fn enum_body(data: &DataEnum) -> syn::Result<proc_macro2::TokenStream> {
    let mut arms = vec![];
    for variant in data.variants.iter() {
        let ident = &variant.ident;
        match &variant.fields {
            Fields::Unit => arms.push(quote! {
                Self::#ident => form::Dependencies::default(),
            }),
            Fields::Unnamed(unnamed) => {
                let mut binds = vec![];
                let mut merges = vec![];
                for i in 0..unnamed.unnamed.len() {
                    let bind = format_ident!("field_{i}");
                    merges.push(quote! {
                        .merge(form::HasDependencies::dependencies(#bind))
                    });
                    binds.push(quote! { #bind });
                }
                arms.push(quote! {
                    Self::#ident(#(#binds),*) => form::Dependencies::default()#(#merges)*,
                });
            }
            Fields::Named(named) => {
                let mut binds = vec![];
                let mut merges = vec![];
                for field in named.named.iter() {
                    // UNWRAP: safe because these are named fields
                    let bind = field.ident.clone().unwrap();
                    merges.push(quote! {
                        .merge(form::HasDependencies::dependencies(#bind))
                    });
                    binds.push(quote! { #bind });
                }
                arms.push(quote! {
                    Self::#ident { #(#binds),* } => form::Dependencies::default()#(#merges)*,
                });
            }
        }
    }
    if arms.is_empty() {
        return Ok(quote! { form::Dependencies::default() });
    }
    Ok(quote! {
        match self {
            #(#arms)*
        }
    })
}

#[proc_macro_derive(HasDependencies)]
pub fn derive_has_dependencies(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input: DeriveInput = syn::parse_macro_input!(input);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => struct_body(named),
        Data::Struct(DataStruct {
            fields: Fields::Unit,
            ..
        }) => Ok(quote! { form::Dependencies::default() }),
        Data::Enum(data) => enum_body(data),
        _ => Err(syn::Error::new(
            name.span(),
            "deriving HasDependencies only supports structs with named fields and enums"
                .to_string(),
        )),
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => return e.into_compile_error().into(),
    };

    let output = quote! {
        impl #impl_generics form::HasDependencies for #name #ty_generics #where_clause {
            fn dependencies(&self) -> form::Dependencies {
                #body
            }
        }
    };
    output.into()
}
