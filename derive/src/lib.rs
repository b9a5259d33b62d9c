use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Data, DataEnum, DataStruct, DeriveInput, Fields, GenericParam,
    Generics, Type,
};

#[proc_macro_derive(Trace)]
pub fn trace(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let generics = add_bound(input.generics, parse_quote!(scopegc::Trace));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let shapes = shapes(&input.data);
    let field_types = field_types(&shapes);

    let arms = shapes.iter().map(|shape| {
        let (pattern, bindings) = destructure(shape);

        (
            pattern,
            quote! {
                #(scopegc::Trace::trace(#bindings, tracer);)*
            },
        )
    });

    let trace_body = match &input.data {
        _ if field_types.is_empty() => quote! {},
        Data::Struct(_) => {
            let arms = arms.map(|(pattern, body)| quote! { let #pattern = self; #body });

            quote! { #(#arms)* }
        }
        _ => {
            let arms = arms.map(|(pattern, body)| quote! { #pattern => { #body } });

            quote! { match self { #(#arms)* } }
        }
    };

    // A type is a leaf if every one of its fields is, so structs holding only
    // plain data skip the mark worklist without having to opt out.
    let expanded = quote! {
        #[automatically_derived]
        unsafe impl #impl_generics scopegc::Trace for #name #ty_generics #where_clause {
            const IS_LEAF: bool = true #(&& <#field_types as scopegc::Trace>::IS_LEAF)*;

            #[allow(unused_variables)]
            fn trace(&self, tracer: &mut scopegc::Tracer<'_>) {
                #trace_body
            }
        }

        impl #impl_generics scopegc::__MustNotDrop for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

#[proc_macro_derive(TraceLeaf)]
pub fn traceleaf(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let generics = add_bound(input.generics, parse_quote!(scopegc::TraceLeaf));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let asserts = field_types(&shapes(&input.data))
        .into_iter()
        .map(|ty| {
            quote! {
                <#ty as scopegc::TraceLeaf>::__assert_trace_leaf();
            }
        })
        .collect::<Vec<_>>();

    let expanded = quote! {
        #[automatically_derived]
        unsafe impl #impl_generics scopegc::TraceLeaf for #name #ty_generics #where_clause {
            fn __assert_trace_leaf() {
                #(#asserts)*
            }
        }

        #[automatically_derived]
        unsafe impl #impl_generics scopegc::Trace for #name #ty_generics #where_clause {
            const IS_LEAF: bool = true;

            fn trace(&self, _: &mut scopegc::Tracer<'_>) {}
        }

        impl #impl_generics scopegc::__MustNotDrop for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

// One set of fields of the input: the struct's own, or one enum variant's.
struct Shape<'a> {
    path: TokenStream2,
    fields: &'a Fields,
}

fn shapes(data: &Data) -> Vec<Shape<'_>> {
    match data {
        Data::Struct(DataStruct { fields, .. }) => vec![Shape {
            path: quote! { Self },
            fields,
        }],
        Data::Enum(DataEnum { variants, .. }) => variants
            .iter()
            .map(|variant| {
                let ident = &variant.ident;

                Shape {
                    path: quote! { Self::#ident },
                    fields: &variant.fields,
                }
            })
            .collect(),
        Data::Union(_) => unimplemented!("Trace cannot be derived for unions"),
    }
}

fn field_types(shapes: &[Shape<'_>]) -> Vec<Type> {
    shapes
        .iter()
        .flat_map(|shape| shape.fields.iter().map(|f| f.ty.clone()))
        .collect()
}

/// Builds a pattern matching `shape` that binds each field by reference to
/// `f0`, `f1`, ... and returns it along with those bindings.
fn destructure(shape: &Shape<'_>) -> (TokenStream2, Vec<Ident>) {
    let path = &shape.path;
    let bindings = (0..shape.fields.len())
        .map(|idx| format_ident!("f{}", idx, span = Span::mixed_site()))
        .collect::<Vec<_>>();

    let pattern = match shape.fields {
        Fields::Named(fields) => {
            let names = fields.named.iter().map(|field| &field.ident);

            quote! { #path { #(#names: #bindings),* } }
        }
        Fields::Unnamed(_) => quote! { #path(#(#bindings),*) },
        Fields::Unit => quote! { #path },
    };

    (pattern, bindings)
}

fn add_bound(mut generics: Generics, bound: syn::TypeParamBound) -> Generics {
    for param in &mut generics.params {
        if let GenericParam::Type(ref mut type_param) = *param {
            type_param.bounds.push(bound.clone());
        }
    }
    generics
}
