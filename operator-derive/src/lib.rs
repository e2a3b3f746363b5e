use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, parse_macro_input};

/// Field names of a struct with named fields, empty for anything else.
fn named_fields(input: &DeriveInput) -> Vec<Ident> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named
                .named
                .iter()
                .filter_map(|field| field.ident.clone())
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Implements `crate::conditions::Conditions` for a custom resource status.
///
/// The status must carry a `conditions: Option<Vec<Condition>>` field. When it
/// also carries `observed_generation: Option<i64>`, the generation accessors are
/// wired to it; otherwise the trait defaults apply.
#[proc_macro_derive(Conditions)]
pub fn derive_conditions(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_conditions(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_conditions(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let fields = named_fields(input);

    if !fields.iter().any(|f| f == "conditions") {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Conditions)] requires a `conditions` field",
        ));
    }

    let generation = fields.iter().any(|f| f == "observed_generation").then(|| {
        quote! {
            fn observed_generation(&self) -> Option<i64> {
                self.observed_generation
            }
            fn set_observed_generation(&mut self, generation: i64) {
                self.observed_generation = Some(generation);
            }
        }
    });

    Ok(quote! {
        impl crate::conditions::Conditions for #name {
            fn conditions(&self) -> &Option<Vec<k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition>> {
                &self.conditions
            }
            fn conditions_mut(&mut self) -> &mut Option<Vec<k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition>> {
                &mut self.conditions
            }
            #generation
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Structs of a fixture file, as the derive would receive them.
    fn fixture_structs(source: &str) -> Vec<DeriveInput> {
        syn::parse_file(source)
            .unwrap()
            .items
            .into_iter()
            .filter_map(|item| match item {
                syn::Item::Struct(s) => Some(DeriveInput::from(s)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn derive_pass() {
        let structs = fixture_structs(include_str!("../tests/fixtures/derive_pass.rs"));
        assert_eq!(structs.len(), 2);
        for input in &structs {
            let expanded = expand_conditions(input).unwrap().to_string();
            assert!(expanded.contains(&format!("Conditions for {}", input.ident)));
        }
        let with_generation = expand_conditions(&structs[0]).unwrap().to_string();
        assert!(with_generation.contains("fn set_observed_generation"));
        let without_generation = expand_conditions(&structs[1]).unwrap().to_string();
        assert!(!without_generation.contains("observed_generation"));
    }

    #[test]
    fn derive_fail() {
        let structs = fixture_structs(include_str!("../tests/fixtures/derive_fail.rs"));
        assert_eq!(structs.len(), 2);
        for input in &structs {
            let err = expand_conditions(input).unwrap_err();
            assert_eq!(err.to_string(), "#[derive(Conditions)] requires a `conditions` field");
        }
    }
}
