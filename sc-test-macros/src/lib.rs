// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Attribute macros for sweetcomb harness test cases.
//!
//! Test classes and test methods are registered into a static table at
//! startup (through `inventory`) so the runner can look them up by source
//! file instead of introspecting anything at runtime.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Ident, ItemFn, ItemStruct, LitStr, Token};

/// Require root privileges for this test
///
/// The check is injected at the top of the function body. Without root the
/// test panics with a skip message, which the runner reports as a failure
/// and `cargo test` reports as a failed test.
///
/// ```ignore
/// #[test]
/// #[ignore]
/// #[requires_root]
/// fn test_veth_links() {
///     // only reached as root
/// }
/// ```
#[proc_macro_attribute]
pub fn requires_root(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            if !nix::unistd::geteuid().is_root() {
                panic!("SKIPPED: test requires root privileges (VPP, veth links and sysrepo need it)");
            }

            #block
        }
    };

    output.into()
}

/// Register a unit struct as a test class.
///
/// The struct must implement `sweetcomb_harness::framework::TestClass`; its
/// `set_up`/`tear_down` hooks run around every test method of the class.
///
/// ```ignore
/// #[sweetcomb_class]
/// pub struct TestOcInterfaces;
///
/// impl TestClass for TestOcInterfaces {}
/// ```
#[proc_macro_attribute]
pub fn sweetcomb_class(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let ident = &input.ident;
    let name = ident.to_string();

    let output = quote! {
        #input

        ::sweetcomb_harness::inventory::submit! {
            ::sweetcomb_harness::discovery::ClassEntry {
                name: #name,
                file: file!(),
                line: line!(),
                set_up: <#ident as ::sweetcomb_harness::framework::TestClass>::set_up,
                tear_down: <#ident as ::sweetcomb_harness::framework::TestClass>::tear_down,
            }
        }
    };

    output.into()
}

struct TestArgs {
    class: Ident,
    skip: Option<LitStr>,
}

impl Parse for TestArgs {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let class: Ident = input.parse()?;
        let mut skip = None;

        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;
            if key == "skip" {
                skip = Some(value);
            } else {
                return Err(syn::Error::new(
                    key.span(),
                    "unknown argument; expected `skip = \"reason\"`",
                ));
            }
        }

        Ok(Self { class, skip })
    }
}

/// Register a function as a test method of a class.
///
/// The function must have the signature
/// `fn(&mut TestContext) -> anyhow::Result<()>`. An optional
/// `skip = "reason"` registers the method but the runner reports it as
/// skipped without running set-up.
///
/// ```ignore
/// #[sweetcomb_test(TestOcInterfaces)]
/// fn test_interface(ctx: &mut TestContext) -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn sweetcomb_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as TestArgs);
    let input = parse_macro_input!(item as ItemFn);

    let class = &args.class;
    let class_name = class.to_string();
    let fn_ident = &input.sig.ident;
    let fn_name = fn_ident.to_string();
    let skip = match &args.skip {
        Some(reason) => quote! { Some(#reason) },
        None => quote! { None },
    };

    let output = quote! {
        #input

        const _: fn() = || {
            fn assert_test_class<T: ::sweetcomb_harness::framework::TestClass>() {}
            assert_test_class::<#class>();
        };

        ::sweetcomb_harness::inventory::submit! {
            ::sweetcomb_harness::discovery::MethodEntry {
                class: #class_name,
                name: #fn_name,
                file: file!(),
                line: line!(),
                func: #fn_ident,
                skip: #skip,
            }
        }
    };

    output.into()
}
