//! Procedural macros shared by keysafe tests.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Ident, ItemFn, LitStr};

/// Levels accepted by [macro@test_traced].
const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// Run a test with a `tracing` subscriber that writes to the test harness.
///
/// The maximum level defaults to `DEBUG` and may be overridden with a string
/// literal (`#[test_traced("INFO")]`). The subscriber is scoped to the test
/// thread, so parallel tests do not interfere with each other.
///
/// The crate using this attribute must depend on `tracing` and
/// `tracing-subscriber` (with the `fmt` feature).
///
/// # Example
/// ```rust,ignore
/// use keysafe_macros::test_traced;
///
/// #[test_traced("INFO")]
/// fn test_generate() {
///     tracing::info!("visible");
///     tracing::debug!("filtered");
/// }
/// ```
#[proc_macro_attribute]
pub fn test_traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let level = if attr.is_empty() {
        "DEBUG".to_string()
    } else {
        let literal = parse_macro_input!(attr as LitStr);
        let level = literal.value().to_uppercase();
        if !LEVELS.contains(&level.as_str()) {
            return syn::Error::new(
                literal.span(),
                format!("unknown level `{}`, expected one of {:?}", level, LEVELS),
            )
            .to_compile_error()
            .into();
        }
        level
    };
    let level = Ident::new(&level, Span::call_site());

    let name = &input.sig.ident;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let block = &input.block;

    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            let subscriber = tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(tracing::Level::#level)
                .with_line_number(true)
                .finish();
            let dispatcher = tracing::Dispatch::new(subscriber);
            tracing::dispatcher::with_default(&dispatcher, || #block);
        }
    };
    TokenStream::from(expanded)
}
