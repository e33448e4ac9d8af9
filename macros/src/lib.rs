use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, FnArg, ItemFn};

/// `#[rxlive_macro::test]`: a `#[test]` that runs with the instant task
/// executor installed.
///
/// The function may take one argument; it is initialized with
/// `Default::default()` before the body runs.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let raw_args = proc_macro2::TokenStream::from(attr);
  if !raw_args.is_empty() {
    return TokenStream::from(
      syn::Error::new(raw_args.span(), "rxlive_macro::test does not take arguments")
        .to_compile_error(),
    );
  }
  if let Some(asyncness) = input.sig.asyncness {
    return TokenStream::from(
      syn::Error::new(
        asyncness.span(),
        "rxlive_macro::test only supports sync tests; drive async code through a scheduler",
      )
      .to_compile_error(),
    );
  }

  let mut inputs = input.sig.inputs.iter();
  let fixture = match (inputs.next(), inputs.next()) {
    (None, _) => None,
    (Some(FnArg::Typed(arg)), None) => Some(arg.clone()),
    (Some(FnArg::Receiver(receiver)), _) => {
      return TokenStream::from(
        syn::Error::new(receiver.span(), "rxlive_macro::test cannot be used on methods")
          .to_compile_error(),
      );
    }
    (Some(_), Some(extra)) => {
      return TokenStream::from(
        syn::Error::new(extra.span(), "rxlive_macro::test accepts at most one fixture argument")
          .to_compile_error(),
      );
    }
  };

  let ItemFn { attrs, vis, sig, block } = input;
  let name = &sig.ident;
  let output = &sig.output;
  let fixture = fixture.map(|arg| {
    let (pat, ty) = (&arg.pat, &arg.ty);
    quote!(let #pat: #ty = ::core::default::Default::default();)
  });

  let expanded = quote! {
      #[test]
      #(#attrs)*
      #vis fn #name() #output {
        let _instant_executor = ::rxlive::testing::InstantTaskExecutor::install();
        #fixture
        #block
      }
  };

  TokenStream::from(expanded)
}
