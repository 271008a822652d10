use proc_macro::TokenStream;
use quote::quote;
use std::{process::Stdio, sync::OnceLock};
use syn::{
  parse::{Parse, ParseStream},
  ItemFn,
};

static IS_SUPPORT_DOCKER: OnceLock<bool> = OnceLock::new();

fn is_support_docker() -> bool {
  *IS_SUPPORT_DOCKER.get_or_init(|| {
    std::process::Command::new("docker")
      .arg("ps")
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map_or(false, |status| status.success())
  })
}

struct Args {
  is_docker: bool,
}

impl Parse for Args {
  fn parse(input: ParseStream) -> syn::Result<Self> {
    if input.is_empty() {
      return Ok(Self { is_docker: false });
    }

    let ident = input.parse::<syn::Ident>()?;
    if ident != "docker" {
      return Err(syn::Error::new(
        ident.span(),
        "expected `docker` or no argument",
      ));
    }

    Ok(Self { is_docker: true })
  }
}

/// `#[stackrun_test::test]` runs a sync or async test with the logger
/// installed. `#[stackrun_test::test(docker)]` is ignored when no docker
/// daemon answered at expansion time.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let item_fn = syn::parse_macro_input!(item as ItemFn);
  let args = syn::parse_macro_input!(attr as Args);

  let attrs = item_fn.attrs;
  let test_name = item_fn.sig.ident;
  let output = item_fn.sig.output;
  let content = item_fn.block;

  let is_async = item_fn.sig.asyncness.is_some();

  // Only re-evaluated when the test crate is rebuilt
  let ignore = if args.is_docker && !is_support_docker() {
    quote! { #[ignore] }
  } else {
    quote! {}
  };

  let content = quote! {
    stackrun_logger::init_logger_with_level(log::Level::Trace);

    #content
  };

  if is_async {
    return quote! {
      #(#attrs)*
      #ignore
      #[tokio::test]
      async fn #test_name() #output {
        #content
      }
    }
    .into();
  }

  quote! {
    #(#attrs)*
    #ignore
    #[test]
    fn #test_name() #output {
      #content
    }
  }
  .into()
}
