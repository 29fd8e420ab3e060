//! Host functions installed into every session's global scope.

use std::{path::PathBuf, sync::Arc};

use rquickjs::{Ctx, Value as JsValue, convert::Coerced, function::Opt};

use crate::{
    error::{Error, Result},
    http::HttpAdapter,
};

mod base64;
mod console;
pub(crate) mod errors;
mod fetch;
mod html;
pub(crate) mod import;

pub(crate) use errors::HostErrors;

/// Shared state every capability closure captures.
#[derive(Clone)]
pub(crate) struct HostContext {
    pub root_dir: Arc<PathBuf>,
    pub http: Arc<HttpAdapter>,
    pub errors: HostErrors,
}

impl HostContext {
    /// Turn a host error into a thrown script exception.
    pub fn lift<T>(&self, ctx: &Ctx<'_>, result: Result<T>) -> rquickjs::Result<T> {
        result.map_err(|e| self.errors.throw(ctx, e))
    }
}

pub(crate) fn register_all(ctx: &Ctx<'_>, host: &HostContext) -> rquickjs::Result<()> {
    console::register(ctx, host)?;
    base64::register(ctx, host)?;
    fetch::register(ctx, host)?;
    import::register(ctx, host)?;
    Ok(())
}

/// Script string coercion of an optional argument; `null` and `undefined`
/// count as missing.
fn optional_string(arg: Opt<JsValue<'_>>) -> Result<Option<String>> {
    match arg.0 {
        Some(v) if !v.is_undefined() && !v.is_null() => v
            .get::<Coerced<String>>()
            .map(|s| Some(s.0))
            .map_err(|e| Error::Argument(e.to_string())),
        _ => Ok(None),
    }
}

fn required_string(func: &str, arg: Opt<JsValue<'_>>) -> Result<String> {
    optional_string(arg)?
        .ok_or_else(|| Error::Argument(format!("{func} requires a string argument")))
}
