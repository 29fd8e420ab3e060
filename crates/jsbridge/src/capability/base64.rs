use base64::{Engine as _, engine::general_purpose::STANDARD};
use rquickjs::{Ctx, Function, Value as JsValue, function::Opt};

use super::{HostContext, required_string};
use crate::error::{Error, Result};

pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode padded standard base64; bytes that are not UTF-8 are replaced.
pub fn decode(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Argument(format!("invalid base64: {e}")))?;
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

pub fn register<'js>(ctx: &Ctx<'js>, host: &HostContext) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let h = host.clone();
    globals.set(
        "atob",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, input: Opt<JsValue<'js>>| -> rquickjs::Result<String> {
                let decoded = required_string("atob", input).and_then(|s| decode(&s));
                h.lift(&ctx, decoded)
            },
        )?,
    )?;

    let h = host.clone();
    globals.set(
        "btoa",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, input: Opt<JsValue<'js>>| -> rquickjs::Result<String> {
                let encoded = required_string("btoa", input).map(|s| encode(&s));
                h.lift(&ctx, encoded)
            },
        )?,
    )?;

    Ok(())
}
