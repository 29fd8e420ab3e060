use std::sync::Arc;

use rquickjs::{ArrayBuffer, Ctx, Function, Object, Value as JsValue, function::Opt};

use super::{HostContext, html, optional_string};
use crate::{
    error::Result,
    http::{FetchDescriptor, FetchResult},
    marshal::{js_to_value, json_to_js},
};

pub fn register<'js>(ctx: &Ctx<'js>, host: &HostContext) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    // fetch(url, { method, headers, body }) -> result object
    let h = host.clone();
    globals.set(
        "fetch",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>,
                  url: Opt<JsValue<'js>>,
                  options: Opt<JsValue<'js>>|
                  -> rquickjs::Result<Object<'js>> {
                let result = fetch(&h, url, options);
                let result = h.lift(&ctx, result)?;
                result_object(&ctx, &h, Arc::new(result))
            },
        )?,
    )?;

    // xhr(url) -> parsed JSON body
    let h = host.clone();
    globals.set(
        "xhr",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, url: Opt<JsValue<'js>>| -> rquickjs::Result<JsValue<'js>> {
                let value = xhr(&ctx, &h, url);
                h.lift(&ctx, value)
            },
        )?,
    )?;

    Ok(())
}

fn fetch(host: &HostContext, url: Opt<JsValue<'_>>, options: Opt<JsValue<'_>>) -> Result<FetchResult> {
    let url = optional_string(url)?;
    let options = options.0.map(js_to_value).transpose()?;
    let descriptor = FetchDescriptor::parse(url.as_deref(), options)?;
    host.http.fetch(descriptor)
}

fn xhr<'js>(ctx: &Ctx<'js>, host: &HostContext, url: Opt<JsValue<'js>>) -> Result<JsValue<'js>> {
    let url = optional_string(url)?;
    let descriptor = FetchDescriptor::parse(url.as_deref(), None)?;
    let result = host.http.fetch(descriptor)?;
    json_to_js(ctx, result.text())
}

fn result_object<'js>(
    ctx: &Ctx<'js>,
    host: &HostContext,
    result: Arc<FetchResult>,
) -> rquickjs::Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    obj.set("url", result.url().as_str())?;
    obj.set("baseUrl", result.base_url())?;
    obj.set("status", i32::from(result.status()))?;
    obj.set("statusText", result.status_text())?;

    let headers = Object::new(ctx.clone())?;
    for (name, value) in result.headers() {
        headers.set(name, value)?;
    }
    obj.set("headers", headers)?;

    let r = result.clone();
    obj.set("text", Function::new(ctx.clone(), move || r.text().to_owned())?)?;
    let r = result.clone();
    obj.set("toString", Function::new(ctx.clone(), move || r.text().to_owned())?)?;

    let (r, h) = (result.clone(), host.clone());
    obj.set(
        "json",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<JsValue<'js>> {
                let value = json_to_js(&ctx, r.text());
                h.lift(&ctx, value)
            },
        )?,
    )?;

    let (r, h) = (result.clone(), host.clone());
    obj.set(
        "html",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<Object<'js>> {
                html::document(&ctx, &h, r.html_source(), r.base_url())
            },
        )?,
    )?;

    let r = result;
    obj.set(
        "bytes",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<ArrayBuffer<'js>> {
                ArrayBuffer::new(ctx, r.bytes().to_vec())
            },
        )?,
    )?;

    Ok(obj)
}

