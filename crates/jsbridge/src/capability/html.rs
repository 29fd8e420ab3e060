//! Parsed-HTML views returned by `response.html()`.
//!
//! Element objects keep an owned snapshot plus the element's position in
//! document order; `select` re-parses the source and finds the element
//! again by that position, so no parser state outlives a call.

use std::sync::Arc;

use rquickjs::{Array, Ctx, Function, Object, Value as JsValue, convert::Coerced, function::Opt};
use scraper::{ElementRef, Html, Selector};

use super::{HostContext, required_string};
use crate::error::{Error, Result};

#[derive(Debug)]
struct Snapshot {
    index: usize,
    tag: String,
    text: String,
    outer_html: String,
    inner_html: String,
    attrs: Vec<(String, String)>,
}

impl Snapshot {
    fn new(index: usize, el: ElementRef<'_>) -> Self {
        Self {
            index,
            tag: el.value().name().to_owned(),
            text: visible_text(el),
            outer_html: el.html(),
            inner_html: el.inner_html(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        }
    }

    fn attr(&self, name: &str) -> &str {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map_or("", |(_, v)| v.as_str())
    }
}

/// Text content with `<script>`/`<style>` bodies dropped and whitespace
/// collapsed.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
            .unwrap_or(false);
        if !hidden {
            out.push_str(text);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title(doc: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next().map(visible_text))
        .unwrap_or_default()
}

fn select(source: &str, scope: Option<usize>, css: &str) -> Result<Vec<Snapshot>> {
    let selector =
        Selector::parse(css).map_err(|e| Error::Argument(format!("invalid selector {css:?}: {e}")))?;
    let doc = Html::parse_document(source);
    let root = doc.tree.root();

    let matched: Vec<_> = match scope {
        None => doc.select(&selector).map(|el| el.id()).collect(),
        Some(index) => match root.descendants().nth(index).and_then(ElementRef::wrap) {
            Some(el) => el.select(&selector).map(|el| el.id()).collect(),
            None => return Ok(Vec::new()),
        },
    };

    Ok(root
        .descendants()
        .enumerate()
        .filter(|(_, node)| matched.contains(&node.id()))
        .filter_map(|(index, node)| ElementRef::wrap(node).map(|el| Snapshot::new(index, el)))
        .collect())
}

pub fn document<'js>(
    ctx: &Ctx<'js>,
    host: &HostContext,
    source: String,
    base_url: String,
) -> rquickjs::Result<Object<'js>> {
    let (title, text, html) = {
        let doc = Html::parse_document(&source);
        (title(&doc), visible_text(doc.root_element()), doc.html())
    };
    let source: Arc<str> = source.into();

    let obj = Object::new(ctx.clone())?;
    obj.set("baseUrl", base_url)?;
    obj.set("title", Function::new(ctx.clone(), move || title.clone())?)?;
    obj.set("text", Function::new(ctx.clone(), move || text.clone())?)?;
    obj.set("html", Function::new(ctx.clone(), move || html.clone())?)?;
    obj.set("select", select_fn(ctx, host, source, None)?)?;
    Ok(obj)
}

fn select_fn<'js>(
    ctx: &Ctx<'js>,
    host: &HostContext,
    source: Arc<str>,
    scope: Option<usize>,
) -> rquickjs::Result<Function<'js>> {
    let h = host.clone();
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, css: Opt<JsValue<'js>>| -> rquickjs::Result<Array<'js>> {
            let found = required_string("select", css).and_then(|css| select(&source, scope, &css));
            let found = h.lift(&ctx, found)?;
            let arr = Array::new(ctx.clone())?;
            for (i, snapshot) in found.into_iter().enumerate() {
                arr.set(i, element(&ctx, &h, &source, snapshot)?)?;
            }
            Ok(arr)
        },
    )
}

fn element<'js>(
    ctx: &Ctx<'js>,
    host: &HostContext,
    source: &Arc<str>,
    snapshot: Snapshot,
) -> rquickjs::Result<Object<'js>> {
    let snapshot = Arc::new(snapshot);
    let obj = Object::new(ctx.clone())?;
    obj.set("tagName", snapshot.tag.as_str())?;

    let s = snapshot.clone();
    obj.set("text", Function::new(ctx.clone(), move || s.text.clone())?)?;
    let s = snapshot.clone();
    obj.set("html", Function::new(ctx.clone(), move || s.outer_html.clone())?)?;
    let s = snapshot.clone();
    obj.set("innerHtml", Function::new(ctx.clone(), move || s.inner_html.clone())?)?;
    let s = snapshot.clone();
    obj.set(
        "attr",
        Function::new(ctx.clone(), move |name: Coerced<String>| s.attr(&name.0).to_owned())?,
    )?;
    let s = snapshot.clone();
    obj.set(
        "attrs",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<Object<'js>> {
                let attrs = Object::new(ctx)?;
                for (k, v) in &s.attrs {
                    attrs.set(k.as_str(), v.as_str())?;
                }
                Ok(attrs)
            },
        )?,
    )?;

    obj.set("select", select_fn(ctx, host, source.clone(), Some(snapshot.index))?)?;
    Ok(obj)
}
