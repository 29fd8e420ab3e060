//! Conversion between script values and the marshaled [`Value`] tree.

use rquickjs::{Array, Ctx, Object, Value as JsValue, convert::Coerced, object::Filter};
use serde::{
    Serialize,
    ser::{SerializeMap, SerializeSeq},
};

use crate::{
    error::{Error, Result},
    value::Value,
};

const MAX_DEPTH: usize = 128;

/// Largest integer a script number can carry without losing precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

struct Marshal<'js>(JsValue<'js>, usize);

impl<'js> Marshal<'js> {
    const fn child(&self, val: JsValue<'js>) -> Self {
        Self(val, self.1 - 1)
    }
}

/// Values with no tree form. They become `null` in arrays and at the top
/// level, and are left out of objects.
fn is_opaque(v: &JsValue<'_>) -> bool {
    v.is_function() || v.is_symbol()
}

/// A failed element or property read; a thrown value is taken off the
/// context so it does not leak into the next evaluation.
fn read_error<E: serde::ser::Error>(ctx: &Ctx<'_>, err: &rquickjs::Error) -> E {
    if !err.is_exception() {
        return E::custom(err);
    }
    let thrown = ctx.catch();
    let message = thrown
        .get::<Coerced<String>>()
        .map_or_else(|_| err.to_string(), |s| s.0);
    E::custom(format!("reading a property threw {message}"))
}

impl Serialize for Marshal<'_> {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.1 == 0 {
            return Err(serde::ser::Error::custom(
                "maximum depth exceeded, possible circular reference",
            ));
        }

        let v = &self.0;
        if v.is_null() || v.is_undefined() || is_opaque(v) {
            serializer.serialize_none()
        } else if let Some(b) = v.as_bool() {
            serializer.serialize_bool(b)
        } else if let Some(i) = v.as_int() {
            serializer.serialize_i32(i)
        } else if let Some(f) = v.as_number() {
            if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                #[allow(clippy::cast_possible_truncation)]
                let i = f as i64;
                serializer.serialize_i64(i)
            } else {
                serializer.serialize_f64(f)
            }
        } else if let Some(s) = v.as_string() {
            let s = s.to_string().map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&s)
        } else if let Some(arr) = v.as_array() {
            let len = arr.len();
            let mut seq = serializer.serialize_seq(Some(len))?;
            for i in 0..len {
                let elem: JsValue<'_> = arr.get(i).map_err(|e| read_error(v.ctx(), &e))?;
                seq.serialize_element(&self.child(elem))?;
            }
            seq.end()
        } else if let Some(obj) = v.as_object() {
            if let Some(buf) = obj.as_array_buffer()
                && let Some(bytes) = buf.as_bytes()
            {
                return serializer.serialize_bytes(bytes);
            }
            if let Some(ta) = obj.as_typed_array::<u8>()
                && let Some(bytes) = ta.as_bytes()
            {
                return serializer.serialize_bytes(bytes);
            }
            let props = obj
                .own_props::<String, JsValue<'_>>(Filter::new().string().enum_only())
                .collect::<rquickjs::Result<Vec<_>>>()
                .map_err(|e| read_error(v.ctx(), &e))?;
            let props: Vec<_> = props.into_iter().filter(|(_, val)| !is_opaque(val)).collect();
            let mut map = serializer.serialize_map(Some(props.len()))?;
            for (key, val) in props {
                map.serialize_entry(&key, &self.child(val))?;
            }
            map.end()
        } else {
            Err(serde::ser::Error::custom(format!(
                "unsupported script value: {:?}",
                v.type_of()
            )))
        }
    }
}

/// Convert a script value into the marshaled tree.
///
/// # Errors
/// Returns [`Error::Marshal`] for circular or over-deep structures.
pub fn js_to_value(value: JsValue<'_>) -> Result<Value> {
    serde_json::to_value(Marshal(value, MAX_DEPTH))
        .map(Value::from_tree)
        .map_err(|e| Error::Marshal(e.to_string()))
}

/// Build a script value from a marshaled tree.
pub fn value_to_js<'js>(ctx: &Ctx<'js>, value: &Value) -> rquickjs::Result<JsValue<'js>> {
    tree_to_js(ctx, value.as_tree())
}

fn tree_to_js<'js>(ctx: &Ctx<'js>, tree: &serde_json::Value) -> rquickjs::Result<JsValue<'js>> {
    use serde_json::Value as Tree;

    Ok(match tree {
        Tree::Null => JsValue::new_null(ctx.clone()),
        Tree::Bool(b) => JsValue::new_bool(ctx.clone(), *b),
        Tree::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => JsValue::new_int(ctx.clone(), i),
            None => JsValue::new_float(ctx.clone(), n.as_f64().unwrap_or(f64::NAN)),
        },
        Tree::String(s) => rquickjs::String::from_str(ctx.clone(), s)?.into_value(),
        Tree::Array(items) => {
            let arr = Array::new(ctx.clone())?;
            for (i, item) in items.iter().enumerate() {
                arr.set(i, tree_to_js(ctx, item)?)?;
            }
            arr.into_value()
        }
        Tree::Object(map) => {
            let obj = Object::new(ctx.clone())?;
            for (key, item) in map {
                obj.set(key.as_str(), tree_to_js(ctx, item)?)?;
            }
            obj.into_value()
        }
    })
}

/// Parse JSON text straight into a script value.
///
/// # Errors
/// Returns [`Error::Json`] for malformed input.
pub fn json_to_js<'js>(ctx: &Ctx<'js>, text: &str) -> Result<JsValue<'js>> {
    let tree: serde_json::Value = serde_json::from_str(text).map_err(Error::Json)?;
    tree_to_js(ctx, &tree).map_err(|e| Error::engine(&e))
}
