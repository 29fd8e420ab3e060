//! Typed host errors carried across the script boundary.
//!
//! A capability that fails stores its [`Error`] here and throws a script
//! exception tagged with the stored id. Scripts can catch it like any other
//! exception; if it escapes to the caller, the tag turns it back into the
//! original typed error.
//!
//! Promise rejections are tracked the same way: one still unhandled when the
//! job queue drains fails the call, one a script catches does not.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use rquickjs::{Ctx, Exception, Object, Value as JsValue, convert::Coerced};

use crate::error::Error;

const TAG: &str = "__jsbridgeHostError";
const REJECTION_TAG: &str = "__jsbridgeRejection";

/// A rejected promise with no handler yet.
struct Rejection {
    id: u32,
    host_error: Option<u32>,
    fallback: Error,
}

#[derive(Default)]
struct State {
    next_id: u32,
    pending: HashMap<u32, Error>,
    deferred: Option<Error>,
    unhandled: Vec<Rejection>,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}

#[derive(Clone, Default)]
pub(crate) struct HostErrors(Arc<Mutex<State>>);

impl HostErrors {
    /// Store `err` and raise it as a script exception.
    pub fn throw(&self, ctx: &Ctx<'_>, err: Error) -> rquickjs::Error {
        let name = err.script_name();
        let message = err.to_string();
        let status = match &err {
            Error::HttpStatus { code, .. } => Some(*code),
            _ => None,
        };

        let id = {
            let mut state = self.0.lock();
            let id = state.next_id();
            state.pending.insert(id, err);
            id
        };

        match exception_object(ctx, name, &message, status, id) {
            Ok(obj) => ctx.throw(obj.into_value()),
            Err(e) => e,
        }
    }

    /// Keep an error raised where no exception can carry it (module loading).
    /// It takes precedence over the engine error or unhandled rejection that
    /// reports the same failure.
    pub fn defer(&self, err: Error) {
        self.0.lock().deferred.get_or_insert(err);
    }

    pub fn take_deferred(&self) -> Option<Error> {
        self.0.lock().deferred.take()
    }

    /// Convert an engine failure into a host error, consuming the pending
    /// exception if there is one.
    pub fn catch(&self, ctx: &Ctx<'_>, err: &rquickjs::Error) -> Error {
        if let Some(deferred) = self.take_deferred() {
            if err.is_exception() {
                let _ = ctx.catch();
            }
            return deferred;
        }
        if err.is_exception() {
            self.resolve(ctx.catch())
        } else {
            Error::engine(err)
        }
    }

    /// Map a thrown (or rejected) script value to a host error.
    pub fn resolve(&self, thrown: JsValue<'_>) -> Error {
        if let Some(id) = host_error_id(&thrown)
            && let Some(err) = self.0.lock().pending.remove(&id)
        {
            return err;
        }
        describe(&thrown)
    }

    /// Host promise rejection tracker: records rejections without a handler
    /// and forgets them once a handler is attached.
    pub fn track_rejection(&self, promise: &JsValue<'_>, reason: &JsValue<'_>, is_handled: bool) {
        let Some(promise) = promise.as_object() else {
            return;
        };
        if is_handled {
            if let Ok(Some(id)) = promise.get::<_, Option<u32>>(REJECTION_TAG) {
                self.0.lock().unhandled.retain(|r| r.id != id);
            }
            return;
        }

        let rejection = Rejection {
            id: self.0.lock().next_id(),
            host_error: host_error_id(reason),
            fallback: describe(reason),
        };
        if promise.set(REJECTION_TAG, rejection.id).is_ok() {
            self.0.lock().unhandled.push(rejection);
        }
    }

    /// The oldest rejection nobody handled, if any. Deferred errors are
    /// dropped when every rejection was handled.
    pub fn take_unhandled(&self) -> Option<Error> {
        let mut state = self.0.lock();
        let deferred = state.deferred.take();
        if state.unhandled.is_empty() {
            return None;
        }
        let rejection = state.unhandled.remove(0);
        let host_error = rejection.host_error.and_then(|id| state.pending.remove(&id));
        Some(host_error.or(deferred).unwrap_or(rejection.fallback))
    }

    pub fn clear(&self) {
        let mut state = self.0.lock();
        state.pending.clear();
        state.deferred = None;
        state.unhandled.clear();
    }
}

fn host_error_id(thrown: &JsValue<'_>) -> Option<u32> {
    thrown.as_object()?.get::<_, Option<u32>>(TAG).ok().flatten()
}

fn describe(thrown: &JsValue<'_>) -> Error {
    if let Some(exc) = thrown.as_exception() {
        let message = exc.message().unwrap_or_default();
        let message = match exc.as_object().get::<_, Option<String>>("name") {
            Ok(Some(name)) if !name.is_empty() => format!("{name}: {message}"),
            _ => message,
        };
        return Error::Script {
            message,
            stack: exc.stack().filter(|s| !s.is_empty()),
        };
    }

    let message = thrown
        .get::<Coerced<String>>()
        .map_or_else(|_| format!("{:?}", thrown.type_of()), |s| s.0);
    Error::Script {
        message: format!("uncaught {message}"),
        stack: None,
    }
}

fn exception_object<'js>(
    ctx: &Ctx<'js>,
    name: &str,
    message: &str,
    status: Option<u16>,
    id: u32,
) -> rquickjs::Result<Object<'js>> {
    let obj = Exception::from_message(ctx.clone(), message)?.into_object();
    obj.set("name", name)?;
    if let Some(status) = status {
        obj.set("status", i32::from(status))?;
    }
    obj.set(TAG, id)?;
    Ok(obj)
}
