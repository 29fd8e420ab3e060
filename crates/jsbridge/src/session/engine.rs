use std::{path::Path, sync::Arc};

use rquickjs::{Context, Ctx, Object, Promise, Runtime, Value as JsValue, function::Args};

use super::{Arg, Script};
use crate::{
    capability::{
        self, HostContext, HostErrors,
        import::{ScriptLoader, ScriptResolver},
    },
    config::SessionConfig,
    error::{Error, Result},
    host::Host,
    http::{BlockingRuntime, HttpAdapter},
    marshal::{js_to_value, value_to_js},
    value::Value,
};

/// A script engine with the host capabilities installed.
pub(crate) struct Engine {
    context: Context,
    #[allow(dead_code)] // Runtime must be kept alive for the context to function
    runtime: Runtime,
    host: HostContext,
}

/// Scoped entry into the engine; host-error state is reset on the way in
/// and on every way out.
struct EngineEntry<'a> {
    errors: &'a HostErrors,
}

impl<'a> EngineEntry<'a> {
    fn enter(errors: &'a HostErrors) -> Self {
        errors.clear();
        Self { errors }
    }
}

impl Drop for EngineEntry<'_> {
    fn drop(&mut self) {
        self.errors.clear();
    }
}

impl Engine {
    pub fn new(config: &SessionConfig, host: Arc<dyn Host>) -> Result<Self> {
        let runtime = Runtime::new().map_err(|e| Error::engine(&e))?;
        runtime.set_max_stack_size(config.max_stack_size);
        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit);
        }

        let errors = HostErrors::default();
        let root_dir = Arc::new(config.root_dir.clone());
        runtime.set_loader(
            ScriptResolver::new(root_dir.clone(), errors.clone()),
            ScriptLoader::new(errors.clone()),
        );
        let tracker = errors.clone();
        runtime.set_host_promise_rejection_tracker(Some(Box::new(
            move |_ctx: Ctx<'_>, promise: JsValue<'_>, reason: JsValue<'_>, is_handled: bool| {
                tracker.track_rejection(&promise, &reason, is_handled);
            },
        )));

        let context = Context::full(&runtime).map_err(|e| Error::engine(&e))?;
        let host = HostContext {
            root_dir,
            http: Arc::new(HttpAdapter::new(host, BlockingRuntime::capture()?)),
            errors,
        };
        context
            .with(|ctx| capability::register_all(&ctx, &host))
            .map_err(|e| Error::engine(&e))?;

        Ok(Self {
            context,
            runtime,
            host,
        })
    }

    fn enter<R: Send>(&self, f: impl FnOnce(&Ctx<'_>) -> Result<R> + Send) -> Result<R> {
        self.context.with(|ctx| {
            let _entry = EngineEntry::enter(&self.host.errors);
            f(&ctx)
        })
    }

    fn catch(&self, ctx: &Ctx<'_>, err: &rquickjs::Error) -> Error {
        self.host.errors.catch(ctx, err)
    }

    pub fn set_global(&self, name: &str, value: &Value) -> Result<()> {
        self.enter(|ctx| {
            let value = value_to_js(ctx, value).map_err(|e| Error::engine(&e))?;
            ctx.globals()
                .set(name, value)
                .map_err(|e| self.catch(ctx, &e))
        })
    }

    pub fn eval(&self, script: &Script) -> Result<Value> {
        self.enter(|ctx| {
            let result: JsValue<'_> = ctx
                .eval(script.text())
                .map_err(|e| self.catch(ctx, &e))?;
            let result = self.settle(ctx, result)?;
            js_to_value(result)
        })
    }

    pub fn eval_file(&self, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)?;
        self.eval(&Script::new(source).with_label(path.display().to_string()))
            .map(drop)
    }

    pub fn call(&self, name: &str, args: Vec<Arg>) -> Result<Value> {
        self.enter(|ctx| {
            let target: JsValue<'_> = ctx
                .globals()
                .get(name)
                .map_err(|e| self.catch(ctx, &e))?;
            let Some(func) = target.as_function() else {
                return Err(Error::FunctionNotFound(name.to_owned()));
            };

            let mut positional = Vec::with_capacity(args.len());
            let mut named = Vec::new();
            for arg in args {
                match arg {
                    Arg::Positional(value) => positional.push(value),
                    Arg::Named(key, value) => named.push((key, value)),
                }
            }

            let mut js_args = Args::new(ctx.clone(), positional.len() + 1);
            for value in &positional {
                let value = value_to_js(ctx, value).map_err(|e| Error::engine(&e))?;
                js_args.push_arg(value).map_err(|e| self.catch(ctx, &e))?;
            }
            if !named.is_empty() {
                let opts = Object::new(ctx.clone()).map_err(|e| Error::engine(&e))?;
                for (key, value) in &named {
                    let value = value_to_js(ctx, value).map_err(|e| Error::engine(&e))?;
                    opts.set(key.as_str(), value).map_err(|e| self.catch(ctx, &e))?;
                }
                js_args.push_arg(opts).map_err(|e| self.catch(ctx, &e))?;
            }

            let result: JsValue<'_> = func.call_arg(js_args).map_err(|e| self.catch(ctx, &e))?;
            let result = self.settle(ctx, result)?;
            js_to_value(result)
        })
    }

    /// Wait for a promise result and run every queued job, so imports and
    /// other deferred work finish before the call returns. A rejection left
    /// without a handler fails the call.
    fn settle<'js>(&self, ctx: &Ctx<'js>, value: JsValue<'js>) -> Result<JsValue<'js>> {
        let value = match value.as_promise() {
            Some(promise) => self.drive_promise(ctx, promise)?,
            None => value,
        };
        while ctx.execute_pending_job() {}
        self.host.errors.take_unhandled().map_or(Ok(value), Err)
    }

    fn drive_promise<'js>(&self, ctx: &Ctx<'js>, promise: &Promise<'js>) -> Result<JsValue<'js>> {
        loop {
            match promise.result::<JsValue<'js>>() {
                Some(Ok(value)) => return Ok(value),
                Some(Err(err)) => return Err(self.catch(ctx, &err)),
                None => {}
            }
            // Use ctx.execute_pending_job() (not the runtime's) since we are
            // already inside context.with().
            if !ctx.execute_pending_job() {
                return Err(self
                    .host
                    .errors
                    .take_deferred()
                    .unwrap_or_else(|| Error::Engine("promise never settled".into())));
            }
        }
    }
}
