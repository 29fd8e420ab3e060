//! File-based script import.
//!
//! `import("lib.js")` goes through the engine's module loader and
//! `importScripts("lib.js")` is the synchronous global. Both evaluate the
//! file as a classic script in the session's global scope, so its top-level
//! declarations stay visible to later evaluations.
//!
//! `import()` runs as a queued job, after the calling script has finished:
//! `import("a.js"); a()` in one script fails, while `a()` in the next call
//! works. Scripts that need the definitions right away use `importScripts`.

use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use rquickjs::{
    Ctx, Function,
    convert::Coerced,
    function::Rest,
    loader::{Loader, Resolver},
    module::{Declared, Module},
};

use super::{HostContext, HostErrors};
use crate::error::{Error, Result};

/// Resolve `name` against `root`, rejecting paths that leave it.
pub fn resolve_path(root: &Path, name: &str) -> Result<PathBuf> {
    if name.trim().is_empty() {
        return Err(Error::Argument("import requires a path".into()));
    }
    let root = normalize(root);
    let resolved = normalize(&root.join(name));
    if !resolved.starts_with(&root) || resolved.components().any(|c| c == Component::ParentDir) {
        return Err(Error::Argument(format!(
            "import path {name:?} is outside {}",
            root.display()
        )));
    }
    Ok(resolved)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Read the script `name` refers to.
pub fn read_script(root: &Path, name: &str) -> Result<String> {
    let path = resolve_path(root, name)?;
    tracing::debug!(path = %path.display(), "importing script");
    Ok(std::fs::read_to_string(path)?)
}

pub fn register<'js>(ctx: &Ctx<'js>, host: &HostContext) -> rquickjs::Result<()> {
    let h = host.clone();
    ctx.globals().set(
        "importScripts",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, paths: Rest<Coerced<String>>| -> rquickjs::Result<()> {
                for path in paths.0 {
                    let source = h.lift(&ctx, read_script(&h.root_dir, &path.0))?;
                    ctx.eval::<(), _>(source)?;
                }
                Ok(())
            },
        )?,
    )
}

/// Module-name resolution for `import()`: every specifier is a path
/// relative to the session root.
pub(crate) struct ScriptResolver {
    root_dir: Arc<PathBuf>,
    errors: HostErrors,
}

impl ScriptResolver {
    pub fn new(root_dir: Arc<PathBuf>, errors: HostErrors) -> Self {
        Self { root_dir, errors }
    }
}

impl Resolver for ScriptResolver {
    fn resolve<'js>(&mut self, _ctx: &Ctx<'js>, base: &str, name: &str) -> rquickjs::Result<String> {
        match resolve_path(&self.root_dir, name) {
            Ok(path) => Ok(path.to_string_lossy().into_owned()),
            Err(err) => {
                self.errors.defer(err);
                Err(rquickjs::Error::new_resolving(base, name))
            }
        }
    }
}

/// Evaluates the resolved file as a global script and hands the engine an
/// empty module in its place.
pub(crate) struct ScriptLoader {
    errors: HostErrors,
}

impl ScriptLoader {
    pub fn new(errors: HostErrors) -> Self {
        Self { errors }
    }
}

impl Loader for ScriptLoader {
    fn load<'js>(&mut self, ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Module<'js, Declared>> {
        let source = match std::fs::read_to_string(name) {
            Ok(source) => source,
            Err(err) => {
                self.errors.defer(Error::Io(err));
                return Err(rquickjs::Error::new_loading(name));
            }
        };
        if let Err(err) = ctx.eval::<(), _>(source) {
            let err = self.errors.catch(ctx, &err);
            self.errors.defer(err);
            return Err(rquickjs::Error::new_loading(name));
        }
        Module::declare(ctx.clone(), name, "")
    }
}
