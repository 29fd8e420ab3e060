use rquickjs::{Ctx, Function, Object, convert::Coerced, function::Rest};
use tracing::Level;

use super::HostContext;

const METHODS: [(&str, Level); 5] = [
    ("log", Level::INFO),
    ("info", Level::INFO),
    ("debug", Level::DEBUG),
    ("warn", Level::WARN),
    ("error", Level::ERROR),
];

pub fn register(ctx: &Ctx<'_>, host: &HostContext) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    for (name, level) in METHODS {
        let http = host.http.clone();
        console.set(
            name,
            Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
                let message = args
                    .0
                    .iter()
                    .map(|arg| arg.0.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                http.host().console(level, &message);
            })?,
        )?;
    }
    ctx.globals().set("console", console)
}
