use std::{
    env::{args, var_os},
    path::PathBuf,
};

use anyhow::{Context, anyhow};
use jsbridge::{Arg, Session, SessionBuilder, SessionConfig, Value};
use tracing::Level;

const USAGE: &str = "\
Usage:
  jsbridge eval <expression>
  jsbridge run <file> [function [json-args...]]

Environment:
  JSBRIDGE_ROOT    directory for import() and importScripts()
  JSBRIDGE_CONFIG  JSON session configuration file
  RUST_LOG         log filter (default: info)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let mut argv = args().skip(1);
    let task = argv.next();
    match task.as_deref() {
        Some("eval") => {
            let expr = argv.next().context("eval needs an expression")?;
            let mut session = builder()?.build()?;
            let value = session.evaluate_value(expr).await?;
            println!("{}", value.to_json());
            session.close();
            Ok(())
        }
        Some("run") => {
            let file = argv.next().context("run needs a script file")?;
            let file = std::path::absolute(&file)?;
            let mut session = builder()?.bootstrap(file).strict_bootstrap(true).build()?;
            if let Some(function) = argv.next() {
                let args = argv
                    .map(|raw| {
                        Value::from_json(&raw)
                            .map(Arg::Positional)
                            .with_context(|| format!("argument {raw:?} is not JSON"))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let value = session.call_function_value(&function, args).await?;
                println!("{}", value.to_json());
            }
            session.close();
            Ok(())
        }
        None | Some("help" | "-h" | "--help") => {
            println!("{USAGE}");
            Ok(())
        }
        Some(other) => {
            eprintln!("{USAGE}");
            Err(anyhow!("unknown task {other:?}"))
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

fn builder() -> anyhow::Result<SessionBuilder> {
    let mut config = match var_os("JSBRIDGE_CONFIG") {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", PathBuf::from(&path).display()))?;
            serde_json::from_str::<SessionConfig>(&text).context("invalid session config")?
        }
        None => SessionConfig::default(),
    };
    if let Some(root) = var_os("JSBRIDGE_ROOT") {
        config.root_dir = PathBuf::from(root);
    }
    Ok(Session::builder().config(config))
}
