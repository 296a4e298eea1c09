use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{anyhow, Context as AnyhowContext};
use rquickjs::{BigInt, Context, Ctx, Error as JsError, Function, Runtime, Value as JsValue};

use super::Engine;
use crate::config::{DriverConfig, DEFAULT_ENGINE_ENTRY_POINT};
use crate::error::Result;
use crate::ids::CallbackId;
use crate::value::Value;

const MAX_PENDING_JOBS: usize = 1000;

/// Engine whose application logic is a script running in QuickJS.
///
/// Scripts emit batches with `__dom_driver.bulk_update(commands)` (an array or
/// an already serialized string) and receive callbacks through a global
/// function, `__engine_callback(callbackId, payload)` unless configured
/// otherwise. `callbackId` is a `BigInt` so every `u64` id arrives exact.
/// Payloads and responses cross as JSON; buffers arrive as arrays of byte
/// values. `console.*` is forwarded to `tracing`.
pub struct QuickJsEngine {
    runtime: Runtime,
    context: Context,
    entry_point: String,
    outbox: Rc<RefCell<VecDeque<String>>>,
}

impl QuickJsEngine {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_entry_point(DEFAULT_ENGINE_ENTRY_POINT)
    }

    pub fn from_config(config: &DriverConfig) -> anyhow::Result<Self> {
        Self::with_entry_point(&config.engine_entry_point)
    }

    pub fn with_entry_point(entry_point: &str) -> anyhow::Result<Self> {
        let runtime = Runtime::new().context("failed to create QuickJS runtime")?;
        let context = Context::full(&runtime).context("failed to create QuickJS context")?;
        let engine = Self {
            runtime,
            context,
            entry_point: entry_point.to_string(),
            outbox: Rc::new(RefCell::new(VecDeque::new())),
        };
        engine.install_bindings()?;
        Ok(engine)
    }

    /// Evaluate a script and discard the result.
    pub fn eval(&self, source: &str, filename: &str) -> anyhow::Result<()> {
        let script = with_source_url(source, filename);
        self.context
            .with(|ctx| {
                ctx.eval::<(), _>(script)
                    .map_err(|error| js_error(&ctx, error))
            })
            .with_context(|| format!("failed to evaluate {filename}"))?;
        self.execute_pending_jobs();
        Ok(())
    }

    fn install_bindings(&self) -> anyhow::Result<()> {
        let outbox = Rc::clone(&self.outbox);
        self.context
            .with(|ctx| {
                let global = ctx.globals();
                let log_fn =
                    Function::new(ctx.clone(), log_from_js)?.with_name("__dom_driver_log")?;
                global.set("__dom_driver_log", log_fn)?;

                let emit_fn = Function::new(ctx.clone(), move |batch: String| {
                    tracing::trace!(target: "quickjs", len = batch.len(), "bulk_update");
                    outbox.borrow_mut().push_back(batch);
                })?
                .with_name("__dom_driver_emit")?;
                global.set("__dom_driver_emit", emit_fn)?;

                ctx.eval::<(), _>(BINDINGS_BOOTSTRAP.as_bytes())
            })
            .map_err(anyhow::Error::from)
    }

    fn execute_pending_jobs(&self) {
        let mut job_count = 0;
        while self.runtime.is_job_pending() {
            match self.runtime.execute_pending_job() {
                Ok(true) => {
                    job_count += 1;
                    if job_count >= MAX_PENDING_JOBS {
                        tracing::warn!(
                            target: "quickjs",
                            "Stopped processing jobs after {} iterations (possible infinite loop)",
                            MAX_PENDING_JOBS
                        );
                        break;
                    }
                }
                Ok(false) => break,
                Err(job_exception) => {
                    tracing::error!(target: "quickjs", "Job execution error: {:?}", job_exception);
                    break;
                }
            }
        }
        if job_count > 0 {
            tracing::debug!(target: "quickjs", "Executed {} pending jobs", job_count);
        }
    }

    fn call_entry_point(
        &self,
        callback_id: CallbackId,
        payload: Option<String>,
    ) -> anyhow::Result<Option<String>> {
        let entry_point = self.entry_point.as_str();
        self.context.with(|ctx| {
            let call = || -> rquickjs::Result<Option<String>> {
                let entry: Function = ctx.globals().get(entry_point)?;
                let payload = match payload {
                    Some(json) => ctx.json_parse(json)?,
                    None => JsValue::new_undefined(ctx.clone()),
                };
                let id = BigInt::from_u64(ctx.clone(), callback_id.to_u64())?;
                let response: JsValue = entry.call((id, payload))?;
                match ctx.json_stringify(response)? {
                    Some(text) => text.to_string().map(Some),
                    None => Ok(None),
                }
            };
            call().map_err(|error| js_error(&ctx, error))
        })
    }
}

impl Engine for QuickJsEngine {
    fn callback(&self, callback_id: CallbackId, payload: Option<Value>) -> Result<Option<Value>> {
        let payload = payload.map(|value| value.to_json().to_string());
        let response = self
            .call_entry_point(callback_id, payload)
            .with_context(|| format!("{} failed for callback {callback_id}", self.entry_point));
        self.execute_pending_jobs();

        let Some(raw) = response? else {
            return Ok(None);
        };
        let json: serde_json::Value =
            serde_json::from_str(&raw).context("engine response is not valid JSON")?;
        Ok(Some(Value::from_json(&json)))
    }

    fn take_pending_batches(&self) -> Vec<String> {
        self.outbox.borrow_mut().drain(..).collect()
    }
}

fn log_from_js(message: String) -> rquickjs::Result<()> {
    tracing::info!(target: "quickjs", message = %message);
    Ok(())
}

fn js_error(ctx: &Ctx<'_>, error: JsError) -> anyhow::Error {
    match error {
        JsError::Exception => anyhow!(capture_exception_message(ctx)),
        other => anyhow::Error::from(other),
    }
}

fn capture_exception_message(ctx: &Ctx<'_>) -> String {
    let exception: JsValue = ctx.catch();

    if let Some(obj) = exception.as_object() {
        if let Ok(message) = obj.get::<_, String>("message") {
            if let Ok(stack) = obj.get::<_, String>("stack") {
                return format!("Error: {}\nStack: {}", message, stack);
            }
            return format!("Error: {}", message);
        }
    }

    format!("{:?}", exception)
}

fn with_source_url(source: &str, filename: &str) -> Vec<u8> {
    let mut script = String::with_capacity(source.len() + filename.len() + 32);
    script.push_str(source);
    if !source.ends_with('\n') {
        script.push('\n');
    }
    script.push_str("//# sourceURL=");
    script.push_str(filename);
    script.push('\n');
    script.into_bytes()
}

const BINDINGS_BOOTSTRAP: &str = r#"
(() => {
    const global = globalThis;
    const stringify = (value) => {
        try {
            if (typeof value === 'string') {
                return value;
            }
            if (value === undefined) {
                return 'undefined';
            }
            if (value === null) {
                return 'null';
            }
            if (typeof value === 'object') {
                return JSON.stringify(value);
            }
            return String(value);
        } catch (err) {
            return '[unprintable]';
        }
    };

    const logImpl = (...args) => {
        try {
            global.__dom_driver_log(args.map(stringify).join(' '));
        } catch (err) {
            // console must never throw
        }
    };

    global.console = {
        log: logImpl,
        error: logImpl,
        warn: logImpl,
        info: logImpl,
        debug: logImpl,
    };

    global.__dom_driver = {
        bulk_update(commands) {
            const batch = typeof commands === 'string' ? commands : JSON.stringify(commands);
            global.__dom_driver_emit(batch);
        },
    };
})();
"#;
