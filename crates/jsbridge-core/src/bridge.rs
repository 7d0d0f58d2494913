//! Cross-thread dispatch bridge into the scripting engine.
//!
//! Every trampoline of a synthesized proxy funnels through here. The bridge
//! owns the engine's designated thread: calls made on that thread run the
//! foreign invocation inline and synchronously, calls from any other thread
//! are queued to it while the caller polls a completion flag at a short tick
//! until the result lands or the wait budget runs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::value::{TypeTag, Value};

/// The opaque foreign call into the scripting engine.
///
/// Implementations run on the engine's designated thread (or inline when the
/// caller already is that thread). A returned `Err` carries the engine's own
/// failure message.
pub trait ForeignEngine: Send + Sync {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, String>;
}

/// Outcome of one dispatched foreign call.
///
/// Tagged so callers can tell a genuine zero/false/null result from a timed
/// out or failed round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The foreign call completed and produced this value.
    Completed(Value),
    /// The wait budget elapsed before the engine signalled completion.
    TimedOut,
    /// The engine rejected the call or returned an unusable result.
    EngineError(String),
}

impl DispatchOutcome {
    /// Collapse to a concrete value of the declared return kind.
    ///
    /// Degraded outcomes produce the kind's zero value and log a warning,
    /// matching the historical proxy surface where a timeout is
    /// indistinguishable from a default result.
    pub fn into_value(self, ret: TypeTag, method: &str) -> Value {
        match self {
            DispatchOutcome::Completed(v) if ret == TypeTag::Void => {
                // Void dispatch discards whatever the engine produced.
                let _ = v;
                Value::Null
            }
            DispatchOutcome::Completed(v) => v,
            DispatchOutcome::TimedOut => {
                tracing::warn!(
                    target: "jsbridge::bridge",
                    method,
                    "foreign call timed out, returning default {} value",
                    ret
                );
                ret.default_value()
            }
            DispatchOutcome::EngineError(msg) => {
                tracing::warn!(
                    target: "jsbridge::bridge",
                    method,
                    error = %msg,
                    "foreign call failed, returning default {} value",
                    ret
                );
                ret.default_value()
            }
        }
    }
}

/// Wait parameters for cross-thread dispatch.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Poll interval while waiting for completion.
    pub tick: Duration,
    /// Maximum total wait before the call degrades to a timeout.
    pub max_wait: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            tick: Duration::from_millis(3),
            max_wait: Duration::from_millis(300_000),
        }
    }
}

/// Completion slot shared between the caller and the engine thread.
///
/// The result is written before the flag is released, so a caller that
/// acquires the flag always observes the result.
struct CallSlot {
    done: AtomicBool,
    result: Mutex<Option<Result<Value, String>>>,
}

impl CallSlot {
    fn new() -> Self {
        CallSlot {
            done: AtomicBool::new(false),
            result: Mutex::new(None),
        }
    }
}

struct DispatchJob {
    method: String,
    args: Vec<Value>,
    slot: Arc<CallSlot>,
}

/// Cross-thread call forwarder connecting generated proxies to the engine.
pub struct DispatchBridge {
    engine: Arc<dyn ForeignEngine>,
    tx: Option<Sender<DispatchJob>>,
    engine_thread: ThreadId,
    handle: Option<JoinHandle<()>>,
    config: BridgeConfig,
}

impl DispatchBridge {
    /// Spawn the engine thread with default wait parameters.
    pub fn new(engine: Arc<dyn ForeignEngine>) -> Self {
        Self::with_config(engine, BridgeConfig::default())
    }

    /// Spawn the engine thread with explicit wait parameters.
    pub fn with_config(engine: Arc<dyn ForeignEngine>, config: BridgeConfig) -> Self {
        let (tx, rx) = channel::unbounded::<DispatchJob>();
        let loop_engine = engine.clone();
        let handle = thread::spawn(move || engine_loop(rx, loop_engine));
        let engine_thread = handle.thread().id();

        DispatchBridge {
            engine,
            tx: Some(tx),
            engine_thread,
            handle: Some(handle),
            config,
        }
    }

    /// Whether the current thread is the engine's designated thread.
    pub fn is_engine_thread(&self) -> bool {
        thread::current().id() == self.engine_thread
    }

    /// Forward a call to the engine and wait for its result.
    ///
    /// On the engine thread the call runs inline; otherwise it is queued and
    /// the calling thread polls the completion flag every `tick` up to
    /// `max_wait`.
    pub fn dispatch(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        if self.is_engine_thread() {
            return match self.engine.invoke(method, &args) {
                Ok(v) => DispatchOutcome::Completed(v),
                Err(e) => DispatchOutcome::EngineError(e),
            };
        }

        let slot = Arc::new(CallSlot::new());
        let job = DispatchJob {
            method: method.to_string(),
            args,
            slot: slot.clone(),
        };
        let Some(tx) = self.tx.as_ref() else {
            return DispatchOutcome::EngineError("bridge is shut down".to_string());
        };
        if tx.send(job).is_err() {
            return DispatchOutcome::EngineError("engine thread is gone".to_string());
        }

        let mut waited = Duration::ZERO;
        while !slot.done.load(Ordering::Acquire) {
            if waited >= self.config.max_wait {
                return DispatchOutcome::TimedOut;
            }
            thread::sleep(self.config.tick);
            waited += self.config.tick;
        }

        let outcome = match slot.result.lock().take() {
            Some(Ok(v)) => DispatchOutcome::Completed(v),
            Some(Err(e)) => DispatchOutcome::EngineError(e),
            None => DispatchOutcome::EngineError("completion flag set without a result".to_string()),
        };
        outcome
    }

    /// Dispatch expecting a particular return kind.
    ///
    /// A completed value of the wrong kind is an engine error, never a
    /// silent coercion.
    fn dispatch_expect(&self, ret: TypeTag, method: &str, args: Vec<Value>) -> DispatchOutcome {
        match self.dispatch(method, args) {
            DispatchOutcome::Completed(_) if ret == TypeTag::Void => {
                DispatchOutcome::Completed(Value::Null)
            }
            DispatchOutcome::Completed(v) => {
                if v.matches_tag(ret) {
                    DispatchOutcome::Completed(v)
                } else {
                    DispatchOutcome::EngineError(format!(
                        "{}: engine returned {} where {} was declared",
                        method,
                        v.tag(),
                        ret
                    ))
                }
            }
            other => other,
        }
    }

    // Return-type-specific entry points, one per kind tag. These are what
    // the synthesized trampolines bind to.

    pub fn dispatch_void(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::Void, method, args)
    }

    pub fn dispatch_bool(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::Bool, method, args)
    }

    pub fn dispatch_i8(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::I8, method, args)
    }

    pub fn dispatch_i16(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::I16, method, args)
    }

    pub fn dispatch_i32(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::I32, method, args)
    }

    pub fn dispatch_i64(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::I64, method, args)
    }

    pub fn dispatch_f32(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::F32, method, args)
    }

    pub fn dispatch_f64(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::F64, method, args)
    }

    pub fn dispatch_char(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::Char, method, args)
    }

    pub fn dispatch_ref(&self, method: &str, args: Vec<Value>) -> DispatchOutcome {
        self.dispatch_expect(TypeTag::Ref, method, args)
    }

    /// Dispatch through the entry point matching `ret`.
    pub fn dispatch_for(&self, ret: TypeTag, method: &str, args: Vec<Value>) -> DispatchOutcome {
        match ret {
            TypeTag::Void => self.dispatch_void(method, args),
            TypeTag::Bool => self.dispatch_bool(method, args),
            TypeTag::I8 => self.dispatch_i8(method, args),
            TypeTag::I16 => self.dispatch_i16(method, args),
            TypeTag::I32 => self.dispatch_i32(method, args),
            TypeTag::I64 => self.dispatch_i64(method, args),
            TypeTag::F32 => self.dispatch_f32(method, args),
            TypeTag::F64 => self.dispatch_f64(method, args),
            TypeTag::Char => self.dispatch_char(method, args),
            TypeTag::Ref => self.dispatch_ref(method, args),
        }
    }
}

impl Drop for DispatchBridge {
    fn drop(&mut self) {
        // Closing the channel ends the engine loop; join so no job outlives
        // the bridge.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn engine_loop(rx: Receiver<DispatchJob>, engine: Arc<dyn ForeignEngine>) {
    for job in rx.iter() {
        let result = engine.invoke(&job.method, &job.args);
        *job.slot.result.lock() = Some(result);
        job.slot.done.store(true, Ordering::Release);
    }
}
