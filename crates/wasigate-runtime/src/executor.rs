//! Single-shot WASI module execution.
//!
//! The executor owns the Wasmtime engine and the compiled-module cache.
//! Every call to [`Executor::run`] builds a fresh store and WASI context
//! from the given invocation environment, runs the module's `_start`
//! export to completion, and returns the captured output. Nothing from
//! one run is visible to the next.
//!
//! # Examples
//!
//! ```no_run
//! use wasigate_core::ModuleId;
//! use wasigate_core::invocation::InvocationEnv;
//! use wasigate_runtime::{Executor, RuntimeLimits};
//!
//! # async fn example() -> wasigate_core::Result<()> {
//! let executor = Executor::new(RuntimeLimits::default(), 16)?;
//! let image = std::fs::read("php.wasm").unwrap();
//!
//! let invocation = InvocationEnv::builder(ModuleId::new("php.wasm"))
//!     .arg("index.php")
//!     .env("REQUEST_METHOD", "GET")
//!     .build();
//!
//! let output = executor.run(&image, &invocation).await?;
//! println!("{}", output.stdout_lossy());
//! # Ok(())
//! # }
//! ```

use crate::cache::{ImageKey, ModuleCache};
use crate::limits::{GuestMemoryLimiter, RuntimeLimits};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;
use wasigate_core::invocation::InvocationEnv;
use wasigate_core::output::CapturedOutput;
use wasigate_core::stats::RuntimeStats;
use wasigate_core::{Error, Result};
use wasmtime::{Config, Engine, Linker, Module, Store};
use wasmtime_wasi::p1::{self, WasiP1Ctx};
use wasmtime_wasi::p2::pipe::MemoryOutputPipe;
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

/// How often the epoch ticker fires; one tick is one epoch increment.
const EPOCH_TICK: std::time::Duration = std::time::Duration::from_millis(10);

/// Store data combining the WASI context and the memory limiter.
struct StoreData {
    wasi: WasiP1Ctx,
    limiter: GuestMemoryLimiter,
}

/// WASI command executor with per-run isolation.
///
/// # Thread Safety
///
/// `Send + Sync`; runs may proceed concurrently, each with its own store
/// and WASI context. Only the module cache is shared.
pub struct Executor {
    engine: Engine,
    limits: RuntimeLimits,
    cache: ModuleCache,

    total_executions: AtomicU32,
    execution_failures: AtomicU32,
    compilation_failures: AtomicU32,
    total_execution_time_us: AtomicU64,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("limits", &self.limits)
            .field("cache", &self.cache)
            .field(
                "total_executions",
                &self.total_executions.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor with the given limits and module-cache
    /// capacity.
    ///
    /// Spawns a background thread that advances the engine epoch so
    /// running guests yield periodically and the execution timeout can
    /// fire even inside tight guest loops.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the Wasmtime engine cannot be built.
    pub fn new(limits: RuntimeLimits, cache_capacity: usize) -> Result<Self> {
        let mut config = Config::new();
        config.async_support(true);
        config.epoch_interruption(true);
        config.strategy(wasmtime::Strategy::Cranelift);

        let engine = Engine::new(&config).map_err(|e| Error::Config {
            message: format!("failed to create Wasmtime engine: {e}"),
        })?;

        // Ticker outlives nothing: it exits once the engine is dropped.
        let weak = engine.weak();
        std::thread::spawn(move || {
            loop {
                std::thread::sleep(EPOCH_TICK);
                match weak.upgrade() {
                    Some(engine) => engine.increment_epoch(),
                    None => break,
                }
            }
        });

        Ok(Self {
            engine,
            limits,
            cache: ModuleCache::new(cache_capacity),
            total_executions: AtomicU32::new(0),
            execution_failures: AtomicU32::new(0),
            compilation_failures: AtomicU32::new(0),
            total_execution_time_us: AtomicU64::new(0),
        })
    }

    /// Runs the module image once under the given invocation environment
    /// and returns its captured output.
    ///
    /// # Errors
    ///
    /// Returns the stage-specific error: `Compile` for an invalid image,
    /// `Instantiate` when linking or the `_start` export fails,
    /// `Execution` for traps and non-zero exits, `Timeout` when the run
    /// exceeds its wall-clock limit.
    pub async fn run(
        &self,
        image: &[u8],
        invocation: &InvocationEnv,
    ) -> Result<CapturedOutput> {
        let start = Instant::now();
        self.total_executions.fetch_add(1, Ordering::Relaxed);

        let module = match self.compiled_module(image) {
            Ok(module) => module,
            Err(err) => {
                self.record_failure(start);
                return Err(err);
            }
        };

        let stdout = MemoryOutputPipe::new(self.limits.max_output_bytes());
        let stderr = MemoryOutputPipe::new(self.limits.max_output_bytes());
        let wasi = match self.build_wasi_ctx(invocation, stdout.clone(), stderr.clone()) {
            Ok(wasi) => wasi,
            Err(err) => {
                self.record_failure(start);
                return Err(err);
            }
        };

        let mut store = Store::new(
            &self.engine,
            StoreData {
                wasi,
                limiter: GuestMemoryLimiter {
                    max_memory_bytes: self.limits.memory_limit().bytes(),
                },
            },
        );
        store.limiter(|data| &mut data.limiter);
        // Yield to the runtime on every epoch tick so the timeout below
        // is observed even while the guest is busy.
        store.epoch_deadline_async_yield_and_update(1);

        let mut linker = Linker::new(&self.engine);
        p1::add_to_linker_async(&mut linker, |data: &mut StoreData| &mut data.wasi).map_err(
            |e| Error::Instantiate {
                message: format!("failed to link WASI imports: {e}"),
            },
        )?;

        // One deadline covers instantiation and the entry call: a core
        // start section runs during instantiation and must not escape
        // the wall-clock limit.
        let timeout = self.limits.execution_timeout();
        let outcome = tokio::time::timeout(timeout, async {
            let instance = linker
                .instantiate_async(&mut store, &module)
                .await
                .map_err(|e| Error::Instantiate {
                    message: format!("failed to instantiate module: {e}"),
                })?;

            let entry = instance
                .get_typed_func::<(), ()>(&mut store, "_start")
                .map_err(|e| Error::Instantiate {
                    message: format!("entry point '_start' not found: {e}"),
                })?;

            match entry.call_async(&mut store, ()).await {
                Ok(()) => Ok(0),
                Err(trap) => match trap.downcast_ref::<I32Exit>() {
                    // A WASI command signals completion through proc_exit;
                    // status zero is a normal return.
                    Some(exit) if exit.0 == 0 => Ok(0),
                    Some(exit) => Err(Error::Execution {
                        message: format!("module exited with status {}", exit.0),
                    }),
                    None => Err(Error::Execution {
                        message: format!("module trapped: {trap}"),
                    }),
                },
            }
        })
        .await;

        let exit_code = match outcome {
            Err(_) => {
                self.record_failure(start);
                tracing::error!("execution timed out after {:?}", timeout);
                return Err(Error::Timeout {
                    operation: "module run".to_string(),
                    duration_secs: timeout.as_secs(),
                });
            }
            Ok(Err(err)) => {
                self.record_failure(start);
                tracing::error!(error = %err, "module run failed");
                return Err(err);
            }
            Ok(Ok(code)) => code,
        };

        // Release the store before draining the pipes.
        drop(store);

        let elapsed = start.elapsed();
        self.total_execution_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        tracing::info!(?elapsed, exit_code, "module run completed");

        Ok(CapturedOutput::new(
            stdout.contents().to_vec(),
            stderr.contents().to_vec(),
            exit_code,
            elapsed,
        ))
    }

    /// Fetches the compiled module from the cache, compiling on a miss.
    fn compiled_module(&self, image: &[u8]) -> Result<Module> {
        let key = ImageKey::for_image(image);
        if let Some(module) = self.cache.get(&key) {
            tracing::debug!(key = %key, "using cached module");
            return Ok(module);
        }

        tracing::debug!(bytes = image.len(), "compiling module image");
        let started = Instant::now();
        let module = Module::new(&self.engine, image).map_err(|e| {
            self.compilation_failures.fetch_add(1, Ordering::Relaxed);
            Error::Compile {
                message: format!("failed to compile module image: {e}"),
            }
        })?;
        tracing::info!(elapsed = ?started.elapsed(), "module compiled");

        self.cache.insert(key, module.clone());
        Ok(module)
    }

    /// Projects the invocation environment into a WASI preview 1 context.
    fn build_wasi_ctx(
        &self,
        invocation: &InvocationEnv,
        stdout: MemoryOutputPipe,
        stderr: MemoryOutputPipe,
    ) -> Result<WasiP1Ctx> {
        let mut builder = WasiCtxBuilder::new();
        builder.args(invocation.args());
        for (key, value) in invocation.env_vars() {
            builder.env(key, value);
        }
        builder.stdout(stdout);
        builder.stderr(stderr);

        for mount in invocation.mounts() {
            let (dir_perms, file_perms) = if mount.writable {
                (DirPerms::all(), FilePerms::all())
            } else {
                (DirPerms::READ, FilePerms::READ)
            };
            builder
                .preopened_dir(&mount.host, &mount.guest, dir_perms, file_perms)
                .map_err(|e| Error::Instantiate {
                    message: format!(
                        "cannot expose {} at {}: {e}",
                        mount.host.display(),
                        mount.guest
                    ),
                })?;
        }

        Ok(builder.build_p1())
    }

    /// Counts a failed run and folds its elapsed time into the totals so
    /// the average in [`Executor::collect_stats`] covers every run.
    fn record_failure(&self, start: Instant) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
        self.total_execution_time_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
    }

    /// Returns the shared Wasmtime engine.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the configured limits.
    #[must_use]
    pub fn limits(&self) -> &RuntimeLimits {
        &self.limits
    }

    /// Snapshots execution metrics.
    #[must_use]
    pub fn collect_stats(&self) -> RuntimeStats {
        let total_executions = self.total_executions.load(Ordering::Relaxed);
        let total_time_us = self.total_execution_time_us.load(Ordering::Relaxed);

        let avg_execution_time_us = if total_executions > 0 {
            total_time_us / u64::from(total_executions)
        } else {
            0
        };

        RuntimeStats::new(
            total_executions,
            self.cache.hits(),
            self.execution_failures.load(Ordering::Relaxed),
            self.compilation_failures.load(Ordering::Relaxed),
            avg_execution_time_us,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasigate_core::ModuleId;

    fn invocation() -> InvocationEnv {
        InvocationEnv::builder(ModuleId::new("test.wasm")).build()
    }

    #[test]
    fn test_executor_creation() {
        let executor = Executor::new(RuntimeLimits::default(), 4);
        assert!(executor.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_image_is_compile_error() {
        let executor = Executor::new(RuntimeLimits::default(), 4).unwrap();
        let err = executor
            .run(&[0x00, 0x61, 0x73, 0x6d, 0xff], &invocation())
            .await
            .unwrap_err();
        assert!(err.is_compile());

        let stats = executor.collect_stats();
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.compilation_failures, 1);
        assert_eq!(stats.execution_failures, 1);
    }

    #[tokio::test]
    async fn test_missing_start_is_instantiate_error() {
        let executor = Executor::new(RuntimeLimits::default(), 4).unwrap();
        let image = wat::parse_str("(module)").unwrap();
        let err = executor.run(&image, &invocation()).await.unwrap_err();
        assert!(err.is_instantiate());
    }

    #[tokio::test]
    async fn test_stats_empty_executor() {
        let executor = Executor::new(RuntimeLimits::default(), 4).unwrap();
        let stats = executor.collect_stats();
        assert_eq!(stats.total_executions, 0);
        assert_eq!(stats.avg_execution_time_us, 0);
        assert!(stats.cache_hit_rate().is_none());
    }
}
