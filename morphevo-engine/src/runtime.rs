use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether an [`EngineRuntime`] is currently live in this process.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// The process-wide engine runtime.
///
/// Owns every worker pool used for fitness evaluation. At most one
/// runtime may be live at a time; it is released exactly once,
/// either explicitly through [`EngineRuntime::shutdown`] or when
/// dropped, so every exit path (including early returns on errors)
/// tears the worker threads down.
pub struct EngineRuntime {
    pools: Vec<Arc<ThreadPool>>,
    released: bool,
}

/// Errors raised while acquiring the runtime or building worker pools.
#[derive(Debug)]
pub enum RuntimeError {
    /// Another runtime is still live in this process.
    AlreadyActive,
    /// The worker pool could not be spawned.
    PoolBuild(ThreadPoolBuildError),
}

impl EngineRuntime {
    /// Acquires the engine runtime.
    ///
    /// # Errors
    /// Returns [`RuntimeError::AlreadyActive`] if another
    /// runtime has not been released yet.
    ///
    /// # Examples
    /// ```
    /// use morphevo_engine::EngineRuntime;
    ///
    /// let runtime = EngineRuntime::acquire().unwrap();
    /// assert!(EngineRuntime::is_active());
    /// assert!(EngineRuntime::acquire().is_err());
    ///
    /// runtime.shutdown();
    /// assert!(!EngineRuntime::is_active());
    /// ```
    pub fn acquire() -> Result<EngineRuntime, RuntimeError> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RuntimeError::AlreadyActive)?;
        log::debug!("Engine runtime acquired");
        Ok(EngineRuntime {
            pools: vec![],
            released: false,
        })
    }

    /// Returns whether a runtime is currently live.
    pub fn is_active() -> bool {
        ACTIVE.load(Ordering::Acquire)
    }

    /// Returns the number of processors available to the process,
    /// which is the pool size used when no thread count is requested.
    pub fn available_processors() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Builds a worker pool owned by this runtime.
    ///
    /// A `threads` value of 0 sizes the pool to the
    /// [available processors](EngineRuntime::available_processors).
    ///
    /// # Errors
    /// Returns an error if the operating system refuses
    /// to spawn the worker threads.
    ///
    /// # Examples
    /// ```
    /// use morphevo_engine::EngineRuntime;
    ///
    /// let mut runtime = EngineRuntime::acquire().unwrap();
    /// let pool = runtime.worker_pool(3).unwrap();
    /// assert_eq!(pool.current_num_threads(), 3);
    /// ```
    pub fn worker_pool(&mut self, threads: usize) -> Result<Arc<ThreadPool>, RuntimeError> {
        let threads = if threads > 0 {
            threads
        } else {
            Self::available_processors()
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("morphevo-worker-{}", i))
            .build()
            .map_err(RuntimeError::PoolBuild)?;
        let pool = Arc::new(pool);
        self.pools.push(Arc::clone(&pool));
        log::debug!("Built worker pool with {} threads", threads);
        Ok(pool)
    }

    /// Releases the runtime and its worker pools.
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        // Pools still shared with live sessions keep their threads
        // until those sessions drop their handles.
        self.pools.clear();
        self.released = true;
        ACTIVE.store(false, Ordering::Release);
        log::debug!("Engine runtime released");
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "an engine runtime is already active"),
            Self::PoolBuild(e) => write!(f, "failed to build worker pool: {}", e),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyActive => None,
            Self::PoolBuild(e) => Some(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    static RUNTIME_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes tests that need the process-wide runtime.
    pub(crate) fn exclusive() -> MutexGuard<'static, ()> {
        RUNTIME_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn acquire_is_exclusive() {
        let _lock = exclusive();
        let runtime = EngineRuntime::acquire().unwrap();
        assert!(matches!(
            EngineRuntime::acquire(),
            Err(RuntimeError::AlreadyActive)
        ));
        runtime.shutdown();
        let runtime = EngineRuntime::acquire().unwrap();
        drop(runtime);
        assert!(!EngineRuntime::is_active());
    }

    #[test]
    fn drop_releases_on_early_exit() {
        let _lock = exclusive();
        fn failing_step() -> Result<(), RuntimeError> {
            let mut runtime = EngineRuntime::acquire()?;
            runtime.worker_pool(1)?;
            Err(RuntimeError::AlreadyActive)
        }
        assert!(failing_step().is_err());
        assert!(!EngineRuntime::is_active());
    }

    #[test]
    fn auto_sized_pool() {
        let _lock = exclusive();
        let mut runtime = EngineRuntime::acquire().unwrap();
        let pool = runtime.worker_pool(0).unwrap();
        assert_eq!(
            pool.current_num_threads(),
            EngineRuntime::available_processors()
        );
    }
}
