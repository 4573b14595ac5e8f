// SPDX-License-Identifier: MIT

//! RAII guard guaranteeing a sandbox handle is released on every exit path
//! — success, failure, panic, or cancellation (spec.md §9: "Resource leak
//! prevention is a correctness requirement, not best-effort"), grounded on
//! the teacher's handle-release discipline in the docker/k8s adapters.
//!
//! `Drop` cannot run async code, so release on drop is necessarily
//! best-effort: it spawns a detached task that calls back into the
//! backend. The happy path calls [`ContainerGuard::release`] explicitly
//! and awaits the real cleanup directly; `Drop` only catches the paths that
//! skip that call (an early return, a panic unwinding through `run`).

use crate::backend::SandboxBackend;
use sf_core::SandboxHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ContainerGuard {
    handle: SandboxHandle,
    backend: Arc<dyn SandboxBackend>,
    released: AtomicBool,
}

impl ContainerGuard {
    pub fn new(handle: SandboxHandle, backend: Arc<dyn SandboxBackend>) -> Self {
        Self { handle, backend, released: AtomicBool::new(false) }
    }

    pub fn handle(&self) -> &SandboxHandle {
        &self.handle
    }

    /// Release on the happy path, awaiting the backend's own cleanup.
    pub async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.backend.cleanup(&self.handle).await;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let handle = self.handle.clone();
        let backend = self.backend.clone();
        tokio::spawn(async move {
            backend.cleanup(&handle).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ExecutionRequest, HandleSink};
    use crate::error::SandboxResult;
    use crate::report::BacktestReport;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio_util::sync::CancellationToken;

    struct CountingBackend {
        cleanups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SandboxBackend for CountingBackend {
        async fn run(
            &self,
            _request: &ExecutionRequest,
            _cancel: CancellationToken,
            _on_handle: HandleSink,
        ) -> SandboxResult<BacktestReport> {
            unimplemented!("not exercised by this test")
        }

        async fn cleanup(&self, _handle: &SandboxHandle) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }

        async fn is_alive(&self, _handle: &SandboxHandle) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn explicit_release_calls_cleanup_exactly_once() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let backend: Arc<dyn SandboxBackend> = Arc::new(CountingBackend { cleanups: cleanups.clone() });
        let guard = ContainerGuard::new(SandboxHandle("c1".into()), backend);
        guard.release().await;
        guard.release().await;
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drop_without_explicit_release_still_cleans_up() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let backend: Arc<dyn SandboxBackend> = Arc::new(CountingBackend { cleanups: cleanups.clone() });
        {
            let _guard = ContainerGuard::new(SandboxHandle("c2".into()), backend);
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }
}
