//! Background tasks that work both natively and in the browser.

use std::future::Future;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// Runs `task` to completion on the browser event loop. Nobody waits for it.
        ///
        /// Always returns true.
        pub fn spawn_detached(task: impl Future<Output = ()> + 'static) -> bool {
            wasm_bindgen_futures::spawn_local(task);
            true
        }
    } else {
        use maybe_sync::MaybeSend;

        /// Runs `task` to completion on the ambient tokio runtime. Nobody waits for it.
        ///
        /// Returns false, dropping the task, when called outside of a runtime context.
        pub fn spawn_detached(task: impl Future<Output = ()> + MaybeSend + 'static) -> bool {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    drop(runtime.spawn(task));
                    true
                }
                Err(err) => {
                    log::warn!("Background task dropped: {err}");
                    false
                }
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn no_runtime_drops_task() {
        assert!(!spawn_detached(async {}));
    }

    #[test]
    fn runs_on_ambient_runtime() {
        tokio_test::block_on(async {
            let (sender, receiver) = tokio::sync::oneshot::channel();
            assert!(spawn_detached(async move {
                let _ = sender.send(42);
            }));
            assert_eq!(receiver.await.unwrap(), 42);
        });
    }
}
