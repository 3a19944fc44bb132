//! Interruption listener.
//!
//! A dedicated thread waits for Ctrl-C on a single-threaded tokio runtime.
//! When it fires, the cancellation flag is raised (the suite stops before its
//! next fixture) and `on_interrupt` runs, typically printing the tally and
//! exiting. An in-flight API call is never aborted.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub fn listen_for_interrupt<F>(cancel: Arc<AtomicBool>, on_interrupt: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to start signal runtime; Ctrl-C will not print results");
                    return;
                }
            };
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    tracing::info!("interrupted");
                    cancel.store(true, Ordering::SeqCst);
                    on_interrupt();
                }
                Err(e) => tracing::warn!(error = %e, "failed to install Ctrl-C handler"),
            }
        })
}
