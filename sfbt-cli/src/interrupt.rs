//! SIGINT / SIGTERM → cancel flag for the submission loop.
//!
//! The first signal stops new dispatches; calls already waiting on the
//! scheduler finish and the report is still written.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Register the handlers now and return the flag they set.
pub fn cancel_on_interrupt() -> io::Result<Arc<AtomicBool>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let shutdown = {
        let _guard = runtime.enter();
        shutdown_signal()?
    };

    let flag = Arc::new(AtomicBool::new(false));
    let set = Arc::clone(&flag);
    thread::Builder::new()
        .name("sfbt-signal".into())
        .spawn(move || {
            runtime.block_on(shutdown);
            tracing::warn!("interrupt received; no further jobs will be submitted");
            set.store(true, Ordering::SeqCst);
        })?;
    Ok(flag)
}

#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
