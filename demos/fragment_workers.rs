//! # Example: fragment_workers
//!
//! Splits a job into fragments, lets three workers claim them concurrently
//! and runs each fragment's (flaky) work under a retry loop. A debounced
//! interceptor reports progress once the workers go quiet.
//!
//! ## Flow
//! ```text
//! Coordinator ──► container.create("demo", "resize", 8, ..)
//!
//! worker × 3 loop {
//!   ├─► task.pick()                       ─► FragmentPicked
//!   ├─► fragment.to_string() → "remote"   ─► Fragment::parse(reply)
//!   ├─► retry.process(..)                 ─► AttemptStarting / AttemptFailed / RetryScheduled ...
//!   ├─► task.update_fragment(f, Success | Failure | Fatal)
//!   └─► progress.invoke(done)             ─► HitFired / HitSuppressed
//! }
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example fragment_workers --features logging
//! ```

use std::{sync::Arc, time::Duration};

use fragvisor::{
    ActionError, Config, Coordinator, ErrorKind, Fragment, FragmentState, InterceptorPolicy,
    LinearRetryPolicy, LogWriter, RetryOn, Subscribe,
};
use rand::Rng;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Short retry schedule so the demo finishes quickly
    let cfg = Config {
        retry: LinearRetryPolicy::new(2, Duration::from_millis(50), Duration::from_millis(50)),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let coord = Coordinator::new(cfg, subs);

    // 2. One job, eight fragments
    let task = coord
        .container()
        .create("demo", "resize", 8, "resize uploaded images")
        .await;

    // 3. Progress reports are debounced: only the settled count is printed
    let progress = coord.interceptor(
        "progress",
        InterceptorPolicy::debounce(Duration::from_millis(200)),
        |done: usize| async move { println!("[progress] {done} fragment(s) done") },
    );

    // 4. Timeouts are transient; anything else escalates
    let transient = Arc::new(RetryOn::kinds([ErrorKind::Timeout]));

    let mut workers = Vec::new();
    for id in 0..3 {
        let task = Arc::clone(&task);
        let retry = coord.retry_task(format!("worker-{id}"));
        let progress = progress.clone();
        let transient = Arc::clone(&transient);
        let token = coord.token();

        workers.push(tokio::spawn(async move {
            while !task.is_done() {
                let Some(picked) = task.pick() else {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    continue;
                };

                // Ship the handle as text and read it back, as a remote worker would
                let wire = picked.to_string();
                let fragment = match Fragment::parse(&wire) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::error!(error = %e, wire, "bad fragment handle");
                        continue;
                    }
                };

                let outcome = retry
                    .process(&token, transient.as_ref(), |_| {
                        let index = fragment.index();
                        async move { resize(index).await }
                    })
                    .await;

                let next = match (outcome, fragment.state()) {
                    (Ok(r), _) if r.is_successful() == Some(true) => FragmentState::Success,
                    (_, FragmentState::Retrying) => FragmentState::Fatal,
                    _ => FragmentState::Failure,
                };
                task.update_fragment(&fragment, next);
                println!("[worker-{id}] fragment {} -> {next}", fragment.index());

                tokio::spawn({
                    let progress = progress.clone();
                    let done = task.done_count();
                    async move { progress.invoke(done).await }
                });
            }
        }));
    }

    for w in workers {
        w.await?;
    }
    progress.wait().await;

    let fatal = task
        .get_done_fragments()
        .iter()
        .filter(|f| f.state() == FragmentState::Fatal)
        .count();
    println!("[main] all {} fragments done, {fatal} fatal", task.count());

    coord.shutdown().await;
    Ok(())
}

/// Simulated work: mostly succeeds, sometimes times out, rarely breaks for good.
async fn resize(index: u32) -> Result<u32, ActionError> {
    let roll: u8 = rand::rng().random_range(0..10);
    tokio::time::sleep(Duration::from_millis(10 * u64::from(roll))).await;
    match roll {
        0..=5 => Ok(index),
        6..=8 => Err(ActionError::new(ErrorKind::Timeout, format!("fragment {index} timed out"))),
        _ => Err(ActionError::application(format!("fragment {index} is corrupt"))),
    }
}
