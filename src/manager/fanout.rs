//! Bounded fan-out over a feature's repositories.
//!
//! One task per repository, joined as a group. A semaphore caps how many
//! run at once; outcomes come back labelled and in input order regardless
//! of completion order, and every failure is kept so partial failure
//! never collapses into whichever error finished first.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::{RepoFailure, Result, ThicketError};

/// One repository's labelled outcome.
pub type Outcome<T> = (String, Result<T>);

/// Run every labelled task, at most `limit` at a time.
///
/// Futures are built eagerly by the caller but only polled once a permit
/// is held, so in-flight work is bounded even for very large sets.
pub async fn for_each<T, Fut>(tasks: Vec<(String, Fut)>, limit: usize) -> Vec<Outcome<T>>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut names = Vec::with_capacity(tasks.len());
    let mut handles = Vec::with_capacity(tasks.len());

    for (name, task) in tasks {
        names.push(name);
        let permits = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.expect("semaphore never closed");
            task.await
        }));
    }

    names
        .into_iter()
        .zip(join_all(handles).await)
        .map(|(name, joined)| {
            let outcome = match joined {
                Ok(result) => result,
                Err(join_err) => Err(ThicketError::Io(std::io::Error::other(join_err.to_string()))),
            };
            (name, outcome)
        })
        .collect()
}

/// Fold labelled outcomes into the operation's combined result.
///
/// Successes come back in input order; any failure at all yields a
/// [`ThicketError::Fanout`] listing every failing repository by name.
pub fn collect<T>(operation: &str, outcomes: Vec<Outcome<T>>) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for (name, outcome) in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(err) => failures.push(RepoFailure::new(name, err)),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(ThicketError::Fanout {
            operation: operation.to_string(),
            failures,
        })
    }
}
