use std::future::Future;

use crate::firestore::backup::options::RetrySettings;
use crate::firestore::error::FirestoreResult;
use crate::platform::runtime::sleep as runtime_sleep;

/// Invokes `operation` until it yields anything other than `DeadlineExceeded`.
///
/// Every deadline failure is followed by a sleep of `settings.interval`; there
/// is no attempt ceiling. All other errors are returned on the attempt that
/// produced them.
pub async fn retry_on_deadline<F, Fut, T>(
    settings: &RetrySettings,
    label: &str,
    mut operation: F,
) -> FirestoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FirestoreResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Err(err) if err.code.is_transient_timeout() => {
                if settings.logs {
                    log::warn!(
                        "{label}: {err}; retrying in {}ms (attempt {attempt})",
                        settings.interval.as_millis()
                    );
                }
                if let Some(observer) = &settings.on_retry {
                    observer(label, attempt);
                }
                runtime_sleep(settings.interval).await;
            }
            result => return result,
        }
    }
}
