//! Status polling engine backing [`ResourceProvider::wait_for_status`].
//!
//! [`crate::ResourceProvider`]'s provided method delegates here; the free
//! function is public so callers with custom polling needs can drive it
//! directly against any provider.

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::types::{ResourceInfo, ResourceStatus, WaitForStatusOptions};
use crate::{Error, ResourceProvider, Result};

/// Poll `provider` until `resource_id` reaches the target status.
///
/// The absolute deadline is computed once at entry, so per-poll overhead
/// never extends the wait. Outcomes:
///
/// - target observed → the fresh [`ResourceInfo`], with no further polling;
/// - `ERROR` observed (and `ERROR` is not the target) → immediate
///   [`Error::ResourceInError`], distinguishing "vendor reported failure"
///   from "vendor is just slow";
/// - deadline passed → [`Error::OperationTimeout`];
/// - cancel signal notified → [`Error::Cancelled`].
pub async fn wait_for_status<P>(
    provider: &P,
    resource_id: &str,
    options: &WaitForStatusOptions,
) -> Result<ResourceInfo>
where
    P: ResourceProvider + ?Sized,
{
    let deadline = Instant::now() + options.timeout;
    let operation = || format!("wait_for_status({})", options.target);

    loop {
        let info = provider.get_resource_info(resource_id).await?;

        if info.status == options.target {
            return Ok(info);
        }

        if info.status == ResourceStatus::Error && options.target != ResourceStatus::Error {
            return Err(Error::ResourceInError {
                provider: provider.kind(),
                resource_id: resource_id.to_string(),
                target: options.target,
            });
        }

        if Instant::now() >= deadline {
            return Err(Error::OperationTimeout {
                provider: provider.kind(),
                operation: operation(),
                timeout: options.timeout,
            });
        }

        debug!(
            resource_id,
            status = %info.status,
            target = %options.target,
            "waiting for status change"
        );

        match &options.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.notified() => {
                        return Err(Error::Cancelled {
                            provider: provider.kind(),
                            operation: operation(),
                        });
                    }
                    _ = sleep(options.interval) => {}
                }
            }
            None => sleep(options.interval).await,
        }
    }
}
