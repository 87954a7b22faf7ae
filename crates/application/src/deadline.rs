use std::future::Future;
use std::time::Duration;

use crate::error::ApplicationError;

/// 给外部调用加上超时。超时或瞬时失败都会带上 `operation` 名称
pub async fn bounded<T, E, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, ApplicationError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ApplicationError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|err| err.into().in_operation(operation)),
        Err(_) => Err(ApplicationError::transient(
            operation,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}
