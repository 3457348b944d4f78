use obx_value::{DisposalTask, Value};

use crate::errors::DisposalError;

/// How disposable values are released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposalMode {
    /// Use asynchronous disposal when an object supports both forms.
    pub prefer_async: bool,
    /// Wait for asynchronous disposal to finish before returning.
    pub block_on_async: bool,
}

/// Result of releasing one value.
pub(crate) enum Disposed {
    /// Released (or nothing to release).
    Done,
    /// Asynchronous disposal still running. Carries the type name for
    /// diagnostics.
    Detached(String, DisposalTask),
}

/// Release `value` if it is a disposable object.
///
/// Objects supporting only one form use that form. Objects supporting both
/// use the synchronous one unless `prefer_async` is set.
pub(crate) fn dispose_value(value: &Value, mode: DisposalMode) -> Result<Disposed, DisposalError> {
    let Value::Object(object) = value else {
        return Ok(Disposed::Done);
    };
    let sync = object.as_dispose();
    let asynchronous = object.as_async_dispose().filter(|_| mode.prefer_async || sync.is_none());
    if sync.is_none() && asynchronous.is_none() {
        return Ok(Disposed::Done);
    }
    let type_name = object.type_name().to_string();

    if let Some(target) = asynchronous {
        let task = target.dispose_async();
        if mode.block_on_async {
            tracing::trace!(%type_name, "waiting for asynchronous disposal");
            return task
                .wait()
                .map(|()| Disposed::Done)
                .map_err(|err| DisposalError::failed(&type_name, err));
        }
        return match task.try_wait() {
            Some(result) => result
                .map(|()| Disposed::Done)
                .map_err(|err| DisposalError::failed(&type_name, err)),
            None => {
                tracing::trace!(%type_name, "asynchronous disposal detached");
                Ok(Disposed::Detached(type_name, task))
            }
        };
    }

    let Some(target) = sync else {
        return Ok(Disposed::Done);
    };
    tracing::trace!(%type_name, "disposing value");
    target
        .dispose()
        .map(|()| Disposed::Done)
        .map_err(|err| DisposalError::failed(&type_name, err))
}
