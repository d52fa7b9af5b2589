use crate::error::{with_last_error_mut, DefaultLandscapeError, LandscapeError, LandscapeErrorCode};
use crate::instance::LandscapeInstance;
use loss_landscape_core::LossLandscape;
use std::ffi::CString;
use std::sync::{Mutex, MutexGuard};

/// Record failure details in thread-local storage.
pub(crate) fn set_last_error(error: &impl LandscapeError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record `error` and return its code.
#[inline]
pub(crate) fn track_error(error: &impl LandscapeError) -> LandscapeErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result and hand back its code.
pub(crate) fn track_result<T>(result: Result<T, DefaultLandscapeError>) -> Result<T, LandscapeErrorCode> {
    result.map_err(|e| track_error(&e))
}

/// Clear the thread-local error after a successful call.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = LandscapeErrorCode::Ok;
    });
}

/// Run `f`, translating its outcome into an FFI code and last-error state.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> LandscapeErrorCode
where
    F: FnOnce() -> Result<(), DefaultLandscapeError>,
{
    match f() {
        Ok(()) => {
            clear_last_error();
            LandscapeErrorCode::Ok
        }
        Err(e) => track_error(&e),
    }
}

/// Borrow the instance behind `ptr`.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `landscape_new`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const LandscapeInstance,
) -> Result<&'a LandscapeInstance, DefaultLandscapeError> {
    // SAFETY: caller guarantees `ptr` is null or valid; null is rejected here
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultLandscapeError::null_pointer("ptr"))
}

/// Run `f` under the read lock.
pub(crate) fn with_landscape<F, R>(instance: &LandscapeInstance, f: F) -> Result<R, DefaultLandscapeError>
where
    F: FnOnce(&LossLandscape) -> R,
{
    let landscape = instance
        .landscape
        .read()
        .map_err(|_| DefaultLandscapeError::lock_poisoned("landscape"))?;
    Ok(f(&landscape))
}

/// Run `f` under the write lock.
pub(crate) fn with_landscape_mut<F, R>(
    instance: &LandscapeInstance,
    f: F,
) -> Result<R, DefaultLandscapeError>
where
    F: FnOnce(&mut LossLandscape) -> R,
{
    let mut landscape = instance
        .landscape
        .write()
        .map_err(|_| DefaultLandscapeError::lock_poisoned("landscape"))?;
    Ok(f(&mut landscape))
}

/// Lock one of the instance's snapshot buffers.
pub(crate) fn lock_snapshot<'a, T>(
    snapshot: &'a Mutex<Vec<T>>,
    name: &str,
) -> Result<MutexGuard<'a, Vec<T>>, DefaultLandscapeError> {
    snapshot
        .lock()
        .map_err(|_| DefaultLandscapeError::lock_poisoned(name))
}
