use loss_landscape_core::ConfigError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - error code passed across the FFI boundary
/// - `msg()` - message for diagnostics
pub(crate) trait LandscapeError {
    fn code(&self) -> LandscapeErrorCode;

    fn msg(&self) -> &str;
}

/// Default implementation of `LandscapeError` for common FFI failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultLandscapeError {
    code: LandscapeErrorCode,
    msg: String,
}

impl DefaultLandscapeError {
    /// Null pointer passed where non-null is required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: LandscapeErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Internal lock was poisoned by a panic on another thread.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: LandscapeErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Settings rejected by configuration validation.
    pub fn invalid_config(error: &ConfigError) -> Self {
        Self {
            code: LandscapeErrorCode::InvalidConfig,
            msg: format!("Invalid landscape settings: {error}"),
        }
    }

    /// Invalid argument with a custom message.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: LandscapeErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl LandscapeError for DefaultLandscapeError {
    fn code(&self) -> LandscapeErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<ConfigError> for DefaultLandscapeError {
    fn from(error: ConfigError) -> Self {
        Self::invalid_config(&error)
    }
}

/// FFI error codes returned by landscape functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandscapeErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Null pointer passed where non-null required.
    NullPointer = 1,

    /// Internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Settings failed validation (extent, resolution, decay factors, ...).
    InvalidConfig = 3,

    /// Invalid parameter passed to function.
    InvalidParameter = 4,
}

impl From<DefaultLandscapeError> for LandscapeErrorCode {
    fn from(error: DefaultLandscapeError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (message, code).
    /// The `CString` is kept here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, LandscapeErrorCode)> = const { RefCell::new((None, LandscapeErrorCode::Ok)) };
}

pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, LandscapeErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, LandscapeErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns `null` if no error has occurred on this thread.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that
/// sets or clears the error. **DO NOT FREE THIS POINTER**.
///
/// Example:
/// ```cpp
/// LandscapeInstance* landscape = nullptr;
/// LandscapeErrorCode err = landscape_new(settings, &landscape);
/// if (err != LandscapeErrorCode::Ok) {
///     const char* error = landscape_get_last_error();
///     if (error) {
///         printf("Landscape creation failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn landscape_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code (`Ok` if none).
///
/// Error state is per-thread.
#[no_mangle]
pub extern "C" fn landscape_get_last_error_code() -> LandscapeErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
