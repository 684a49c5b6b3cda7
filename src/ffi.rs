//! FFI bindings for Rumbo scoring
//!
//! This module provides C-compatible functions for calling Rumbo from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `rumbo_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{score_scania_json, score_trips_json};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Shared body of the scoring entry points: read arguments, run, hand back JSON
unsafe fn score_with(
    input: *const c_char,
    config_json: *const c_char,
    score: fn(&str, Option<&str>) -> Result<String, ComputeError>,
) -> *mut c_char {
    clear_last_error();

    let input_str = match cstr_to_string(input) {
        Some(s) => s,
        None => {
            set_last_error("Invalid input string pointer");
            return ptr::null_mut();
        }
    };

    // NULL config means defaults; a non-NULL but invalid pointer is an error
    let config_str = if config_json.is_null() {
        None
    } else {
        match cstr_to_string(config_json) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match score(&input_str, config_str.as_deref()) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Scoring API
// ============================================================================

/// Score a JSON array of trip records and return the report JSON.
///
/// # Safety
/// - `trips_json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `rumbo_free_string`.
/// - Returns NULL on error; call `rumbo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rumbo_score_trips_json(
    trips_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    score_with(trips_json, config_json, score_trips_json)
}

/// Score a Scania Driver Evaluation Report payload and return the report JSON.
///
/// # Safety
/// - `payload_json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `rumbo_free_string`.
/// - Returns NULL on error; call `rumbo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rumbo_score_scania_json(
    payload_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    score_with(payload_json, config_json, score_scania_json)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Rumbo functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Rumbo function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rumbo_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Rumbo function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rumbo_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Rumbo library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rumbo_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
