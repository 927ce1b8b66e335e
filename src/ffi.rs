//! FFI bindings for Kidski analytics
//!
//! This module provides C-compatible functions for calling the analytics from
//! other languages, typically the web layer that renders workbooks and documents.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `kidski_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{csv_to_comparison, csv_to_report};
use crate::types::ComparisonMode;

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

/// Optional thresholds argument: NULL means defaults, an invalid pointer is an error
unsafe fn optional_thresholds(ptr: *const c_char) -> Result<Option<String>, &'static str> {
    if ptr.is_null() {
        return Ok(None);
    }
    cstr_to_string(ptr)
        .map(Some)
        .ok_or("Invalid thresholds string pointer")
}

unsafe fn compare(
    start_csv: *const c_char,
    end_csv: *const c_char,
    thresholds_json: *const c_char,
    mode: ComparisonMode,
) -> *mut c_char {
    clear_last_error();

    let start = match cstr_to_string(start_csv) {
        Some(s) => s,
        None => {
            set_last_error("Invalid start CSV string pointer");
            return ptr::null_mut();
        }
    };

    let end = match cstr_to_string(end_csv) {
        Some(s) => s,
        None => {
            set_last_error("Invalid end CSV string pointer");
            return ptr::null_mut();
        }
    };

    let thresholds = match optional_thresholds(thresholds_json) {
        Ok(t) => t,
        Err(msg) => {
            set_last_error(msg);
            return ptr::null_mut();
        }
    };

    match csv_to_comparison(start, end, mode, thresholds) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Report API
// ============================================================================

/// Analyse one CSV export and return the single-period report JSON.
///
/// # Safety
/// - `csv` must be a valid null-terminated C string.
/// - `thresholds_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `kidski_free_string`.
/// - Returns NULL on error; call `kidski_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kidski_single_report(
    csv: *const c_char,
    thresholds_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let csv_str = match cstr_to_string(csv) {
        Some(s) => s,
        None => {
            set_last_error("Invalid CSV string pointer");
            return ptr::null_mut();
        }
    };

    let thresholds = match optional_thresholds(thresholds_json) {
        Ok(t) => t,
        Err(msg) => {
            set_last_error(msg);
            return ptr::null_mut();
        }
    };

    match csv_to_report(csv_str, thresholds) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Compare two CSV exports as independent groups and return the report JSON.
///
/// # Safety
/// - `start_csv` and `end_csv` must be valid null-terminated C strings.
/// - `thresholds_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `kidski_free_string`.
/// - Returns NULL on error; call `kidski_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kidski_compare_independent(
    start_csv: *const c_char,
    end_csv: *const c_char,
    thresholds_json: *const c_char,
) -> *mut c_char {
    compare(start_csv, end_csv, thresholds_json, ComparisonMode::Independent)
}

/// Compare the children present in both CSV exports and return the report JSON.
///
/// # Safety
/// - `start_csv` and `end_csv` must be valid null-terminated C strings.
/// - `thresholds_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `kidski_free_string`.
/// - Returns NULL on error, including when no child identifier occurs in both
///   exports; call `kidski_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kidski_compare_paired(
    start_csv: *const c_char,
    end_csv: *const c_char,
    thresholds_json: *const c_char,
) -> *mut c_char {
    compare(start_csv, end_csv, thresholds_json, ComparisonMode::Paired)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Kidski functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Kidski function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kidski_free_string(ptr: *mut c_char) {
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
/// - Returns a newly allocated string that must be freed with `kidski_free_string`.
/// - Returns NULL if there is no error.
#[no_mangle]
pub unsafe extern "C" fn kidski_last_error() -> *mut c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(msg) => string_to_cstr(msg.to_str().unwrap_or("Unknown error")),
        None => ptr::null_mut(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "id,cognitive\n1,40\n2,85\n";
    const END: &str = "id,cognitive\n1,90\n2,88\n";

    unsafe fn take_string(ptr: *mut c_char) -> String {
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        kidski_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_single_report() {
        let csv = CString::new(START).unwrap();
        unsafe {
            let result = kidski_single_report(csv.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let payload: serde_json::Value = serde_json::from_str(&take_string(result)).unwrap();
            assert_eq!(payload["record_count"], 2);
        }
    }

    #[test]
    fn test_ffi_compare_paired() {
        let start = CString::new(START).unwrap();
        let end = CString::new(END).unwrap();
        unsafe {
            let result = kidski_compare_paired(start.as_ptr(), end.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let payload: serde_json::Value = serde_json::from_str(&take_string(result)).unwrap();
            assert_eq!(payload["merged_count"], 2);
            assert_eq!(payload["metrics"][0]["trend"], "improved");
        }
    }

    #[test]
    fn test_ffi_no_join_sets_last_error() {
        let start = CString::new(START).unwrap();
        let end = CString::new("id,cognitive\n7,90\n").unwrap();
        unsafe {
            let result = kidski_compare_paired(start.as_ptr(), end.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = kidski_last_error();
            assert!(!error.is_null());
            assert!(take_string(error).contains("No matching child identifiers"));
        }
    }

    #[test]
    fn test_ffi_null_input() {
        unsafe {
            let result = kidski_compare_independent(ptr::null(), ptr::null(), ptr::null());
            assert!(result.is_null());

            let error = kidski_last_error();
            assert!(!error.is_null());
            assert_eq!(take_string(error), "Invalid start CSV string pointer");
        }
    }
}
