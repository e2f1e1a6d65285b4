//! FFI bindings for proctor-risk
//!
//! This module provides C-compatible functions for calling the scorer from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `proctor_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::RiskError;
use crate::pipeline::{aggregate_json, score_json, tick_json};
use crate::session::{ProctoringSession, SessionEvent, SessionSummary};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

/// Run a string-in/string-out JSON function behind the C ABI conventions
unsafe fn call_json(
    input: *const c_char,
    f: impl FnOnce(&str) -> Result<String, RiskError>,
) -> *mut c_char {
    clear_last_error();

    let input = match cstr_to_string(input) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match f(&input) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score one observation JSON and return CategoryAssessment JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_score_json(json: *const c_char) -> *mut c_char {
    call_json(json, score_json)
}

/// Score a JSON array of observations and return OverallAssessment JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_tick_json(json: *const c_char) -> *mut c_char {
    call_json(json, tick_json)
}

/// Aggregate a JSON array of assessments and return OverallAssessment JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_aggregate_json(json: *const c_char) -> *mut c_char {
    call_json(json, aggregate_json)
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a ProctoringSession
pub struct ProctorSessionHandle {
    session: ProctoringSession,
}

/// Start a new proctoring session.
///
/// # Safety
/// - `user_id` and `exam_id` must be valid null-terminated C strings.
/// - Returns a pointer that must be released with `proctor_session_end` or
///   `proctor_session_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn proctor_session_new(
    user_id: *const c_char,
    exam_id: *const c_char,
) -> *mut ProctorSessionHandle {
    clear_last_error();

    let (user_id, exam_id) = match (cstr_to_string(user_id), cstr_to_string(exam_id)) {
        (Some(u), Some(e)) => (u, e),
        _ => {
            set_last_error("Invalid user_id or exam_id string pointer");
            return ptr::null_mut();
        }
    };

    let handle = Box::new(ProctorSessionHandle {
        session: ProctoringSession::start(user_id, exam_id),
    });
    Box::into_raw(handle)
}

/// Feed one session event JSON and return EventOutcome JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `proctor_session_new`.
/// - `event_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_session_handle(
    session: *mut ProctorSessionHandle,
    event_json: *const c_char,
) -> *mut c_char {
    if session.is_null() {
        clear_last_error();
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    call_json(event_json, |json| {
        let event: SessionEvent = serde_json::from_str(json)?;
        let outcome = handle.session.handle(&event)?;
        Ok(serde_json::to_string(&outcome)?)
    })
}

/// End a session and return SessionSummary JSON with status `completed`.
///
/// # Safety
/// - `session` must be a valid pointer returned by `proctor_session_new`.
/// - The session is consumed: after this call the pointer is invalid and must not be
///   passed to `proctor_session_free`.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
#[no_mangle]
pub unsafe extern "C" fn proctor_session_end(session: *mut ProctorSessionHandle) -> *mut c_char {
    finish_session(session, ProctoringSession::end)
}

/// Cut a session short (e.g. on client disconnect) and return SessionSummary JSON with
/// status `terminated`.
///
/// # Safety
/// Same contract as `proctor_session_end`.
#[no_mangle]
pub unsafe extern "C" fn proctor_session_terminate(
    session: *mut ProctorSessionHandle,
) -> *mut c_char {
    finish_session(session, ProctoringSession::terminate)
}

unsafe fn finish_session(
    session: *mut ProctorSessionHandle,
    finish: fn(ProctoringSession) -> SessionSummary,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = Box::from_raw(session);
    let summary = finish(handle.session);

    match serde_json::to_string(&summary) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session without producing a report.
///
/// # Safety
/// - `session` must be a valid pointer returned by `proctor_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn proctor_session_free(session: *mut ProctorSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by proctor functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a proctor function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn proctor_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next proctor function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn proctor_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn proctor_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_score_json() {
        let json = CString::new(
            r#"{"channel": "face", "face_detected": false, "face_count": 2, "position_changed": 0.5}"#,
        )
        .unwrap();

        unsafe {
            let result = proctor_score_json(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("face_detection"));
            assert!(result_str.contains("\"alert\":true"));

            proctor_free_string(result);
        }
    }

    #[test]
    fn test_ffi_tick_json() {
        let json = CString::new(
            r#"[{"channel": "browser", "tab_switches": 0, "focus_lost": 0, "copy_paste_count": 0}]"#,
        )
        .unwrap();

        unsafe {
            let result = proctor_tick_json(json.as_ptr());
            assert!(!result.is_null());

            let value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(value["high_risk"], false);

            proctor_free_string(result);
        }
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        let user = CString::new("student-1").unwrap();
        let exam = CString::new("exam-9").unwrap();
        let event = CString::new(
            r#"{"type": "browser", "tab_switches": 6, "focus_lost": 5, "copy_paste_count": 1}"#,
        )
        .unwrap();

        unsafe {
            let session = proctor_session_new(user.as_ptr(), exam.as_ptr());
            assert!(!session.is_null());

            let outcome = proctor_session_handle(session, event.as_ptr());
            assert!(!outcome.is_null());
            let outcome_str = CStr::from_ptr(outcome).to_str().unwrap();
            assert!(outcome_str.contains("\"severity\":\"high\""));
            proctor_free_string(outcome);

            let summary = proctor_session_end(session);
            assert!(!summary.is_null());
            let value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(summary).to_str().unwrap()).unwrap();
            assert_eq!(value["user_id"], "student-1");
            assert_eq!(value["report"]["risk_level"], "HIGH");
            assert_eq!(value["status"], "completed");
            proctor_free_string(summary);
        }
    }

    #[test]
    fn test_ffi_session_terminate() {
        let user = CString::new("student-2").unwrap();
        let exam = CString::new("exam-9").unwrap();

        unsafe {
            let session = proctor_session_new(user.as_ptr(), exam.as_ptr());
            let summary = proctor_session_terminate(session);
            assert!(!summary.is_null());
            let value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(summary).to_str().unwrap()).unwrap();
            assert_eq!(value["status"], "terminated");
            assert_eq!(value["report"]["risk_level"], "LOW");
            proctor_free_string(summary);

            assert!(proctor_session_terminate(ptr::null_mut()).is_null());
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = proctor_score_json(invalid_json.as_ptr());
            assert!(result.is_null());

            let error = proctor_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.starts_with("Invalid JSON"));
        }
    }

    #[test]
    fn test_ffi_null_session() {
        let event = CString::new(r#"{"type": "audio", "voice_count": 1, "noise_level": 0.1}"#).unwrap();
        unsafe {
            let result = proctor_session_handle(ptr::null_mut(), event.as_ptr());
            assert!(result.is_null());
            assert!(!proctor_last_error().is_null());
            proctor_session_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = proctor_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
