//! C FFI bindings for incident-insight.
//!
//! Exposes loading, classification and the statistical estimators to a
//! non-Rust presentation layer.
//!
//! - **Opaque handle**: `*mut DatasetContext` owns one loaded table
//! - **`#[repr(C)]`**: fixed-size results (summary, interval, t-test)
//! - **JSON strings**: variable-size results (classification, grouped
//!   intervals, full analysis), freed with `incident_string_free`
//! - **Integer status codes**: 0 = success, negative = error
//! - **Thread-local error message**: `incident_last_error()`
//!
//! # Safety
//!
//! All entry points use `catch_unwind` so panics never cross the FFI
//! boundary. Null pointer arguments return `INCIDENT_ERR_NULL_PTR` (or a
//! null handle/string).

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::slice;

use serde::Serialize;

use crate::classify::classify_columns;
use crate::dataframe::DataFrame;
use crate::error::InsightError;
use crate::inference::{
    grouped_confidence_intervals, mean_confidence_interval, welch_t_test, ConfidenceLevel,
};
use crate::loader::{DatasetLoader, DatasetSource, LoaderConfig};
use crate::profiling::describe_column;
use crate::report::{run_analysis, AnalysisRequest};

// ── Error handling ────────────────────────────────────────────────────

/// Status codes returned by FFI functions.
pub const INCIDENT_OK: i32 = 0;
pub const INCIDENT_ERR_NULL_PTR: i32 = -1;
pub const INCIDENT_ERR_INVALID_INPUT: i32 = -2;
pub const INCIDENT_ERR_PARSE_FAILED: i32 = -3;
pub const INCIDENT_ERR_ANALYSIS_FAILED: i32 = -4;
/// The sample is too small for the requested statistic.
pub const INCIDENT_ERR_INSUFFICIENT_DATA: i32 = -5;
pub const INCIDENT_ERR_PANIC: i32 = -99;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(msg).ok();
    });
}

fn status_of(err: &InsightError) -> i32 {
    match err {
        InsightError::MalformedInput { .. } | InsightError::Io(_) => INCIDENT_ERR_PARSE_FAILED,
        InsightError::InsufficientData { .. } => INCIDENT_ERR_INSUFFICIENT_DATA,
        InsightError::ColumnNotFound { .. }
        | InsightError::NonNumericColumn { .. }
        | InsightError::InvalidParameter { .. } => INCIDENT_ERR_INVALID_INPUT,
        _ => INCIDENT_ERR_ANALYSIS_FAILED,
    }
}

/// Records `err` as the last error and returns its status code.
fn fail(err: InsightError) -> i32 {
    set_last_error(&err.to_string());
    status_of(&err)
}

/// Returns the last error message, or null if no error.
/// The returned string is valid until the next FFI call on this thread.
///
/// # Safety
/// The caller must not free the returned pointer.
#[no_mangle]
pub extern "C" fn incident_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cstr) => cstr.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn incident_clear_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Borrows a C string argument as UTF-8.
///
/// # Safety
/// `ptr` must be null or a valid null-terminated string that outlives `'a`.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, i32> {
    if ptr.is_null() {
        set_last_error(&format!("null {what} pointer"));
        return Err(INCIDENT_ERR_NULL_PTR);
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|e| {
        set_last_error(&format!("invalid UTF-8 in {what}: {e}"));
        INCIDENT_ERR_INVALID_INPUT
    })
}

/// Serializes `value` into a caller-owned C string.
fn json_string<T: Serialize>(value: &T) -> *mut c_char {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            set_last_error(&format!("JSON encoding failed: {e}"));
            return ptr::null_mut();
        }
    };
    match CString::new(json) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            set_last_error(&format!("JSON contains a NUL byte: {e}"));
            ptr::null_mut()
        }
    }
}

/// Frees a string returned by one of the `*_json` functions.
///
/// # Safety
/// `s` must come from this library, or be null.
#[no_mangle]
pub unsafe extern "C" fn incident_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = unsafe { CString::from_raw(s) };
    }
}

// ── Dataset Context (opaque handle) ──────────────────────────────────

/// Opaque handle holding one loaded, renamed table.
pub struct DatasetContext {
    dataframe: DataFrame,
}

fn into_handle(result: Result<DataFrame, InsightError>) -> *mut DatasetContext {
    match result {
        Ok(dataframe) => Box::into_raw(Box::new(DatasetContext { dataframe })),
        Err(e) => {
            set_last_error(&format!("dataset load failed: {e}"));
            ptr::null_mut()
        }
    }
}

/// Loads a dataset from an in-memory CSV string.
///
/// # Safety
/// - `csv_data` must be a valid null-terminated UTF-8 string.
/// - The returned handle must be freed with `incident_dataset_free`.
#[no_mangle]
pub unsafe extern "C" fn incident_dataset_from_csv(csv_data: *const c_char) -> *mut DatasetContext {
    let result = panic::catch_unwind(|| {
        let csv = match unsafe { str_arg(csv_data, "csv_data") } {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        };
        into_handle(DatasetLoader::default().load(Some(DatasetSource::from(csv))))
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in incident_dataset_from_csv");
            ptr::null_mut()
        }
    }
}

/// Loads a dataset from a file. A null `path` loads the default file;
/// when that file does not exist the handle holds an empty table.
///
/// # Safety
/// - `path` must be null or a valid null-terminated UTF-8 string.
/// - The returned handle must be freed with `incident_dataset_free`.
#[no_mangle]
pub unsafe extern "C" fn incident_dataset_from_path(path: *const c_char) -> *mut DatasetContext {
    let result = panic::catch_unwind(|| {
        let loader = DatasetLoader::new(LoaderConfig::default());
        if path.is_null() {
            return into_handle(loader.load(None));
        }
        let path = match unsafe { str_arg(path, "path") } {
            Ok(s) => PathBuf::from(s),
            Err(_) => return ptr::null_mut(),
        };
        into_handle(loader.load(Some(path.into())))
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in incident_dataset_from_path");
            ptr::null_mut()
        }
    }
}

/// Frees a dataset handle.
///
/// # Safety
/// `ctx` must be a pointer from `incident_dataset_from_*`, or null.
#[no_mangle]
pub unsafe extern "C" fn incident_dataset_free(ctx: *mut DatasetContext) {
    if !ctx.is_null() {
        let _ = unsafe { Box::from_raw(ctx) };
    }
}

/// Returns the number of rows, or -1 for a null handle.
///
/// # Safety
/// `ctx` must be a valid dataset handle or null.
#[no_mangle]
pub unsafe extern "C" fn incident_dataset_row_count(ctx: *const DatasetContext) -> i64 {
    if ctx.is_null() {
        set_last_error("null context");
        return -1;
    }
    let ctx = unsafe { &*ctx };
    ctx.dataframe.row_count() as i64
}

/// Returns the number of columns, or -1 for a null handle.
///
/// # Safety
/// `ctx` must be a valid dataset handle or null.
#[no_mangle]
pub unsafe extern "C" fn incident_dataset_col_count(ctx: *const DatasetContext) -> i64 {
    if ctx.is_null() {
        set_last_error("null context");
        return -1;
    }
    let ctx = unsafe { &*ctx };
    ctx.dataframe.column_count() as i64
}

/// Numeric and categorical column names as
/// `{"numeric": [...], "categorical": [...]}`.
///
/// # Safety
/// `ctx` must be a valid dataset handle. Free the result with
/// `incident_string_free`.
#[no_mangle]
pub unsafe extern "C" fn incident_classify_json(ctx: *const DatasetContext) -> *mut c_char {
    let result = panic::catch_unwind(|| {
        if ctx.is_null() {
            set_last_error("null context");
            return ptr::null_mut();
        }
        let ctx = unsafe { &*ctx };
        json_string(&classify_columns(&ctx.dataframe))
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in incident_classify_json");
            ptr::null_mut()
        }
    }
}

// ── Descriptive summary ──────────────────────────────────────────────

/// C-compatible descriptive summary of one numeric column.
#[repr(C)]
pub struct CDescriptiveSummary {
    /// Number of non-missing values.
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value. Only meaningful when `has_mode` is 1.
    pub mode: f64,
    pub has_mode: u8,
    /// Sample variance; NaN when count < 2.
    pub variance: f64,
    pub std_dev: f64,
}

/// Summarizes a numeric column of the dataset.
///
/// # Safety
/// `ctx` must be valid, `column` a null-terminated UTF-8 string, and
/// `out` must point to a valid `CDescriptiveSummary`.
#[no_mangle]
pub unsafe extern "C" fn incident_describe(
    ctx: *const DatasetContext,
    column: *const c_char,
    out: *mut CDescriptiveSummary,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if ctx.is_null() || out.is_null() {
            set_last_error("null pointer");
            return INCIDENT_ERR_NULL_PTR;
        }
        let ctx = unsafe { &*ctx };
        let column = match unsafe { str_arg(column, "column") } {
            Ok(s) => s,
            Err(code) => return code,
        };

        let summary = match describe_column(&ctx.dataframe, column) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };

        unsafe {
            (*out) = CDescriptiveSummary {
                count: summary.count as u64,
                mean: summary.mean,
                median: summary.median,
                mode: summary.mode.unwrap_or(f64::NAN),
                has_mode: u8::from(summary.mode.is_some()),
                variance: summary.variance,
                std_dev: summary.std_dev,
            };
        }
        INCIDENT_OK
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error("panic in incident_describe");
            INCIDENT_ERR_PANIC
        }
    }
}

// ── Confidence interval ──────────────────────────────────────────────

/// C-compatible confidence interval for a mean.
#[repr(C)]
pub struct CConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    /// Values used after dropping NaN.
    pub n: u64,
}

/// t-based confidence interval for the mean of `data`.
///
/// `level` is a fraction in (0, 1), e.g. 0.95. Returns
/// `INCIDENT_ERR_INSUFFICIENT_DATA` when fewer than two non-NaN values
/// are given.
///
/// # Safety
/// - `data` must point to `n` contiguous f64 values.
/// - `out` must point to a valid `CConfidenceInterval`.
#[no_mangle]
pub unsafe extern "C" fn incident_confidence_interval(
    data: *const f64,
    n: u32,
    level: f64,
    out: *mut CConfidenceInterval,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if data.is_null() || out.is_null() {
            set_last_error("null pointer");
            return INCIDENT_ERR_NULL_PTR;
        }
        let level = match ConfidenceLevel::new(level) {
            Ok(level) => level,
            Err(e) => return fail(e),
        };
        let values = unsafe { slice::from_raw_parts(data, n as usize) };
        let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

        let Some((lower, upper)) = mean_confidence_interval(&valid, level) else {
            return fail(InsightError::InsufficientData {
                min_required: 2,
                actual: valid.len(),
            });
        };

        unsafe {
            (*out) = CConfidenceInterval {
                mean: valid.iter().sum::<f64>() / valid.len() as f64,
                lower,
                upper,
                n: valid.len() as u64,
            };
        }
        INCIDENT_OK
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error("panic in incident_confidence_interval");
            INCIDENT_ERR_PANIC
        }
    }
}

/// Per-group intervals as a JSON array sorted by descending mean. Each
/// element has `group`, `n`, `mean`, `lower` and `upper` (null when the
/// group has a single value).
///
/// # Safety
/// `ctx` must be valid; `numeric_column` and `group_column` must be
/// null-terminated UTF-8 strings. Free the result with
/// `incident_string_free`.
#[no_mangle]
pub unsafe extern "C" fn incident_grouped_intervals_json(
    ctx: *const DatasetContext,
    numeric_column: *const c_char,
    group_column: *const c_char,
    level: f64,
) -> *mut c_char {
    let result = panic::catch_unwind(|| {
        if ctx.is_null() {
            set_last_error("null context");
            return ptr::null_mut();
        }
        let ctx = unsafe { &*ctx };
        let (Ok(numeric), Ok(group)) = (unsafe { str_arg(numeric_column, "numeric_column") }, unsafe {
            str_arg(group_column, "group_column")
        }) else {
            return ptr::null_mut();
        };

        let intervals = ConfidenceLevel::new(level)
            .and_then(|level| grouped_confidence_intervals(&ctx.dataframe, numeric, group, level));
        match intervals {
            Ok(rows) => json_string(&rows),
            Err(e) => {
                fail(e);
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in incident_grouped_intervals_json");
            ptr::null_mut()
        }
    }
}

// ── Welch's t-test ───────────────────────────────────────────────────

/// C-compatible Welch's t-test result.
#[repr(C)]
pub struct CWelchTest {
    pub t_statistic: f64,
    /// Two-tailed p-value.
    pub p_value: f64,
    pub degrees_of_freedom: f64,
}

/// Welch's t-test of sample `a` against sample `b`.
///
/// Returns `INCIDENT_ERR_INSUFFICIENT_DATA` unless both samples hold
/// more than one non-NaN value.
///
/// # Safety
/// - `a` must point to `n_a` f64 values and `b` to `n_b`.
/// - `out` must point to a valid `CWelchTest`.
#[no_mangle]
pub unsafe extern "C" fn incident_welch_test(
    a: *const f64,
    n_a: u32,
    b: *const f64,
    n_b: u32,
    out: *mut CWelchTest,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if a.is_null() || b.is_null() || out.is_null() {
            set_last_error("null pointer");
            return INCIDENT_ERR_NULL_PTR;
        }
        let sample_a = unsafe { slice::from_raw_parts(a, n_a as usize) };
        let sample_b = unsafe { slice::from_raw_parts(b, n_b as usize) };

        let Some(test) = welch_t_test(sample_a, sample_b) else {
            return fail(InsightError::InsufficientData {
                min_required: 2,
                actual: n_a.min(n_b) as usize,
            });
        };

        unsafe {
            (*out) = CWelchTest {
                t_statistic: test.t_statistic,
                p_value: test.p_value,
                degrees_of_freedom: test.degrees_of_freedom,
            };
        }
        INCIDENT_OK
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error("panic in incident_welch_test");
            INCIDENT_ERR_PANIC
        }
    }
}

// ── Full analysis ────────────────────────────────────────────────────

/// Runs the whole analysis panel and returns the report as JSON.
///
/// `request_json` holds the selections (`numeric_column`,
/// `group_column`, `confidence_percent`, `selected_groups`,
/// `time_column`, `trend_metric`); null or `{}` uses the defaults.
///
/// # Safety
/// `ctx` must be valid; `request_json` must be null or a null-terminated
/// UTF-8 string. Free the result with `incident_string_free`.
#[no_mangle]
pub unsafe extern "C" fn incident_analysis_json(
    ctx: *const DatasetContext,
    request_json: *const c_char,
) -> *mut c_char {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        if ctx.is_null() {
            set_last_error("null context");
            return ptr::null_mut();
        }
        let ctx = unsafe { &*ctx };

        let request = if request_json.is_null() {
            AnalysisRequest::default()
        } else {
            let Ok(raw) = (unsafe { str_arg(request_json, "request_json") }) else {
                return ptr::null_mut();
            };
            match serde_json::from_str::<AnalysisRequest>(raw) {
                Ok(request) => request,
                Err(e) => {
                    set_last_error(&format!("invalid analysis request: {e}"));
                    return ptr::null_mut();
                }
            }
        };

        match run_analysis(&ctx.dataframe, &request) {
            Ok(report) => json_string(&report),
            Err(e) => {
                fail(e);
                ptr::null_mut()
            }
        }
    }));

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in incident_analysis_json");
            ptr::null_mut()
        }
    }
}

// ── Version ──────────────────────────────────────────────────────────

/// Returns the version string of incident-insight.
///
/// # Safety
/// The returned string is a static string literal. Do not free it.
#[no_mangle]
pub extern "C" fn incident_version() -> *const c_char {
    c"0.1.0".as_ptr()
}
