//! C-ABI FFI bindings for cross-language integration.
//!
//! Pages are passed in as the JSON emitted by the layout collaborators and
//! results come back as owned C strings.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::render::{self, JsonFormat};
use crate::{parse_pages_json, reconstruct_with_options, ReconstructOptions};

/// Result structure returned by FFI functions.
#[repr(C)]
pub struct UnflatResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The result data (null if failed). Must be freed with `unflat_free_result`.
    pub data: *mut c_char,
    /// Error message (null if succeeded). Must be freed with `unflat_free_result`.
    pub error: *mut c_char,
}

impl UnflatResult {
    fn success(data: String) -> Self {
        Self {
            success: true,
            data: CString::new(data).unwrap_or_default().into_raw(),
            error: ptr::null_mut(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: ptr::null_mut(),
            error: CString::new(message).unwrap_or_default().into_raw(),
        }
    }
}

/// Options for reconstruction via FFI.
#[repr(C)]
pub struct UnflatOptions {
    /// Downgrade broken table contracts to warnings.
    pub lenient: bool,
    /// Fill table skeletons from table-model output.
    pub parse_tables: bool,
    /// Pair captions with tables and figures.
    pub associate_captions: bool,
}

impl Default for UnflatOptions {
    fn default() -> Self {
        Self {
            lenient: true,
            parse_tables: true,
            associate_captions: true,
        }
    }
}

impl From<&UnflatOptions> for ReconstructOptions {
    fn from(options: &UnflatOptions) -> Self {
        let mut converted = ReconstructOptions::new()
            .with_tables(options.parse_tables)
            .with_captions(options.associate_captions);
        if options.lenient {
            converted = converted.lenient();
        }
        converted
    }
}

unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} cannot be null", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 {}", what))
}

fn markdown_internal(json: &str, options: &ReconstructOptions) -> crate::Result<String> {
    let pages = parse_pages_json(json)?;
    Ok(reconstruct_with_options(&pages, options)?.to_markdown())
}

fn tree_internal(json: &str, name: &str, format: JsonFormat, options: &ReconstructOptions) -> crate::Result<String> {
    let pages = parse_pages_json(json)?;
    let structure = reconstruct_with_options(&pages, options)?;
    render::to_json(&structure.to_tree(name), format)
}

/// Reconstruct pages JSON and render it as Markdown.
///
/// # Safety
///
/// The `pages_json` must be a valid null-terminated UTF-8 string.
/// The returned result must be freed with `unflat_free_result`.
#[no_mangle]
pub unsafe extern "C" fn unflat_markdown_from_json(pages_json: *const c_char) -> UnflatResult {
    unflat_markdown_from_json_with_options(pages_json, UnflatOptions::default())
}

/// Reconstruct pages JSON with options and render it as Markdown.
///
/// # Safety
///
/// The `pages_json` must be a valid null-terminated UTF-8 string.
/// The returned result must be freed with `unflat_free_result`.
#[no_mangle]
pub unsafe extern "C" fn unflat_markdown_from_json_with_options(
    pages_json: *const c_char,
    options: UnflatOptions,
) -> UnflatResult {
    let json = match read_str(pages_json, "pages JSON") {
        Ok(s) => s,
        Err(e) => return UnflatResult::error(e),
    };

    match markdown_internal(json, &ReconstructOptions::from(&options)) {
        Ok(markdown) => UnflatResult::success(markdown),
        Err(e) => UnflatResult::error(e.to_string()),
    }
}

/// Reconstruct pages JSON and serialize the document tree.
///
/// `name` becomes the tree's `file_name`; null is treated as empty.
///
/// # Safety
///
/// The `pages_json` must be a valid null-terminated UTF-8 string.
/// The `name` must be null or a valid null-terminated UTF-8 string.
/// The returned result must be freed with `unflat_free_result`.
#[no_mangle]
pub unsafe extern "C" fn unflat_tree_from_json(
    pages_json: *const c_char,
    name: *const c_char,
    pretty: bool,
) -> UnflatResult {
    let json = match read_str(pages_json, "pages JSON") {
        Ok(s) => s,
        Err(e) => return UnflatResult::error(e),
    };
    let name = if name.is_null() {
        ""
    } else {
        match read_str(name, "name") {
            Ok(s) => s,
            Err(e) => return UnflatResult::error(e),
        }
    };

    let format = if pretty {
        JsonFormat::Pretty
    } else {
        JsonFormat::Compact
    };

    let options = ReconstructOptions::from(&UnflatOptions::default());
    match tree_internal(json, name, format, &options) {
        Ok(tree) => UnflatResult::success(tree),
        Err(e) => UnflatResult::error(e.to_string()),
    }
}

/// Free a result returned by any unflat function.
///
/// # Safety
///
/// The `result` must have been returned by an unflat function.
/// This function should only be called once per result.
#[no_mangle]
pub unsafe extern "C" fn unflat_free_result(result: UnflatResult) {
    if !result.data.is_null() {
        drop(CString::from_raw(result.data));
    }
    if !result.error.is_null() {
        drop(CString::from_raw(result.error));
    }
}

/// Free a string allocated by unflat.
///
/// # Safety
///
/// The `ptr` must have been allocated by unflat.
/// This function should only be called once per pointer.
#[no_mangle]
pub unsafe extern "C" fn unflat_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the version of the unflat library.
///
/// # Safety
///
/// The returned string is statically allocated and should not be freed.
#[no_mangle]
pub extern "C" fn unflat_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGES: &str = r#"[{"pnum": 0, "bbox": [0, 0, 600, 800], "blocks": [
        {"role_label": "doc_title", "pnum": 0, "bbox": [10, 10, 200, 30],
         "lines": [{"bbox": [10, 10, 200, 30], "spans": [{"text": "第一章 绪论", "bbox": [10, 10, 200, 30]}]}]}
    ]}]"#;

    #[test]
    fn test_version() {
        let version = unflat_version();
        assert!(!version.is_null());
    }

    #[test]
    fn test_null_input() {
        unsafe {
            let result = unflat_markdown_from_json(ptr::null());
            assert!(!result.success);
            assert!(!result.error.is_null());
            unflat_free_result(result);
        }
    }

    #[test]
    fn test_markdown_from_json() {
        let json = CString::new(PAGES).unwrap();
        unsafe {
            let result = unflat_markdown_from_json(json.as_ptr());
            assert!(result.success);
            let markdown = CStr::from_ptr(result.data).to_str().unwrap().to_string();
            assert_eq!(markdown, "# 第一章 绪论");
            unflat_free_result(result);
        }
    }

    #[test]
    fn test_tree_from_json() {
        let json = CString::new(PAGES).unwrap();
        let name = CString::new("guide").unwrap();
        unsafe {
            let result = unflat_tree_from_json(json.as_ptr(), name.as_ptr(), false);
            assert!(result.success);
            let tree = CStr::from_ptr(result.data).to_str().unwrap();
            assert!(tree.contains("\"file_name\":\"guide\""));
            unflat_free_result(result);
        }
    }

    #[test]
    fn test_invalid_json() {
        let json = CString::new("not json").unwrap();
        unsafe {
            let result = unflat_markdown_from_json(json.as_ptr());
            assert!(!result.success);
            unflat_free_result(result);
        }
    }
}
