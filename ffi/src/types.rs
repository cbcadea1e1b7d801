//! C-side views of the feedback types.
//!
//! Strings cross as NUL-terminated `*mut c_char`, lists as pointer plus
//! length, and results as a tagged envelope whose payload the host frees
//! with `fbk_free_result`. Requests flow outward to the host callback and
//! responses come back through `FfiResponseSink`.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use feedback_core::{
    DeviceMetadata, FeedbackError, FeedbackKit, HttpMethod, HttpRequest, HttpResponse, HttpTransport,
    KeyValueStore, PublicItem, PublicListModel, SubmissionForm, SubmissionState,
};

/// Host callback that performs one HTTP round-trip.
///
/// The host reads `request`, performs the call, reports the outcome through
/// `fbk_response_set(sink, ...)` and returns 0. Any other return value is a
/// transport failure. `request` and `sink` are only valid during the call.
pub type FfiExecuteFn = Option<
    unsafe extern "C" fn(user_data: *mut c_void, request: *const FfiHttpRequest, sink: *mut FfiResponseSink) -> i32,
>;

/// Opaque handle to a `FeedbackKit`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiFeedbackKit {
    pub(crate) inner: FeedbackKit<CallbackTransport>,
}

/// `HttpTransport` that forwards to the host callback.
pub(crate) struct CallbackTransport {
    pub(crate) execute: unsafe extern "C" fn(*mut c_void, *const FfiHttpRequest, *mut FfiResponseSink) -> i32,
    pub(crate) user_data: *mut c_void,
}

// The host promises its callback and `user_data` may be used from any thread.
unsafe impl Send for CallbackTransport {}
unsafe impl Sync for CallbackTransport {}

impl HttpTransport for CallbackTransport {
    fn execute(&self, request: HttpRequest) -> feedback_core::Result<HttpResponse> {
        let ffi_request = FfiHttpRequest::from_core(request);
        let mut sink = FfiResponseSink::default();
        let rc = unsafe { (self.execute)(self.user_data, ffi_request, &mut sink) };
        unsafe { FfiHttpRequest::free_raw(ffi_request) };

        if rc != 0 {
            return Err(FeedbackError::Transport(format!("host transport returned {rc}")));
        }
        sink.response.ok_or(FeedbackError::InvalidResponse)
    }
}

/// Collects the host's response during a transport callback.
#[derive(Default)]
pub struct FfiResponseSink {
    pub(crate) response: Option<HttpResponse>,
}

// ---------------------------------------------------------------------------
// Host key-value storage
// ---------------------------------------------------------------------------

/// Host callback that reads a string array.
///
/// The host calls `fbk_strings_push(sink, value)` once per stored value and
/// returns 0. A key with no values reads as absent. Any other return value is
/// a storage failure.
pub type FfiLoadStringsFn =
    Option<unsafe extern "C" fn(user_data: *mut c_void, key: *const c_char, sink: *mut FfiStringsSink) -> i32>;

/// Host callback that replaces the string array stored under `key`.
///
/// `values` holds `len` C strings valid only during the call. Return 0 on
/// success.
pub type FfiStoreStringsFn = Option<
    unsafe extern "C" fn(user_data: *mut c_void, key: *const c_char, values: *const *const c_char, len: u32) -> i32,
>;

/// Host storage (UserDefaults, SharedPreferences) for the voted-id set.
#[repr(C)]
pub struct FfiKeyValueStore {
    pub user_data: *mut c_void,
    pub load: FfiLoadStringsFn,
    pub store: FfiStoreStringsFn,
}

/// Collects values during a load callback.
#[derive(Default)]
pub struct FfiStringsSink {
    pub(crate) values: Option<Vec<String>>,
}

/// `KeyValueStore` that forwards to the host callbacks.
pub(crate) struct CallbackStore {
    load: unsafe extern "C" fn(*mut c_void, *const c_char, *mut FfiStringsSink) -> i32,
    store: unsafe extern "C" fn(*mut c_void, *const c_char, *const *const c_char, u32) -> i32,
    user_data: *mut c_void,
}

// Same contract as `CallbackTransport`.
unsafe impl Send for CallbackStore {}
unsafe impl Sync for CallbackStore {}

impl CallbackStore {
    /// `None` when either callback is missing.
    pub(crate) fn from_ffi(ffi: &FfiKeyValueStore) -> Option<Self> {
        Some(Self {
            load: ffi.load?,
            store: ffi.store?,
            user_data: ffi.user_data,
        })
    }
}

impl KeyValueStore for CallbackStore {
    fn load_strings(&self, key: &str) -> feedback_core::Result<Option<Vec<String>>> {
        let key = storage_c_string(key)?;
        let mut sink = FfiStringsSink::default();
        let rc = unsafe { (self.load)(self.user_data, key.as_ptr(), &mut sink) };
        if rc != 0 {
            return Err(FeedbackError::Storage(format!("host load returned {rc}")));
        }
        Ok(sink.values)
    }

    fn store_strings(&self, key: &str, values: &[String]) -> feedback_core::Result<()> {
        let key = storage_c_string(key)?;
        let owned = values
            .iter()
            .map(|v| storage_c_string(v))
            .collect::<feedback_core::Result<Vec<_>>>()?;
        let pointers: Vec<*const c_char> = owned.iter().map(|v| v.as_ptr()).collect();
        let rc = unsafe { (self.store)(self.user_data, key.as_ptr(), pointers.as_ptr(), pointers.len() as u32) };
        if rc != 0 {
            return Err(FeedbackError::Storage(format!("host store returned {rc}")));
        }
        Ok(())
    }
}

fn storage_c_string(s: &str) -> feedback_core::Result<CString> {
    CString::new(s).map_err(|e| FeedbackError::Storage(e.to_string()))
}

// ---------------------------------------------------------------------------
// View model handles
// ---------------------------------------------------------------------------

/// Opaque handle to the public board model. Not thread-safe: drive it from
/// the thread that renders the list.
pub struct FfiListModel {
    pub(crate) inner: PublicListModel,
}

/// Opaque handle to the submission form model.
pub struct FfiSubmissionForm {
    pub(crate) inner: SubmissionForm,
}

/// Submission form state as a C enum.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiSubmissionState {
    Idle = 0,
    Submitting = 1,
    Success = 2,
    Failed = 3,
}

impl From<&SubmissionState> for FfiSubmissionState {
    fn from(state: &SubmissionState) -> Self {
        match state {
            SubmissionState::Idle => FfiSubmissionState::Idle,
            SubmissionState::Submitting => FfiSubmissionState::Submitting,
            SubmissionState::Success { .. } => FfiSubmissionState::Success,
            SubmissionState::Failed(_) => FfiSubmissionState::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let url = to_c_string(req.url);
        let body = req.body.map(to_c_string).unwrap_or(std::ptr::null_mut());

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }

    /// Free a request produced by `from_core`. Null is ignored.
    pub(crate) unsafe fn free_raw(req: *mut Self) {
        if req.is_null() {
            return;
        }
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize);
            let headers = unsafe { Box::from_raw(slice) };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Device metadata supplied by the host. Any field may be null.
#[repr(C)]
pub struct FfiDeviceMetadata {
    pub app_name: *const c_char,
    pub app_version: *const c_char,
    pub build_number: *const c_char,
    pub os_name: *const c_char,
    pub os_version: *const c_char,
    pub device_model: *const c_char,
    pub locale: *const c_char,
    pub timezone: *const c_char,
}

impl FfiDeviceMetadata {
    pub(crate) unsafe fn to_core(&self) -> DeviceMetadata {
        unsafe {
            DeviceMetadata {
                app_name: opt_string(self.app_name),
                app_version: opt_string(self.app_version),
                build_number: opt_string(self.build_number),
                os_name: opt_string(self.os_name),
                os_version: opt_string(self.os_version),
                device_model: opt_string(self.device_model),
                locale: opt_string(self.locale),
                timezone: opt_string(self.timezone),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiFeedbackResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotConfigured = 1,
    InvalidResponse = 2,
    Server = 3,
    Transport = 4,
    Decode = 5,
    Serialization = 6,
    Storage = 7,
    Panic = 8,
    NullArg = 9,
    InvalidArg = 10,
}

/// Tag that tells `fbk_free_result` what `FfiFeedbackResult::data` points to.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Slug = 1,
    ItemList = 2,
    Upvote = 3,
}

/// A public board item exposed to C. `description` and `source` may be null.
#[repr(C)]
pub struct FfiPublicItem {
    pub id: *mut c_char,
    pub title: *mut c_char,
    pub description: *mut c_char,
    pub status: *mut c_char,
    pub source: *mut c_char,
    pub created_at: *mut c_char,
    pub has_votes: bool,
    pub votes: u32,
}

#[repr(C)]
pub struct FfiPublicItemList {
    pub items: *mut FfiPublicItem,
    pub len: u32,
}

impl FfiPublicItemList {
    /// Copy the list back into core items.
    pub(crate) unsafe fn to_core(&self) -> Vec<PublicItem> {
        if self.items.is_null() || self.len == 0 {
            return Vec::new();
        }
        let items = unsafe { std::slice::from_raw_parts(self.items, self.len as usize) };
        items
            .iter()
            .map(|item| unsafe {
                PublicItem {
                    id: read_c_str(item.id),
                    title: read_c_str(item.title),
                    description: opt_string(item.description),
                    status: read_c_str(item.status),
                    source: opt_string(item.source),
                    created_at: read_c_str(item.created_at),
                    votes: item.has_votes.then_some(item.votes),
                }
            })
            .collect()
    }
}

#[repr(C)]
pub struct FfiUpvote {
    pub has_votes: bool,
    pub votes: u32,
}

/// Result envelope for all operations.
///
/// `data_tag` says what `data` points to. Failures carry a non-zero
/// `error_code`, a message string and a null `data`.
#[repr(C)]
pub struct FfiFeedbackResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiFeedbackResult {
    fn boxed(error_code: FfiErrorCode, error_message: *mut c_char, data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiFeedbackResult {
            error_code,
            error_message,
            data_tag,
            data,
        }))
    }

    /// Success with no data payload (e.g. send feedback).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), FfiDataTag::None, std::ptr::null_mut())
    }

    /// Success carrying a C string (the board slug).
    pub(crate) fn ok_slug(slug: String) -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), FfiDataTag::Slug, to_c_string(slug) as *mut c_void)
    }

    pub(crate) fn ok_items(items: Vec<PublicItem>) -> *mut Self {
        let len = items.len() as u32;
        let ffi_items: Box<[FfiPublicItem]> = items
            .into_iter()
            .map(|item| FfiPublicItem {
                id: to_c_string(item.id),
                title: to_c_string(item.title),
                description: item.description.map(to_c_string).unwrap_or(std::ptr::null_mut()),
                status: to_c_string(item.status),
                source: item.source.map(to_c_string).unwrap_or(std::ptr::null_mut()),
                created_at: to_c_string(item.created_at),
                has_votes: item.votes.is_some(),
                votes: item.votes.unwrap_or(0),
            })
            .collect();
        let items = if len == 0 {
            std::ptr::null_mut()
        } else {
            Box::into_raw(ffi_items) as *mut FfiPublicItem
        };
        let list = Box::new(FfiPublicItemList { items, len });
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), FfiDataTag::ItemList, Box::into_raw(list) as *mut c_void)
    }

    pub(crate) fn ok_upvote(votes: Option<u32>) -> *mut Self {
        let upvote = Box::new(FfiUpvote {
            has_votes: votes.is_some(),
            votes: votes.unwrap_or(0),
        });
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), FfiDataTag::Upvote, Box::into_raw(upvote) as *mut c_void)
    }

    /// Build an error result from a `FeedbackError`.
    pub(crate) fn from_error(err: FeedbackError) -> *mut Self {
        let code = match &err {
            FeedbackError::NotConfigured => FfiErrorCode::NotConfigured,
            FeedbackError::InvalidResponse => FfiErrorCode::InvalidResponse,
            FeedbackError::ServerError(_) => FfiErrorCode::Server,
            FeedbackError::Transport(_) => FfiErrorCode::Transport,
            FeedbackError::Decode(_) => FfiErrorCode::Decode,
            FeedbackError::Serialization(_) => FfiErrorCode::Serialization,
            FeedbackError::Storage(_) => FfiErrorCode::Storage,
        };
        Self::boxed(code, to_c_string(err.to_string()), FfiDataTag::None, std::ptr::null_mut())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(message: String) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidArg, message)
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg.to_string())
    }

    fn failure(code: FfiErrorCode, message: String) -> *mut Self {
        Self::boxed(code, to_c_string(message), FfiDataTag::None, std::ptr::null_mut())
    }

    /// Rebuild the core error of a failed result; `None` on success.
    ///
    /// Argument and panic codes have no core counterpart and come back as
    /// `Transport` carrying the message.
    pub(crate) unsafe fn core_error(&self) -> Option<FeedbackError> {
        let message = unsafe { opt_string(self.error_message) }.unwrap_or_default();
        let detail = |prefix: &str| message.strip_prefix(prefix).unwrap_or(&message).to_string();
        let err = match self.error_code {
            FfiErrorCode::Ok => return None,
            FfiErrorCode::NotConfigured => FeedbackError::NotConfigured,
            FfiErrorCode::InvalidResponse => FeedbackError::InvalidResponse,
            FfiErrorCode::Server => FeedbackError::ServerError(message.clone()),
            FfiErrorCode::Transport => FeedbackError::Transport(detail("transport error: ")),
            FfiErrorCode::Decode => FeedbackError::Decode(detail("decode failed: ")),
            FfiErrorCode::Serialization => FeedbackError::Serialization(detail("serialization failed: ")),
            FfiErrorCode::Storage => FeedbackError::Storage(detail("storage error: ")),
            FfiErrorCode::Panic | FfiErrorCode::NullArg | FfiErrorCode::InvalidArg => {
                FeedbackError::Transport(message.clone())
            }
        };
        Some(err)
    }

    /// The outcome of an `fbk_upvote` result, or `None` if this is a
    /// successful result of another kind.
    pub(crate) unsafe fn upvote_outcome(&self) -> Option<feedback_core::Result<Option<u32>>> {
        if let Some(err) = unsafe { self.core_error() } {
            return Some(Err(err));
        }
        match self.data_tag {
            FfiDataTag::Upvote if !self.data.is_null() => {
                let upvote = unsafe { &*(self.data as *const FfiUpvote) };
                Some(Ok(upvote.has_votes.then_some(upvote.votes)))
            }
            _ => None,
        }
    }

    /// The outcome of an `fbk_fetch_public_items` result, or `None` if this
    /// is a successful result of another kind.
    pub(crate) unsafe fn items_outcome(&self) -> Option<feedback_core::Result<Vec<PublicItem>>> {
        if let Some(err) = unsafe { self.core_error() } {
            return Some(Err(err));
        }
        match self.data_tag {
            FfiDataTag::ItemList if !self.data.is_null() => {
                let list = unsafe { &*(self.data as *const FfiPublicItemList) };
                Some(Ok(unsafe { list.to_core() }))
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// Hand a Rust string to C. Interior NULs are dropped rather than failing.
pub(crate) fn to_c_string(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(s).unwrap_or_default().into_raw()
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Borrow a C string as UTF-8, replacing invalid sequences.
pub(crate) unsafe fn read_c_str(s: *const c_char) -> String {
    unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned()
}

pub(crate) unsafe fn opt_string(s: *const c_char) -> Option<String> {
    if s.is_null() {
        None
    } else {
        Some(unsafe { read_c_str(s) })
    }
}
