//! C-ABI wrapper around `feedback-core`.
//!
//! # Overview
//! Exposes the feedback SDK through `extern "C"` functions so iOS and Android
//! hosts can configure the kit, submit feedback, list the public board and
//! upvote without linking to serde or an HTTP stack. The host performs the
//! actual HTTP round-trip through a callback supplied to `fbk_kit_new`.
//!
//! The board and form view models are exposed too (`fbk_list_*`,
//! `fbk_form_*`), so the voted-id set, optimistic upvotes and the submit
//! state machine live here rather than in each host. The voted-id set is
//! persisted through `FfiKeyValueStore` callbacks.
//!
//! # Design
//! - Each `fbk_*` entry point runs inside `catch_unwind`; a panic becomes an
//!   `FfiErrorCode::Panic` result.
//! - Configuration is process-wide: `fbk_configure` writes the single
//!   `ConfigHolder` that every kit handle reads.
//! - Operations return one `FfiFeedbackResult`; `data_tag` names the payload.
//! - Returned results and strings belong to the host, which releases them
//!   with `fbk_free_result` / `fbk_free_string`.

pub mod types;

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use std::time::Instant;

use feedback_core::{
    Category, ConfigHolder, FeedbackKit, HttpResponse, MemoryStore, PublicListModel, StaticDeviceMetadata,
    SubmissionForm, DEFAULT_PAGE_LIMIT,
};
use tracing::error;

use types::*;

fn panic_result(function: &str) -> *mut FfiFeedbackResult {
    error!(function, "panic caught at FFI boundary");
    FfiFeedbackResult::panic(&format!("panic in {function}"))
}

fn category_from_c(category: i32) -> Option<Category> {
    match category {
        0 => Some(Category::Feature),
        1 => Some(Category::Bug),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Set or replace the process-wide configuration. Last write wins.
///
/// `base_url` may be null to use the hosted default. Returns false if
/// `secret` is null.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_configure(secret: *const c_char, base_url: *const c_char) -> bool {
    catch_unwind(|| {
        if secret.is_null() {
            return false;
        }
        let secret = unsafe { read_c_str(secret) };
        let base_url = unsafe { opt_string(base_url) };
        ConfigHolder::global().configure(&secret, base_url.as_deref());
        true
    })
    .unwrap_or(false)
}

/// Whether `fbk_configure` has been called in this process.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_is_configured() -> bool {
    catch_unwind(|| ConfigHolder::global().is_configured()).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Kit lifecycle
// ---------------------------------------------------------------------------

/// Create a kit that performs HTTP through `execute`.
///
/// `user_data` is passed back to every callback invocation. `device` may be
/// null; when given, its strings are copied. Returns null if `execute` is
/// null. The caller must free the returned pointer with `fbk_kit_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_kit_new(
    execute: FfiExecuteFn,
    user_data: *mut c_void,
    device: *const FfiDeviceMetadata,
) -> *mut FfiFeedbackKit {
    catch_unwind(|| {
        let Some(execute) = execute else {
            return std::ptr::null_mut();
        };
        let mut kit = FeedbackKit::new(CallbackTransport { execute, user_data });
        if !device.is_null() {
            let metadata = unsafe { (*device).to_core() };
            kit = kit.with_device_metadata(StaticDeviceMetadata(metadata));
        }
        Box::into_raw(Box::new(FfiFeedbackKit { inner: kit }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a kit created by `fbk_kit_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_kit_free(kit: *mut FfiFeedbackKit) {
    if !kit.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(kit) });
        }));
    }
}

/// Report the HTTP response from inside a transport callback.
///
/// `body` may be null for an empty body. The body is copied.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_response_set(sink: *mut FfiResponseSink, status: u16, body: *const c_char) {
    if sink.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let body = unsafe { opt_string(body) }.unwrap_or_default();
        let sink = unsafe { &mut *sink };
        sink.response = Some(HttpResponse::new(status, body));
    }));
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Submit feedback. `description` may be null. `category` is 0 for a
/// feature request and 1 for a bug report.
///
/// Returns a result with `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_send_feedback(
    kit: *const FfiFeedbackKit,
    title: *const c_char,
    description: *const c_char,
    category: i32,
) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        if title.is_null() {
            return FfiFeedbackResult::null_arg("title");
        }
        let Some(category) = category_from_c(category) else {
            return FfiFeedbackResult::invalid_arg(format!("unknown category: {category}"));
        };
        let kit = unsafe { &*kit };
        let title = unsafe { read_c_str(title) };
        let description = unsafe { opt_string(description) };
        match kit.inner.send_feedback(&title, description.as_deref(), category) {
            Ok(()) => FfiFeedbackResult::ok_empty(),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_send_feedback"))
}

/// Fetch the public board. `limit` of 0 means the default page size.
///
/// Returns a result with `data_tag = ItemList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_fetch_public_items(kit: *const FfiFeedbackKit, limit: u32) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        let kit = unsafe { &*kit };
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit as usize };
        match kit.inner.fetch_public_items(limit) {
            Ok(items) => FfiFeedbackResult::ok_items(items),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_fetch_public_items"))
}

/// Upvote an item.
///
/// Returns a result with `data_tag = Upvote` on success; `has_votes` is false
/// when the server did not report a new count.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_upvote(kit: *const FfiFeedbackKit, feedback_id: *const c_char) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        if feedback_id.is_null() {
            return FfiFeedbackResult::null_arg("feedback_id");
        }
        let kit = unsafe { &*kit };
        let feedback_id = unsafe { read_c_str(feedback_id) };
        match kit.inner.upvote(&feedback_id) {
            Ok(votes) => FfiFeedbackResult::ok_upvote(votes),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_upvote"))
}

/// Resolve (or return the cached) board slug.
///
/// Returns a result with `data_tag = Slug` and `data` pointing to a C string.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_resolve_board_slug(kit: *const FfiFeedbackKit) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        let kit = unsafe { &*kit };
        match kit.inner.resolve_board_slug() {
            Ok(slug) => FfiFeedbackResult::ok_slug(slug),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_resolve_board_slug"))
}

// ---------------------------------------------------------------------------
// Host storage
// ---------------------------------------------------------------------------

/// Report one stored value from inside a load callback. The value is copied.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_strings_push(sink: *mut FfiStringsSink, value: *const c_char) {
    if sink.is_null() || value.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let value = unsafe { read_c_str(value) };
        let sink = unsafe { &mut *sink };
        sink.values.get_or_insert_with(Vec::new).push(value);
    }));
}

// ---------------------------------------------------------------------------
// Public board model
// ---------------------------------------------------------------------------

/// Create a board model and load the voted-id set from `store`.
///
/// `store` may be null for an in-memory set that is lost with the model.
/// Returns null if `store` is given with a missing callback. `limit` of 0
/// means the default page size. Free with `fbk_list_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_new(store: *const FfiKeyValueStore, limit: u32) -> *mut FfiListModel {
    catch_unwind(AssertUnwindSafe(|| {
        let model = if store.is_null() {
            PublicListModel::new(Box::new(MemoryStore::new()))
        } else {
            match CallbackStore::from_ffi(unsafe { &*store }) {
                Some(store) => PublicListModel::new(Box::new(store)),
                None => return std::ptr::null_mut(),
            }
        };
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit as usize };
        Box::into_raw(Box::new(FfiListModel {
            inner: model.with_limit(limit),
        }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a model created by `fbk_list_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_free(list: *mut FfiListModel) {
    if !list.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(list) });
        }));
    }
}

/// Fetch the board through `kit` and replace the model's items.
///
/// On failure the previous items stay and `fbk_list_error` returns the
/// banner text.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_refresh(list: *mut FfiListModel, kit: *const FfiFeedbackKit) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return FfiFeedbackResult::null_arg("list");
        }
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        let (list, kit) = unsafe { (&mut *list, &*kit) };
        match list.inner.refresh(&kit.inner) {
            Ok(()) => FfiFeedbackResult::ok_empty(),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_list_refresh"))
}

/// Apply a result from `fbk_fetch_public_items` run elsewhere.
///
/// `result` is only read; the caller still frees it.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_apply_refresh(
    list: *mut FfiListModel,
    result: *const FfiFeedbackResult,
) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return FfiFeedbackResult::null_arg("list");
        }
        if result.is_null() {
            return FfiFeedbackResult::null_arg("result");
        }
        let list = unsafe { &mut *list };
        let Some(outcome) = (unsafe { (*result).items_outcome() }) else {
            return FfiFeedbackResult::invalid_arg("result does not carry an item list".to_string());
        };
        match list.inner.apply_refresh(outcome) {
            Ok(()) => FfiFeedbackResult::ok_empty(),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_list_apply_refresh"))
}

/// Snapshot of the items as currently displayed, optimistic counts included.
///
/// Returns a result with `data_tag = ItemList`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_items(list: *const FfiListModel) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return FfiFeedbackResult::null_arg("list");
        }
        let list = unsafe { &*list };
        FfiFeedbackResult::ok_items(list.inner.items().to_vec())
    }))
    .unwrap_or_else(|_| panic_result("fbk_list_items"))
}

/// Banner text of the last failed refresh or upvote, or null. Free with
/// `fbk_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_error(list: *const FfiListModel) -> *mut c_char {
    if list.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let list = unsafe { &*list };
        list.inner
            .error()
            .map(|e| to_c_string(e.to_string()))
            .unwrap_or(std::ptr::null_mut())
    }))
    .unwrap_or(std::ptr::null_mut())
}

fn list_query(list: *const FfiListModel, id: *const c_char, query: fn(&PublicListModel, &str) -> bool) -> bool {
    if list.is_null() || id.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let list = unsafe { &*list };
        let id = unsafe { read_c_str(id) };
        query(&list.inner, &id)
    }))
    .unwrap_or(false)
}

/// Whether the upvote button for `id` should be enabled.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_can_upvote(list: *const FfiListModel, id: *const c_char) -> bool {
    list_query(list, id, PublicListModel::can_upvote)
}

#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_is_voting(list: *const FfiListModel, id: *const c_char) -> bool {
    list_query(list, id, PublicListModel::is_voting)
}

#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_has_voted(list: *const FfiListModel, id: *const c_char) -> bool {
    list_query(list, id, PublicListModel::has_voted)
}

/// Count the vote optimistically before running `fbk_upvote` elsewhere.
///
/// Returns false, and changes nothing, when the button should be disabled
/// or the item is not listed.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_begin_upvote(list: *mut FfiListModel, id: *const c_char) -> bool {
    if list.is_null() || id.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let list = unsafe { &mut *list };
        let id = unsafe { read_c_str(id) };
        list.inner.begin_upvote(&id)
    }))
    .unwrap_or(false)
}

/// Settle an upvote started with `fbk_list_begin_upvote` using the result of
/// `fbk_upvote`. `result` is only read; the caller still frees it.
///
/// Returns a result with `data_tag = Upvote` carrying the displayed count,
/// or the upvote's error after the count was restored.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_finish_upvote(
    list: *mut FfiListModel,
    id: *const c_char,
    result: *const FfiFeedbackResult,
) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return FfiFeedbackResult::null_arg("list");
        }
        if id.is_null() {
            return FfiFeedbackResult::null_arg("id");
        }
        if result.is_null() {
            return FfiFeedbackResult::null_arg("result");
        }
        let list = unsafe { &mut *list };
        let id = unsafe { read_c_str(id) };
        let Some(outcome) = (unsafe { (*result).upvote_outcome() }) else {
            return FfiFeedbackResult::invalid_arg("result does not carry an upvote".to_string());
        };
        match list.inner.finish_upvote(&id, outcome) {
            Ok(()) => FfiFeedbackResult::ok_upvote(list.inner.item(&id).and_then(|item| item.votes)),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_list_finish_upvote"))
}

/// Run a whole upvote through `kit`.
///
/// Returns `data_tag = Upvote` with the displayed count when a request was
/// sent, and `data_tag = None` when the id was already voted, in flight or
/// not listed (no request is made).
#[unsafe(no_mangle)]
pub extern "C" fn fbk_list_upvote(
    list: *mut FfiListModel,
    kit: *const FfiFeedbackKit,
    id: *const c_char,
) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return FfiFeedbackResult::null_arg("list");
        }
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        if id.is_null() {
            return FfiFeedbackResult::null_arg("id");
        }
        let (list, kit) = unsafe { (&mut *list, &*kit) };
        let id = unsafe { read_c_str(id) };
        match list.inner.upvote(&kit.inner, &id) {
            Ok(true) => FfiFeedbackResult::ok_upvote(list.inner.item(&id).and_then(|item| item.votes)),
            Ok(false) => FfiFeedbackResult::ok_empty(),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_list_upvote"))
}

// ---------------------------------------------------------------------------
// Submission form model
// ---------------------------------------------------------------------------

/// Create an empty form (feature category). Free with `fbk_form_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_new() -> *mut FfiSubmissionForm {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiSubmissionForm {
            inner: SubmissionForm::new(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a form created by `fbk_form_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_free(form: *mut FfiSubmissionForm) {
    if !form.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(form) });
        }));
    }
}

/// Replace the title as typed. Null clears it.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_set_title(form: *mut FfiSubmissionForm, title: *const c_char) {
    if form.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &mut *form };
        form.inner.title = unsafe { opt_string(title) }.unwrap_or_default();
    }));
}

/// Replace the description as typed. Null clears it.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_set_description(form: *mut FfiSubmissionForm, description: *const c_char) {
    if form.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &mut *form };
        form.inner.description = unsafe { opt_string(description) }.unwrap_or_default();
    }));
}

/// Select the category (0 feature, 1 bug). Returns false for other values.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_set_category(form: *mut FfiSubmissionForm, category: i32) -> bool {
    if form.is_null() {
        return false;
    }
    let Some(category) = category_from_c(category) else {
        return false;
    };
    catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &mut *form };
        form.inner.category = category;
        true
    }))
    .unwrap_or(false)
}

/// Whether the submit control should be enabled.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_can_submit(form: *const FfiSubmissionForm) -> bool {
    if form.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &*form };
        form.inner.can_submit()
    }))
    .unwrap_or(false)
}

/// Submit the trimmed form contents through `kit`.
///
/// Returns `InvalidArg` without any request when the form cannot be
/// submitted. Otherwise the form moves to `Success` or `Failed` and the
/// result mirrors it.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_submit(form: *mut FfiSubmissionForm, kit: *const FfiFeedbackKit) -> *mut FfiFeedbackResult {
    catch_unwind(AssertUnwindSafe(|| {
        if form.is_null() {
            return FfiFeedbackResult::null_arg("form");
        }
        if kit.is_null() {
            return FfiFeedbackResult::null_arg("kit");
        }
        let (form, kit) = unsafe { (&mut *form, &*kit) };
        let Some(draft) = form.inner.begin_submit() else {
            return FfiFeedbackResult::invalid_arg("form is not ready to submit".to_string());
        };
        let result = kit
            .inner
            .send_feedback(&draft.title, draft.description.as_deref(), draft.category);
        form.inner.finish_submit(result.clone());
        match result {
            Ok(()) => FfiFeedbackResult::ok_empty(),
            Err(e) => FfiFeedbackResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panic_result("fbk_form_submit"))
}

#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_state(form: *const FfiSubmissionForm) -> FfiSubmissionState {
    if form.is_null() {
        return FfiSubmissionState::Idle;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &*form };
        FfiSubmissionState::from(form.inner.state())
    }))
    .unwrap_or(FfiSubmissionState::Idle)
}

/// Inline error text of the last failed submission, or null. Free with
/// `fbk_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_error_text(form: *const FfiSubmissionForm) -> *mut c_char {
    if form.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &*form };
        form.inner
            .error_text()
            .map(|text| to_c_string(text.to_string()))
            .unwrap_or(std::ptr::null_mut())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Whether a successful form has been visible long enough to close.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_form_should_dismiss(form: *const FfiSubmissionForm) -> bool {
    if form.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let form = unsafe { &*form };
        form.inner.should_dismiss(Instant::now())
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiFeedbackResult` returned by any operation.
/// Null is a no-op. The payload is released according to `data_tag`.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_free_result(result: *mut FfiFeedbackResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Slug => free_c_string(result.data as *mut c_char),
            FfiDataTag::ItemList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiPublicItemList) };
                if !list.items.is_null() && list.len > 0 {
                    let slice = std::ptr::slice_from_raw_parts_mut(list.items, list.len as usize);
                    let items = unsafe { Box::from_raw(slice) };
                    for item in items.iter() {
                        free_ffi_item_fields(item);
                    }
                }
            }
            FfiDataTag::Upvote => drop(unsafe { Box::from_raw(result.data as *mut FfiUpvote) }),
            FfiDataTag::None => {}
        }
    }));
}

/// Free the C-string fields of an `FfiPublicItem` (but not the struct itself).
fn free_ffi_item_fields(item: &FfiPublicItem) {
    free_c_string(item.id);
    free_c_string(item.title);
    free_c_string(item.description);
    free_c_string(item.status);
    free_c_string(item.source);
    free_c_string(item.created_at);
}

/// Free a string the host took ownership of. Null is a no-op.
#[unsafe(no_mangle)]
pub extern "C" fn fbk_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::{CStr, CString};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use feedback_core::{FeedbackError, VOTED_IDS_KEY};

    // All tests share the process-wide configuration, so they all configure
    // identical values.
    const SECRET: &str = "ffi-secret";
    const BASE_URL: &str = "https://ffi.test";

    fn configure() {
        let secret = CString::new(SECRET).unwrap();
        let base = CString::new(BASE_URL).unwrap();
        assert!(fbk_configure(secret.as_ptr(), base.as_ptr()));
    }

    /// Routes by URL like the real backend would. `user_data` is an
    /// `AtomicUsize` call counter.
    unsafe extern "C" fn fake_backend(
        user_data: *mut c_void,
        request: *const FfiHttpRequest,
        sink: *mut FfiResponseSink,
    ) -> i32 {
        let counter = unsafe { &*(user_data as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::SeqCst);

        let req = unsafe { &*request };
        let url = unsafe { CStr::from_ptr(req.url) }.to_str().unwrap();
        let headers = if req.headers.is_null() {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) }
        };
        let secret_ok = headers.iter().any(|h| {
            let key = unsafe { CStr::from_ptr(h.key) }.to_str().unwrap();
            let value = unsafe { CStr::from_ptr(h.value) }.to_str().unwrap();
            key == "x-ingest-secret" && value == SECRET
        });

        let (status, body) = if url.ends_with("/api/ingest-info") {
            if secret_ok {
                (200, r#"{"slug":"ffi-board"}"#)
            } else {
                (401, "invalid ingest secret")
            }
        } else if url.ends_with("/api/feedback") {
            let body = unsafe { CStr::from_ptr(req.body) }.to_str().unwrap();
            let json: serde_json::Value = serde_json::from_str(body).unwrap();
            if json["title"] == "reject me" {
                (422, "title is not allowed")
            } else {
                (201, "")
            }
        } else if url.contains("/api/public-feedback?slug=ffi-board") {
            (
                200,
                r#"{"items":[{"id":"a1","title":"X","status":"open","created_at":"2024-01-01T00:00:00Z","votes":3},{"id":"b2","title":"Y","description":"why","status":"done","source":"mobile","created_at":"2024-01-02T00:00:00Z"}]}"#,
            )
        } else if url.ends_with("/api/public-upvote") {
            (200, r#"{"ok":true,"votes":4}"#)
        } else {
            (404, "")
        };
        let body = CString::new(body).unwrap();
        fbk_response_set(sink, status, body.as_ptr());
        0
    }

    unsafe extern "C" fn offline(
        _user_data: *mut c_void,
        _request: *const FfiHttpRequest,
        _sink: *mut FfiResponseSink,
    ) -> i32 {
        -1
    }

    unsafe extern "C" fn silent(
        _user_data: *mut c_void,
        _request: *const FfiHttpRequest,
        _sink: *mut FfiResponseSink,
    ) -> i32 {
        0
    }

    fn new_kit(counter: &AtomicUsize) -> *mut FfiFeedbackKit {
        let kit = fbk_kit_new(
            Some(fake_backend),
            counter as *const AtomicUsize as *mut c_void,
            std::ptr::null(),
        );
        assert!(!kit.is_null());
        kit
    }

    #[test]
    fn kit_new_null_callback_returns_null() {
        let kit = fbk_kit_new(None, std::ptr::null_mut(), std::ptr::null());
        assert!(kit.is_null());
    }

    #[test]
    fn kit_free_null_is_safe() {
        fbk_kit_free(std::ptr::null_mut());
    }

    #[test]
    fn configure_null_secret_is_rejected() {
        assert!(!fbk_configure(std::ptr::null(), std::ptr::null()));
    }

    #[test]
    fn configure_marks_process_configured() {
        configure();
        assert!(fbk_is_configured());
    }

    #[test]
    fn send_feedback_success() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let title = CString::new("Add dark mode").unwrap();

        let result = fbk_send_feedback(kit, title.as_ptr(), std::ptr::null(), 0);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert_eq!(r.data_tag, FfiDataTag::None);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn send_feedback_server_error_message() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let title = CString::new("reject me").unwrap();

        let result = fbk_send_feedback(kit, title.as_ptr(), std::ptr::null(), 1);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Server);
        let message = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert_eq!(message, "title is not allowed");

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn send_feedback_invalid_category() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let title = CString::new("x").unwrap();

        let result = fbk_send_feedback(kit, title.as_ptr(), std::ptr::null(), 7);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidArg);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn send_feedback_null_args() {
        let result = fbk_send_feedback(std::ptr::null(), std::ptr::null(), std::ptr::null(), 0);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        fbk_free_result(result);

        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let result = fbk_send_feedback(kit, std::ptr::null(), std::ptr::null(), 0);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn fetch_public_items_returns_list() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);

        let result = fbk_fetch_public_items(kit, 0);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::ItemList);

        let list = unsafe { &*(r.data as *const FfiPublicItemList) };
        assert_eq!(list.len, 2);
        let items = unsafe { std::slice::from_raw_parts(list.items, list.len as usize) };

        let id0 = unsafe { CStr::from_ptr(items[0].id) }.to_str().unwrap();
        assert_eq!(id0, "a1");
        assert!(items[0].has_votes);
        assert_eq!(items[0].votes, 3);
        assert!(items[0].description.is_null());

        let desc1 = unsafe { CStr::from_ptr(items[1].description) }.to_str().unwrap();
        assert_eq!(desc1, "why");
        assert!(!items[1].has_votes);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn fetch_public_items_respects_limit() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);

        let result = fbk_fetch_public_items(kit, 1);
        let r = unsafe { &*result };
        let list = unsafe { &*(r.data as *const FfiPublicItemList) };
        assert_eq!(list.len, 1);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn resolve_board_slug_returns_string() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);

        let result = fbk_resolve_board_slug(kit);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Slug);
        let slug = unsafe { CStr::from_ptr(r.data as *const c_char) }.to_str().unwrap();
        assert_eq!(slug, "ffi-board");

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn upvote_reports_votes() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let id = CString::new("a1").unwrap();

        let result = fbk_upvote(kit, id.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Upvote);
        let upvote = unsafe { &*(r.data as *const FfiUpvote) };
        assert!(upvote.has_votes);
        assert_eq!(upvote.votes, 4);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn failing_transport_is_transport_error() {
        configure();
        let kit = fbk_kit_new(Some(offline), std::ptr::null_mut(), std::ptr::null());
        let title = CString::new("x").unwrap();

        let result = fbk_send_feedback(kit, title.as_ptr(), std::ptr::null(), 0);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Transport);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn callback_without_response_is_invalid() {
        configure();
        let kit = fbk_kit_new(Some(silent), std::ptr::null_mut(), std::ptr::null());
        let id = CString::new("a1").unwrap();

        let result = fbk_upvote(kit, id.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidResponse);

        fbk_free_result(result);
        fbk_kit_free(kit);
    }

    #[test]
    fn device_metadata_is_copied() {
        let model = CString::new("Pixel 8").unwrap();
        let device = FfiDeviceMetadata {
            app_name: std::ptr::null(),
            app_version: std::ptr::null(),
            build_number: std::ptr::null(),
            os_name: std::ptr::null(),
            os_version: std::ptr::null(),
            device_model: model.as_ptr(),
            locale: std::ptr::null(),
            timezone: std::ptr::null(),
        };
        let metadata = unsafe { device.to_core() };
        assert_eq!(metadata.device_model.as_deref(), Some("Pixel 8"));
        assert!(metadata.app_name.is_none());

        let counter = AtomicUsize::new(0);
        let kit = fbk_kit_new(
            Some(fake_backend),
            &counter as *const AtomicUsize as *mut c_void,
            &device,
        );
        assert!(!kit.is_null());
        fbk_kit_free(kit);
    }

    #[test]
    fn request_conversion_round_trip() {
        let req = feedback_core::HttpRequest {
            method: feedback_core::HttpMethod::Post,
            url: "https://ffi.test/api/feedback".to_string(),
            headers: vec![("x-ingest-secret".to_string(), "s".to_string())],
            body: Some("{}".to_string()),
        };
        let ffi = FfiHttpRequest::from_core(req);
        let r = unsafe { &*ffi };
        assert_eq!(r.method, FfiHttpMethod::Post);
        assert_eq!(r.headers_len, 1);
        assert_eq!(unsafe { CStr::from_ptr(r.body) }.to_str().unwrap(), "{}");
        unsafe { FfiHttpRequest::free_raw(ffi) };
    }

    #[test]
    fn response_set_null_sink_is_safe() {
        fbk_response_set(std::ptr::null_mut(), 200, std::ptr::null());
    }

    #[test]
    fn free_result_null_is_safe() {
        fbk_free_result(std::ptr::null_mut());
    }

    #[test]
    fn free_string_null_is_safe() {
        fbk_free_string(std::ptr::null_mut());
    }

    type HostPrefs = Mutex<HashMap<String, Vec<String>>>;

    unsafe extern "C" fn prefs_load(user_data: *mut c_void, key: *const c_char, sink: *mut FfiStringsSink) -> i32 {
        let prefs = unsafe { &*(user_data as *const HostPrefs) };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap();
        if let Some(values) = prefs.lock().unwrap().get(key) {
            for value in values {
                let value = CString::new(value.as_str()).unwrap();
                fbk_strings_push(sink, value.as_ptr());
            }
        }
        0
    }

    unsafe extern "C" fn prefs_store(
        user_data: *mut c_void,
        key: *const c_char,
        values: *const *const c_char,
        len: u32,
    ) -> i32 {
        let prefs = unsafe { &*(user_data as *const HostPrefs) };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap().to_string();
        let values = unsafe { std::slice::from_raw_parts(values, len as usize) }
            .iter()
            .map(|v| unsafe { CStr::from_ptr(*v) }.to_str().unwrap().to_string())
            .collect();
        prefs.lock().unwrap().insert(key, values);
        0
    }

    fn host_store(prefs: &HostPrefs) -> FfiKeyValueStore {
        FfiKeyValueStore {
            user_data: prefs as *const HostPrefs as *mut c_void,
            load: Some(prefs_load),
            store: Some(prefs_store),
        }
    }

    fn displayed_votes(list: *const FfiListModel, id: &str) -> Option<u32> {
        let result = fbk_list_items(list);
        let r = unsafe { &*result };
        assert_eq!(r.data_tag, FfiDataTag::ItemList);
        let items = unsafe { (*(r.data as *const FfiPublicItemList)).to_core() };
        fbk_free_result(result);
        items.into_iter().find(|item| item.id == id).and_then(|item| item.votes)
    }

    fn take_string(s: *mut c_char) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let owned = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        fbk_free_string(s);
        Some(owned)
    }

    #[test]
    fn list_upvote_persists_through_host_store() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let prefs = HostPrefs::default();
        let store = host_store(&prefs);
        let id = CString::new("a1").unwrap();

        let list = fbk_list_new(&store, 0);
        assert!(!list.is_null());
        let result = fbk_list_refresh(list, kit);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Ok);
        fbk_free_result(result);
        assert_eq!(displayed_votes(list, "a1"), Some(3));
        assert!(fbk_list_can_upvote(list, id.as_ptr()));

        let result = fbk_list_upvote(list, kit, id.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Upvote);
        assert_eq!(unsafe { &*(r.data as *const FfiUpvote) }.votes, 4);
        fbk_free_result(result);
        assert!(fbk_list_has_voted(list, id.as_ptr()));
        assert_eq!(prefs.lock().unwrap().get(VOTED_IDS_KEY), Some(&vec!["a1".to_string()]));

        let before = counter.load(Ordering::SeqCst);
        let result = fbk_list_upvote(list, kit, id.as_ptr());
        assert_eq!(unsafe { &*result }.data_tag, FfiDataTag::None);
        fbk_free_result(result);
        assert_eq!(counter.load(Ordering::SeqCst), before);
        fbk_list_free(list);

        let reopened = fbk_list_new(&store, 0);
        assert!(fbk_list_has_voted(reopened, id.as_ptr()));
        assert!(!fbk_list_can_upvote(reopened, id.as_ptr()));
        fbk_list_free(reopened);
        fbk_kit_free(kit);
    }

    #[test]
    fn list_split_upvote_restores_count_after_failure() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let offline_kit = fbk_kit_new(Some(offline), std::ptr::null_mut(), std::ptr::null());
        let id = CString::new("a1").unwrap();

        let list = fbk_list_new(std::ptr::null(), 0);
        fbk_free_result(fbk_list_refresh(list, kit));
        assert!(fbk_list_begin_upvote(list, id.as_ptr()));
        assert!(fbk_list_is_voting(list, id.as_ptr()));
        assert!(!fbk_list_begin_upvote(list, id.as_ptr()));
        assert_eq!(displayed_votes(list, "a1"), Some(4));

        let fetched = fbk_fetch_public_items(kit, 0);
        let applied = fbk_list_apply_refresh(list, fetched);
        assert_eq!(unsafe { &*applied }.error_code, FfiErrorCode::Ok);
        fbk_free_result(applied);
        fbk_free_result(fetched);
        assert_eq!(displayed_votes(list, "a1"), Some(4));

        let upvote = fbk_upvote(offline_kit, id.as_ptr());
        let finished = fbk_list_finish_upvote(list, id.as_ptr(), upvote);
        assert_eq!(unsafe { &*finished }.error_code, FfiErrorCode::Transport);
        fbk_free_result(finished);
        fbk_free_result(upvote);

        assert_eq!(displayed_votes(list, "a1"), Some(3));
        assert!(fbk_list_can_upvote(list, id.as_ptr()));
        assert_eq!(
            take_string(fbk_list_error(list)).as_deref(),
            Some("transport error: host transport returned -1")
        );

        fbk_list_free(list);
        fbk_kit_free(offline_kit);
        fbk_kit_free(kit);
    }

    #[test]
    fn list_finish_rejects_result_of_another_kind() {
        let list = fbk_list_new(std::ptr::null(), 0);
        let id = CString::new("a1").unwrap();
        let empty = FfiFeedbackResult::ok_empty();

        let result = fbk_list_finish_upvote(list, id.as_ptr(), empty);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidArg);
        fbk_free_result(result);
        let result = fbk_list_apply_refresh(list, empty);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidArg);
        fbk_free_result(result);

        fbk_free_result(empty);
        fbk_list_free(list);
    }

    #[test]
    fn list_new_requires_both_store_callbacks() {
        let prefs = HostPrefs::default();
        let mut store = host_store(&prefs);
        store.store = None;
        assert!(fbk_list_new(&store, 0).is_null());
        fbk_list_free(std::ptr::null_mut());
    }

    #[test]
    fn form_submit_walks_the_state_machine() {
        configure();
        let counter = AtomicUsize::new(0);
        let kit = new_kit(&counter);
        let form = fbk_form_new();
        assert_eq!(fbk_form_state(form), FfiSubmissionState::Idle);
        assert!(!fbk_form_can_submit(form));

        let result = fbk_form_submit(form, kit);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidArg);
        fbk_free_result(result);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let title = CString::new("reject me").unwrap();
        fbk_form_set_title(form, title.as_ptr());
        assert!(fbk_form_set_category(form, 1));
        assert!(!fbk_form_set_category(form, 5));
        let result = fbk_form_submit(form, kit);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Server);
        fbk_free_result(result);
        assert_eq!(fbk_form_state(form), FfiSubmissionState::Failed);
        assert_eq!(take_string(fbk_form_error_text(form)).as_deref(), Some("title is not allowed"));
        assert!(fbk_form_can_submit(form));

        let title = CString::new("  Add dark mode ").unwrap();
        fbk_form_set_title(form, title.as_ptr());
        fbk_form_set_description(form, std::ptr::null());
        let result = fbk_form_submit(form, kit);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Ok);
        fbk_free_result(result);
        assert_eq!(fbk_form_state(form), FfiSubmissionState::Success);
        assert!(fbk_form_error_text(form).is_null());
        assert!(!fbk_form_should_dismiss(form));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        fbk_form_free(form);
        fbk_kit_free(kit);
    }

    #[test]
    fn result_errors_rebuild_core_errors() {
        let errors = [
            FeedbackError::NotConfigured,
            FeedbackError::InvalidResponse,
            FeedbackError::ServerError("board closed".to_string()),
            FeedbackError::Transport("offline".to_string()),
            FeedbackError::Decode("expected object".to_string()),
            FeedbackError::Serialization("bad float".to_string()),
            FeedbackError::Storage("disk full".to_string()),
        ];
        for err in errors {
            let result = FfiFeedbackResult::from_error(err.clone());
            assert_eq!(unsafe { (*result).core_error() }, Some(err));
            fbk_free_result(result);
        }
        let ok = FfiFeedbackResult::ok_empty();
        assert_eq!(unsafe { (*ok).core_error() }, None);
        fbk_free_result(ok);
    }
}
