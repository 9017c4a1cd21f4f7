use std::ffi::c_void;

use anyhow::{Context, Result};
use objc2_core_foundation::{
    CFFileDescriptor, CFFileDescriptorContext, CFFileDescriptorNativeDescriptor, CFOptionFlags,
    CFRetained, CFRunLoop, kCFRunLoopDefaultMode,
};

use super::app::AppDelegate;

pub(super) const READ_CALL_BACK: CFOptionFlags = 1;

type FdCallback = unsafe extern "C-unwind" fn(*mut CFFileDescriptor, CFOptionFlags, *mut c_void);

/// Wrap a raw descriptor in a `CFFileDescriptor`, arm its read callback with
/// the delegate as context, and attach it to the current run loop. CF
/// disables the callback after every fire; the callback re-arms itself with
/// [`READ_CALL_BACK`].
pub(super) fn attach_to_runloop(
    fd: CFFileDescriptorNativeDescriptor,
    close_on_invalidate: bool,
    callback: FdCallback,
    delegate: &'static AppDelegate,
) -> Result<CFRetained<CFFileDescriptor>> {
    let context = CFFileDescriptorContext {
        version: 0,
        info: delegate as *const AppDelegate as *mut c_void,
        retain: None,
        release: None,
        copyDescription: None,
    };

    let fd_ref =
        unsafe { CFFileDescriptor::new(None, fd, close_on_invalidate, Some(callback), &context) }
            .context("Failed to create CFFileDescriptor")?;
    fd_ref.enable_call_backs(READ_CALL_BACK);

    let source = CFFileDescriptor::new_run_loop_source(None, Some(&fd_ref), 0)
        .context("Failed to create run loop source")?;
    CFRunLoop::current()
        .unwrap()
        .add_source(Some(&source), unsafe { kCFRunLoopDefaultMode });

    Ok(fd_ref)
}
