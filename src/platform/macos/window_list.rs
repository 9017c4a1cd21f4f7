use std::collections::HashMap;

use objc2::MainThreadMarker;
use objc2_app_kit::NSRunningApplication;
use objc2_core_foundation::{CFArray, CFDictionary, CFNumber, CFString, CFType};
use objc2_core_graphics::{CGWindowListCopyWindowInfo, CGWindowListOption};

use crate::core::{DirectorySnapshot, Rect, WindowInfo};

use super::screens;

/// One refresh of the window server's window list plus the display
/// arrangement. A failed OS query yields an empty snapshot so consumers see
/// "no windows" rather than an error.
pub(super) fn snapshot(mtm: MainThreadMarker) -> DirectorySnapshot {
    DirectorySnapshot::new(list_windows(), screens::all_displays(mtm))
}

fn list_windows() -> Vec<WindowInfo> {
    let options =
        CGWindowListOption::OptionOnScreenOnly | CGWindowListOption::ExcludeDesktopElements;
    // 0 is kCGNullWindowID
    let Some(list) = (unsafe { CGWindowListCopyWindowInfo(options, 0) }) else {
        tracing::warn!("CGWindowListCopyWindowInfo returned nothing");
        return Vec::new();
    };
    let list: &CFArray<CFDictionary<CFString, CFType>> = unsafe { list.cast_unchecked() };

    // The window list repeats the owner pid per window, so resolve each pid's
    // bundle identifier once per refresh.
    let mut bundle_ids: HashMap<i32, Option<String>> = HashMap::new();

    let mut windows = Vec::new();
    for entry in list {
        if let Some(window) = parse_entry(&entry, &mut bundle_ids) {
            windows.push(window);
        }
    }
    windows
}

fn parse_entry(
    entry: &CFDictionary<CFString, CFType>,
    bundle_ids: &mut HashMap<i32, Option<String>>,
) -> Option<WindowInfo> {
    let id = get_i64(entry, "kCGWindowNumber")? as u32;
    let pid = get_i64(entry, "kCGWindowOwnerPID")? as i32;
    let layer = get_i64(entry, "kCGWindowLayer")? as i32;
    let alpha = get_f64(entry, "kCGWindowAlpha").unwrap_or(1.0);
    let frame = get_bounds(entry)?;
    let title = get_string(entry, "kCGWindowName").filter(|s| !s.is_empty());
    let bundle_id = bundle_ids
        .entry(pid)
        .or_insert_with(|| bundle_id_for_pid(pid))
        .clone();

    Some(WindowInfo {
        id,
        pid,
        title,
        bundle_id,
        frame,
        alpha,
        layer,
    })
}

fn get_i64(entry: &CFDictionary<CFString, CFType>, key: &'static str) -> Option<i64> {
    let value = entry.get(&CFString::from_static_str(key))?;
    value.downcast_ref::<CFNumber>()?.as_i64()
}

fn get_f64(entry: &CFDictionary<CFString, CFType>, key: &'static str) -> Option<f64> {
    let value = entry.get(&CFString::from_static_str(key))?;
    value.downcast_ref::<CFNumber>()?.as_f64()
}

fn get_string(entry: &CFDictionary<CFString, CFType>, key: &'static str) -> Option<String> {
    let value = entry.get(&CFString::from_static_str(key))?;
    value.downcast_ref::<CFString>().map(|s| s.to_string())
}

/// `kCGWindowBounds` is a nested dictionary of X/Y/Width/Height, in the
/// window server's top-left coordinate space.
fn get_bounds(entry: &CFDictionary<CFString, CFType>) -> Option<Rect> {
    let value = entry.get(&CFString::from_static_str("kCGWindowBounds"))?;
    let bounds = value.downcast_ref::<CFDictionary>()?;
    let bounds: &CFDictionary<CFString, CFType> = unsafe { bounds.cast_unchecked() };
    Some(Rect::new(
        get_f64(bounds, "X")?,
        get_f64(bounds, "Y")?,
        get_f64(bounds, "Width")?,
        get_f64(bounds, "Height")?,
    ))
}

fn bundle_id_for_pid(pid: i32) -> Option<String> {
    let app = NSRunningApplication::runningApplicationWithProcessIdentifier(pid)?;
    app.bundleIdentifier().map(|b| b.to_string())
}
