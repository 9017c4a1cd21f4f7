use std::ptr::NonNull;

use anyhow::{Context, Result};
use objc2_application_services::{AXUIElement, AXValue, AXValueType};
use objc2_core_foundation::{CFArray, CFRetained, CFString, CGPoint, CGSize, kCFBooleanTrue};

use crate::core::{ManipulationCandidate, Rect, WindowInfo, resolve};

use super::objc2_wrapper::{
    get_attribute, kAXFrontmostAttribute, kAXMainAttribute, kAXPositionAttribute,
    kAXSizeAttribute, kAXTitleAttribute, kAXWindowsAttribute, set_attribute_value,
};

/// Accessibility handle to a mirrored source window, used to raise and focus
/// it when interaction is forwarded. The accessibility tree shares no id with
/// the window list, so the handle is found by matching title and geometry.
pub(super) struct SourceWindow {
    element: CFRetained<AXUIElement>,
    app: CFRetained<AXUIElement>,
}

// Safety: AXUIElement operations are IPC calls to the accessibility server,
// safe to use from any thread for manipulating other applications' windows.
unsafe impl Send for SourceWindow {}

impl SourceWindow {
    /// Look the window up in its process's accessibility tree. `None` when
    /// the tree has no element matching the window's title and frame, which
    /// happens while the tree lags window creation.
    #[tracing::instrument(skip_all, fields(pid = target.pid, window = target.id))]
    pub(super) fn lookup(target: &WindowInfo) -> Option<Self> {
        let app = unsafe { AXUIElement::new_application(target.pid) };
        let windows =
            get_attribute::<CFArray<AXUIElement>>(&app, &kAXWindowsAttribute()).ok()?;

        let mut elements = Vec::new();
        let mut candidates = Vec::new();
        for element in windows.into_iter() {
            let Some(frame) = element_frame(&element) else {
                continue;
            };
            let title = get_attribute::<CFString>(&element, &kAXTitleAttribute())
                .map(|t| t.to_string())
                .ok();
            candidates.push(ManipulationCandidate { title, frame });
            elements.push(element);
        }

        let index = resolve(target, &candidates)?;
        Some(Self {
            element: elements.swap_remove(index),
            app,
        })
    }

    /// Bring the real window to the front: make its app frontmost, then make
    /// the window its main window.
    #[tracing::instrument(skip_all)]
    pub(super) fn activate(&self) -> Result<()> {
        set_attribute_value(&self.app, &kAXFrontmostAttribute(), unsafe {
            kCFBooleanTrue.unwrap()
        })
        .context("make app frontmost")?;
        set_attribute_value(&self.element, &kAXMainAttribute(), unsafe {
            kCFBooleanTrue.unwrap()
        })
        .context("make window main")?;
        Ok(())
    }
}

fn element_frame(element: &AXUIElement) -> Option<Rect> {
    let pos = get_attribute::<AXValue>(element, &kAXPositionAttribute()).ok()?;
    let mut cg_pos = CGPoint::new(0.0, 0.0);
    let ptr = NonNull::new((&mut cg_pos as *mut CGPoint).cast()).unwrap();
    unsafe { pos.value(AXValueType::CGPoint, ptr) };

    let size = get_attribute::<AXValue>(element, &kAXSizeAttribute()).ok()?;
    let mut cg_size = CGSize::new(0.0, 0.0);
    let ptr = NonNull::new((&mut cg_size as *mut CGSize).cast()).unwrap();
    unsafe { size.value(AXValueType::CGSize, ptr) };

    Some(Rect::new(
        cg_pos.x,
        cg_pos.y,
        cg_size.width,
        cg_size.height,
    ))
}
