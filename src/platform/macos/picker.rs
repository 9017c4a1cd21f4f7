use block2::RcBlock;
use objc2::MainThreadMarker;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_app_kit::{
    NSBackingStoreType, NSColor, NSEvent, NSEventMask, NSEventType, NSFloatingWindowLevel,
    NSWindow, NSWindowCollectionBehavior, NSWindowStyleMask,
};
use objc2_foundation::NSRect;
use std::ptr::NonNull;

use crate::core::Picker;

use super::app::{AppEvent, EventSender};

const ESC_KEYCODE: u16 = 53;
const HIGHLIGHT_ALPHA: f64 = 0.3;

/// An interactive selection sweep: event monitors feed pointer movement and
/// clicks back to the runtime, and a translucent window marks the current
/// candidate. Dropping the session removes the monitors and the highlight.
pub(super) struct PickerSession {
    pub(super) hit_test: Picker,
    highlight: Retained<NSWindow>,
    monitors: Vec<Retained<AnyObject>>,
}

impl PickerSession {
    pub(super) fn start(mtm: MainThreadMarker, sender: EventSender) -> Self {
        let highlight = create_highlight_window(mtm);
        let mask = NSEventMask::MouseMoved | NSEventMask::LeftMouseDown;
        let mut monitors = Vec::new();

        // Global monitors only see events headed for other applications, so
        // a local monitor covers our own windows, and also the escape key.
        {
            let sender = sender.clone();
            let block = RcBlock::new(move |event: NonNull<NSEvent>| {
                forward_event(&sender, unsafe { event.as_ref() });
            });
            if let Some(monitor) =
                unsafe { NSEvent::addGlobalMonitorForEventsMatchingMask_handler(mask, &block) }
            {
                monitors.push(monitor);
            }
        }
        {
            let sender = sender.clone();
            let block = RcBlock::new(move |event: NonNull<NSEvent>| -> *mut NSEvent {
                let e = unsafe { event.as_ref() };
                if unsafe { e.r#type() } == NSEventType::KeyDown {
                    if unsafe { e.keyCode() } == ESC_KEYCODE {
                        sender.send(AppEvent::PickerCancelled);
                        return std::ptr::null_mut();
                    }
                    return event.as_ptr();
                }
                forward_event(&sender, e);
                event.as_ptr()
            });
            if let Some(monitor) = unsafe {
                NSEvent::addLocalMonitorForEventsMatchingMask_handler(
                    mask | NSEventMask::KeyDown,
                    &block,
                )
            } {
                monitors.push(monitor);
            }
        }

        Self {
            hit_test: Picker::new(),
            highlight,
            monitors,
        }
    }

    pub(super) fn set_highlight(&self, frame: NSRect) {
        self.highlight.setFrame_display(frame, true);
        self.highlight.orderFront(None);
    }

    pub(super) fn clear_highlight(&self) {
        self.highlight.orderOut(None);
    }
}

impl Drop for PickerSession {
    fn drop(&mut self) {
        for monitor in self.monitors.drain(..) {
            unsafe { NSEvent::removeMonitor(&monitor) };
        }
        self.highlight.close();
    }
}

fn forward_event(sender: &EventSender, event: &NSEvent) {
    match unsafe { event.r#type() } {
        NSEventType::MouseMoved => sender.send(AppEvent::PickerMoved),
        NSEventType::LeftMouseDown => sender.send(AppEvent::PickerClicked),
        _ => {}
    }
}

fn create_highlight_window(mtm: MainThreadMarker) -> Retained<NSWindow> {
    let window = unsafe {
        NSWindow::initWithContentRect_styleMask_backing_defer(
            NSWindow::alloc(mtm),
            NSRect::ZERO,
            NSWindowStyleMask::Borderless,
            NSBackingStoreType::Buffered,
            false,
        )
    };
    window.setOpaque(false);
    window.setLevel(NSFloatingWindowLevel);
    window.setIgnoresMouseEvents(true);
    window.setAlphaValue(HIGHLIGHT_ALPHA);
    window.setCollectionBehavior(
        NSWindowCollectionBehavior::CanJoinAllSpaces | NSWindowCollectionBehavior::Stationary,
    );
    unsafe {
        window.setReleasedWhenClosed(false);
        window.setBackgroundColor(Some(&NSColor::systemBlueColor()));
    }
    window
}
