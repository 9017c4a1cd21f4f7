use objc2::runtime::AnyObject;
use objc2::{DefinedClass, MainThreadMarker, MainThreadOnly, define_class, msg_send, rc::Retained};
use objc2_app_kit::{
    NSBackingStoreType, NSEvent, NSFloatingWindowLevel, NSNormalWindowLevel, NSResponder,
    NSTrackingArea, NSTrackingAreaOptions, NSView, NSWindow, NSWindowCollectionBehavior,
    NSWindowOrderingMode, NSWindowStyleMask,
};
use objc2_foundation::{NSObject, NSObjectProtocol, NSRect};
use objc2_io_surface::IOSurface;
use objc2_quartz_core::CALayer;

use crate::core::{MirrorId, WindowId};

use super::app::{AppEvent, EventSender};

struct MirrorViewIvars {
    mirror: MirrorId,
    sender: EventSender,
}

define_class!(
    #[unsafe(super(NSView, NSResponder, NSObject))]
    #[thread_kind = MainThreadOnly]
    #[ivars = MirrorViewIvars]
    struct MirrorView;

    unsafe impl NSObjectProtocol for MirrorView {}

    impl MirrorView {
        #[unsafe(method(mouseEntered:))]
        fn mouse_entered(&self, _event: &NSEvent) {
            self.ivars().sender.send(AppEvent::PointerEntered {
                mirror: self.ivars().mirror,
            });
        }

        #[unsafe(method(mouseExited:))]
        fn mouse_exited(&self, _event: &NSEvent) {
            self.ivars().sender.send(AppEvent::PointerExited {
                mirror: self.ivars().mirror,
            });
        }

        #[unsafe(method(mouseDown:))]
        fn mouse_down(&self, _event: &NSEvent) {
            self.ivars().sender.send(AppEvent::SurfaceClicked {
                mirror: self.ivars().mirror,
            });
        }

        #[unsafe(method(acceptsFirstMouse:))]
        fn accepts_first_mouse(&self, _event: Option<&NSEvent>) -> bool {
            true
        }
    }
);

impl MirrorView {
    fn new(
        mtm: MainThreadMarker,
        frame: NSRect,
        mirror: MirrorId,
        sender: EventSender,
    ) -> Retained<Self> {
        let this = Self::alloc(mtm).set_ivars(MirrorViewIvars { mirror, sender });
        let view: Retained<Self> = unsafe { msg_send![super(this), initWithFrame: frame] };
        view.setWantsLayer(true);

        // InVisibleRect keeps the tracking rect glued to the view through
        // resizes without reinstalling it.
        let tracking = unsafe {
            NSTrackingArea::initWithRect_options_owner_userInfo(
                NSTrackingArea::alloc(),
                NSRect::ZERO,
                NSTrackingAreaOptions::MouseEnteredAndExited
                    | NSTrackingAreaOptions::ActiveAlways
                    | NSTrackingAreaOptions::InVisibleRect,
                Some(&view),
                None,
            )
        };
        unsafe { view.addTrackingArea(&tracking) };
        view
    }
}

/// The on-screen half of a pinned mirror: a borderless always-on-top window
/// whose layer shows the latest captured frame.
pub(super) struct MirrorSurface {
    window: Retained<NSWindow>,
    layer: Retained<CALayer>,
    source: WindowId,
    visible: bool,
}

impl MirrorSurface {
    pub(super) fn new(
        mtm: MainThreadMarker,
        mirror: MirrorId,
        source: WindowId,
        frame: NSRect,
        scale: f64,
        sender: EventSender,
    ) -> Self {
        let window = unsafe {
            NSWindow::initWithContentRect_styleMask_backing_defer(
                NSWindow::alloc(mtm),
                frame,
                NSWindowStyleMask::Borderless,
                NSBackingStoreType::Buffered,
                false,
            )
        };

        window.setOpaque(true);
        window.setLevel(NSFloatingWindowLevel);
        window.setIgnoresMouseEvents(false);
        window.setCollectionBehavior(
            NSWindowCollectionBehavior::CanJoinAllSpaces | NSWindowCollectionBehavior::Stationary,
        );
        unsafe { window.setReleasedWhenClosed(false) };

        let view = MirrorView::new(mtm, frame, mirror, sender);
        let layer = CALayer::new();
        layer.setContentsScale(scale);
        view.setLayer(Some(&layer));
        window.setContentView(Some(&view));

        Self {
            window,
            layer,
            source,
            visible: false,
        }
    }

    pub(super) fn set_frame(&self, frame: NSRect) {
        self.window.setFrame_display(frame, true);
    }

    pub(super) fn set_scale(&self, scale: f64) {
        self.layer.setContentsScale(scale);
    }

    pub(super) fn set_opacity(&self, opacity: f64) {
        self.window.setAlphaValue(opacity);
    }

    pub(super) fn set_interactive(&self, interactive: bool) {
        self.window.setIgnoresMouseEvents(!interactive);
    }

    pub(super) fn order_above_all(&self) {
        self.window.setLevel(NSFloatingWindowLevel);
        if self.visible {
            self.window.orderFront(None);
        }
    }

    /// Drop to the normal level, stacked directly above the source window so
    /// the pair reads as one unit.
    pub(super) fn order_above_source(&self) {
        self.window.setLevel(NSNormalWindowLevel);
        unsafe {
            self.window
                .orderWindow_relativeTo(NSWindowOrderingMode::Above, self.source as isize)
        };
    }

    /// Show the latest captured frame. The window stays hidden until the
    /// first frame arrives so a blank mirror never flashes.
    pub(super) fn apply_frame(&mut self, surface: &IOSurface) {
        let contents: &AnyObject = surface;
        unsafe { self.layer.setContents(Some(contents)) };
        if !self.visible {
            self.window.orderFront(None);
            self.visible = true;
        }
    }
}

impl Drop for MirrorSurface {
    fn drop(&mut self) {
        self.window.close();
    }
}
