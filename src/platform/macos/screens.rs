use objc2::MainThreadMarker;
use objc2_app_kit::NSScreen;
use objc2_core_graphics::{CGDirectDisplayID, CGDisplayBounds, CGMainDisplayID};
use objc2_foundation::{NSNumber, NSString};

use crate::core::{DisplayInfo, Rect};

const FALLBACK_FPS: u32 = 60;

fn get_display_id(screen: &NSScreen) -> CGDirectDisplayID {
    let desc = screen.deviceDescription();
    let key = NSString::from_str("NSScreenNumber");
    desc.objectForKey(&key)
        .and_then(|obj| {
            let num: Option<&NSNumber> = obj.downcast_ref();
            num.map(|n| n.unsignedIntValue())
        })
        .unwrap_or(0)
}

pub(super) fn all_displays(mtm: MainThreadMarker) -> Vec<DisplayInfo> {
    NSScreen::screens(mtm)
        .iter()
        .map(|screen| {
            let display_id = get_display_id(&screen);
            let bounds = CGDisplayBounds(display_id);
            let max_fps = screen.maximumFramesPerSecond() as u32;
            DisplayInfo {
                id: display_id,
                frame: Rect::new(
                    bounds.origin.x,
                    bounds.origin.y,
                    bounds.size.width,
                    bounds.size.height,
                ),
                max_fps: if max_fps == 0 { FALLBACK_FPS } else { max_fps },
                scale: screen.backingScaleFactor(),
            }
        })
        .collect()
}

/// Height of the primary display, used to flip between the window server's
/// top-left space and AppKit's bottom-left space.
pub(super) fn primary_full_height() -> f64 {
    CGDisplayBounds(CGMainDisplayID()).size.height
}
