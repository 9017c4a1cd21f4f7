use block2::RcBlock;
use dispatch2::{DispatchQueue, DispatchRetained};
use objc2::runtime::ProtocolObject;
use objc2::{AnyThread, DefinedClass, define_class, msg_send, rc::Retained};
use objc2_core_foundation::CFRetained;
use objc2_core_graphics::kCGColorSpaceSRGB;
use objc2_core_media::{CMSampleBuffer, CMTime, CMTimeFlags};
use objc2_foundation::{NSError, NSObject, NSObjectProtocol};
use objc2_io_surface::IOSurface;
use objc2_screen_capture_kit::{
    SCContentFilter, SCShareableContent, SCStream, SCStreamConfiguration, SCStreamOutput,
    SCStreamOutputType,
};

use crate::core::{MirrorId, StreamConfig, WindowId};

use super::app::{AppEvent, EventSender};

/// BGRA, the layout CALayer composites without conversion.
const PIXEL_FORMAT: u32 = u32::from_be_bytes(*b"BGRA");

/// One ScreenCaptureKit stream bound to a pinned mirror. Stream callbacks
/// run on the shared capture queue and are marshaled back to the main run
/// loop through the event sender.
pub(super) struct WindowCapture {
    stream: Retained<SCStream>,
    handler: Retained<StreamOutputHandler>,
    running: bool,
}

// Safety: SCStream and StreamOutputHandler are thread-safe for the operations we perform
unsafe impl Send for WindowCapture {}

impl WindowCapture {
    /// Apply the stream parameters and begin delivery. Start completion is
    /// asynchronous; the outcome arrives as `CaptureStarted` or
    /// `CaptureFailed`.
    pub(super) fn start(&mut self, config: StreamConfig, mirror: MirrorId, sender: EventSender) {
        let sc_config = stream_configuration(config);
        let block = RcBlock::new(|_: *mut NSError| {});
        unsafe {
            self.stream
                .updateConfiguration_completionHandler(&sc_config, Some(&block))
        };
        if !self.running {
            let block = RcBlock::new(move |error: *mut NSError| {
                if error.is_null() {
                    sender.send(AppEvent::CaptureStarted { mirror });
                } else {
                    sender.send(AppEvent::CaptureFailed { mirror });
                }
            });
            unsafe { self.stream.startCaptureWithCompletionHandler(Some(&block)) };
            self.running = true;
        }
    }

    /// Adjust resolution and frame rate in place, without restarting the
    /// stream.
    pub(super) fn reconfigure(&mut self, config: StreamConfig) {
        let sc_config = stream_configuration(config);
        let block = RcBlock::new(|_: *mut NSError| {});
        unsafe {
            self.stream
                .updateConfiguration_completionHandler(&sc_config, Some(&block))
        };
    }

    pub(super) fn stop(&mut self) {
        if self.running {
            let block = RcBlock::new(|_: *mut NSError| {});
            unsafe { self.stream.stopCaptureWithCompletionHandler(Some(&block)) };
            self.running = false;
        }
    }
}

impl Drop for WindowCapture {
    fn drop(&mut self) {
        self.stop();
        unsafe {
            self.stream
                .removeStreamOutput_type_error(
                    ProtocolObject::from_ref(&*self.handler),
                    SCStreamOutputType::Screen,
                )
                .ok();
        }
    }
}

fn stream_configuration(config: StreamConfig) -> Retained<SCStreamConfiguration> {
    let sc_config = unsafe { SCStreamConfiguration::new() };
    unsafe {
        sc_config.setWidth(config.width as usize);
        sc_config.setHeight(config.height as usize);
        sc_config.setMinimumFrameInterval(CMTime {
            value: 1,
            timescale: config.fps as i32,
            flags: CMTimeFlags::Valid,
            epoch: 0,
        });
        sc_config.setPixelFormat(PIXEL_FORMAT);
        // CALayer expects sRGB
        sc_config.setColorSpaceName(kCGColorSpaceSRGB);
        sc_config.setShowsCursor(false);
        sc_config.setQueueDepth(3);
    }
    sc_config
}

/// Build the stream for a source window. Shareable-content enumeration is
/// asynchronous; the result arrives as `CaptureReady`, or `CaptureFailed`
/// when the window is gone or not capturable.
pub(super) fn create_capture_async(
    mirror: MirrorId,
    source: WindowId,
    sender: EventSender,
    queue: DispatchRetained<DispatchQueue>,
) {
    let block = RcBlock::new(
        move |content: *mut SCShareableContent, error: *mut NSError| {
            if !error.is_null() || content.is_null() {
                tracing::error!(%mirror, "Failed to get shareable content");
                sender.send(AppEvent::CaptureFailed { mirror });
                return;
            }
            let content = unsafe { Retained::retain(content).unwrap() };
            let sc_windows = unsafe { content.windows() };
            let Some(sc_window) = sc_windows.iter().find(|w| unsafe { w.windowID() } == source)
            else {
                tracing::warn!(%mirror, source, "source window is not shareable");
                sender.send(AppEvent::CaptureFailed { mirror });
                return;
            };

            let filter = unsafe {
                SCContentFilter::initWithDesktopIndependentWindow(
                    <SCContentFilter as AnyThread>::alloc(),
                    &sc_window,
                )
            };

            let config = unsafe { SCStreamConfiguration::new() };
            unsafe { config.setQueueDepth(3) };

            let handler = StreamOutputHandler::new(mirror, sender.clone());

            let stream = unsafe {
                SCStream::initWithFilter_configuration_delegate(
                    <SCStream as AnyThread>::alloc(),
                    &filter,
                    &config,
                    None,
                )
            };

            if unsafe {
                stream.addStreamOutput_type_sampleHandlerQueue_error(
                    ProtocolObject::from_ref(&*handler),
                    SCStreamOutputType::Screen,
                    Some(&queue),
                )
            }
            .is_err()
            {
                sender.send(AppEvent::CaptureFailed { mirror });
                return;
            }

            sender.send(AppEvent::CaptureReady {
                mirror,
                capture: WindowCapture {
                    stream,
                    handler,
                    running: false,
                },
            });
        },
    );
    unsafe { SCShareableContent::getShareableContentWithCompletionHandler(&block) };
}

struct StreamOutputHandlerIvars {
    mirror: MirrorId,
    sender: EventSender,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[ivars = StreamOutputHandlerIvars]
    struct StreamOutputHandler;

    unsafe impl NSObjectProtocol for StreamOutputHandler {}

    unsafe impl SCStreamOutput for StreamOutputHandler {
        #[unsafe(method(stream:didOutputSampleBuffer:ofType:))]
        fn did_output_sample_buffer(
            &self,
            _stream: &SCStream,
            buffer: &CMSampleBuffer,
            output_type: SCStreamOutputType,
        ) {
            if output_type == SCStreamOutputType::Screen {
                if let Some(surface) = extract_io_surface(buffer) {
                    self.ivars().sender.send(AppEvent::Frame {
                        mirror: self.ivars().mirror,
                        surface,
                    });
                }
            }
        }
    }
);

impl StreamOutputHandler {
    fn new(mirror: MirrorId, sender: EventSender) -> Retained<Self> {
        let this = Self::alloc().set_ivars(StreamOutputHandlerIvars { mirror, sender });
        unsafe { msg_send![super(this), init] }
    }
}

fn extract_io_surface(buffer: &CMSampleBuffer) -> Option<Retained<IOSurface>> {
    unsafe {
        let image_buffer = buffer.image_buffer()?;
        let surface = objc2_core_video::CVPixelBufferGetIOSurface(Some(&image_buffer))?;
        let ptr = CFRetained::into_raw(surface).as_ptr() as *mut IOSurface;
        Some(Retained::from_raw(ptr).unwrap())
    }
}
