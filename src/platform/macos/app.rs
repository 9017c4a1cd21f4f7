use std::cell::{OnceCell, RefCell};
use std::ffi::c_void;
use std::os::unix::net::UnixListener;
use std::sync::mpsc::{self, Receiver, Sender};

use objc2::runtime::ProtocolObject;
use objc2::{DefinedClass, MainThreadMarker, MainThreadOnly, define_class, msg_send, rc::Retained};
use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy, NSApplicationDelegate};
use objc2_application_services::{AXIsProcessTrustedWithOptions, kAXTrustedCheckOptionPrompt};
use objc2_core_foundation::{
    CFAbsoluteTimeGetCurrent, CFDictionary, CFFileDescriptor, CFRetained, CFRunLoop,
    CFRunLoopSource, CFRunLoopSourceContext, CFRunLoopTimer, CFRunLoopTimerContext, kCFBooleanTrue,
    kCFRunLoopDefaultMode,
};
use objc2_foundation::{NSNotification, NSObject, NSObjectProtocol};
use objc2_io_surface::IOSurface;
use tracing_error::ErrorLayer;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::action::Action;
use crate::config::Config;
use crate::core::MirrorId;

use super::capture::WindowCapture;
use super::runtime::Runtime;
use super::{config_watcher, ipc};

/// Everything the runtime reacts to, delivered one at a time on the main
/// run loop.
pub(super) enum AppEvent {
    /// Periodic window-list poll.
    Poll,
    /// A command from the IPC socket or the CLI.
    Action(Action),
    ConfigReloaded(Config),
    /// Stream construction finished on the capture callback.
    CaptureReady {
        mirror: MirrorId,
        capture: WindowCapture,
    },
    CaptureStarted {
        mirror: MirrorId,
    },
    CaptureFailed {
        mirror: MirrorId,
    },
    /// A captured frame from the capture queue.
    Frame {
        mirror: MirrorId,
        surface: Retained<IOSurface>,
    },
    PointerEntered {
        mirror: MirrorId,
    },
    PointerExited {
        mirror: MirrorId,
    },
    SurfaceClicked {
        mirror: MirrorId,
    },
    PickerMoved,
    PickerClicked,
    PickerCancelled,
    Shutdown,
}

/// Marshals events from any thread to the main run loop: push onto the
/// channel, signal the source, wake the loop.
#[derive(Clone)]
pub(super) struct EventSender {
    tx: Sender<AppEvent>,
    source: CFRetained<CFRunLoopSource>,
    run_loop: CFRetained<CFRunLoop>,
}

// Safety: CFRunLoopSource and CFRunLoop are thread-safe for signal and
// wake_up
unsafe impl Send for EventSender {}

impl EventSender {
    pub(super) fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_ok() {
            self.source.signal();
            self.run_loop.wake_up();
        }
    }
}

pub fn run_app(config_path: Option<String>) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load config from {config_path}: {e}, using defaults");
        Config::default()
    });

    init_tracing(&config);

    tracing::debug!("Accessibility: {}", unsafe {
        AXIsProcessTrustedWithOptions(Some(
            CFDictionary::from_slices(&[kAXTrustedCheckOptionPrompt], &[kCFBooleanTrue.unwrap()])
                .as_opaque(),
        ))
    });

    let mtm = MainThreadMarker::new().unwrap();
    let app = NSApplication::sharedApplication(mtm);
    app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);

    let (tx, rx) = mpsc::channel();

    let delegate = AppDelegate::new(mtm, config_path, config, rx);
    let source = create_event_source(&delegate);

    let main_run_loop = CFRunLoop::main().unwrap();
    main_run_loop.add_source(Some(&source), unsafe { kCFRunLoopDefaultMode });

    let _ = delegate.ivars().sender.set(EventSender {
        tx,
        source,
        run_loop: main_run_loop,
    });

    app.setDelegate(Some(ProtocolObject::from_ref(&*delegate)));
    app.run();
    Ok(())
}

fn create_event_source(delegate: &Retained<AppDelegate>) -> CFRetained<CFRunLoopSource> {
    let mut context = CFRunLoopSourceContext {
        version: 0,
        info: Retained::as_ptr(delegate) as *mut c_void,
        retain: None,
        release: None,
        copyDescription: None,
        equal: None,
        hash: None,
        schedule: None,
        cancel: None,
        perform: Some(event_callback),
    };
    unsafe { CFRunLoopSource::new(None, 0, &mut context).unwrap() }
}

fn init_tracing(config: &Config) {
    let filter = config
        .log_level
        .as_ref()
        .and_then(|l| l.parse().ok())
        .unwrap_or_else(EnvFilter::from_default_env);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .init();
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = backtrace::Backtrace::new();
        tracing::error!("Application panicked: {panic_info}. Backtrace: {backtrace:?}");
    }));
}

pub(super) struct AppDelegateIvars {
    pub(super) config_path: String,
    config: RefCell<Config>,
    rx: Receiver<AppEvent>,
    runtime: RefCell<Option<Runtime>>,
    sender: OnceCell<EventSender>,
    pub(super) listener: OnceCell<UnixListener>,
    pub(super) config_fd: OnceCell<CFRetained<CFFileDescriptor>>,
    poll_timer: OnceCell<CFRetained<CFRunLoopTimer>>,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[ivars = AppDelegateIvars]
    pub(super) struct AppDelegate;

    unsafe impl NSObjectProtocol for AppDelegate {}

    unsafe impl NSApplicationDelegate for AppDelegate {
        #[unsafe(method(applicationDidFinishLaunching:))]
        fn did_finish_launching(&self, _notification: &NSNotification) {
            tracing::info!("Application did finish launching");
            // AppDelegate lives for the entire duration of the app
            let delegate: &'static AppDelegate = unsafe { std::mem::transmute(self) };
            let mtm = self.mtm();

            let config = delegate.ivars().config.borrow().clone();
            let sender = delegate.ivars().sender.get().unwrap().clone();
            *delegate.ivars().runtime.borrow_mut() =
                Some(Runtime::new(mtm, config.clone(), sender));

            match ipc::try_bind() {
                Ok(listener) => {
                    let _ = delegate.ivars().listener.set(listener);
                    if let Err(e) = ipc::register_with_runloop(delegate) {
                        tracing::error!("Failed to register IPC socket: {e:#}");
                        NSApplication::sharedApplication(mtm).terminate(None);
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to bind IPC socket: {e:#}");
                    NSApplication::sharedApplication(mtm).terminate(None);
                }
            }

            if let Err(e) = config_watcher::setup(delegate) {
                tracing::warn!("Failed to setup config watcher: {e:#}");
            }

            schedule_poll_timer(delegate, config.poll_interval_ms);
        }

        #[unsafe(method(applicationWillTerminate:))]
        fn will_terminate(&self, _notification: &NSNotification) {
            if let Some(runtime) = self.ivars().runtime.borrow_mut().as_mut() {
                runtime.shutdown();
            }
            ipc::remove_socket();
        }
    }
);

impl AppDelegate {
    fn new(
        mtm: MainThreadMarker,
        config_path: String,
        config: Config,
        rx: Receiver<AppEvent>,
    ) -> Retained<Self> {
        let ivars = AppDelegateIvars {
            config_path,
            config: RefCell::new(config),
            rx,
            runtime: RefCell::new(None),
            sender: OnceCell::new(),
            listener: OnceCell::new(),
            config_fd: OnceCell::new(),
            poll_timer: OnceCell::new(),
        };
        let this = Self::alloc(mtm).set_ivars(ivars);
        unsafe { msg_send![super(this), init] }
    }

    pub(super) fn send_event(&self, event: AppEvent) {
        if let Some(sender) = self.ivars().sender.get() {
            sender.send(event);
        }
    }
}

unsafe extern "C-unwind" fn event_callback(info: *mut c_void) {
    // Safety: AppDelegate lives until the end of the app
    let delegate: &'static AppDelegate = unsafe { &*(info as *const AppDelegate) };

    while let Ok(event) = delegate.ivars().rx.try_recv() {
        dispatch(delegate, event);
    }
}

fn dispatch(delegate: &'static AppDelegate, event: AppEvent) {
    match event {
        AppEvent::Shutdown => {
            let mtm = MainThreadMarker::new().unwrap();
            NSApplication::sharedApplication(mtm).terminate(None);
        }
        AppEvent::ConfigReloaded(config) => {
            *delegate.ivars().config.borrow_mut() = config.clone();
            if let Some(runtime) = delegate.ivars().runtime.borrow_mut().as_mut() {
                runtime.handle_event(AppEvent::ConfigReloaded(config));
            }
        }
        event => {
            if let Some(runtime) = delegate.ivars().runtime.borrow_mut().as_mut() {
                runtime.handle_event(event);
            }
        }
    }
}

unsafe extern "C-unwind" fn poll_callback(_timer: *mut CFRunLoopTimer, info: *mut c_void) {
    let delegate: &'static AppDelegate = unsafe { &*(info as *const AppDelegate) };
    delegate.send_event(AppEvent::Poll);
}

fn schedule_poll_timer(delegate: &'static AppDelegate, interval_ms: u64) {
    let interval = interval_ms as f64 / 1000.0;
    let mut context = CFRunLoopTimerContext {
        version: 0,
        info: delegate as *const AppDelegate as *mut c_void,
        retain: None,
        release: None,
        copyDescription: None,
    };
    let timer = unsafe {
        CFRunLoopTimer::new(
            None,
            CFAbsoluteTimeGetCurrent() + interval,
            interval,
            0,
            0,
            Some(poll_callback),
            &mut context,
        )
    };
    if let Some(timer) = timer {
        CFRunLoop::current()
            .unwrap()
            .add_timer(Some(&timer), unsafe { kCFRunLoopDefaultMode });
        let _ = delegate.ivars().poll_timer.set(timer);
    } else {
        tracing::error!("Failed to create poll timer");
    }
}
