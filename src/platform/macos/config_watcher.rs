use std::ffi::c_void;
use std::fs::File;
use std::os::unix::io::{AsRawFd, IntoRawFd};

use anyhow::{Context, Result};
use objc2::DefinedClass;
use objc2_core_foundation::{CFFileDescriptor, CFFileDescriptorNativeDescriptor, CFOptionFlags};

use crate::config::Config;

use super::app::{AppDelegate, AppEvent};
use super::fd_source;

/// Watch the config file through a kqueue vnode filter and surface rewrites
/// as `ConfigReloaded` events; the runtime applies them on its own turn of
/// the run loop. The watched fd and the kqueue live for the app's lifetime
/// and are reclaimed by the OS on exit.
pub(super) fn setup(delegate: &'static AppDelegate) -> Result<()> {
    let file =
        File::open(&delegate.ivars().config_path).context("open config file for watching")?;
    let watched_fd = file.into_raw_fd();

    let kq = unsafe { libc::kqueue() };
    anyhow::ensure!(kq >= 0, "Failed to create kqueue");

    let mut change: libc::kevent = unsafe { std::mem::zeroed() };
    change.ident = watched_fd as usize;
    change.filter = libc::EVFILT_VNODE;
    change.flags = libc::EV_ADD | libc::EV_CLEAR;
    change.fflags = libc::NOTE_WRITE | libc::NOTE_ATTRIB;
    let registered =
        unsafe { libc::kevent(kq, &change, 1, std::ptr::null_mut(), 0, std::ptr::null()) };
    anyhow::ensure!(registered >= 0, "Failed to register kevent");

    let fd_ref = fd_source::attach_to_runloop(
        kq as CFFileDescriptorNativeDescriptor,
        true,
        config_callback,
        delegate,
    )?;
    let _ = delegate.ivars().config_fd.set(fd_ref);

    tracing::info!(path = %delegate.ivars().config_path, "Config watcher listening");
    Ok(())
}

unsafe extern "C-unwind" fn config_callback(
    fd_ref: *mut CFFileDescriptor,
    _callback_types: CFOptionFlags,
    info: *mut c_void,
) {
    unsafe {
        let delegate: &'static AppDelegate = &*(info as *const AppDelegate);
        let ivars = delegate.ivars();

        // Consume the pending kqueue event so the descriptor goes quiet.
        if let Some(kq) = ivars.config_fd.get() {
            let mut event: libc::kevent = std::mem::zeroed();
            let immediately = libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            };
            libc::kevent(
                kq.as_raw_fd(),
                std::ptr::null(),
                0,
                &mut event,
                1,
                &immediately,
            );
        }

        match Config::load(&ivars.config_path) {
            Ok(config) => {
                tracing::info!("Config reloaded");
                delegate.send_event(AppEvent::ConfigReloaded(config));
            }
            Err(e) => tracing::warn!("Failed to reload config: {e}, keeping current config"),
        }

        if let Some(fd_ref) = fd_ref.as_ref() {
            fd_ref.enable_call_backs(fd_source::READ_CALL_BACK);
        }
    }
}
