use std::ffi::c_void;
use std::io::{BufRead, BufReader, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;

use objc2::DefinedClass;
use objc2_core_foundation::{CFFileDescriptor, CFFileDescriptorNativeDescriptor, CFOptionFlags};

use crate::action::Action;

use super::app::{AppDelegate, AppEvent};
use super::fd_source;

pub(super) fn socket_path() -> PathBuf {
    std::env::temp_dir().join("pintop.sock")
}

unsafe extern "C-unwind" fn socket_callback(
    fd_ref: *mut CFFileDescriptor,
    _callback_types: CFOptionFlags,
    info: *mut c_void,
) {
    unsafe {
        // Safety: AppDelegate lives until the end of the app
        let delegate: &'static AppDelegate = &*(info as *const AppDelegate);
        if let Some(listener) = delegate.ivars().listener.get()
            && let Ok((stream, _)) = listener.accept()
        {
            serve(stream, delegate);
        }
        if let Some(fd_ref) = fd_ref.as_ref() {
            fd_ref.enable_call_backs(fd_source::READ_CALL_BACK);
        }
    }
}

/// One request per connection: a JSON action on a single line. The action is
/// queued and runs on the next run loop pass, after the reply is written, so
/// "ok" means accepted, not executed.
fn serve(mut stream: UnixStream, delegate: &'static AppDelegate) {
    let mut line = String::new();
    if BufReader::new(&stream).read_line(&mut line).is_err() {
        return;
    }
    let request = line.trim();
    if request.is_empty() {
        return;
    }

    let reply = match serde_json::from_str::<Action>(request) {
        Ok(action) => {
            tracing::debug!(?action, "IPC action");
            delegate.send_event(AppEvent::Action(action));
            "ok\n".to_string()
        }
        Err(e) => {
            tracing::warn!(message = request, "Invalid IPC message: {e}");
            format!("error:invalid action: {e}\n")
        }
    };
    let _ = stream.write_all(reply.as_bytes());
}

pub(super) fn register_with_runloop(delegate: &'static AppDelegate) -> anyhow::Result<()> {
    let listener = delegate.ivars().listener.get().unwrap();
    // The listener ivar owns the socket; the CF wrapper must not close it.
    let fd_ref = fd_source::attach_to_runloop(
        listener.as_raw_fd() as CFFileDescriptorNativeDescriptor,
        false,
        socket_callback,
        delegate,
    )?;
    // The wrapper has no owner; it lives as long as the process.
    std::mem::forget(fd_ref);

    tracing::info!(path = %socket_path().display(), "IPC server listening");
    Ok(())
}

/// Bind the control socket, recovering from a stale file left behind by a
/// crashed instance. A live instance answers the connect attempt and wins.
pub(super) fn try_bind() -> anyhow::Result<UnixListener> {
    let path = socket_path();
    match UnixListener::bind(&path) {
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::ensure!(
                UnixStream::connect(&path).is_err(),
                "pintop is already running"
            );
            std::fs::remove_file(&path)?;
            Ok(UnixListener::bind(&path)?)
        }
        other => Ok(other?),
    }
}

pub(super) fn remove_socket() {
    let _ = std::fs::remove_file(socket_path());
}

pub fn send_action(action: &Action) -> std::io::Result<String> {
    let mut stream = UnixStream::connect(socket_path())?;
    let json = serde_json::to_string(action).map_err(std::io::Error::other)?;
    writeln!(stream, "{json}")?;

    let mut response = String::new();
    BufReader::new(&stream).read_line(&mut response)?;
    Ok(response.trim().to_string())
}
