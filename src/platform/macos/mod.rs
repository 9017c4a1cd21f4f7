mod accessibility;
mod app;
mod capture;
mod config_watcher;
mod fd_source;
mod ipc;
mod objc2_wrapper;
mod picker;
mod runtime;
mod screens;
mod surface;
mod window_list;

pub use app::run_app;
pub use ipc::send_action;
