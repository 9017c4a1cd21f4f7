use clap::Subcommand;
use serde::{Deserialize, Serialize};

/// Remote commands accepted by a running instance. The CLI parses one of
/// these and ships it over the control socket as a JSON line.
#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
pub enum Action {
    /// Start an interactive sweep: hover highlights a window, click pins it.
    Pick,
    /// Pin the frontmost eligible window with the given title, or unpin it
    /// if it is already mirrored.
    Pin {
        #[arg(long)]
        title: String,
    },
    /// Close the mirror of the window with the given title.
    Unpin {
        #[arg(long)]
        title: String,
    },
    /// Close every mirror.
    UnpinAll,
    /// Freeze the mirror of the window with the given title.
    Pause {
        #[arg(long)]
        title: String,
    },
    /// Resume a paused mirror.
    Resume {
        #[arg(long)]
        title: String,
    },
    /// Shut the running instance down.
    Exit,
}
