//! Host-managed plugins for a media-automation platform.
//!
//! Each plugin wraps one remote service and runs on a schedule owned by the
//! host (or by the bundled [`runner::PluginRunner`]):
//!
//! - [`docker_copilot`] — watches DockerCopilot-managed containers, notifies
//!   about available image updates, applies them, and tracks update tasks.
//! - [`media_fresh`] — triggers ZSpace media-library rescans for libraries
//!   that received new media, and tracks the rescan tasks.
//! - [`sys_msg`] — forwards ZSpace system messages into the host's
//!   notification channel.
//!
//! Plugins hold no ambient state: configuration, clients, the notification
//! channel, and cancellation are all injected at construction.

pub mod docker_copilot;
pub mod error;
pub mod media_fresh;
pub mod notify;
pub mod runner;
pub mod sys_msg;
pub mod testing;

pub use docker_copilot::{DockerCopilotConfig, DockerCopilotPlugin};
pub use error::PluginError;
pub use media_fresh::{MediaFreshConfig, MediaFreshPlugin, MediaKind, TransferHistory, TransferRecord};
pub use notify::{LogNotifier, Notification, Notifier, NotifierProgress};
pub use runner::PluginRunner;
pub use sys_msg::{SysMsgConfig, SysMsgPlugin};
