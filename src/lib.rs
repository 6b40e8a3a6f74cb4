//! HONGBAO - lucky red envelope gacha.
//!
//! Click the envelope, watch it charge, see what falls out. The draw and the
//! click/charge/reveal cycle live in [`reward`] and [`session`] and know
//! nothing about rendering; [`scene`] is the Bevy front end driving them.

pub mod clipboard;
pub mod config;
pub mod error;
pub mod fx;
pub mod reward;
pub mod scene;
pub mod session;
pub mod share;
pub mod timeline;

pub use config::GachaConfig;
pub use error::{ClipboardError, ConfigError};
pub use reward::{RandomSource, RewardKind, RewardOutcome, RewardTable};
pub use session::{ClickOutcome, Session, SessionEvent, SessionState, Timing};
pub use share::{build_share_url, ShareMessageSet};
