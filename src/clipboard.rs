use std::time::Duration;

use bevy::log::warn;

use crate::error::ClipboardError;

/// How long "Copied!" stays up after a successful copy.
pub const COPIED_NOTICE: Duration = Duration::from_secs(2);

pub trait Clipboard {
    fn copy_text(&mut self, value: &str) -> Result<(), ClipboardError>;
}

/// A live clipboard connection that text can be written through.
pub trait ClipboardHandle {
    fn write_text(&mut self, value: &str) -> Result<(), ClipboardError>;
}

impl ClipboardHandle for arboard::Clipboard {
    fn write_text(&mut self, value: &str) -> Result<(), ClipboardError> {
        arboard::Clipboard::set_text(self, value.to_owned())?;
        Ok(())
    }
}

type Opener<H> = Box<dyn FnMut() -> Result<H, ClipboardError>>;

/// Opens its handle on the first copy and keeps it for later copies.
///
/// On X11 the arboard handle is what serves the selection: dropping it
/// loses the copied text unless a clipboard manager takes it over. The
/// handle is only discarded after a failed write, so the next copy reopens.
pub struct HeldClipboard<H> {
    handle: Option<H>,
    open: Opener<H>,
}

/// The OS clipboard. Not `Send`, so the scene keeps it as a non-send
/// resource on the main thread.
pub type SystemClipboard = HeldClipboard<arboard::Clipboard>;

impl<H> HeldClipboard<H> {
    pub fn new(open: impl FnMut() -> Result<H, ClipboardError> + 'static) -> Self {
        Self {
            handle: None,
            open: Box::new(open),
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new(|| Ok(arboard::Clipboard::new()?))
    }
}

impl<H: ClipboardHandle> Clipboard for HeldClipboard<H> {
    fn copy_text(&mut self, value: &str) -> Result<(), ClipboardError> {
        let mut handle = match self.handle.take() {
            Some(handle) => handle,
            None => (self.open)()?,
        };
        handle.write_text(value)?;
        self.handle = Some(handle);
        Ok(())
    }
}

/// Transient "Copied!" flag.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CopyNotice {
    remaining: Duration,
}

impl CopyNotice {
    pub fn visible(&self) -> bool {
        !self.remaining.is_zero()
    }

    /// Copies `value` and arms the notice on success. Failures are logged
    /// and otherwise dropped.
    pub fn copy(&mut self, clipboard: &mut impl Clipboard, value: &str) -> bool {
        match clipboard.copy_text(value) {
            Ok(()) => {
                self.remaining = COPIED_NOTICE;
                true
            }
            Err(e) => {
                warn!("Failed to copy: {}", e);
                false
            }
        }
    }

    pub fn tick(&mut self, delta: Duration) {
        self.remaining = self.remaining.saturating_sub(delta);
    }
}
