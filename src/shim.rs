//! Process-wide image decoder slot.
//!
//! The engine's image path looks the decoder up here instead of receiving it
//! as a parameter. Services install their provider's decoder for their own
//! lifetime through [`install`], and the returned [`ShimGuard`] puts the
//! previous value back when it is restored or dropped.
//!
//! Installs form a stack. Restoring the topmost guard writes back the value it
//! captured; restoring a guard lower in the stack splices it out, handing its
//! captured value to the install above it. Once every guard is gone the slot
//! holds exactly what it held before the first install, whatever order the
//! guards were released in. Writes made through [`replace_decoder`] while
//! guards are live are overwritten when the topmost guard restores.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ChartError, ChartResult};

/// Decoded RGBA8 pixels, row-major, straight alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> ChartResult<Self> {
        let image = Self {
            width,
            height,
            rgba,
        };
        image.validate()?;
        Ok(image)
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChartError::InvalidData(
                "decoded image must have non-zero dimensions".to_owned(),
            ));
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.rgba.len() != expected {
            return Err(ChartError::InvalidData(format!(
                "decoded image buffer has {} bytes, expected {expected}",
                self.rgba.len()
            )));
        }
        Ok(())
    }

    /// RGBA value at `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

pub type DecodeFn = dyn Fn(&[u8]) -> ChartResult<DecodedImage> + Send + Sync;

/// Shareable image-decoding capability.
///
/// Equality is identity: two decoders are equal only when they share the same
/// underlying function allocation.
#[derive(Clone)]
pub struct ImageDecoder {
    name: Arc<str>,
    decode: Arc<DecodeFn>,
}

impl ImageDecoder {
    pub fn new<F>(name: impl Into<Arc<str>>, decode: F) -> Self
    where
        F: Fn(&[u8]) -> ChartResult<DecodedImage> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(decode),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decode(&self, bytes: &[u8]) -> ChartResult<DecodedImage> {
        let image = (self.decode)(bytes)?;
        image.validate()?;
        Ok(image)
    }

    #[must_use]
    pub fn same_as(&self, other: &ImageDecoder) -> bool {
        Arc::ptr_eq(&self.decode, &other.decode)
    }
}

impl PartialEq for ImageDecoder {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for ImageDecoder {}

impl fmt::Debug for ImageDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDecoder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

struct Install {
    id: u64,
    previous: Option<ImageDecoder>,
}

struct SlotState {
    current: Option<ImageDecoder>,
    installs: Vec<Install>,
    next_id: u64,
}

impl SlotState {
    const fn new() -> Self {
        Self {
            current: None,
            installs: Vec::new(),
            next_id: 1,
        }
    }
}

static SLOT: Mutex<SlotState> = parking_lot::const_mutex(SlotState::new());

/// Current slot value.
#[must_use]
pub fn current_decoder() -> Option<ImageDecoder> {
    SLOT.lock().current.clone()
}

/// Raw write to the slot, bypassing install bookkeeping. Returns the old value.
pub fn replace_decoder(decoder: Option<ImageDecoder>) -> Option<ImageDecoder> {
    let mut slot = SLOT.lock();
    std::mem::replace(&mut slot.current, decoder)
}

/// Number of guards currently holding an install.
#[must_use]
pub fn active_installs() -> usize {
    SLOT.lock().installs.len()
}

/// Decodes `bytes` with whatever decoder the slot currently holds.
pub fn decode_with_installed(bytes: &[u8]) -> ChartResult<DecodedImage> {
    let decoder = current_decoder().ok_or(ChartError::DecoderUnavailable)?;
    decoder.decode(bytes)
}

/// Captures the slot's value, then overwrites it with `decoder`.
pub fn install(decoder: ImageDecoder) -> ShimGuard {
    let mut slot = SLOT.lock();
    let id = slot.next_id;
    slot.next_id += 1;
    let previous = slot.current.replace(decoder.clone());
    slot.installs.push(Install { id, previous });
    debug!(
        install_id = id,
        decoder = decoder.name(),
        depth = slot.installs.len(),
        "installed image decoder shim"
    );
    ShimGuard { id, released: false }
}

/// Scoped ownership of one install. Restores on [`ShimGuard::restore`] or drop.
#[must_use = "dropping the guard restores the previous decoder immediately"]
#[derive(Debug)]
pub struct ShimGuard {
    id: u64,
    released: bool,
}

impl ShimGuard {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn restore(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut slot = SLOT.lock();
        let Some(position) = slot.installs.iter().position(|install| install.id == self.id)
        else {
            warn!(install_id = self.id, "image decoder shim install already gone");
            return;
        };

        let install = slot.installs.remove(position);
        if position == slot.installs.len() {
            slot.current = install.previous;
            debug!(
                install_id = self.id,
                depth = slot.installs.len(),
                "restored image decoder slot"
            );
        } else {
            slot.installs[position].previous = install.previous;
            debug!(
                install_id = self.id,
                depth = slot.installs.len(),
                "spliced out non-topmost image decoder shim"
            );
        }
    }
}

impl Drop for ShimGuard {
    fn drop(&mut self) {
        self.release();
    }
}
