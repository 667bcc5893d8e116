use bytes::Bytes;

use crate::decode::DecodedImage;

/// Opaque reference to an uploaded texture.
///
/// Carries the pixel dimensions so consumers can size draws without going
/// back to the store. Generation-checked: once freed, stale handles stop
/// resolving even if the slot is reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    index: u32,
    generation: u32,
    width: u32,
    height: u32,
}

impl TextureHandle {
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Uploaded pixel data. This core has no GPU; a texture is the retained
/// RGBA8 buffer a real backend would have transferred to device memory.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

/// Slot table of uploaded textures with free-list reuse.
#[derive(Debug, Default)]
pub struct TextureStore {
    slots: Vec<Option<Texture>>,
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl TextureStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&mut self, image: DecodedImage) -> TextureHandle {
        self.upload_raw(image.width, image.height, image.pixels)
    }

    pub fn upload_raw(&mut self, width: u32, height: u32, pixels: Bytes) -> TextureHandle {
        let texture = Texture {
            width,
            height,
            pixels,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(texture);
                index
            }
            None => {
                self.slots.push(Some(texture));
                self.generations.push(0);
                (self.slots.len() - 1) as u32
            }
        };
        TextureHandle {
            index,
            generation: self.generations[index as usize],
            width,
            height,
        }
    }

    /// Drop the texture behind `handle`. Returns `false` for stale handles.
    pub fn free(&mut self, handle: TextureHandle) -> bool {
        let index = handle.index as usize;
        if !self.is_live(handle) {
            return false;
        }
        self.slots[index] = None;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    #[must_use]
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        if !self.is_live(handle) {
            return None;
        }
        self.slots[handle.index as usize].as_ref()
    }

    /// Count of live textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, handle: TextureHandle) -> bool {
        let index = handle.index as usize;
        index < self.slots.len()
            && self.generations[index] == handle.generation
            && self.slots[index].is_some()
    }
}
