#![forbid(unsafe_code)]

//! Windows, textures and fonts owned by the null backend's handle table.

use std::any::Any;
use std::mem::size_of;

use m3_backend::{Footprint, TextureFormat, WindowFlags, object_type};
use m3_core::{Object, ObjectHeader, Result, SharedAllocator};

macro_rules! null_object {
    ($ty:ident) => {
        impl Object for $ty {
            fn header(&self) -> &ObjectHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut ObjectHeader {
                &mut self.header
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn destroy(self: Box<Self>) -> Result<()> {
                self.footprint.free()
            }
        }
    };
}

#[allow(dead_code)]
#[derive(Debug)]
pub(crate) struct NullWindow {
    header: ObjectHeader,
    footprint: Footprint,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) dpi_scale: f32,
    pub(crate) flags: WindowFlags,
    pub(crate) visible: bool,
}

impl NullWindow {
    pub(crate) fn new(
        allocator: &SharedAllocator,
        width: i32,
        height: i32,
        flags: WindowFlags,
    ) -> Result<Self> {
        Ok(Self {
            header: ObjectHeader::new(object_type::WINDOW, 0),
            footprint: Footprint::alloc(allocator, size_of::<Self>())?,
            width,
            height,
            dpi_scale: 1.0,
            flags,
            visible: false,
        })
    }
}

null_object!(NullWindow);

// Dimensions and format are recorded for inspection only.
#[allow(dead_code)]
#[derive(Debug)]
pub(crate) struct NullTexture {
    header: ObjectHeader,
    footprint: Footprint,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) format: TextureFormat,
}

impl NullTexture {
    pub(crate) fn new(
        allocator: &SharedAllocator,
        width: i32,
        height: i32,
        format: TextureFormat,
    ) -> Result<Self> {
        Ok(Self {
            header: ObjectHeader::new(object_type::TEXTURE, 0),
            footprint: Footprint::alloc(allocator, size_of::<Self>())?,
            width,
            height,
            format,
        })
    }
}

null_object!(NullTexture);

#[allow(dead_code)]
#[derive(Debug)]
pub(crate) struct NullFont {
    header: ObjectHeader,
    footprint: Footprint,
    pub(crate) size_px: i32,
    pub(crate) weight: i32,
    pub(crate) italic: bool,
}

impl NullFont {
    pub(crate) fn new(
        allocator: &SharedAllocator,
        size_px: i32,
        weight: i32,
        italic: bool,
    ) -> Result<Self> {
        Ok(Self {
            header: ObjectHeader::new(object_type::FONT, 0),
            footprint: Footprint::alloc(allocator, size_of::<Self>())?,
            size_px,
            weight,
            italic,
        })
    }
}

null_object!(NullFont);

#[cfg(test)]
mod tests {
    use super::*;
    use m3_core::alloc::FaultyAllocator;
    use std::sync::Arc;

    #[test]
    fn destroy_returns_footprint_to_allocator() {
        let faulty = Arc::new(FaultyAllocator::new());
        let allocator: SharedAllocator = faulty.clone();
        let window = NullWindow::new(&allocator, 10, 20, WindowFlags::RESIZABLE).unwrap();
        assert_eq!(faulty.live_blocks(), 1);
        assert_eq!(window.header().type_id(), object_type::WINDOW);
        assert_eq!(window.dpi_scale, 1.0);
        assert!(!window.visible);
        Box::new(window).destroy().unwrap();
        assert_eq!(faulty.live_blocks(), 0);
    }

    #[test]
    fn allocation_failure_surfaces() {
        let faulty = Arc::new(FaultyAllocator::new());
        faulty.fail_alloc_on_call(1);
        let allocator: SharedAllocator = faulty.clone();
        assert!(NullFont::new(&allocator, 12, 400, false).is_err());
        assert_eq!(faulty.live_blocks(), 0);
    }
}
