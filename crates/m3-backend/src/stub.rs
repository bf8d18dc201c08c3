#![forbid(unsafe_code)]

//! Capabilities a backend exposes without a platform implementation.
//!
//! [`StubCapabilities`] answers every [`Io`], [`Sensors`], [`Camera`] and
//! [`Tasks`] call: queries report "nothing there", everything else logs at
//! DEBUG and fails with [`Error::Unsupported`]. Posted tasks run on the
//! calling thread when inline tasks are enabled.
//!
//! [`Footprint`] charges a backend object's size to the configured allocator
//! so allocation limits and leak checks see every live window, texture and
//! font.

use m3_core::log::{self, LogLevel};
use m3_core::{Allocator, Block, Error, Handle, Result, SharedAllocator};

use crate::{
    Camera, CameraConfig, CameraFrame, FileInfo, Io, SensorReading, SensorType, Sensors, Task,
    Tasks, ThreadEntry,
};

/// Shared implementation of the capabilities no backend reaches the OS for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubCapabilities {
    tag: &'static str,
    log_enabled: bool,
    inline_tasks: bool,
}

impl StubCapabilities {
    /// Stubs logging under `tag` when `log_enabled` is set.
    #[must_use]
    pub const fn new(tag: &'static str, log_enabled: bool, inline_tasks: bool) -> Self {
        Self {
            tag,
            log_enabled,
            inline_tasks,
        }
    }

    #[must_use]
    pub const fn inline_tasks(&self) -> bool {
        self.inline_tasks
    }

    fn log(&self, message: &str) -> Result<()> {
        if !self.log_enabled {
            return Ok(());
        }
        log::write(LogLevel::Debug, self.tag, message)
    }

    /// Log `operation` and fail with [`Error::Unsupported`].
    pub fn unsupported<T>(&self, operation: &str) -> Result<T> {
        self.log(operation)?;
        Err(Error::Unsupported)
    }

    fn run_inline(&self, operation: &str, task: Task) -> Result<()> {
        self.log(operation)?;
        if !self.inline_tasks {
            return Err(Error::Unsupported);
        }
        task()
    }
}

impl Io for StubCapabilities {
    fn read_file(&mut self, _path: &str, _buffer: &mut [u8]) -> Result<usize> {
        self.unsupported("io.read_file")
    }

    fn read_file_alloc(&mut self, _path: &str, _allocator: &dyn Allocator) -> Result<Block> {
        self.unsupported("io.read_file_alloc")
    }

    fn write_file(&mut self, _path: &str, _data: &[u8], _overwrite: bool) -> Result<()> {
        self.unsupported("io.write_file")
    }

    fn file_exists(&mut self, _path: &str) -> Result<bool> {
        self.unsupported("io.file_exists")
    }

    fn delete_file(&mut self, _path: &str) -> Result<()> {
        self.unsupported("io.delete_file")
    }

    fn stat_file(&mut self, _path: &str) -> Result<FileInfo> {
        self.unsupported("io.stat_file")
    }
}

impl Sensors for StubCapabilities {
    fn is_available(&mut self, _sensor: SensorType) -> Result<bool> {
        self.log("sensors.is_available")?;
        Ok(false)
    }

    fn start(&mut self, _sensor: SensorType) -> Result<()> {
        self.unsupported("sensors.start")
    }

    fn stop(&mut self, _sensor: SensorType) -> Result<()> {
        self.unsupported("sensors.stop")
    }

    fn read(&mut self, _sensor: SensorType) -> Result<Option<SensorReading>> {
        self.log("sensors.read")?;
        Ok(None)
    }
}

impl Camera for StubCapabilities {
    fn open(&mut self, _camera_id: u32) -> Result<()> {
        self.unsupported("camera.open")
    }

    fn open_with_config(&mut self, config: &CameraConfig) -> Result<()> {
        Camera::open(self, config.camera_id)
    }

    fn close(&mut self) -> Result<()> {
        self.unsupported("camera.close")
    }

    fn start(&mut self) -> Result<()> {
        self.unsupported("camera.start")
    }

    fn stop(&mut self) -> Result<()> {
        self.unsupported("camera.stop")
    }

    fn read_frame(&mut self) -> Result<Option<CameraFrame<'_>>> {
        self.log("camera.read_frame")?;
        Ok(None)
    }
}

impl Tasks for StubCapabilities {
    fn thread_create(&mut self, _entry: ThreadEntry) -> Result<Handle> {
        self.unsupported("tasks.thread_create")
    }

    fn thread_join(&mut self, _thread: Handle) -> Result<()> {
        self.unsupported("tasks.thread_join")
    }

    fn mutex_create(&mut self) -> Result<Handle> {
        self.unsupported("tasks.mutex_create")
    }

    fn mutex_destroy(&mut self, _mutex: Handle) -> Result<()> {
        self.unsupported("tasks.mutex_destroy")
    }

    fn mutex_lock(&mut self, _mutex: Handle) -> Result<()> {
        self.unsupported("tasks.mutex_lock")
    }

    fn mutex_unlock(&mut self, _mutex: Handle) -> Result<()> {
        self.unsupported("tasks.mutex_unlock")
    }

    fn sleep_ms(&mut self, _ms: u32) -> Result<()> {
        self.log("tasks.sleep_ms")?;
        if !self.inline_tasks {
            return Err(Error::Unsupported);
        }
        Ok(())
    }

    fn post(&mut self, task: Task) -> Result<()> {
        self.run_inline("tasks.post", task)
    }

    fn post_delayed(&mut self, task: Task, _delay_ms: u32) -> Result<()> {
        self.run_inline("tasks.post_delayed", task)
    }
}

/// Backing storage charged to the backend allocator for each object.
#[derive(Debug)]
pub struct Footprint {
    allocator: SharedAllocator,
    block: Block,
}

impl Footprint {
    pub fn alloc(allocator: &SharedAllocator, size: usize) -> Result<Self> {
        let block = allocator.alloc(size)?;
        Ok(Self {
            allocator: allocator.clone(),
            block,
        })
    }

    pub fn free(self) -> Result<()> {
        self.allocator.free(self.block)
    }
}
