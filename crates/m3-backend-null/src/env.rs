#![forbid(unsafe_code)]

//! Environment capabilities. None of them reach the operating system: file,
//! hardware, network, thread and mutex calls report
//! [`m3_core::Error::Unsupported`] after logging, and posted tasks run inline
//! when enabled. Everything but the network goes through
//! [`m3_backend::StubCapabilities`].

use m3_backend::{
    Camera, Environment, Io, Network, NetworkRequest, NetworkResponse, Sensors, Tasks,
};
use m3_core::log::LogLevel;
use m3_core::{Allocator, Result};

use crate::device::NullDevice;

impl Environment for NullDevice {
    fn io(&mut self) -> Result<&mut dyn Io> {
        self.log(LogLevel::Info, "env.get_io")?;
        Ok(&mut self.stubs)
    }

    fn sensors(&mut self) -> Result<&mut dyn Sensors> {
        self.log(LogLevel::Info, "env.get_sensors")?;
        Ok(&mut self.stubs)
    }

    fn camera(&mut self) -> Result<&mut dyn Camera> {
        self.log(LogLevel::Info, "env.get_camera")?;
        Ok(&mut self.stubs)
    }

    fn network(&mut self) -> Result<&mut dyn Network> {
        self.log(LogLevel::Info, "env.get_network")?;
        Ok(self)
    }

    fn tasks(&mut self) -> Result<&mut dyn Tasks> {
        self.log(LogLevel::Info, "env.get_tasks")?;
        Ok(&mut self.stubs)
    }

    fn get_time_ms(&mut self) -> Result<u32> {
        self.log(LogLevel::Info, "env.get_time_ms")?;
        Ok(self.tick())
    }
}

impl Network for NullDevice {
    fn request(
        &mut self,
        _request: &NetworkRequest<'_>,
        _allocator: &dyn Allocator,
    ) -> Result<NetworkResponse> {
        self.stubs.unsupported("network.request")
    }

    fn free_response(
        &mut self,
        _allocator: &dyn Allocator,
        _response: &mut NetworkResponse,
    ) -> Result<()> {
        self.stubs.unsupported("network.free_response")
    }
}
