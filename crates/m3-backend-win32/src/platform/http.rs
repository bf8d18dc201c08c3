//! Synchronous WinHTTP requests.

use std::mem::size_of;
use std::ptr;

use m3_backend::{Network, NetworkRequest, NetworkResponse};
use m3_core::log::LogLevel;
use m3_core::{Allocator, Error, Result};
use winapi::ctypes::c_void;
use winapi::shared::minwindef::FALSE;
use winapi::um::winhttp::{
    HINTERNET, URL_COMPONENTS, WINHTTP_ACCESS_TYPE_DEFAULT_PROXY, WINHTTP_FLAG_SECURE,
    WINHTTP_QUERY_FLAG_NUMBER, WINHTTP_QUERY_STATUS_CODE, WinHttpCloseHandle, WinHttpConnect,
    WinHttpCrackUrl, WinHttpOpen, WinHttpOpenRequest, WinHttpQueryDataAvailable,
    WinHttpQueryHeaders, WinHttpReadData, WinHttpReceiveResponse, WinHttpSendRequest,
    WinHttpSetTimeouts,
};

use super::Win32Device;
use crate::net::{self, BodyBuffer, RequestTarget, Scheme};
use crate::session::Session;
use crate::wide::to_wide;

const USER_AGENT: &str = "LibM3C/1.0";

/// Session, connection or request handle closed on drop.
struct Internet(HINTERNET);

impl Internet {
    fn new(handle: HINTERNET, session: &Session, operation: &str) -> Result<Self> {
        if handle.is_null() {
            return Err(failure(session, operation));
        }
        Ok(Self(handle))
    }
}

impl Drop for Internet {
    fn drop(&mut self) {
        // SAFETY: the handle is owned and closed once.
        unsafe { WinHttpCloseHandle(self.0) };
    }
}

/// Log the thread's last error under `operation` and map it.
fn failure(session: &Session, operation: &str) -> Error {
    net::error_from_winhttp(session.log_last_error(operation))
}

/// Borrow a cracked URL component out of the URL buffer it points into.
///
/// # Safety
///
/// A non-null `start` must point at `len` units that outlive `'a`.
unsafe fn component<'a>(start: *const u16, len: u32) -> Result<&'a [u16]> {
    if len == 0 {
        return Ok(&[]);
    }
    if start.is_null() {
        return Err(Error::InvalidArgument);
    }
    // SAFETY: guaranteed by the caller.
    Ok(unsafe { std::slice::from_raw_parts(start, len as usize) })
}

/// Split `url` into the connection target WinHTTP needs.
fn crack_url(session: &Session, url: &[u16]) -> Result<RequestTarget> {
    // SAFETY: URL_COMPONENTS is plain data; zero requests nothing.
    let mut parts: URL_COMPONENTS = unsafe { std::mem::zeroed() };
    parts.dwStructSize = size_of::<URL_COMPONENTS>() as u32;
    parts.dwSchemeLength = u32::MAX;
    parts.dwHostNameLength = u32::MAX;
    parts.dwUrlPathLength = u32::MAX;
    parts.dwExtraInfoLength = u32::MAX;

    // SAFETY: `url` is NUL-terminated and the component pointers written
    // into `parts` point into it.
    unsafe {
        if WinHttpCrackUrl(url.as_ptr(), 0, 0, &mut parts) == FALSE {
            return Err(failure(session, "network.crack_url"));
        }
        let scheme = Scheme::from_raw(parts.nScheme as i32);
        if scheme == Scheme::Other {
            return Err(Error::Unsupported);
        }
        let host = component(parts.lpszHostName, parts.dwHostNameLength)?;
        let path = component(parts.lpszUrlPath, parts.dwUrlPathLength)?;
        let extra = component(parts.lpszExtraInfo, parts.dwExtraInfoLength)?;
        RequestTarget::from_components(scheme, host, parts.nPort, path, extra)
    }
}

impl Network for Win32Device {
    fn request(
        &mut self,
        request: &NetworkRequest<'_>,
        allocator: &dyn Allocator,
    ) -> Result<NetworkResponse> {
        net::validate_request(request)?;
        self.session.log(LogLevel::Debug, "network.request")?;
        let session = &self.session;

        let url = to_wide(request.url)?;
        let target = crack_url(session, &url)?;
        let method = to_wide(request.method)?;
        let headers = match request.headers {
            Some(headers) if !headers.is_empty() => Some(to_wide(headers)?),
            _ => None,
        };
        let agent = to_wide(USER_AGENT)?;

        // SAFETY: every string is NUL-terminated and outlives the handles
        // that use it; handles close in reverse order of opening.
        unsafe {
            let internet = Internet::new(
                WinHttpOpen(
                    agent.as_ptr(),
                    WINHTTP_ACCESS_TYPE_DEFAULT_PROXY,
                    ptr::null(),
                    ptr::null(),
                    0,
                ),
                session,
                "network.open_session",
            )?;

            if request.timeout_ms > 0 {
                let timeout = request.timeout_ms as i32;
                if WinHttpSetTimeouts(internet.0, timeout, timeout, timeout, timeout) == FALSE {
                    return Err(failure(session, "network.set_timeouts"));
                }
            }

            let connection = Internet::new(
                WinHttpConnect(internet.0, target.host.as_ptr(), target.port, 0),
                session,
                "network.connect",
            )?;

            let flags = if target.secure { WINHTTP_FLAG_SECURE } else { 0 };
            let handle = Internet::new(
                WinHttpOpenRequest(
                    connection.0,
                    method.as_ptr(),
                    target.object.as_ptr(),
                    ptr::null(),
                    ptr::null(),
                    ptr::null_mut(),
                    flags,
                ),
                session,
                "network.open_request",
            )?;

            let (header_ptr, header_len) = match &headers {
                Some(headers) => (headers.as_ptr(), u32::MAX),
                None => (ptr::null(), 0),
            };
            let body_ptr = if request.body.is_empty() {
                ptr::null_mut()
            } else {
                request.body.as_ptr() as *mut c_void
            };
            let body_len = request.body.len() as u32;
            if WinHttpSendRequest(
                handle.0, header_ptr, header_len, body_ptr, body_len, body_len, 0,
            ) == FALSE
            {
                return Err(failure(session, "network.send_request"));
            }

            if WinHttpReceiveResponse(handle.0, ptr::null_mut()) == FALSE {
                return Err(failure(session, "network.receive_response"));
            }

            let mut status_code: u32 = 0;
            let mut status_size = size_of::<u32>() as u32;
            if WinHttpQueryHeaders(
                handle.0,
                WINHTTP_QUERY_STATUS_CODE | WINHTTP_QUERY_FLAG_NUMBER,
                ptr::null(),
                (&mut status_code as *mut u32).cast(),
                &mut status_size,
                ptr::null_mut(),
            ) == FALSE
            {
                return Err(failure(session, "network.query_status"));
            }

            let mut body = BodyBuffer::new(allocator);
            loop {
                let mut available: u32 = 0;
                if WinHttpQueryDataAvailable(handle.0, &mut available) == FALSE {
                    return Err(failure(session, "network.query_data_available"));
                }
                if available == 0 {
                    break;
                }
                let spare = body.reserve(available as usize)?;
                let mut read: u32 = 0;
                if WinHttpReadData(handle.0, spare.as_mut_ptr().cast(), available, &mut read)
                    == FALSE
                {
                    return Err(failure(session, "network.read_data"));
                }
                body.commit(read as usize, available as usize)?;
            }

            Ok(NetworkResponse {
                status_code,
                body: body.finish()?,
            })
        }
    }

    fn free_response(
        &mut self,
        allocator: &dyn Allocator,
        response: &mut NetworkResponse,
    ) -> Result<()> {
        self.session.log(LogLevel::Debug, "network.free_response")?;
        net::release_response(allocator, response)
    }
}
