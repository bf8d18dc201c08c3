#![forbid(unsafe_code)]

//! Request plumbing around WinHTTP: argument checks, target assembly,
//! error mapping and the response body buffer.

use m3_backend::{NetworkRequest, NetworkResponse};
use m3_core::{Allocator, Block, Error, Result};

pub const ERROR_WINHTTP_TIMEOUT: u32 = 12002;
pub const ERROR_WINHTTP_INVALID_URL: u32 = 12005;
pub const ERROR_WINHTTP_UNRECOGNIZED_SCHEME: u32 = 12006;
pub const ERROR_WINHTTP_NAME_NOT_RESOLVED: u32 = 12007;
pub const ERROR_WINHTTP_LOGIN_FAILURE: u32 = 12015;
pub const ERROR_WINHTTP_CLIENT_AUTH_CERT_NEEDED: u32 = 12044;
pub const ERROR_WINHTTP_SECURE_FAILURE: u32 = 12175;

pub const INTERNET_DEFAULT_HTTP_PORT: u16 = 80;
pub const INTERNET_DEFAULT_HTTPS_PORT: u16 = 443;

/// Map a WinHTTP `GetLastError` code.
#[must_use]
pub fn error_from_winhttp(code: u32) -> Error {
    match code {
        ERROR_WINHTTP_TIMEOUT => Error::Timeout,
        ERROR_WINHTTP_INVALID_URL => Error::InvalidArgument,
        ERROR_WINHTTP_NAME_NOT_RESOLVED => Error::NotFound,
        ERROR_WINHTTP_SECURE_FAILURE
        | ERROR_WINHTTP_CLIENT_AUTH_CERT_NEEDED
        | ERROR_WINHTTP_LOGIN_FAILURE => Error::Permission,
        ERROR_WINHTTP_UNRECOGNIZED_SCHEME => Error::Unsupported,
        _ => Error::Io,
    }
}

/// Reject requests WinHTTP cannot express.
pub fn validate_request(request: &NetworkRequest<'_>) -> Result<()> {
    if request.method.is_empty() || request.url.is_empty() {
        return Err(Error::InvalidArgument);
    }
    if i32::try_from(request.timeout_ms).is_err() {
        return Err(Error::Range);
    }
    if u32::try_from(request.body.len()).is_err() {
        return Err(Error::Range);
    }
    Ok(())
}

/// URL scheme reported by `WinHttpCrackUrl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Other,
}

impl Scheme {
    /// From an `INTERNET_SCHEME` value.
    #[must_use]
    pub fn from_raw(scheme: i32) -> Self {
        match scheme {
            1 => Scheme::Http,
            2 => Scheme::Https,
            _ => Scheme::Other,
        }
    }
}

/// Connection target split out of a URL, as NUL-terminated wide strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub secure: bool,
    pub host: Vec<u16>,
    pub port: u16,
    /// Path plus query, never empty.
    pub object: Vec<u16>,
}

impl RequestTarget {
    /// Assemble the target from cracked URL components.
    ///
    /// Only `http` and `https` are supported. A zero port selects the
    /// scheme default; an empty path becomes `/`.
    pub fn from_components(
        scheme: Scheme,
        host: &[u16],
        port: u16,
        path: &[u16],
        extra: &[u16],
    ) -> Result<Self> {
        let secure = match scheme {
            Scheme::Http => false,
            Scheme::Https => true,
            Scheme::Other => return Err(Error::Unsupported),
        };
        if host.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let port = match (port, secure) {
            (0, true) => INTERNET_DEFAULT_HTTPS_PORT,
            (0, false) => INTERNET_DEFAULT_HTTP_PORT,
            (port, _) => port,
        };

        let mut object = Vec::new();
        let object_len = path
            .len()
            .max(1)
            .checked_add(extra.len())
            .and_then(|n| n.checked_add(1))
            .ok_or(Error::Overflow)?;
        object
            .try_reserve_exact(object_len)
            .map_err(|_| Error::OutOfMemory)?;
        if path.is_empty() {
            object.push(u16::from(b'/'));
        } else {
            object.extend_from_slice(path);
        }
        object.extend_from_slice(extra);
        object.push(0);

        let mut host_z = Vec::new();
        host_z
            .try_reserve_exact(host.len() + 1)
            .map_err(|_| Error::OutOfMemory)?;
        host_z.extend_from_slice(host);
        host_z.push(0);

        Ok(Self {
            secure,
            host: host_z,
            port,
            object,
        })
    }
}

/// Response body accumulated with the caller's allocator.
///
/// Storage is allocated on the first chunk and reallocated only when a chunk
/// does not fit. Dropping an unfinished buffer returns its storage.
#[derive(Debug)]
pub struct BodyBuffer<'a> {
    allocator: &'a dyn Allocator,
    block: Option<Block>,
    len: usize,
}

impl<'a> BodyBuffer<'a> {
    #[must_use]
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            allocator,
            block: None,
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Make room for `additional` bytes and return that spare region.
    pub fn reserve(&mut self, additional: usize) -> Result<&mut [u8]> {
        let needed = self.len.checked_add(additional).ok_or(Error::Overflow)?;
        match &mut self.block {
            Some(block) if block.len() >= needed => {}
            Some(block) => self.allocator.realloc(block, needed)?,
            None => self.block = Some(self.allocator.alloc(needed)?),
        }
        let block = self.block.as_mut().ok_or(Error::State)?;
        Ok(&mut block[self.len..needed])
    }

    /// Mark `read` bytes of a `reserved`-byte region as filled.
    ///
    /// A read of nothing, or of more than was offered, is [`Error::Io`].
    pub fn commit(&mut self, read: usize, reserved: usize) -> Result<()> {
        if read == 0 || read > reserved {
            return Err(Error::Io);
        }
        self.len += read;
        Ok(())
    }

    /// Hand the body over, trimmed to the bytes received.
    pub fn finish(mut self) -> Result<Option<Block>> {
        let Some(mut block) = self.block.take() else {
            return Ok(None);
        };
        if self.len == 0 {
            self.allocator.free(block)?;
            return Ok(None);
        }
        if block.len() != self.len {
            if let Err(err) = self.allocator.realloc(&mut block, self.len) {
                let _ = self.allocator.free(block);
                return Err(err);
            }
        }
        Ok(Some(block))
    }
}

impl Drop for BodyBuffer<'_> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            let _ = self.allocator.free(block);
        }
    }
}

/// Return a response body to `allocator` and reset the response.
pub fn release_response(allocator: &dyn Allocator, response: &mut NetworkResponse) -> Result<()> {
    if let Some(body) = response.body.take() {
        allocator.free(body)?;
    }
    response.status_code = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3_core::alloc::FaultyAllocator;
    use pretty_assertions::assert_eq;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn wide_z(s: &str) -> Vec<u16> {
        let mut w = wide(s);
        w.push(0);
        w
    }

    #[test]
    fn winhttp_error_map() {
        assert_eq!(error_from_winhttp(ERROR_WINHTTP_TIMEOUT), Error::Timeout);
        assert_eq!(error_from_winhttp(ERROR_WINHTTP_INVALID_URL), Error::InvalidArgument);
        assert_eq!(error_from_winhttp(ERROR_WINHTTP_NAME_NOT_RESOLVED), Error::NotFound);
        assert_eq!(error_from_winhttp(ERROR_WINHTTP_SECURE_FAILURE), Error::Permission);
        assert_eq!(
            error_from_winhttp(ERROR_WINHTTP_CLIENT_AUTH_CERT_NEEDED),
            Error::Permission
        );
        assert_eq!(error_from_winhttp(ERROR_WINHTTP_LOGIN_FAILURE), Error::Permission);
        assert_eq!(
            error_from_winhttp(ERROR_WINHTTP_UNRECOGNIZED_SCHEME),
            Error::Unsupported
        );
        assert_eq!(error_from_winhttp(12030), Error::Io);
        assert_eq!(error_from_winhttp(0), Error::Io);
    }

    #[test]
    fn request_validation() {
        assert_eq!(validate_request(&NetworkRequest::get("http://a/")), Ok(()));
        assert_eq!(validate_request(&NetworkRequest::get("")), Err(Error::InvalidArgument));
        let mut request = NetworkRequest::get("http://a/");
        request.method = "";
        assert_eq!(validate_request(&request), Err(Error::InvalidArgument));
        request.method = "GET";
        request.timeout_ms = u32::MAX;
        assert_eq!(validate_request(&request), Err(Error::Range));
    }

    #[test]
    fn target_defaults() {
        let target =
            RequestTarget::from_components(Scheme::Https, &wide("example.com"), 0, &[], &[])
                .unwrap();
        assert!(target.secure);
        assert_eq!(target.port, 443);
        assert_eq!(target.host, wide_z("example.com"));
        assert_eq!(target.object, wide_z("/"));

        let plain = RequestTarget::from_components(Scheme::Http, &wide("h"), 0, &[], &[]).unwrap();
        assert_eq!(plain.port, 80);
    }

    #[test]
    fn target_joins_path_and_query() {
        let target = RequestTarget::from_components(
            Scheme::Http,
            &wide("h"),
            8080,
            &wide("/a/b"),
            &wide("?q=1"),
        )
        .unwrap();
        assert_eq!(target.port, 8080);
        assert_eq!(target.object, wide_z("/a/b?q=1"));

        let query_only =
            RequestTarget::from_components(Scheme::Http, &wide("h"), 0, &[], &wide("?x")).unwrap();
        assert_eq!(query_only.object, wide_z("/?x"));
    }

    #[test]
    fn target_rejects_other_schemes_and_empty_host() {
        assert_eq!(
            RequestTarget::from_components(Scheme::Other, &wide("h"), 0, &[], &[]),
            Err(Error::Unsupported)
        );
        assert_eq!(
            RequestTarget::from_components(Scheme::Http, &[], 0, &[], &[]),
            Err(Error::InvalidArgument)
        );
        assert_eq!(Scheme::from_raw(1), Scheme::Http);
        assert_eq!(Scheme::from_raw(2), Scheme::Https);
        assert_eq!(Scheme::from_raw(4), Scheme::Other);
    }

    #[test]
    fn body_grows_with_allocator() {
        let faulty = FaultyAllocator::new();
        let mut body = BodyBuffer::new(&faulty);
        body.reserve(3).unwrap().copy_from_slice(b"abc");
        body.commit(3, 3).unwrap();
        let spare = body.reserve(4).unwrap();
        spare[..2].copy_from_slice(b"de");
        body.commit(2, 4).unwrap();
        assert_eq!(body.len(), 5);
        assert_eq!(faulty.alloc_calls(), 1);
        assert_eq!(faulty.realloc_calls(), 1);

        let block = body.finish().unwrap().unwrap();
        assert_eq!(block.as_slice(), b"abcde");
        assert_eq!(faulty.realloc_calls(), 2);

        let mut response = NetworkResponse {
            status_code: 200,
            body: Some(block),
        };
        release_response(&faulty, &mut response).unwrap();
        assert_eq!(response, NetworkResponse::default());
        assert_eq!(faulty.live_blocks(), 0);
    }

    #[test]
    fn empty_body_is_none() {
        let faulty = FaultyAllocator::new();
        assert_eq!(BodyBuffer::new(&faulty).finish(), Ok(None));
        assert_eq!(faulty.alloc_calls(), 0);
    }

    #[test]
    fn bad_reads_and_abandoned_bodies() {
        let faulty = FaultyAllocator::new();
        let mut body = BodyBuffer::new(&faulty);
        body.reserve(4).unwrap();
        assert_eq!(body.commit(0, 4), Err(Error::Io));
        assert_eq!(body.commit(5, 4), Err(Error::Io));
        drop(body);
        assert_eq!(faulty.live_blocks(), 0);
    }

    #[test]
    fn allocation_failure_surfaces() {
        let faulty = FaultyAllocator::new();
        faulty.fail_alloc_on_call(1);
        let mut body = BodyBuffer::new(&faulty);
        assert_eq!(body.reserve(8).map(|s| s.len()), Err(Error::OutOfMemory));
        assert!(body.is_empty());
    }
}
