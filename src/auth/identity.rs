//! Identity Providers
//!
//! An identity is the name of a host network interface. The set of valid
//! identities is queried fresh for every authentication attempt so that
//! interfaces coming up or going down are honored immediately.

use std::collections::HashSet;
use std::io;

/// Source of the identities a client may authenticate as
pub trait IdentityProvider: Send + Sync {
    /// Names that are valid right now
    fn current_identities(&self) -> io::Result<HashSet<String>>;
}

impl<F> IdentityProvider for F
where
    F: Fn() -> io::Result<HashSet<String>> + Send + Sync,
{
    fn current_identities(&self) -> io::Result<HashSet<String>> {
        self()
    }
}

/// Live network interfaces of the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl IdentityProvider for SystemInterfaces {
    fn current_identities(&self) -> io::Result<HashSet<String>> {
        list_interfaces()
    }
}

#[cfg(unix)]
fn list_interfaces() -> io::Result<HashSet<String>> {
    use std::ffi::CStr;

    // SAFETY: if_nameindex returns either null or an array terminated by an
    // entry with index 0 and a null name. The array is released exactly once
    // below, after every name has been copied out.
    unsafe {
        let head = libc::if_nameindex();
        if head.is_null() {
            return Err(io::Error::last_os_error());
        }

        let mut names = HashSet::new();
        let mut cursor = head;
        while (*cursor).if_index != 0 && !(*cursor).if_name.is_null() {
            let name = CStr::from_ptr((*cursor).if_name);
            names.insert(name.to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }

        libc::if_freenameindex(head);
        Ok(names)
    }
}

#[cfg(not(unix))]
fn list_interfaces() -> io::Result<HashSet<String>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interface enumeration is only available on unix",
    ))
}

/// Fixed identity set taken from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticIdentities {
    identities: HashSet<String>,
}

impl StaticIdentities {
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identities: identities.into_iter().map(Into::into).collect(),
        }
    }
}

impl IdentityProvider for StaticIdentities {
    fn current_identities(&self) -> io::Result<HashSet<String>> {
        Ok(self.identities.clone())
    }
}
