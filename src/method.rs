//! HTTP method as a typed enum.
//!
//! Routes bind to one of the five verbs a JSON API uses. Requests carrying
//! any other method never match a route and get `404` from the [`Mux`](crate::Mux).

use std::fmt;
use std::str::FromStr;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl Method {
    /// The verb as it appears on the wire and in route keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Patch  => "PATCH",
            Self::Post   => "POST",
            Self::Put    => "PUT",
        }
    }
}

/// Case-sensitive: `"get"` is not a method a route can bind.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELETE" => Ok(Self::Delete),
            "GET"    => Ok(Self::Get),
            "PATCH"  => Ok(Self::Patch),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            _        => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
