// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// A [`ToSocketAddrs`] that also remembers the name it was resolved from.
///
/// known_hosts lookups are keyed by the name the user typed, not by the
/// address it resolved to, so the hostname has to travel with the address.
pub trait ToSocketAddrsWithHostname {
    fn to_socket_addrs(&self) -> io::Result<std::vec::IntoIter<SocketAddr>>;

    fn hostname(&self) -> String;
}

impl ToSocketAddrsWithHostname for (&str, u16) {
    fn to_socket_addrs(&self) -> io::Result<std::vec::IntoIter<SocketAddr>> {
        let addrs: Vec<SocketAddr> = ToSocketAddrs::to_socket_addrs(self)?.collect();
        Ok(addrs.into_iter())
    }

    fn hostname(&self) -> String {
        self.0.to_string()
    }
}

impl ToSocketAddrsWithHostname for (String, u16) {
    fn to_socket_addrs(&self) -> io::Result<std::vec::IntoIter<SocketAddr>> {
        ToSocketAddrsWithHostname::to_socket_addrs(&(self.0.as_str(), self.1))
    }

    fn hostname(&self) -> String {
        self.0.clone()
    }
}

impl ToSocketAddrsWithHostname for SocketAddr {
    fn to_socket_addrs(&self) -> io::Result<std::vec::IntoIter<SocketAddr>> {
        Ok(vec![*self].into_iter())
    }

    fn hostname(&self) -> String {
        self.ip().to_string()
    }
}
