// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Network I/O for the server.
//!
//! The [`TokioIoProvider`] owns the server's UDP sockets and drives a
//! [`Server`](crate::server::Server) with received datagrams. It is
//! the only I/O provider; the [`server`](crate::server) module itself
//! never touches a socket.

mod tokio;

pub use self::tokio::{ShutdownController, TokioIoProvider};
