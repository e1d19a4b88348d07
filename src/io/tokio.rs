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

//! Implementation of the Tokio I/O provider.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};

use crate::server::Server;

/// The size of the receive buffer for one UDP datagram. This is the
/// RFC 1035 limit for DNS over UDP without EDNS; anything longer is
/// truncated by the socket and will fail to parse.
const RECV_BUFFER_SIZE: usize = 512;

////////////////////////////////////////////////////////////////////////
// THE I/O PROVIDER                                                   //
////////////////////////////////////////////////////////////////////////

/// The Tokio-based UDP I/O provider.
///
/// The provider runs one receive-loop task per bound socket. Each
/// received datagram is copied out of the shared receive buffer and
/// handed to a freshly spawned task, so a slow handler never blocks
/// further receives. Backpressure is left to the operating system's
/// socket buffer; per-datagram work is small and bounded.
///
/// The provider supports graceful shutdown through the
/// [`ShutdownController`] returned by [`TokioIoProvider::start`].
pub struct TokioIoProvider {
    udp_sockets: Vec<UdpSocket>,
}

impl TokioIoProvider {
    /// Binds a UDP socket for each of `addrs` in preparation for
    /// serving. This requires the Tokio runtime to be active.
    pub async fn bind<U>(addrs: U) -> io::Result<Self>
    where
        U: IntoIterator<Item = SocketAddr>,
    {
        let mut udp_sockets = Vec::new();
        for addr in addrs {
            let socket = UdpSocket::bind(addr).await?;
            info!("Listening on UDP {}.", socket.local_addr()?);
            udp_sockets.push(socket);
        }
        Ok(Self { udp_sockets })
    }

    /// Starts the receive loops on the active Tokio runtime.
    ///
    /// The returned [`ShutdownController`] must be held as long as
    /// the server should be running: dropping it triggers shutdown.
    pub fn start(self, server: &Arc<Server>) -> ShutdownController {
        let (controller, handle) = make_shutdown_channels();
        for socket in self.udp_sockets {
            tokio::spawn(run_udp_receiver(
                handle.clone(),
                server.clone(),
                Arc::new(socket),
            ));
        }
        controller
    }
}

/// The UDP receive loop for one socket.
///
/// The receive buffer is reused across iterations, so each datagram
/// is copied into a freshly owned buffer before the handler task is
/// spawned. The loop ends (dropping its socket) when shutdown is
/// requested.
async fn run_udp_receiver(
    mut shutdown: ShutdownHandle,
    server: Arc<Server>,
    socket: Arc<UdpSocket>,
) {
    let mut buf = [0; RECV_BUFFER_SIZE];
    loop {
        let (len, src) = tokio::select! {
            _ = shutdown.request_receiver.recv() => return,
            result = socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(err) => {
                    error!("UDP receive error: {}", err);
                    continue;
                }
            },
        };

        let datagram = buf[..len].to_vec();
        let server = server.clone();
        let socket = socket.clone();
        let shutdown = shutdown.wait_sender.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_query(&datagram) {
                if let Err(err) = socket.send_to(&response, src).await {
                    error!("failed to send response to {}: {}", src, err);
                }
            }
            // This keeps the shutdown handle alive until the handler
            // is done.
            drop(shutdown);
        });
    }
}

////////////////////////////////////////////////////////////////////////
// GRACEFUL SHUTDOWN                                                  //
////////////////////////////////////////////////////////////////////////

/// Controls the shutdown of the provider's Tokio tasks.
///
/// Use [`ShutdownController::blocking_shut_down`] to request shutdown
/// and wait for the receive loops and in-flight handlers to finish.
/// Dropping the controller also triggers shutdown, but without
/// waiting.
#[must_use]
pub struct ShutdownController {
    request_sender: broadcast::Sender<()>,
    wait_receiver: mpsc::Receiver<()>,
}

impl ShutdownController {
    /// Requests that the running tasks shut down, then waits for them
    /// to terminate. This must be called from outside the runtime.
    pub fn blocking_shut_down(mut self) {
        drop(self.request_sender);
        let _ = self.wait_receiver.blocking_recv();
    }
}

/// A handle held by tasks to interact with the graceful shutdown
/// mechanism. Tasks learn of a shutdown request when all senders
/// attached to `request_receiver` are dropped, and prevent shutdown
/// from completing until they drop their `wait_sender`.
struct ShutdownHandle {
    request_receiver: broadcast::Receiver<()>,
    wait_sender: mpsc::Sender<()>,
}

impl Clone for ShutdownHandle {
    fn clone(&self) -> Self {
        // A receiver created through resubscribe does not see values
        // already queued, but the shutdown signal is not a value; it
        // is the closing of the channel.
        Self {
            request_receiver: self.request_receiver.resubscribe(),
            wait_sender: self.wait_sender.clone(),
        }
    }
}

/// Produces a [`ShutdownController`] and an initial [`ShutdownHandle`]
/// connected to it.
fn make_shutdown_channels() -> (ShutdownController, ShutdownHandle) {
    let (request_sender, request_receiver) = broadcast::channel(1);
    let (wait_sender, wait_receiver) = mpsc::channel(1);
    let controller = ShutdownController {
        request_sender,
        wait_receiver,
    };
    let handle = ShutdownHandle {
        request_receiver,
        wait_sender,
    };
    (controller, handle)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::zone::Catalog;
    use crate::zone_file;

    fn test_server() -> Arc<Server> {
        let catalog = Catalog::new();
        let zone = zone_file::load(Cursor::new(
            "$ORIGIN example.com.\n\
             $TTL 3600\n\
             @ IN A 93.184.216.34\n",
        ))
        .unwrap();
        catalog.insert(Arc::new(zone));
        Arc::new(Server::new(catalog))
    }

    /// A query for example.com. IN A.
    const QUERY: &[u8] =
        b"\x12\x34\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x07example\x03com\x00\x00\x01\x00\x01";

    #[tokio::test]
    async fn serves_a_query_over_udp() {
        let server = test_server();
        let provider = TokioIoProvider::bind(["127.0.0.1:0".parse().unwrap()])
            .await
            .unwrap();
        let bound = provider.udp_sockets[0].local_addr().unwrap();
        let controller = provider.start(&server);

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(QUERY, bound).await.unwrap();
        let mut buf = [0; 512];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();

        let response = crate::message::Message::parse(&buf[..len]).unwrap();
        assert_eq!(response.id, 0x1234);
        assert!(response.qr());
        assert!(response.aa());
        assert_eq!(response.answers.len(), 1);

        tokio::task::spawn_blocking(move || controller.blocking_shut_down())
            .await
            .unwrap();
        assert_eq!(server.stats().queries(), 1);
        assert_eq!(server.stats().answers(), 1);
    }

    #[tokio::test]
    async fn shutdown_completes_when_tasks_exit() {
        let server = test_server();
        let provider = TokioIoProvider::bind(["127.0.0.1:0".parse().unwrap()])
            .await
            .unwrap();
        let controller = provider.start(&server);
        tokio::task::spawn_blocking(move || controller.blocking_shut_down())
            .await
            .unwrap();
    }
}
