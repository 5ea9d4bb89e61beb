//! Thin TCP server: accept loop plus one drain loop per client connection
//! (spec.md §6 "Wire protocol", §9 "one thread per consumer/output sink").
//!
//! Structurally this follows the teacher's own accept-loop shape (a
//! non-blocking `TcpListener` polled with a sleep on `WouldBlock`, one
//! connection handed to its own thread) rather than anything async: the
//! core's concurrency is the interesting part here, this is just plumbing.

use std::io::Write;
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use telemetry_core::{Context, Filter};

use crate::error::TcpError;

/// Tunables for [`serve`] and [`serve_connection`].
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// How long the accept loop and each per-connection drain loop sleep
    /// when there is nothing to do (spec.md §9 Open Question 3: "the TCP
    /// collaborator polls the ring with a 1 ms sleep when empty"). Kept as
    /// the literal documented default; a caller wanting a condition
    /// variable or event count instead can drive [`serve_connection`]
    /// directly from their own wakeup source.
    pub poll_interval: Duration,
    /// Size of the scratch buffer each connection thread reuses for
    /// `drain_packed` (spec.md §4.4). Must be at least `PacketHeader::SIZE`
    /// or every drain call returns `BufferTooSmall`.
    pub packet_buf_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            packet_buf_size: 64 * 1024,
        }
    }
}

/// Closes the consumer slot when a connection thread exits, on any path
/// (clean shutdown, write error, panic unwind).
struct ConsumerGuard<'ctx, 'a> {
    ctx: &'ctx Context<'a>,
    id: usize,
}

impl<'ctx, 'a> Drop for ConsumerGuard<'ctx, 'a> {
    fn drop(&mut self) {
        self.ctx.consumer_close(self.id);
    }
}

/// Sends the one-shot schema blob, then loops writing length-prefixed
/// packed batches until `shutdown` is set or the socket errors out.
///
/// Wire protocol (spec.md §6): `[u32 schema_len][schema_blob]` once, then
/// repeated `[u32 packet_len][packet]`, all little-endian length prefixes.
pub fn serve_connection(
    ctx: &Context,
    stream: &mut TcpStream,
    filter: Filter,
    shutdown: &AtomicBool,
    config: &ServerConfig,
) -> Result<(), TcpError> {
    let schema_len = ctx.schema_serialize(None)?;
    let mut schema_buf = vec![0u8; schema_len];
    ctx.schema_serialize(Some(&mut schema_buf))?;
    stream.write_all(&(schema_len as u32).to_le_bytes())?;
    stream.write_all(&schema_buf)?;

    let id = ctx.consumer_open(filter)?;
    let _guard = ConsumerGuard { ctx, id };

    let mut packet_buf = vec![0u8; config.packet_buf_size];
    while !shutdown.load(Ordering::Relaxed) {
        let len = ctx.drain_packed(id, &mut packet_buf)?;
        if len == 0 {
            thread::sleep(config.poll_interval);
            continue;
        }
        stream.write_all(&(len as u32).to_le_bytes())?;
        stream.write_all(&packet_buf[..len])?;
    }
    Ok(())
}

/// Runs the accept loop on `addr` until `shutdown` is set. Every accepted
/// connection is served on its own scoped thread borrowing `ctx` directly
/// (no `Arc`/`'static` bound needed: the scope outlives every spawned
/// thread it creates).
pub fn serve(
    ctx: &Context,
    addr: impl ToSocketAddrs,
    filter: Filter,
    shutdown: &AtomicBool,
    config: ServerConfig,
) -> Result<(), TcpError> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;

    thread::scope(|scope| {
        while !shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((mut stream, _peer)) => {
                    let _ = stream.set_nodelay(true);
                    scope.spawn(|| {
                        if let Err(e) = serve_connection(ctx, &mut stream, filter, shutdown, &config)
                        {
                            if !e.is_peer_disconnect() {
                                eprintln!("telemetry-tcp: connection ended: {e}");
                            }
                        }
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(config.poll_interval);
                }
                Err(e) => {
                    eprintln!("telemetry-tcp: accept failed: {e}");
                    thread::sleep(config.poll_interval);
                }
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::SocketAddr;
    use telemetry_core::Config;

    #[test]
    fn single_connection_receives_schema_then_one_packet() {
        let ctx = Context::new(Config::new(16));
        ctx.log(7, &42u32.to_ne_bytes()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let shutdown = AtomicBool::new(false);

        thread::scope(|scope| {
            let client = scope.spawn(move || TcpStream::connect(addr).unwrap());
            let (mut accepted, _peer) = listener.accept().unwrap();
            let mut connecting = client.join().unwrap();

            let config = ServerConfig {
                poll_interval: Duration::from_millis(1),
                packet_buf_size: 4096,
            };
            // Serve exactly this one accepted connection on a dedicated
            // thread; stop it as soon as we have read the schema header
            // and one packet below.
            let server_thread =
                scope.spawn(|| serve_connection(&ctx, &mut accepted, Filter::all(), &shutdown, &config));

            let mut len_buf = [0u8; 4];
            connecting.read_exact(&mut len_buf).unwrap();
            let schema_len = u32::from_le_bytes(len_buf) as usize;
            let mut schema_blob = vec![0u8; schema_len];
            connecting.read_exact(&mut schema_blob).unwrap();

            connecting.read_exact(&mut len_buf).unwrap();
            let packet_len = u32::from_le_bytes(len_buf) as usize;
            assert!(packet_len > 0);

            shutdown.store(true, Ordering::Relaxed);
            let _ = server_thread.join();
        });
    }
}
