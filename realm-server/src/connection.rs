//! Per-connection networking (`spec.md` §4.1). One thread accepts
//! sockets; each accepted connection gets a reader thread (this one)
//! decoding frames off a [`FrameBuffer`] and a writer thread draining
//! the session's outbound channel registered in the
//! [`realm_world::registry::SessionRegistry`]. A shared worker pool
//! drains decoded commands so a slow handler on one connection never
//! blocks another connection's reads.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use slog::{debug, info, warn};

use realm_protocol::{ClientCommand, DecodeError, FrameBuffer, Reader, ServerEvent};
use realm_shared::ids::CharIndex;
use realm_shared::time::timestamp_secs;
use realm_world::broadcast::broadcast_area;
use realm_world::outbox::Outbox;

use crate::deps::Dependencies;
use crate::session::SessionId;

const READ_BUFFER_CAPACITY: usize = 64 * 1024;
const LOGIN_TIMEOUT_S: u64 = 30;
const IDLE_TIMEOUT_S: u64 = 300;
const SOCKET_POLL_TIMEOUT: Duration = Duration::from_millis(500);
const WORKER_QUEUE_CAPACITY: usize = 4096;
const WORKER_THREADS: usize = 8;

/// Either a plain or a TLS-wrapped socket, behind one small interface so
/// the reader/writer loops don't care which. TLS reads and writes share
/// one `rustls::StreamOwned` behind a mutex — both sides contend for it,
/// but the socket-level read timeout below keeps either side from
/// starving the other for longer than one poll interval.
enum Transport {
    Plain(TcpStream),
    Tls(Arc<Mutex<rustls::StreamOwned<rustls::ServerConnection, TcpStream>>>),
}

impl Transport {
    fn try_clone(&self) -> io::Result<Transport> {
        match self {
            Transport::Plain(s) => Ok(Transport::Plain(s.try_clone()?)),
            Transport::Tls(s) => Ok(Transport::Tls(s.clone())),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.lock().expect("tls stream poisoned").read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.lock().expect("tls stream poisoned").write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.lock().expect("tls stream poisoned").flush(),
        }
    }
}

/// Binds the listener and accepts connections until `shutdown` is set,
/// spawning one thread per connection plus a shared worker pool that
/// drains decoded commands (`spec.md` §4.1, §5).
pub fn run_listener(
    deps: Dependencies,
    tls_config: Option<Arc<rustls::ServerConfig>>,
    shutdown: Arc<AtomicBool>,
) -> io::Result<()> {
    let addr = format!("{}:{}", deps.config.server.host, deps.config.server.port);
    let listener = TcpListener::bind(&addr)?;
    listener.set_nonblocking(true)?;
    info!(deps.log, "listening"; "addr" => &addr);

    let work_tx = spawn_worker_pool(deps.clone());

    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let deps = deps.clone();
                let work_tx = work_tx.clone();
                let tls_config = tls_config.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, deps.clone(), tls_config, work_tx) {
                        debug!(deps.log, "connection ended"; "peer" => %peer, "error" => %err);
                    }
                });
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn spawn_worker_pool(deps: Dependencies) -> Sender<(SessionId, ClientCommand)> {
    let (tx, rx): (Sender<(SessionId, ClientCommand)>, Receiver<(SessionId, ClientCommand)>) =
        bounded(WORKER_QUEUE_CAPACITY);
    for _ in 0..WORKER_THREADS {
        let rx = rx.clone();
        let deps = deps.clone();
        std::thread::spawn(move || {
            while let Ok((session_id, cmd)) = rx.recv() {
                crate::dispatch::handle(session_id, cmd, &deps);
            }
        });
    }
    tx
}

fn handle_connection(
    stream: TcpStream,
    deps: Dependencies,
    tls_config: Option<Arc<rustls::ServerConfig>>,
    work_tx: Sender<(SessionId, ClientCommand)>,
) -> anyhow::Result<()> {
    stream.set_nodelay(true).ok();
    stream.set_read_timeout(Some(SOCKET_POLL_TIMEOUT)).ok();

    let mut transport = match tls_config {
        Some(cfg) => {
            let conn = rustls::ServerConnection::new(cfg)?;
            Transport::Tls(Arc::new(Mutex::new(rustls::StreamOwned::new(conn, stream))))
        }
        None => Transport::Plain(stream),
    };

    let now = timestamp_secs();
    let session_id = deps.sessions.create(now);
    let (out_tx, out_rx) = bounded::<Vec<u8>>(256);
    deps.registry.register(session_id, out_tx);

    let mut writer_transport = transport.try_clone()?;
    let writer = std::thread::spawn(move || {
        for bytes in out_rx {
            if writer_transport.write_all(&bytes).is_err() {
                break;
            }
        }
    });

    let result = read_loop(&mut transport, session_id, &deps, &work_tx);

    deps.registry.unregister(session_id);
    if let Some(session) = deps.sessions.remove(session_id) {
        let char_index = session.lock().expect("session poisoned").char_index;
        if let Some(char_index) = char_index {
            cleanup_player(char_index, &deps);
        }
    }
    let _ = writer.join();

    result
}

fn read_loop(
    transport: &mut Transport,
    session_id: SessionId,
    deps: &Dependencies,
    work_tx: &Sender<(SessionId, ClientCommand)>,
) -> anyhow::Result<()> {
    let mut buffer = FrameBuffer::new(READ_BUFFER_CAPACITY);
    let connected_at = timestamp_secs();

    loop {
        match buffer.fill_from(transport) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                if connection_timed_out(session_id, deps, connected_at) {
                    return Ok(());
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        loop {
            let readable = buffer.readable();
            if readable.is_empty() {
                break;
            }
            let opcode = readable[0];
            let mut reader = Reader::new(&readable[1..]);
            match ClientCommand::decode(opcode, &mut reader) {
                Ok(cmd) => {
                    let consumed = 1 + reader.consumed();
                    buffer.consume(consumed);
                    if work_tx.send((session_id, cmd)).is_err() {
                        return Ok(());
                    }
                }
                Err(DecodeError::Incomplete) => break,
                Err(DecodeError::Protocol(err)) => {
                    debug!(deps.log, "protocol error, closing connection";
                        "session" => session_id, "error" => %err);
                    return Ok(());
                }
            }
        }

        if connection_timed_out(session_id, deps, connected_at) {
            return Ok(());
        }
    }
}

/// Disconnects a session that never completed `LOGIN` within
/// [`LOGIN_TIMEOUT_S`], or one that has sent nothing for
/// [`IDLE_TIMEOUT_S`] (`spec.md` §5 "Timeouts").
fn connection_timed_out(session_id: SessionId, deps: &Dependencies, connected_at: u64) -> bool {
    let Some(session) = deps.sessions.get(session_id) else {
        return true;
    };
    let session = session.lock().expect("session poisoned");
    let now = timestamp_secs();
    if !session.is_authenticated() && now.saturating_sub(connected_at) >= LOGIN_TIMEOUT_S {
        return true;
    }
    now.saturating_sub(session.last_activity_at) >= IDLE_TIMEOUT_S
}

/// Removes a disconnected player from the world, persists its last
/// known state, and tells everyone nearby it's gone (`spec.md` §4.1
/// "Disconnect", §4.9).
fn cleanup_player(char_index: CharIndex, deps: &Dependencies) {
    let (record, map, x, y) = {
        let world = deps.world.lock().expect("world lock poisoned");
        let Some(player) = world.get_entity(char_index).and_then(|e| e.as_player()) else {
            return;
        };
        let record = crate::player_sync::player_to_record(player);
        let (map, x, y) = (player.map, player.x, player.y);
        (record, map, x, y)
    };

    if let Err(err) = realm_persistence::player::save(&deps.store, &record) {
        warn!(deps.log, "failed to save player on disconnect";
            "user_id" => record.user_id, "error" => %err);
    }

    let mut world = deps.world.lock().expect("world lock poisoned");
    world.remove_entity(char_index);
    let mut outbox = Outbox::new(deps.registry.clone());
    broadcast_area(
        &world,
        &mut outbox,
        map,
        x,
        y,
        &ServerEvent::CharacterRemove { char_index: char_index.get() },
    );
    drop(world);
    outbox.flush();
}
