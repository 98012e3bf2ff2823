// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The session with the external synthesis engine.
//!
//! All contact with the engine goes through a [`Connection`]:
//! - UDP socket setup toward the engine's OSC port
//! - Synth definition publication, the only call that awaits a reply
//! - Default group creation, the placement target for all playback
//! - Synth ID allocation, safe under concurrent triggers
//! - Batch dispatch of synth instantiations as a single bundle

pub mod error;

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};
use std::time::Duration;

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
use tokio::{net::UdpSocket, time};
use tracing::{debug, info};

use self::error::EngineError;

/// How long to wait for the engine to acknowledge each synth definition
/// unless the caller configures otherwise.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// The engine's root node, the target for default group creation.
const ROOT_NODE_ID: i32 = 0;
/// The node ID of the default group.
const DEFAULT_GROUP_ID: i32 = 1;
/// The first ID handed out by the synth ID allocator. Lower IDs are left for
/// groups and other long-lived nodes.
const FIRST_SYNTH_ID: i32 = 1000;

/// Bundles tagged with this time are executed by the engine on arrival.
const IMMEDIATELY: OscTime = OscTime {
    seconds: 0,
    fractional: 1,
};

/// Where the engine places a new node relative to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddAction {
    /// Add to the head of the target group.
    Head = 0,
    /// Add to the tail of the target group.
    Tail = 1,
}

/// One synth to start inside a group. Built per trigger and dropped once the
/// batch has been sent.
#[derive(Clone, Debug)]
pub struct SynthRequest {
    /// The name of the definition the engine should instantiate.
    def_name: String,
    /// The unique node ID for the new synth.
    synth_id: i32,
    /// Where to place the synth relative to the group.
    add_action: AddAction,
    /// Initial control values for the synth.
    controls: HashMap<String, f32>,
}

impl SynthRequest {
    /// Creates a new synth request.
    pub fn new(
        def_name: &str,
        synth_id: i32,
        add_action: AddAction,
        controls: HashMap<String, f32>,
    ) -> SynthRequest {
        SynthRequest {
            def_name: def_name.to_string(),
            synth_id,
            add_action,
            controls,
        }
    }
}

/// A UDP session with a running engine.
///
/// The connection owns the synth ID allocator: every node created through it
/// gets an ID that is never reused for the life of the connection, even when
/// triggers run concurrently.
pub struct Connection {
    /// The socket connected to the engine's OSC port.
    socket: UdpSocket,
    /// How long synthdef publication waits for an acknowledgment.
    handshake_timeout: Duration,
    /// The next synth ID to hand out.
    next_synth_id: AtomicI32,
}

impl Connection {
    /// Connects to the engine at the given address using the default
    /// handshake timeout.
    pub async fn connect(addr: &str) -> Result<Arc<Connection>, EngineError> {
        Self::connect_with_timeout(addr, DEFAULT_HANDSHAKE_TIMEOUT).await
    }

    /// Connects to the engine at the given address.
    pub async fn connect_with_timeout(
        addr: &str,
        handshake_timeout: Duration,
    ) -> Result<Arc<Connection>, EngineError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        info!(addr, "Connected to the synthesis engine");

        Ok(Arc::new(Connection {
            socket,
            handshake_timeout,
            next_synth_id: AtomicI32::new(FIRST_SYNTH_ID),
        }))
    }

    /// Returns a fresh synth ID. Two callers never receive the same ID.
    pub fn next_synth_id(&self) -> i32 {
        self.next_synth_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Creates the default group that all playback synths are placed in,
    /// consuming this handle into the returned [`Group`]. Group creation is
    /// fire-and-forget; the engine sends no reply.
    pub async fn add_default_group(self: Arc<Self>) -> Result<Group, EngineError> {
        self.send_packet(&OscPacket::Message(OscMessage {
            addr: "/g_new".to_string(),
            args: vec![
                OscType::Int(DEFAULT_GROUP_ID),
                OscType::Int(AddAction::Head as i32),
                OscType::Int(ROOT_NODE_ID),
            ],
        }))
        .await?;
        debug!(group = DEFAULT_GROUP_ID, "Created default group");

        Ok(Group {
            conn: self,
            node_id: DEFAULT_GROUP_ID,
        })
    }

    /// Sends one encoded synth definition and blocks until the engine
    /// acknowledges it or the handshake timeout elapses. Definitions must be
    /// published one at a time so each acknowledgment is attributable to the
    /// definition named here.
    pub async fn send_def(&self, name: &str, encoded: Vec<u8>) -> Result<(), EngineError> {
        self.send_packet(&OscPacket::Message(OscMessage {
            addr: "/d_recv".to_string(),
            args: vec![OscType::Blob(encoded)],
        }))
        .await?;

        match time::timeout(self.handshake_timeout, self.await_done("/d_recv")).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::HandshakeTimeout {
                def: name.to_string(),
                timeout: self.handshake_timeout,
            }),
        }
    }

    /// Waits for the done reply to the given command, skipping unrelated
    /// engine notifications that arrive first.
    async fn await_done(&self, command: &str) -> Result<(), EngineError> {
        let mut buf = [0u8; rosc::decoder::MTU];
        loop {
            let size = self.socket.recv(&mut buf).await?;
            let (_, packet) = rosc::decoder::decode_udp(&buf[..size])?;
            if let OscPacket::Message(msg) = packet {
                if msg.addr == "/done" {
                    if let Some(OscType::String(done_command)) = msg.args.first() {
                        if done_command == command {
                            return Ok(());
                        }
                    }
                }
                debug!(addr = msg.addr, "Ignoring engine reply");
            }
        }
    }

    async fn send_packet(&self, packet: &OscPacket) -> Result<(), EngineError> {
        let encoded = rosc::encoder::encode(packet)?;
        self.socket.send(&encoded).await?;
        Ok(())
    }
}

/// An engine-side container for synths, used as the placement target for all
/// playback. Shares the connection so dispatch can send through it.
pub struct Group {
    /// The connection the group was created over.
    conn: Arc<Connection>,
    /// The engine node ID of this group.
    node_id: i32,
}

impl Group {
    /// Returns the engine node ID of this group.
    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    /// Starts every synth in the batch inside this group. The whole batch
    /// travels as one bundle in one datagram, so the requests arrive at the
    /// engine together and in order. The engine sends no reply; a slow
    /// engine drops requests rather than blocking the caller.
    pub async fn synths(&self, requests: &[SynthRequest]) -> Result<(), EngineError> {
        let content = requests
            .iter()
            .map(|request| {
                let mut args = vec![
                    OscType::String(request.def_name.clone()),
                    OscType::Int(request.synth_id),
                    OscType::Int(request.add_action as i32),
                    OscType::Int(self.node_id),
                ];
                for (name, value) in &request.controls {
                    args.push(OscType::String(name.clone()));
                    args.push(OscType::Float(*value));
                }
                OscPacket::Message(OscMessage {
                    addr: "/s_new".to_string(),
                    args,
                })
            })
            .collect();

        let encoded = rosc::encoder::encode(&OscPacket::Bundle(OscBundle {
            timetag: IMMEDIATELY,
            content,
        }))?;
        self.conn
            .socket
            .send(&encoded)
            .await
            .map_err(EngineError::DispatchFailed)?;

        debug!(
            group = self.node_id,
            synths = requests.len(),
            "Dispatched synth batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::error::Error;

    use super::*;
    use crate::testutil::{eventually_async, MockEngine};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_synth_ids_are_monotonic() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start().await?;
        let conn = Connection::connect(&mock.addr()).await?;

        assert_eq!(1000, conn.next_synth_id());
        assert_eq!(1001, conn.next_synth_id());
        assert_eq!(1002, conn.next_synth_id());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_synth_ids_never_collide() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start().await?;
        let conn = Connection::connect(&mock.addr()).await?;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let conn = conn.clone();
            handles.push(tokio::spawn(async move {
                (0..100).map(|_| conn.next_synth_id()).collect::<Vec<i32>>()
            }));
        }

        let mut ids: HashSet<i32> = HashSet::new();
        for handle in handles {
            for id in handle.await? {
                assert!(ids.insert(id), "synth ID {} was issued twice", id);
            }
        }
        assert_eq!(800, ids.len());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_def_waits_for_acknowledgment() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start().await?;
        let conn = Connection::connect_with_timeout(&mock.addr(), Duration::from_secs(1)).await?;

        conn.send_def("sampler_simple_mono", vec![1, 2, 3]).await?;

        let defs = mock.messages_to("/d_recv");
        assert_eq!(1, defs.len());
        assert_eq!(Some(&OscType::Blob(vec![1, 2, 3])), defs[0].args.first());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_def_times_out_without_acknowledgment() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start_silent().await?;
        let conn =
            Connection::connect_with_timeout(&mock.addr(), Duration::from_millis(100)).await?;

        match conn.send_def("sampler_simple_mono", vec![1, 2, 3]).await {
            Err(EngineError::HandshakeTimeout { def, timeout }) => {
                assert_eq!("sampler_simple_mono", def);
                assert_eq!(Duration::from_millis(100), timeout);
            }
            other => panic!("expected a handshake timeout, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_default_group() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start().await?;
        let conn = Connection::connect(&mock.addr()).await?;

        let group = conn.clone().add_default_group().await?;
        assert_eq!(1, group.node_id());

        eventually_async(
            || async { !mock.messages_to("/g_new").is_empty() },
            "group creation never reached the engine",
        )
        .await;

        let messages = mock.messages_to("/g_new");
        assert_eq!(
            vec![OscType::Int(1), OscType::Int(0), OscType::Int(0)],
            messages[0].args
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_synths_sends_one_bundle() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start().await?;
        let conn = Connection::connect(&mock.addr()).await?;
        let group = conn.clone().add_default_group().await?;

        let requests = vec![
            SynthRequest::new("sampler_simple_mono", 1000, AddAction::Tail, HashMap::new()),
            SynthRequest::new(
                "sampler_simple_stereo",
                1001,
                AddAction::Tail,
                HashMap::from([("bufnum".to_string(), 3.0)]),
            ),
        ];
        group.synths(&requests).await?;

        eventually_async(
            || async { !mock.bundles().is_empty() },
            "synth batch never reached the engine",
        )
        .await;

        let bundles = mock.bundles();
        assert_eq!(1, bundles.len());
        let batch = &bundles[0];
        assert_eq!(2, batch.len());

        assert_eq!("/s_new", batch[0].addr);
        assert_eq!(
            vec![
                OscType::String("sampler_simple_mono".to_string()),
                OscType::Int(1000),
                OscType::Int(1),
                OscType::Int(1),
            ],
            batch[0].args
        );

        assert_eq!("/s_new", batch[1].addr);
        assert_eq!(
            vec![
                OscType::String("sampler_simple_stereo".to_string()),
                OscType::Int(1001),
                OscType::Int(1),
                OscType::Int(1),
                OscType::String("bufnum".to_string()),
                OscType::Float(3.0),
            ],
            batch[1].args
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_synths_dispatch_failure_keeps_connection_usable() -> Result<(), Box<dyn Error>> {
        let mock = MockEngine::start().await?;
        let conn = Connection::connect(&mock.addr()).await?;
        let group = conn.clone().add_default_group().await?;

        // A batch far larger than fits in one UDP datagram.
        let oversized: Vec<SynthRequest> = (0..4000)
            .map(|i| {
                SynthRequest::new(
                    "sampler_simple_mono",
                    1000 + i,
                    AddAction::Tail,
                    HashMap::new(),
                )
            })
            .collect();
        match group.synths(&oversized).await {
            Err(EngineError::DispatchFailed(_)) => {}
            other => panic!("expected dispatch to fail, got {:?}", other),
        }

        // The failed batch is dropped whole; the next batch still goes
        // through on the same connection.
        let single = vec![SynthRequest::new(
            "sampler_simple_mono",
            5000,
            AddAction::Tail,
            HashMap::new(),
        )];
        group.synths(&single).await?;

        eventually_async(
            || async { !mock.bundles().is_empty() },
            "follow-up batch never reached the engine",
        )
        .await;

        let bundles = mock.bundles();
        assert_eq!(1, bundles.len());
        assert_eq!(1, bundles[0].len());
        assert_eq!("/s_new", bundles[0][0].addr);
        assert_eq!(Some(&OscType::Int(5000)), bundles[0][0].args.get(1));
        Ok(())
    }
}
