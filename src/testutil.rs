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
#[cfg(test)]
use std::{
    error::Error,
    fs::File,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime},
};

#[cfg(test)]
use hound::{SampleFormat, WavSpec, WavWriter};
#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use rosc::{OscMessage, OscPacket, OscType};
#[cfg(test)]
use tokio::{net::UdpSocket, task::JoinHandle};

/// Wait for the given async predicate to return true or fail.
#[inline]
#[cfg(test)]
pub async fn eventually_async<F, Fut>(mut predicate: F, error_msg: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed();
        if elapsed.is_err() {
            panic!("System time error");
        }
        let elapsed = elapsed.unwrap();

        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate().await {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}

/// A stand-in synthesis engine on a local UDP port. Records every packet it
/// receives and, unless started silent, acknowledges synth definitions the
/// way the real engine does.
#[cfg(test)]
pub struct MockEngine {
    /// The address the mock is listening on.
    addr: SocketAddr,
    /// Everything received so far, in arrival order.
    received: Arc<Mutex<Vec<OscPacket>>>,
    /// The receive loop task.
    handle: JoinHandle<()>,
}

#[cfg(test)]
impl MockEngine {
    /// Starts a mock engine that acknowledges synth definitions.
    pub async fn start() -> Result<MockEngine, Box<dyn Error>> {
        Self::start_inner(true).await
    }

    /// Starts a mock engine that never replies, for exercising timeouts.
    pub async fn start_silent() -> Result<MockEngine, Box<dyn Error>> {
        Self::start_inner(false).await
    }

    async fn start_inner(acknowledge: bool) -> Result<MockEngine, Box<dyn Error>> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let received: Arc<Mutex<Vec<OscPacket>>> = Arc::new(Mutex::new(Vec::new()));

        let task_received = received.clone();
        let handle = tokio::spawn(async move {
            let mut buf = [0u8; rosc::decoder::MTU];
            loop {
                let (size, sender) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(_) => return,
                };
                let packet = match rosc::decoder::decode_udp(&buf[..size]) {
                    Ok((_, packet)) => packet,
                    Err(_) => continue,
                };

                // Record before replying so assertions that run after an
                // acknowledged call always see the packet.
                task_received.lock().push(packet.clone());

                if acknowledge {
                    if let OscPacket::Message(msg) = &packet {
                        if msg.addr == "/d_recv" {
                            let done = OscPacket::Message(OscMessage {
                                addr: "/done".to_string(),
                                args: vec![OscType::String("/d_recv".to_string())],
                            });
                            if let Ok(encoded) = rosc::encoder::encode(&done) {
                                let _ = socket.send_to(&encoded, sender).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(MockEngine {
            addr,
            received,
            handle,
        })
    }

    /// Returns the address to connect to.
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Returns every packet received so far.
    pub fn received(&self) -> Vec<OscPacket> {
        self.received.lock().clone()
    }

    /// Returns the plain messages received for the given OSC address.
    pub fn messages_to(&self, addr: &str) -> Vec<OscMessage> {
        self.received()
            .into_iter()
            .filter_map(|packet| match packet {
                OscPacket::Message(msg) if msg.addr == addr => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Returns the received bundles, each as its contained messages.
    pub fn bundles(&self) -> Vec<Vec<OscMessage>> {
        self.received()
            .into_iter()
            .filter_map(|packet| match packet {
                OscPacket::Bundle(bundle) => Some(
                    bundle
                        .content
                        .into_iter()
                        .filter_map(|inner| match inner {
                            OscPacket::Message(msg) => Some(msg),
                            OscPacket::Bundle(_) => None,
                        })
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl Drop for MockEngine {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Writes a float WAV file with the given channels, interleaving one frame
/// at a time.
#[cfg(test)]
pub fn write_wav(
    path: PathBuf,
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for frame in 0..frames {
        for channel in &channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}
