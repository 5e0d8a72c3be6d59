//! Command Link Module
//!
//! This module adapts the wireless peer-to-peer link to the command core.
//! The radio layer delivers fixed-size command frames through `push_frame`;
//! `CommandLink` owns the session state, runs each frame through the drive
//! interpreter, and forwards the resulting pulses and indicator color to the
//! actuation channels. Transmitters are tracked in a peer store keyed by
//! their link address.

extern crate alloc;

use alloc::{format, string::String, vec::Vec};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use hashbrown::HashMap;
use lazy_static::lazy_static;

use crate::utils::controllers::{
    leds::LedCommand, servo::ServoCommand, LED_CHANNEL, SERVO_CHANNEL,
};
use crate::utils::drive::interpreter::{CommandPacket, DriveState};

/// Link-layer address of a transmitter.
pub type PeerAddr = [u8; 6];

/// Size of one command frame on the wire.
pub const FRAME_LEN: usize = 3;

/// A raw command frame as delivered by the radio layer.
#[derive(Debug, Clone, Copy)]
pub struct RxFrame {
    pub from: PeerAddr,
    pub data: [u8; FRAME_LEN],
}

/// Queue between the radio receive context and the dispatch task.
pub static FRAME_CHANNEL: Channel<CriticalSectionRawMutex, RxFrame, 16> = Channel::new();

#[derive(Clone, Debug)]
pub struct PeerState {
    pub last_seen: u64,
    pub frames: u32,
}

pub struct PeerRegistry;

lazy_static! {
    pub static ref PEER_STORE: Mutex<CriticalSectionRawMutex, HashMap<String, PeerState>> =
        Mutex::new(HashMap::new());
}

/// Hand a received payload to the command core.
///
/// Safe to call from the radio receive context: never blocks, never
/// interprets. Returns `false` when the payload is dropped, either because
/// it is not exactly [`FRAME_LEN`] bytes or because the queue is full. The
/// link is lossy by contract, so dropping is recovery rather than an error.
pub fn push_frame(from: PeerAddr, payload: &[u8]) -> bool {
    let Ok(data) = <[u8; FRAME_LEN]>::try_from(payload) else {
        tracing::warn!("dropping frame of {} bytes from {:?}", payload.len(), from);
        return false;
    };
    match FRAME_CHANNEL.try_send(RxFrame { from, data }) {
        Ok(()) => true,
        Err(_) => {
            tracing::warn!("frame queue full, dropping frame from {:?}", from);
            false
        }
    }
}

/// Format a peer address as a colon-separated hex string.
pub fn format_addr(addr: &PeerAddr) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        addr[0], addr[1], addr[2], addr[3], addr[4], addr[5]
    )
}

/// Dispatcher owning the session state.
///
/// Exactly one task runs `CommandLink::run`, so reading the prior mode,
/// deciding, and writing the new mode happen as one critical section; the
/// radio context only ever enqueues.
pub struct CommandLink {
    state: DriveState,
}

impl CommandLink {
    pub const fn new() -> Self {
        CommandLink {
            state: DriveState::new(),
        }
    }

    pub fn engaged(&self) -> bool {
        self.state.engaged()
    }

    /// Receive and dispatch command frames forever.
    pub async fn run(&mut self) -> ! {
        loop {
            let frame = FRAME_CHANNEL.receiver().receive().await;
            self.dispatch(frame).await;
        }
    }

    /// Interpret one frame and forward the full decision to the actuators.
    async fn dispatch(&mut self, frame: RxFrame) {
        let peer = format_addr(&frame.from);
        tracing::debug!(%peer, data = ?frame.data, "command frame");
        PeerRegistry::touch(peer, embassy_time::Instant::now().as_secs()).await;

        let actuation = self.state.apply(CommandPacket::from_bytes(frame.data));
        tracing::info!(
            engaged = actuation.engaged,
            left = actuation.left_pulse,
            right = actuation.right_pulse,
            status = ?actuation.status,
            "frame interpreted"
        );

        SERVO_CHANNEL
            .send(ServoCommand::Drive {
                left: actuation.left_pulse,
                right: actuation.right_pulse,
            })
            .await;
        LED_CHANNEL
            .send(LedCommand::Status {
                color: actuation.status,
            })
            .await;
    }
}

#[allow(dead_code)]
impl PeerRegistry {
    /// Record a frame from the given peer at the given timestamp.
    pub async fn touch(
        peer: String,
        timestamp: u64,
    ) {
        let mut store = PEER_STORE.lock().await;
        let state = store.entry(peer).or_insert(PeerState {
            last_seen: timestamp,
            frames: 0,
        });
        state.last_seen = timestamp;
        state.frames = state.frames.wrapping_add(1);
    }

    /// Retrieve a copy of the state for the given peer.
    /// Returns None if the peer has never been heard from.
    pub async fn get_peer(peer: &str) -> Option<PeerState> {
        PEER_STORE.lock().await.get(peer).cloned()
    }

    /// Purge peers that have not been heard from since the provided
    /// threshold. Any peer with last_seen less than the threshold is
    /// removed.
    pub async fn purge_stale_peers(threshold: u64) {
        PEER_STORE
            .lock()
            .await
            .retain(|_addr, state| state.last_seen >= threshold);
    }

    /// Returns a list of known peer addresses.
    pub async fn list_peers() -> Vec<String> {
        PEER_STORE.lock().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_addr() {
        let addr = [0x4C, 0x75, 0x00, 0xAB, 0x01, 0xFF];
        assert_eq!(format_addr(&addr), "4C:75:00:AB:01:FF");
    }

    #[test]
    fn test_push_frame_rejects_bad_length() {
        assert!(!push_frame([0; 6], &[1, 0]));
        assert!(!push_frame([0; 6], &[1, 0, 1, 0]));
    }

    #[test]
    fn test_push_frame_roundtrip() {
        let addr = [1, 2, 3, 4, 5, 6];
        assert!(push_frame(addr, &[1, 0, 2]));
        let frame = FRAME_CHANNEL.try_receive().unwrap();
        assert_eq!(frame.from, addr);
        assert_eq!(frame.data, [1, 0, 2]);
    }
}
