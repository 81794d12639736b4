//! DFPlayer Mini serial driver.
//!
//! Every exchange is a fixed 10-byte frame:
//!
//! ```text
//! 7E FF 06 <cmd> <feedback> <param hi> <param lo> <chk hi> <chk lo> EF
//! ```
//!
//! where the checksum is the two's complement of the sum of bytes 1..=6.
//! Commands go out without requesting feedback; the only reply the driver
//! waits for is the online report the module sends after a reset.

use embedded_io::{Read, Write};

use crate::audio::{AudioActuator, AudioError};
use crate::config::MAX_VOLUME;

pub const FRAME_LEN: usize = 10;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LEN: u8 = 0x06;
const END: u8 = 0xEF;

/// Highest track index addressable by the play/loop commands
pub const MAX_TRACK: u16 = 2999;

/// Bytes the driver is willing to read while waiting for the reset report
const INIT_READ_BUDGET: usize = 64;

/// Commands sent to the module
pub mod cmd {
    pub const PLAY: u8 = 0x03;
    pub const VOLUME: u8 = 0x06;
    pub const LOOP: u8 = 0x08;
    pub const RESET: u8 = 0x0C;
    pub const STOP: u8 = 0x16;
}

/// Reports sent by the module
pub mod report {
    pub const CARD_INSERTED: u8 = 0x3A;
    pub const CARD_REMOVED: u8 = 0x3B;
    pub const TRACK_FINISHED: u8 = 0x3D;
    /// Sent after power-up or reset; param is a storage bitmask
    pub const ONLINE: u8 = 0x3F;
    pub const ERROR: u8 = 0x40;
    pub const ACK: u8 = 0x41;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    pub feedback: bool,
    pub param: u16,
}

impl Frame {
    pub const fn new(command: u8, param: u16) -> Self {
        Self {
            command,
            feedback: false,
            param,
        }
    }
}

fn checksum(body: &[u8]) -> u16 {
    body.iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
        .wrapping_neg()
}

/// Serialize a frame to its 10-byte wire form.
pub fn encode_frame(frame: &Frame) -> [u8; FRAME_LEN] {
    let [param_hi, param_lo] = frame.param.to_be_bytes();
    let mut out = [
        START,
        VERSION,
        LEN,
        frame.command,
        frame.feedback as u8,
        param_hi,
        param_lo,
        0,
        0,
        END,
    ];
    let [chk_hi, chk_lo] = checksum(&out[1..7]).to_be_bytes();
    out[7] = chk_hi;
    out[8] = chk_lo;
    out
}

/// Byte-fed frame decoder.
///
/// Skips noise until a start byte and checks the header as it arrives. A
/// completed frame with a bad end byte or checksum is dropped, and decoding
/// resumes from the next start byte inside it, so a truncated frame never
/// swallows the one that follows.
pub struct FrameReader {
    buf: [u8; FRAME_LEN],
    pos: usize,
}

impl FrameReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            pos: 0,
        }
    }

    /// Feed one byte. Returns a frame when a valid one completes.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        self.push(byte);
        if self.pos < FRAME_LEN {
            return None;
        }
        match decode(&self.buf) {
            Some(frame) => {
                self.pos = 0;
                Some(frame)
            }
            None => {
                self.resync();
                None
            }
        }
    }

    fn push(&mut self, byte: u8) {
        let expected = match self.pos {
            0 => Some(START),
            1 => Some(VERSION),
            2 => Some(LEN),
            _ => None,
        };
        if let Some(want) = expected {
            if byte != want {
                // A start byte here may open the real frame
                self.pos = 0;
                if byte == START {
                    self.buf[0] = START;
                    self.pos = 1;
                }
                return;
            }
        }
        self.buf[self.pos] = byte;
        self.pos += 1;
    }

    /// Replay whatever followed the first start byte of a rejected frame.
    fn resync(&mut self) {
        let rejected = self.buf;
        self.pos = 0;
        if let Some(i) = rejected[1..].iter().position(|&b| b == START) {
            for &b in &rejected[1 + i..] {
                self.push(b);
            }
        }
    }
}

fn decode(b: &[u8; FRAME_LEN]) -> Option<Frame> {
    if b[0] != START || b[1] != VERSION || b[2] != LEN || b[9] != END {
        return None;
    }
    if checksum(&b[1..7]) != u16::from_be_bytes([b[7], b[8]]) {
        return None;
    }
    Some(Frame {
        command: b[3],
        feedback: b[4] != 0,
        param: u16::from_be_bytes([b[5], b[6]]),
    })
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// DFPlayer Mini over any blocking serial port.
///
/// `port.read` returning `Ok(0)` is taken to mean "nothing arrived before
/// the port's timeout".
pub struct DfPlayer<U> {
    port: U,
    reader: FrameReader,
}

impl<U: Read + Write> DfPlayer<U> {
    pub fn new(port: U) -> Self {
        Self {
            port,
            reader: FrameReader::new(),
        }
    }

    pub fn release(self) -> U {
        self.port
    }

    fn send(&mut self, command: u8, param: u16) -> Result<(), AudioError> {
        let bytes = encode_frame(&Frame::new(command, param));
        self.port.write_all(&bytes).map_err(|_| AudioError::Serial)?;
        self.port.flush().map_err(|_| AudioError::Serial)
    }

    /// Read until a valid frame arrives or the byte budget runs out.
    fn next_report(&mut self, budget: &mut usize) -> Result<Frame, AudioError> {
        let mut chunk = [0u8; FRAME_LEN];
        while *budget > 0 {
            let want = chunk.len().min(*budget);
            let n = self
                .port
                .read(&mut chunk[..want])
                .map_err(|_| AudioError::Serial)?;
            if n == 0 {
                return Err(AudioError::NoResponse);
            }
            *budget -= n;
            for &byte in &chunk[..n] {
                if let Some(frame) = self.reader.feed(byte) {
                    return Ok(frame);
                }
            }
        }
        Err(AudioError::NoResponse)
    }

    fn check_track(track: u16) -> Result<u16, AudioError> {
        if (1..=MAX_TRACK).contains(&track) {
            Ok(track)
        } else {
            Err(AudioError::InvalidTrack(track))
        }
    }
}

impl<U: Read + Write> AudioActuator for DfPlayer<U> {
    fn init(&mut self) -> Result<(), AudioError> {
        self.reader = FrameReader::new();
        self.send(cmd::RESET, 0)?;

        let mut budget = INIT_READ_BUDGET;
        loop {
            let frame = self.next_report(&mut budget)?;
            match frame.command {
                report::ONLINE if frame.param != 0 => {
                    log::info!("DFPlayer online, storage mask {:#04x}", frame.param);
                    return Ok(());
                }
                report::ONLINE => return Err(AudioError::NoMedium),
                report::ERROR => return Err(AudioError::Module(frame.param)),
                other => log::debug!("DFPlayer report {:#04x} ignored during init", other),
            }
        }
    }

    fn set_volume(&mut self, level: u8) -> Result<(), AudioError> {
        self.send(cmd::VOLUME, level.min(MAX_VOLUME) as u16)
    }

    fn play(&mut self, track: u16) -> Result<(), AudioError> {
        let track = Self::check_track(track)?;
        self.send(cmd::PLAY, track)
    }

    fn play_looping(&mut self, track: u16) -> Result<(), AudioError> {
        let track = Self::check_track(track)?;
        self.send(cmd::LOOP, track)
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.send(cmd::STOP, 0)
    }
}
