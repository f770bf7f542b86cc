// src/driver/midi.rs

//! MIDI realization of `GridDriver` for 8x8 pad controllers with a control
//! column (Launchpad Mini layout).
//!
//! Pads are addressed by note number with a 16-wide hardware row stride:
//! `note = row * 16 + col`. Lights are driven with note-on messages whose
//! velocity is the intensity; button presses arrive as note-on (press) and
//! note-on with velocity 0 or note-off (release).

use super::{GridDriver, UiInputEvent};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, trace, warn};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Notes per hardware row.
pub const ROW_STRIDE: usize = 16;
/// Hardware rows covered by a full clear.
pub const CLEAR_ROWS: usize = 8;

const READ_BUFFER_SIZE: usize = 256;
/// Highest valid note number; anything above would read as a status byte.
const MAX_NOTE: u8 = 0x7F;

/// How long a full output buffer may stall a write before it fails.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Maps grid coordinates to a MIDI note number. `None` when the pad does not
/// exist on the hardware grid.
pub fn map_ui_to_midi(col: usize, row: usize) -> Option<u8> {
    if col >= ROW_STRIDE {
        return None;
    }
    let note = u8::try_from(row.checked_mul(ROW_STRIDE)?.checked_add(col)?).ok()?;
    (note <= MAX_NOTE).then_some(note)
}

/// Maps a MIDI note number back to grid coordinates `(col, row)`.
pub fn map_midi_to_ui(note: u8) -> (usize, usize) {
    let note = note as usize;
    (note % ROW_STRIDE, note / ROW_STRIDE)
}

/// One channel message: status byte plus up to two data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        MidiMessage {
            status: NOTE_ON,
            data1: note,
            data2: velocity,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// Bytes this message occupies on the wire: the status plus its data bytes.
    pub fn wire_len(self) -> usize {
        1 + data_len(self.status)
    }

    /// Converts note messages into grid input. Other messages yield `None`.
    fn to_input_event(self) -> Option<UiInputEvent> {
        let (col, row) = map_midi_to_ui(self.data1);
        match self.status & 0xF0 {
            NOTE_ON => Some(UiInputEvent::new(col, row, self.data2)),
            NOTE_OFF => Some(UiInputEvent::new(col, row, 0)),
            _ => None,
        }
    }
}

/// Number of data bytes following a status byte.
fn data_len(status: u8) -> usize {
    match status {
        0x80..=0xBF | 0xE0..=0xEF => 2,
        0xC0..=0xDF => 1,
        0xF1 | 0xF3 => 1,
        0xF2 => 2,
        _ => 0,
    }
}

/// Incremental decoder for a raw MIDI byte stream with running status.
#[derive(Debug, Default)]
pub struct MidiParser {
    running_status: Option<u8>,
    data: Vec<u8>,
    in_sysex: bool,
}

impl MidiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every complete channel message they finish.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Vec<MidiMessage> {
        let mut messages = Vec::new();
        for &byte in bytes {
            if byte >= 0xF8 {
                // Realtime bytes may appear anywhere and carry no grid meaning.
                continue;
            }
            if self.in_sysex {
                if byte == SYSEX_END {
                    self.in_sysex = false;
                }
                continue;
            }
            if byte & 0x80 != 0 {
                self.data.clear();
                if byte == SYSEX_START {
                    self.in_sysex = true;
                    self.running_status = None;
                } else if byte < SYSEX_START {
                    self.running_status = Some(byte);
                } else {
                    // System common cancels running status; we skip its payload.
                    self.running_status = None;
                }
                continue;
            }
            let Some(status) = self.running_status else {
                trace!("MidiParser: dropping stray data byte {:#04x}", byte);
                continue;
            };
            self.data.push(byte);
            if self.data.len() == data_len(status) {
                messages.push(MidiMessage {
                    status,
                    data1: self.data[0],
                    data2: self.data.get(1).copied().unwrap_or(0),
                });
                self.data.clear();
            }
        }
        messages
    }
}

/// Byte-level MIDI transport.
pub trait MidiPort {
    /// Returns whatever bytes are buffered without blocking.
    fn read_available(&mut self) -> Result<Vec<u8>>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Grid driver over any `MidiPort`.
pub struct MidiDriver<P: MidiPort> {
    port: P,
    parser: MidiParser,
    write_queue: Vec<MidiMessage>,
}

impl<P: MidiPort> MidiDriver<P> {
    pub fn new(port: P) -> Self {
        MidiDriver {
            port,
            parser: MidiParser::new(),
            write_queue: Vec::new(),
        }
    }

    pub fn queued(&self) -> &[MidiMessage] {
        &self.write_queue
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}

impl<P: MidiPort> GridDriver for MidiDriver<P> {
    fn get(&mut self) -> Result<Vec<UiInputEvent>> {
        let bytes = self.port.read_available()?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let events: Vec<UiInputEvent> = self
            .parser
            .process_bytes(&bytes)
            .into_iter()
            .filter_map(MidiMessage::to_input_event)
            .collect();
        debug!("MidiDriver: {} byte(s) -> {} input event(s)", bytes.len(), events.len());
        Ok(events)
    }

    fn set(&mut self, col: usize, row: usize, intensity: u8) -> Result<()> {
        let note = map_ui_to_midi(col, row)
            .ok_or_else(|| anyhow!("Light ({}, {}) has no MIDI note", col, row))?;
        self.write_queue.push(MidiMessage::note_on(note, intensity));
        Ok(())
    }

    fn clear(&mut self, at: Option<(usize, usize)>) -> Result<()> {
        match at {
            Some((col, row)) => self.set(col, row, 0),
            None => {
                self.write_queue.extend(
                    (0..CLEAR_ROWS * ROW_STRIDE).map(|note| MidiMessage::note_on(note as u8, 0)),
                );
                Ok(())
            }
        }
    }

    fn commit(&mut self) -> Result<()> {
        if self.write_queue.is_empty() {
            return Ok(());
        }
        let bytes: Vec<u8> = self
            .write_queue
            .drain(..)
            .flat_map(MidiMessage::to_bytes)
            .collect();
        trace!("MidiDriver: writing {} byte(s)", bytes.len());
        self.port.write_all(&bytes).context("MIDI write failed")
    }

    fn close(&mut self) -> Result<()> {
        if !self.write_queue.is_empty() {
            warn!(
                "MidiDriver: closing with {} uncommitted message(s)",
                self.write_queue.len()
            );
            self.write_queue.clear();
        }
        self.port.close()
    }
}

/// A raw MIDI character device (`/dev/snd/midiC*D*`, `/dev/midi*`) opened
/// non-blocking. Input and output may share a node or use separate ones.
#[derive(Debug)]
pub struct RawMidiPort {
    input: Option<File>,
    output: Option<File>,
    write_timeout: Duration,
}

impl RawMidiPort {
    /// Wraps already opened, non-blocking handles.
    pub fn from_files(input: Option<File>, output: Option<File>) -> Self {
        RawMidiPort {
            input,
            output,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Opens one node for both directions.
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_nonblocking(path, true, true)?;
        let output = file
            .try_clone()
            .with_context(|| format!("Failed to duplicate MIDI handle for {}", path.display()))?;
        info!("RawMidiPort: opened {}", path.display());
        Ok(Self::from_files(Some(file), Some(output)))
    }

    /// Opens distinct input and output nodes.
    pub fn open_split(input: &Path, output: &Path) -> Result<Self> {
        let port = Self::from_files(
            Some(open_nonblocking(input, true, false)?),
            Some(open_nonblocking(output, false, true)?),
        );
        info!(
            "RawMidiPort: opened in: {}, out: {}",
            input.display(),
            output.display()
        );
        Ok(port)
    }
}

fn open_nonblocking(path: &Path, read: bool, write: bool) -> Result<File> {
    OpenOptions::new()
        .read(read)
        .write(write)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .with_context(|| format!("Failed to open MIDI device {}", path.display()))
}

impl MidiPort for RawMidiPort {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        let Some(input) = self.input.as_mut() else {
            return Ok(Vec::new());
        };
        let mut collected = Vec::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            match input.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => collected.extend_from_slice(&buffer[..count]),
                Err(e) if e.kind() == IoErrorKind::WouldBlock => break,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => return Err(anyhow::Error::from(e).context("MIDI read error")),
            }
        }
        Ok(collected)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let timeout = self.write_timeout;
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| anyhow!("MIDI output already closed"))?;
        let mut remaining = bytes;
        let mut stalled_since: Option<Instant> = None;
        while !remaining.is_empty() {
            match output.write(remaining) {
                Ok(0) => anyhow::bail!("MIDI device accepted no bytes"),
                Ok(count) => {
                    remaining = &remaining[count..];
                    stalled_since = None;
                }
                // The device buffer is full; it drains at wire speed.
                Err(e) if e.kind() == IoErrorKind::WouldBlock => {
                    let since = *stalled_since.get_or_insert_with(Instant::now);
                    if since.elapsed() >= timeout {
                        anyhow::bail!(
                            "MIDI device stopped draining: {} byte(s) unsent after {:?}",
                            remaining.len(),
                            timeout
                        );
                    }
                    std::thread::sleep(Duration::from_millis(1))
                }
                Err(e) if e.kind() == IoErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        output.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let had_input = self.input.take().is_some();
        let had_output = self.output.take().is_some();
        if had_input || had_output {
            info!("RawMidiPort: closed");
        }
        Ok(())
    }
}

/// A MIDI device node discovered on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub path: PathBuf,
    pub name: String,
}

/// Extracts the ALSA card number from a node name such as `midiC1D0`.
pub fn parse_card_number(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix("midiC")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || !rest[digits.len()..].starts_with('D') {
        return None;
    }
    digits.parse().ok()
}

/// Lists raw MIDI nodes under `/dev/snd`, named after their ALSA card.
pub fn list_devices() -> Result<Vec<MidiDeviceInfo>> {
    list_devices_in(Path::new("/dev/snd"), Path::new("/proc/asound"))
}

pub fn list_devices_in(dev_dir: &Path, asound_dir: &Path) -> Result<Vec<MidiDeviceInfo>> {
    let entries = match std::fs::read_dir(dev_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(anyhow::Error::from(e)
                .context(format!("Failed to read {}", dev_dir.display())))
        }
    };
    let mut devices = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(card) = parse_card_number(&file_name) else {
            continue;
        };
        let id_path = asound_dir.join(format!("card{}", card)).join("id");
        let name = std::fs::read_to_string(&id_path)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| file_name.clone());
        devices.push(MidiDeviceInfo {
            path: entry.path(),
            name,
        });
    }
    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Finds the first device whose name contains `name` (case-insensitive).
pub fn find_device<'a>(devices: &'a [MidiDeviceInfo], name: &str) -> Option<&'a MidiDeviceInfo> {
    let needle = name.to_lowercase();
    devices
        .iter()
        .find(|d| d.name.to_lowercase().contains(&needle))
}
