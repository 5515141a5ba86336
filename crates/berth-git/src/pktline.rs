//! Git pkt-line framing.
//!
//! Every protocol line is prefixed with a 4-digit hex length covering the
//! prefix itself, or "0000" for a flush packet. Side-band multiplexing nests
//! a one-byte channel marker inside data packets.

use crate::{GitError, Result};
use std::io::{Read, Write};

/// Largest payload a single data packet may carry (65520 on the wire, minus
/// the 4-byte length prefix).
pub const MAX_PKT_PAYLOAD: usize = 65516;

/// Largest payload per side-band data packet (one byte goes to the channel
/// marker).
pub const MAX_BAND_PAYLOAD: usize = MAX_PKT_PAYLOAD - 1;

/// A decoded pkt-line frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data frame with payload.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
}

impl PktLine {
    /// Creates a data frame from a string slice.
    pub fn text(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns the payload, or None for a flush packet.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            Self::Flush => None,
        }
    }

    /// Returns the payload as text with any trailing newline trimmed.
    pub fn as_text(&self) -> Option<&str> {
        self.data()
            .and_then(|d| std::str::from_utf8(d).ok())
            .map(|s| s.trim_end_matches('\n'))
    }

    /// Encodes the frame to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Data(data) => {
                if data.len() > MAX_PKT_PAYLOAD {
                    return Err(GitError::InvalidPktLine(format!(
                        "payload of {} bytes exceeds the pkt-line maximum",
                        data.len()
                    )));
                }
                let mut frame = format!("{:04x}", data.len() + 4).into_bytes();
                frame.extend_from_slice(data);
                Ok(frame)
            }
            Self::Flush => Ok(b"0000".to_vec()),
        }
    }
}

/// Side-band channels, negotiated via the `side-band-64k` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// Primary payload: pack data, or the report-status for a push.
    Pack = 1,
    /// Human-readable progress.
    Progress = 2,
    /// Fatal error text.
    Fatal = 3,
}

/// Reader for pkt-line framed streams.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next frame; `None` on a clean end of stream.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut prefix = [0u8; 4];
        match self.reader.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let prefix = std::str::from_utf8(&prefix)
            .map_err(|_| GitError::InvalidPktLine("non-ascii length prefix".to_string()))?;
        let len = usize::from_str_radix(prefix, 16)
            .map_err(|_| GitError::InvalidPktLine(format!("bad length prefix '{}'", prefix)))?;

        match len {
            0 => Ok(Some(PktLine::Flush)),
            1..=3 => Err(GitError::InvalidPktLine(format!("length {} too small", len))),
            _ if len > MAX_PKT_PAYLOAD + 4 => Err(GitError::InvalidPktLine(format!(
                "length {} exceeds the pkt-line maximum",
                len
            ))),
            _ => {
                let mut data = vec![0u8; len - 4];
                self.reader.read_exact(&mut data)?;
                Ok(Some(PktLine::Data(data)))
            }
        }
    }

    /// Reads frames until a flush packet or end of stream.
    pub fn read_until_flush(&mut self) -> Result<Vec<PktLine>> {
        let mut frames = Vec::new();
        loop {
            match self.read()? {
                Some(PktLine::Flush) | None => break,
                Some(frame) => frames.push(frame),
            }
        }
        Ok(frames)
    }

    /// Returns a mutable reference to the inner reader. Used to hand the raw
    /// byte stream (e.g. a packfile that follows the framed section) to the
    /// plumbing.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the reader and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writer for pkt-line framed streams.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one frame.
    pub fn write(&mut self, frame: &PktLine) -> Result<()> {
        self.writer.write_all(&frame.encode()?)?;
        Ok(())
    }

    /// Writes a data frame.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write(&PktLine::Data(data.to_vec()))
    }

    /// Writes a text line, appending the protocol's trailing newline when
    /// missing.
    pub fn write_text(&mut self, s: &str) -> Result<()> {
        let mut data = s.as_bytes().to_vec();
        if !s.ends_with('\n') {
            data.push(b'\n');
        }
        self.write(&PktLine::Data(data))
    }

    /// Writes a payload onto a side-band channel, splitting it into maximum
    /// sized data frames.
    pub fn write_band(&mut self, band: Band, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }
        for chunk in payload.chunks(MAX_BAND_PAYLOAD) {
            let mut data = Vec::with_capacity(chunk.len() + 1);
            data.push(band as u8);
            data.extend_from_slice(chunk);
            self.write(&PktLine::Data(data))?;
        }
        Ok(())
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns a mutable reference to the inner writer. Used to emit raw
    /// (unframed) pack bytes when the client did not negotiate side-band.
    pub fn inner_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the writer and returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_text_and_flush() {
        assert_eq!(PktLine::text("hello\n").encode().unwrap(), b"000ahello\n");
        assert_eq!(PktLine::Flush.encode().unwrap(), b"0000");
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let frame = PktLine::Data(vec![0u8; MAX_PKT_PAYLOAD + 1]);
        assert!(matches!(frame.encode(), Err(GitError::InvalidPktLine(_))));
    }

    #[test]
    fn test_round_trip() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_text("first").unwrap();
            writer.write_data(b"raw\x00bytes").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        assert_eq!(reader.read().unwrap(), Some(PktLine::text("first\n")));
        assert_eq!(
            reader.read().unwrap(),
            Some(PktLine::Data(b"raw\x00bytes".to_vec()))
        );
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_as_text_trims_newline() {
        assert_eq!(PktLine::text("want abc\n").as_text(), Some("want abc"));
        assert_eq!(PktLine::text("done").as_text(), Some("done"));
        assert!(PktLine::Data(vec![0xff, 0xfe]).as_text().is_none());
        assert!(PktLine::Flush.as_text().is_none());
    }

    #[test]
    fn test_write_text_does_not_double_newline() {
        let mut buf = Vec::new();
        PktLineWriter::new(&mut buf).write_text("line\n").unwrap();
        assert!(buf.ends_with(b"line\n"));
        assert!(!buf.ends_with(b"line\n\n"));
    }

    #[test]
    fn test_read_until_flush_stops_at_flush() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_text("a").unwrap();
            writer.write_text("b").unwrap();
            writer.flush_pkt().unwrap();
            writer.write_text("after").unwrap();
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        let frames = reader.read_until_flush().unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_read_rejects_undersized_length() {
        let mut reader = PktLineReader::new(Cursor::new(b"0003".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(GitError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_read_rejects_oversized_length() {
        let mut reader = PktLineReader::new(Cursor::new(b"ffff".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(GitError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_read_rejects_garbage_prefix() {
        let mut reader = PktLineReader::new(Cursor::new(b"zzzzrest".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(GitError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_band_payload_is_split_and_tagged() {
        let payload = vec![7u8; MAX_BAND_PAYLOAD + 10];
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_band(Band::Pack, &payload).unwrap();
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        let first = reader.read().unwrap().unwrap();
        let second = reader.read().unwrap().unwrap();
        assert_eq!(first.data().unwrap()[0], 1);
        assert_eq!(first.data().unwrap().len(), MAX_BAND_PAYLOAD + 1);
        assert_eq!(second.data().unwrap(), &[1, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7][..]);
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_empty_band_payload_writes_nothing() {
        let mut buf = Vec::new();
        PktLineWriter::new(&mut buf)
            .write_band(Band::Progress, b"")
            .unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_data_frame() {
        let encoded = PktLine::Data(Vec::new()).encode().unwrap();
        assert_eq!(encoded, b"0004");

        let mut reader = PktLineReader::new(Cursor::new(encoded));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Data(Vec::new())));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_round_trip_any_payload(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
                let mut buf = Vec::new();
                PktLineWriter::new(&mut buf).write_data(&payload).unwrap();

                let mut reader = PktLineReader::new(Cursor::new(buf));
                let frame = reader.read().unwrap().unwrap();
                prop_assert_eq!(frame.data().unwrap(), &payload[..]);
                prop_assert_eq!(reader.read().unwrap(), None);
            }

            #[test]
            fn prop_band_round_trip(payload in proptest::collection::vec(any::<u8>(), 1..200_000)) {
                let mut buf = Vec::new();
                PktLineWriter::new(&mut buf).write_band(Band::Pack, &payload).unwrap();

                let mut reader = PktLineReader::new(Cursor::new(buf));
                let mut reassembled = Vec::new();
                while let Some(frame) = reader.read().unwrap() {
                    let data = frame.data().unwrap();
                    prop_assert_eq!(data[0], 1);
                    prop_assert!(data.len() <= MAX_BAND_PAYLOAD + 1);
                    reassembled.extend_from_slice(&data[1..]);
                }
                prop_assert_eq!(reassembled, payload);
            }
        }
    }
}
