//! Upload-pack: serving fetch and clone.

use crate::pktline::{Band, PktLine, PktLineReader, PktLineWriter};
use crate::{GitError, Result};
use git2::{Oid, Repository};
use std::io::{Read, Write};

/// A parsed fetch negotiation request.
#[derive(Debug, Default)]
pub struct FetchRequest {
    /// Object ids the client wants.
    pub wants: Vec<Oid>,
    /// Object ids the client already has.
    pub haves: Vec<Oid>,
    /// Whether the client ended negotiation.
    pub done: bool,
    /// Capabilities requested on the first want line.
    pub capabilities: Vec<String>,
}

impl FetchRequest {
    /// Parses want/have/done lines from a request body. Unrecognized lines
    /// are skipped; negotiation state carries across flush packets because
    /// each stateless round resends the full set.
    pub fn parse<R: Read>(input: &mut R) -> Result<Self> {
        let mut pkt = PktLineReader::new(input);
        let mut request = Self::default();

        loop {
            match pkt.read()? {
                Some(PktLine::Data(data)) => {
                    let line = String::from_utf8_lossy(&data);
                    let line = line.trim_end();
                    let mut words = line.split(' ');
                    match words.next() {
                        Some("want") => {
                            let id = words.next().ok_or_else(|| {
                                GitError::Protocol("want line without object id".to_string())
                            })?;
                            request.wants.push(parse_oid(id)?);
                            if request.wants.len() == 1 {
                                request
                                    .capabilities
                                    .extend(words.map(|w| w.to_string()));
                            }
                        }
                        Some("have") => {
                            let id = words.next().ok_or_else(|| {
                                GitError::Protocol("have line without object id".to_string())
                            })?;
                            request.haves.push(parse_oid(id)?);
                        }
                        Some("done") => {
                            request.done = true;
                            return Ok(request);
                        }
                        _ => {}
                    }
                }
                Some(PktLine::Flush) => continue,
                None => return Ok(request),
            }
        }
    }

    /// Whether the client negotiated side-band-64k.
    pub fn side_band(&self) -> bool {
        self.capabilities.iter().any(|c| c == "side-band-64k")
    }
}

fn parse_oid(hex: &str) -> Result<Oid> {
    Oid::from_str(hex).map_err(|_| GitError::Protocol(format!("malformed object id '{}'", hex)))
}

/// Serves one upload-pack request: negotiation in, packfile out.
///
/// The pack is produced chunk by chunk and written straight to `output`,
/// framed on side-band channel 1 when negotiated and raw otherwise. Nothing
/// is ever written to the progress band, so the binary stream cannot be
/// corrupted by status chatter.
pub fn upload_pack<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    repo: &Repository,
) -> Result<()> {
    let request = FetchRequest::parse(input)?;
    let mut pkt = PktLineWriter::new(output);

    if request.wants.is_empty() {
        pkt.write_text("NAK")?;
        pkt.flush()?;
        return Ok(());
    }

    let odb = repo.odb()?;
    for want in &request.wants {
        if !odb.exists(*want) {
            pkt.write_text(&format!("ERR upload-pack: not our ref {}", want))?;
            pkt.flush()?;
            tracing::debug!(want = %want, "fetch requested an unknown object");
            return Ok(());
        }
    }

    // Without multi_ack a single NAK answers every negotiation round; the
    // client keeps state across stateless retries and eventually sends done.
    pkt.write_text("NAK")?;
    if !request.done {
        pkt.flush()?;
        return Ok(());
    }

    let mut walk = repo.revwalk()?;
    for want in &request.wants {
        walk.push(*want)?;
    }
    for have in &request.haves {
        if odb.exists(*have) {
            let _ = walk.hide(*have);
        }
    }

    let mut builder = repo.packbuilder()?;
    builder.insert_walk(&mut walk)?;

    let mut sink_err: Option<GitError> = None;
    let side_band = request.side_band();
    let result = builder.foreach(|chunk| {
        let written = if side_band {
            pkt.write_band(Band::Pack, chunk)
        } else {
            pkt.inner_mut().write_all(chunk).map_err(GitError::from)
        };
        match written {
            Ok(()) => true,
            Err(e) => {
                sink_err = Some(e);
                false
            }
        }
    });
    if let Some(e) = sink_err {
        return Err(e);
    }
    result?;

    if side_band {
        pkt.flush_pkt()?;
    }
    pkt.flush()?;
    Ok(())
}
