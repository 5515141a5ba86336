//! Ref advertisement for the info/refs endpoint.

use crate::pktline::PktLineWriter;
use crate::service::GitService;
use crate::Result;
use git2::{Oid, Repository};
use std::io::Write;

const ZERO_ID: &str = "0000000000000000000000000000000000000000";

/// Writes the smart HTTP advertisement for `service`: the `# service=` text
/// packet, a flush, then one line per ref with the capability list appended
/// after a NUL on the first line. An empty repository advertises a zero-id
/// `capabilities^{}` line so clients still learn the capabilities.
pub fn advertise_refs<W: Write>(
    out: &mut W,
    repo: &Repository,
    service: GitService,
) -> Result<()> {
    let mut pkt = PktLineWriter::new(out);
    pkt.write_text(&format!("# service={}", service.name()))?;
    pkt.flush_pkt()?;

    let mut refs: Vec<(String, Oid)> = Vec::new();
    for reference in repo.references()? {
        let reference = reference?;
        if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
            refs.push((name.to_string(), target));
        }
    }
    refs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut caps = service.capabilities();
    if service == GitService::UploadPack {
        if let Ok(head) = repo.find_reference("HEAD") {
            if let Some(target) = head.symbolic_target() {
                caps.push_str(" symref=HEAD:");
                caps.push_str(target);
            }
        }
    }

    match repo.head().ok().and_then(|h| h.target()) {
        Some(head_id) => {
            pkt.write_text(&format!("{} HEAD\0{}", head_id, caps))?;
            for (name, id) in &refs {
                pkt.write_text(&format!("{} {}", id, name))?;
            }
        }
        None if !refs.is_empty() => {
            let (first_name, first_id) = &refs[0];
            pkt.write_text(&format!("{} {}\0{}", first_id, first_name, caps))?;
            for (name, id) in refs.iter().skip(1) {
                pkt.write_text(&format!("{} {}", id, name))?;
            }
        }
        None => {
            pkt.write_text(&format!("{} capabilities^{{}}\0{}", ZERO_ID, caps))?;
        }
    }

    pkt.flush_pkt()?;
    pkt.flush()?;
    Ok(())
}
