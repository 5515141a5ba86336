//! Receive-pack: accepting pushes.

use crate::pktline::{Band, PktLine, PktLineReader, PktLineWriter};
use crate::{GitError, Result};
use git2::{Oid, Repository};
use std::io::{Read, Write};

/// What a ref-update command does to its ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Old id is all-zero: the ref is being born.
    Create,
    /// Both ids are set: the ref moves.
    Update,
    /// New id is all-zero: the ref is being removed.
    Delete,
}

/// Outcome of a ref-update command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not yet decided.
    Pending,
    /// Applied to the object store.
    Accepted,
    /// Refused, with a human-readable reason for the report.
    Rejected(String),
}

/// One ref-update command from a push, with its mutable outcome.
///
/// Commands live only for the duration of a single push. The first rejection
/// wins: later stages leave a decided command untouched.
#[derive(Debug, Clone)]
pub struct RefUpdate {
    /// Id the client believes the ref currently has (zero on create).
    pub old_id: Oid,
    /// Id the ref should point at afterwards (zero on delete).
    pub new_id: Oid,
    /// Full ref name, e.g. `refs/heads/main`.
    pub ref_name: String,
    outcome: CommandOutcome,
}

impl RefUpdate {
    /// Creates a pending command.
    pub fn new(old_id: Oid, new_id: Oid, ref_name: impl Into<String>) -> Self {
        Self {
            old_id,
            new_id,
            ref_name: ref_name.into(),
            outcome: CommandOutcome::Pending,
        }
    }

    /// Classifies the command by its zero-id sides.
    pub fn kind(&self) -> UpdateKind {
        if self.old_id.is_zero() {
            UpdateKind::Create
        } else if self.new_id.is_zero() {
            UpdateKind::Delete
        } else {
            UpdateKind::Update
        }
    }

    /// The command's current outcome.
    pub fn outcome(&self) -> &CommandOutcome {
        &self.outcome
    }

    /// Whether no stage has decided this command yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.outcome, CommandOutcome::Pending)
    }

    /// Whether the command was applied.
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, CommandOutcome::Accepted)
    }

    /// Rejects a still-pending command with a reason.
    pub fn reject(&mut self, reason: impl Into<String>) {
        if self.is_pending() {
            self.outcome = CommandOutcome::Rejected(reason.into());
        }
    }

    /// Accepts a still-pending command.
    pub fn accept(&mut self) {
        if self.is_pending() {
            self.outcome = CommandOutcome::Accepted;
        }
    }

    /// The branch name when this command targets `refs/heads/`.
    pub fn branch_name(&self) -> Option<&str> {
        self.ref_name.strip_prefix("refs/heads/")
    }
}

/// Which ref transitions a repository accepts.
#[derive(Debug, Clone)]
pub struct ReceivePolicy {
    /// Allow refs to be created.
    pub allow_creates: bool,
    /// Allow refs to be deleted.
    pub allow_deletes: bool,
    /// Allow updates whose new tip does not descend from the old tip.
    pub allow_non_fast_forward: bool,
}

impl Default for ReceivePolicy {
    fn default() -> Self {
        Self {
            allow_creates: true,
            allow_deletes: false,
            allow_non_fast_forward: false,
        }
    }
}

/// A validation stage run after pack ingestion and before any ref update.
///
/// Implementations decide per command, calling [`RefUpdate::reject`] on the
/// ones they refuse; commands left pending continue to the apply stage.
pub trait PreReceive: Send + Sync {
    /// Inspects the push's commands, rejecting any that should not land.
    fn pre_receive(&self, repo: &Repository, commands: &mut [RefUpdate]);
}

/// Hook that lets every command through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl PreReceive for AcceptAll {
    fn pre_receive(&self, _repo: &Repository, _commands: &mut [RefUpdate]) {}
}

/// Result of one receive-pack exchange.
#[derive(Debug)]
pub struct ReceiveOutcome {
    /// Every command from the push with its final outcome.
    pub commands: Vec<RefUpdate>,
    /// Whether the incoming pack was ingested cleanly.
    pub unpack_ok: bool,
}

impl ReceiveOutcome {
    /// Commands that were applied to the object store.
    pub fn accepted(&self) -> impl Iterator<Item = &RefUpdate> {
        self.commands.iter().filter(|c| c.is_accepted())
    }
}

/// Parses the command section: `old-id new-id ref-name`, the first line
/// carrying the client's capability list after a NUL.
fn parse_commands<R: Read>(
    pkt: &mut PktLineReader<R>,
) -> Result<(Vec<RefUpdate>, Vec<String>)> {
    let mut commands = Vec::new();
    let mut capabilities = Vec::new();

    loop {
        match pkt.read()? {
            Some(PktLine::Data(data)) => {
                let line = String::from_utf8_lossy(&data);
                let line = line.trim_end_matches('\n');
                let (line, caps) = match line.split_once('\0') {
                    Some((cmd, caps)) => (cmd, Some(caps)),
                    None => (line, None),
                };
                if let Some(caps) = caps {
                    if !commands.is_empty() {
                        return Err(GitError::Protocol(
                            "capabilities allowed only on the first command".to_string(),
                        ));
                    }
                    capabilities.extend(caps.split(' ').map(|c| c.to_string()));
                }

                let mut words = line.split(' ');
                let (old, new, name) = match (words.next(), words.next(), words.next()) {
                    (Some(old), Some(new), Some(name)) if words.next().is_none() => {
                        (old, new, name)
                    }
                    _ => {
                        return Err(GitError::Protocol(format!(
                            "malformed ref-update command '{}'",
                            line
                        )))
                    }
                };
                let old_id = Oid::from_str(old)
                    .map_err(|_| GitError::Protocol(format!("malformed object id '{}'", old)))?;
                let new_id = Oid::from_str(new)
                    .map_err(|_| GitError::Protocol(format!("malformed object id '{}'", new)))?;
                commands.push(RefUpdate::new(old_id, new_id, name));
            }
            Some(PktLine::Flush) | None => break,
        }
    }

    Ok((commands, capabilities))
}

/// Streams the packfile that follows the command section into the object
/// database. Absent pack bytes are fine: delete-only pushes send none.
fn ingest_pack<R: Read>(input: &mut R, repo: &Repository) -> Result<bool> {
    let mut first = [0u8; 1];
    let n = input.read(&mut first)?;
    if n == 0 {
        return Ok(false);
    }

    let odb = repo.odb()?;
    let mut writer = odb.packwriter()?;
    writer.write_all(&first[..n])?;
    std::io::copy(input, &mut writer)?;
    writer.commit()?;
    Ok(true)
}

/// Serves one receive-pack request: commands and pack in, report out.
///
/// Stages: parse commands → ingest pack → policy checks → pre-receive hook →
/// apply surviving commands → report-status. Every stage before apply only
/// marks outcomes; nothing touches a ref until validation is complete.
pub fn receive_pack<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    repo: &Repository,
    policy: &ReceivePolicy,
    hook: &dyn PreReceive,
) -> Result<ReceiveOutcome> {
    let mut pkt = PktLineReader::new(input);
    let (mut commands, capabilities) = parse_commands(&mut pkt)?;
    if commands.is_empty() {
        return Ok(ReceiveOutcome {
            commands,
            unpack_ok: true,
        });
    }

    let side_band = capabilities.iter().any(|c| c == "side-band-64k");
    let report_status = capabilities.iter().any(|c| c == "report-status");

    let unpack_error = match ingest_pack(pkt.inner_mut(), repo) {
        Ok(_) => None,
        Err(e) if e.is_disconnect() => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "pack ingestion failed");
            Some(e.to_string())
        }
    };

    if let Some(reason) = &unpack_error {
        for command in &mut commands {
            command.reject(format!("unpacker error: {}", reason));
        }
    } else {
        enforce_policy(repo, policy, &mut commands);
        hook.pre_receive(repo, &mut commands);
        apply_commands(repo, &mut commands);
    }

    if report_status {
        write_report(output, side_band, unpack_error.as_deref(), &commands)?;
    }

    Ok(ReceiveOutcome {
        unpack_ok: unpack_error.is_none(),
        commands,
    })
}

/// Policy stage: object presence, stale old ids, create/delete permission,
/// and the fast-forward requirement.
fn enforce_policy(repo: &Repository, policy: &ReceivePolicy, commands: &mut [RefUpdate]) {
    let odb = match repo.odb() {
        Ok(odb) => odb,
        Err(e) => {
            for command in commands.iter_mut() {
                command.reject(format!("repository unavailable: {}", e));
            }
            return;
        }
    };

    for command in commands.iter_mut() {
        if !command.is_pending() {
            continue;
        }
        match command.kind() {
            UpdateKind::Create => {
                if !policy.allow_creates {
                    command.reject("ref creation is prohibited");
                } else if repo.refname_to_id(&command.ref_name).is_ok() {
                    command.reject("ref already exists");
                } else if !odb.exists(command.new_id) {
                    command.reject("missing necessary objects");
                }
            }
            UpdateKind::Delete => {
                if !policy.allow_deletes {
                    command.reject("ref deletion is prohibited");
                }
            }
            UpdateKind::Update => {
                let current = repo.refname_to_id(&command.ref_name).ok();
                if current != Some(command.old_id) {
                    command.reject("stale old object id");
                } else if !odb.exists(command.new_id) {
                    command.reject("missing necessary objects");
                } else if !policy.allow_non_fast_forward
                    && !is_fast_forward(repo, command.old_id, command.new_id)
                {
                    command.reject("non-fast-forward updates are prohibited");
                }
            }
        }
    }
}

/// Whether new descends from old. Non-commit refs (e.g. tag objects) skip
/// the ancestry rule.
fn is_fast_forward(repo: &Repository, old_id: Oid, new_id: Oid) -> bool {
    if old_id == new_id {
        return true;
    }
    if repo.find_commit(old_id).is_err() || repo.find_commit(new_id).is_err() {
        return true;
    }
    repo.graph_descendant_of(new_id, old_id).unwrap_or(false)
}

/// Apply stage: surviving commands become ref transactions.
fn apply_commands(repo: &Repository, commands: &mut [RefUpdate]) {
    for command in commands.iter_mut() {
        if !command.is_pending() {
            continue;
        }
        let applied = match command.kind() {
            UpdateKind::Delete => repo
                .find_reference(&command.ref_name)
                .and_then(|mut r| r.delete()),
            _ => repo
                .reference(&command.ref_name, command.new_id, true, "push")
                .map(|_| ()),
        };
        match applied {
            Ok(()) => command.accept(),
            Err(e) => command.reject(format!("failed to update ref: {}", e.message())),
        }
    }
}

/// Writes the report-status section, nested on side-band channel 1 when the
/// client negotiated multiplexing.
fn write_report<W: Write>(
    output: &mut W,
    side_band: bool,
    unpack_error: Option<&str>,
    commands: &[RefUpdate],
) -> Result<()> {
    let mut report = Vec::new();
    {
        let mut pkt = PktLineWriter::new(&mut report);
        match unpack_error {
            None => pkt.write_text("unpack ok")?,
            Some(reason) => pkt.write_text(&format!("unpack {}", reason))?,
        }
        for command in commands {
            match command.outcome() {
                CommandOutcome::Accepted => {
                    pkt.write_text(&format!("ok {}", command.ref_name))?
                }
                CommandOutcome::Rejected(reason) => {
                    pkt.write_text(&format!("ng {} {}", command.ref_name, reason))?
                }
                CommandOutcome::Pending => {
                    pkt.write_text(&format!("ng {} not attempted", command.ref_name))?
                }
            }
        }
        pkt.flush_pkt()?;
    }

    let mut pkt = PktLineWriter::new(output);
    if side_band {
        pkt.write_band(Band::Pack, &report)?;
        pkt.flush_pkt()?;
    } else {
        pkt.inner_mut().write_all(&report)?;
    }
    pkt.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bare_repo, commit_file, pack_between, DisconnectingWriter};
    use std::io::Cursor;

    struct RejectEverything;

    impl PreReceive for RejectEverything {
        fn pre_receive(&self, _repo: &Repository, commands: &mut [RefUpdate]) {
            for command in commands.iter_mut() {
                command.reject("blocked by review");
            }
        }
    }

    fn push_body(commands: &[(Oid, Oid, &str)], caps: &str, pack: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        {
            let mut pkt = PktLineWriter::new(&mut body);
            for (i, (old, new, name)) in commands.iter().enumerate() {
                let line = if i == 0 {
                    format!("{} {} {}\0{}", old, new, name, caps)
                } else {
                    format!("{} {} {}", old, new, name)
                };
                pkt.write_text(&line).unwrap();
            }
            pkt.flush_pkt().unwrap();
        }
        body.extend_from_slice(pack);
        body
    }

    fn run(
        repo: &Repository,
        body: Vec<u8>,
        policy: &ReceivePolicy,
        hook: &dyn PreReceive,
    ) -> (ReceiveOutcome, String) {
        let mut input = Cursor::new(body);
        let mut output = Vec::new();
        let outcome = receive_pack(&mut input, &mut output, repo, policy, hook).unwrap();
        (outcome, String::from_utf8_lossy(&output).to_string())
    }

    #[test]
    fn test_push_creates_branch() {
        let (_src_tmp, src) = bare_repo();
        let tip = commit_file(&src, Some("refs/heads/main"), "a.txt", "hi", "init", &[]);
        let pack = pack_between(&src, tip, None);

        let (_tmp, target) = bare_repo();
        let body = push_body(
            &[(Oid::zero(), tip, "refs/heads/main")],
            "report-status",
            &pack,
        );
        let (outcome, report) = run(&target, body, &ReceivePolicy::default(), &AcceptAll);

        assert!(outcome.unpack_ok);
        assert_eq!(outcome.accepted().count(), 1);
        assert_eq!(target.refname_to_id("refs/heads/main").unwrap(), tip);
        assert!(report.contains("unpack ok"));
        assert!(report.contains("ok refs/heads/main"));
    }

    #[test]
    fn test_hook_rejection_blocks_ref_update() {
        let (_src_tmp, src) = bare_repo();
        let tip = commit_file(&src, Some("refs/heads/main"), "a.txt", "hi", "init", &[]);
        let pack = pack_between(&src, tip, None);

        let (_tmp, target) = bare_repo();
        let body = push_body(
            &[(Oid::zero(), tip, "refs/heads/main")],
            "report-status",
            &pack,
        );
        let (outcome, report) = run(&target, body, &ReceivePolicy::default(), &RejectEverything);

        assert_eq!(outcome.accepted().count(), 0);
        assert!(target.refname_to_id("refs/heads/main").is_err());
        assert!(report.contains("ng refs/heads/main blocked by review"));
    }

    #[test]
    fn test_fast_forward_update_is_accepted() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);
        let c2 = commit_file(&repo, None, "a.txt", "two", "second", &[c1]);
        let pack = pack_between(&repo, c2, Some(c1));

        let body = push_body(&[(c1, c2, "refs/heads/main")], "report-status", &pack);
        let (outcome, report) = run(&repo, body, &ReceivePolicy::default(), &AcceptAll);

        assert_eq!(outcome.accepted().count(), 1);
        assert_eq!(repo.refname_to_id("refs/heads/main").unwrap(), c2);
        assert!(report.contains("ok refs/heads/main"));
    }

    #[test]
    fn test_non_fast_forward_is_refused() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);
        let c2 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "two", "second", &[c1]);
        // A sibling of c2, not a descendant.
        let c3 = commit_file(&repo, None, "a.txt", "three", "fork", &[c1]);
        let pack = pack_between(&repo, c3, Some(c1));

        let body = push_body(&[(c2, c3, "refs/heads/main")], "report-status", &pack);
        let (outcome, report) = run(&repo, body, &ReceivePolicy::default(), &AcceptAll);

        assert_eq!(outcome.accepted().count(), 0);
        assert_eq!(repo.refname_to_id("refs/heads/main").unwrap(), c2);
        assert!(report.contains("non-fast-forward"));
    }

    #[test]
    fn test_stale_old_id_is_refused() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);
        let c2 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "two", "second", &[c1]);
        let c3 = commit_file(&repo, None, "a.txt", "three", "third", &[c1]);
        let pack = pack_between(&repo, c3, Some(c1));

        // Claims the remote is still at c1, but it moved to c2.
        let body = push_body(&[(c1, c3, "refs/heads/main")], "report-status", &pack);
        let (_, report) = run(&repo, body, &ReceivePolicy::default(), &AcceptAll);

        assert!(report.contains("ng refs/heads/main stale old object id"));
        assert_eq!(repo.refname_to_id("refs/heads/main").unwrap(), c2);
    }

    #[test]
    fn test_delete_is_refused_by_policy() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);

        let body = push_body(&[(c1, Oid::zero(), "refs/heads/main")], "report-status", &[]);
        let (outcome, report) = run(&repo, body, &ReceivePolicy::default(), &AcceptAll);

        assert_eq!(outcome.accepted().count(), 0);
        assert!(report.contains("ng refs/heads/main ref deletion is prohibited"));
        assert!(repo.refname_to_id("refs/heads/main").is_ok());
    }

    #[test]
    fn test_delete_applies_when_policy_allows() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);
        commit_file(&repo, Some("refs/heads/dev"), "b.txt", "two", "branch", &[c1]);

        let policy = ReceivePolicy {
            allow_deletes: true,
            ..ReceivePolicy::default()
        };
        let dev = repo.refname_to_id("refs/heads/dev").unwrap();
        let body = push_body(&[(dev, Oid::zero(), "refs/heads/dev")], "report-status", &[]);
        let (outcome, report) = run(&repo, body, &policy, &AcceptAll);

        assert_eq!(outcome.accepted().count(), 1);
        assert!(report.contains("ok refs/heads/dev"));
        assert!(repo.refname_to_id("refs/heads/dev").is_err());
    }

    #[test]
    fn test_report_rides_side_band_when_negotiated() {
        let (_src_tmp, src) = bare_repo();
        let tip = commit_file(&src, Some("refs/heads/main"), "a.txt", "hi", "init", &[]);
        let pack = pack_between(&src, tip, None);

        let (_tmp, target) = bare_repo();
        let body = push_body(
            &[(Oid::zero(), tip, "refs/heads/main")],
            "report-status side-band-64k",
            &pack,
        );

        let mut input = Cursor::new(body);
        let mut output = Vec::new();
        receive_pack(
            &mut input,
            &mut output,
            &target,
            &ReceivePolicy::default(),
            &AcceptAll,
        )
        .unwrap();

        let mut reader = PktLineReader::new(Cursor::new(output));
        let first = reader.read().unwrap().unwrap();
        let data = first.data().unwrap();
        assert_eq!(data[0], 1);
        assert!(String::from_utf8_lossy(&data[1..]).contains("unpack ok"));
    }

    /// Hook that opens a second handle on the repository mid-push and
    /// advertises its refs, the way a concurrent info/refs request would.
    struct AdvertiseDuringPush {
        captured: std::sync::Mutex<Vec<u8>>,
    }

    impl PreReceive for AdvertiseDuringPush {
        fn pre_receive(&self, repo: &Repository, _commands: &mut [RefUpdate]) {
            let reader = Repository::open_bare(repo.path()).unwrap();
            let mut out = Vec::new();
            crate::advertise_refs(&mut out, &reader, crate::GitService::UploadPack).unwrap();
            *self.captured.lock().unwrap() = out;
        }
    }

    #[test]
    fn test_advertisement_during_push_shows_pre_push_refs() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);
        let c2 = commit_file(&repo, None, "a.txt", "two", "second", &[c1]);
        let pack = pack_between(&repo, c2, Some(c1));

        let hook = AdvertiseDuringPush {
            captured: std::sync::Mutex::new(Vec::new()),
        };
        let body = push_body(&[(c1, c2, "refs/heads/main")], "report-status", &pack);
        let (outcome, _) = run(&repo, body, &ReceivePolicy::default(), &hook);
        assert_eq!(outcome.accepted().count(), 1);

        // The mid-push advertisement is well formed and shows the tip the
        // push has not yet moved.
        let captured = hook.captured.lock().unwrap().clone();
        let mut reader = PktLineReader::new(Cursor::new(captured));
        let header = reader.read().unwrap().unwrap();
        assert_eq!(header.as_text(), Some("# service=git-upload-pack"));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));

        let refs = reader.read_until_flush().unwrap();
        let first = refs[0].as_text().unwrap();
        assert!(first.starts_with(&format!("{} HEAD\0", c1)), "got {first}");
        assert!(refs
            .iter()
            .filter_map(|p| p.as_text())
            .any(|l| l == format!("{} refs/heads/main", c1)));
        assert_eq!(reader.read().unwrap(), None);

        // Once the push lands, a fresh advertisement shows the new tip.
        assert_eq!(repo.refname_to_id("refs/heads/main").unwrap(), c2);
        let mut after = Vec::new();
        crate::advertise_refs(&mut after, &repo, crate::GitService::UploadPack).unwrap();
        assert!(String::from_utf8_lossy(&after).contains(&format!("{} refs/heads/main", c2)));
    }

    #[test]
    fn test_client_hangup_before_report_is_a_disconnect() {
        let (_src_tmp, src) = bare_repo();
        let tip = commit_file(&src, Some("refs/heads/main"), "a.txt", "hi", "init", &[]);
        let pack = pack_between(&src, tip, None);

        let (_tmp, target) = bare_repo();
        let body = push_body(
            &[(Oid::zero(), tip, "refs/heads/main")],
            "report-status",
            &pack,
        );

        let mut input = Cursor::new(body);
        let mut output = DisconnectingWriter::new(0);
        let err = receive_pack(
            &mut input,
            &mut output,
            &target,
            &ReceivePolicy::default(),
            &AcceptAll,
        )
        .unwrap_err();

        assert!(err.is_disconnect(), "got {err}");
        // The commands were applied before the report write failed.
        assert_eq!(target.refname_to_id("refs/heads/main").unwrap(), tip);
    }

    #[test]
    fn test_push_without_commands_is_a_no_op() {
        let (_tmp, repo) = bare_repo();
        let mut input = Cursor::new(b"0000".to_vec());
        let mut output = Vec::new();
        let outcome = receive_pack(
            &mut input,
            &mut output,
            &repo,
            &ReceivePolicy::default(),
            &AcceptAll,
        )
        .unwrap();

        assert!(outcome.commands.is_empty());
        assert!(output.is_empty());
    }

    #[test]
    fn test_malformed_command_is_a_protocol_error() {
        let (_tmp, repo) = bare_repo();
        let mut body = Vec::new();
        {
            let mut pkt = PktLineWriter::new(&mut body);
            pkt.write_text("this is not a command").unwrap();
            pkt.flush_pkt().unwrap();
        }

        let mut input = Cursor::new(body);
        let mut output = Vec::new();
        let err = receive_pack(
            &mut input,
            &mut output,
            &repo,
            &ReceivePolicy::default(),
            &AcceptAll,
        )
        .unwrap_err();
        assert!(matches!(err, GitError::Protocol(_)));
        assert!(output.is_empty());
    }

    #[test]
    fn test_corrupt_pack_rejects_every_command() {
        let (_tmp, repo) = bare_repo();
        let fake_tip = Oid::from_str(&"d".repeat(40)).unwrap();
        let body = push_body(
            &[(Oid::zero(), fake_tip, "refs/heads/main")],
            "report-status",
            b"garbage that is no packfile",
        );
        let (outcome, report) = run(&repo, body, &ReceivePolicy::default(), &AcceptAll);

        assert!(!outcome.unpack_ok);
        assert_eq!(outcome.accepted().count(), 0);
        assert!(report.contains("unpack "));
        assert!(report.contains("ng refs/heads/main unpacker error"));
        assert!(repo.refname_to_id("refs/heads/main").is_err());
    }

    #[test]
    fn test_multi_command_outcomes_are_independent() {
        let (_tmp, repo) = bare_repo();
        let c1 = commit_file(&repo, Some("refs/heads/main"), "a.txt", "one", "first", &[]);
        let c2 = commit_file(&repo, None, "b.txt", "two", "feature", &[c1]);
        let pack = pack_between(&repo, c2, Some(c1));

        let main = repo.refname_to_id("refs/heads/main").unwrap();
        let body = push_body(
            &[
                (Oid::zero(), c2, "refs/heads/feature"),
                (main, Oid::zero(), "refs/heads/main"),
            ],
            "report-status",
            &pack,
        );
        let (outcome, report) = run(&repo, body, &ReceivePolicy::default(), &AcceptAll);

        assert_eq!(outcome.accepted().count(), 1);
        assert!(report.contains("ok refs/heads/feature"));
        assert!(report.contains("ng refs/heads/main ref deletion is prohibited"));
        assert_eq!(repo.refname_to_id("refs/heads/feature").unwrap(), c2);
    }
}
