use std::collections::HashSet;
use std::fmt;

use crate::Result;
use crate::image::{Object, ObjectKey};

/// Stage of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// Prerequisites are checked.
	Init,
	/// Candidates are collected from the hard-to-falsify structure.
	TraverseStructural,
	/// The self-reported listing is collected.
	TraverseIndependent,
	/// Candidates are matched against the listing.
	Reconcile,
	/// Findings are summarised.
	Report,
	/// Run finished.
	Done,
}

impl Phase {
	/// Following phase; `Done` is terminal.
	pub fn next(self) -> Self {
		match self {
			Self::Init => Self::TraverseStructural,
			Self::TraverseStructural => Self::TraverseIndependent,
			Self::TraverseIndependent => Self::Reconcile,
			Self::Reconcile => Self::Report,
			Self::Report | Self::Done => Self::Done,
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// Object found by one traversal, with what the traversal observed about it.
#[derive(Debug, Clone)]
pub struct CandidateRecord<'a> {
	/// Recovered object; its identity is what reconciliation compares.
	pub object: Object<'a>,
	/// Traversal that found the object.
	pub path: &'static str,
	/// Reference count observed while traversing, when the traversal reads one.
	pub refcount: Option<i64>,
	/// Self-reported name, for display only.
	pub name: String,
}

/// One structural candidate with its membership in the independent listing.
#[derive(Debug, Clone)]
pub struct Reconciled<'a> {
	/// The structural candidate.
	pub candidate: CandidateRecord<'a>,
	/// Whether the independent listing contains the same object.
	pub known: bool,
}

/// Two independently sourced views over the same image.
///
/// Implementors supply the traversals; [`reconcile`] drives the phases.
pub trait CrossView<'a> {
	/// Name used in log lines.
	fn name(&self) -> &str;

	/// Whether the structures both traversals need are present.
	fn is_active(&self) -> bool;

	/// Candidates from the structure an attacker cannot easily unlink from.
	fn traverse_structural(&self) -> Result<Vec<CandidateRecord<'a>>>;

	/// Objects from the subsystem's own bookkeeping.
	fn traverse_independent(&self) -> Result<Vec<Object<'a>>>;
}

/// Run both traversals and mark each structural candidate known or hidden.
///
/// Returns `Ok(None)` when the view is inactive. Membership is by object
/// identity, so a hidden object sharing a listed object's name still shows up.
pub fn reconcile<'a>(view: &impl CrossView<'a>) -> Result<Option<Vec<Reconciled<'a>>>> {
	let name = view.name();
	let mut phase = Phase::Init;
	if !view.is_active() {
		log::debug!("{name}: inactive, prerequisites missing");
		return Ok(None);
	}

	phase = advance(name, phase);
	let structural = view.traverse_structural()?;
	log::debug!("{name}: {} structural candidates", structural.len());

	phase = advance(name, phase);
	let independent: HashSet<ObjectKey> = view.traverse_independent()?.iter().map(Object::identity).collect();
	log::debug!("{name}: {} independently listed objects", independent.len());

	phase = advance(name, phase);
	let results: Vec<Reconciled<'a>> = structural
		.into_iter()
		.map(|candidate| {
			let known = independent.contains(&candidate.object.identity());
			Reconciled { candidate, known }
		})
		.collect();

	phase = advance(name, phase);
	let hidden = results.iter().filter(|result| !result.known).count();
	if hidden > 0 {
		log::info!("{name}: {hidden} of {} candidates missing from the independent listing", results.len());
	}

	advance(name, phase);
	Ok(Some(results))
}

fn advance(name: &str, phase: Phase) -> Phase {
	let next = phase.next();
	log::debug!("{name}: {phase} -> {next}");
	next
}

#[cfg(test)]
mod tests {
	use super::{CandidateRecord, CrossView, Phase, reconcile};
	use crate::Result;
	use crate::image::{Endianness, Memory, Object, Profile, Segment, SegmentSpace, StructLayout, TypeSpec};

	struct FixedView<'a> {
		mem: Memory<'a>,
		active: bool,
		structural: Vec<u64>,
		listed: Vec<u64>,
	}

	impl<'a> CrossView<'a> for FixedView<'a> {
		fn name(&self) -> &str {
			"fixed"
		}

		fn is_active(&self) -> bool {
			self.active
		}

		fn traverse_structural(&self) -> Result<Vec<CandidateRecord<'a>>> {
			self.structural
				.iter()
				.map(|addr| {
					Ok(CandidateRecord {
						object: self.mem.struct_at("node", *addr)?,
						path: "structural",
						refcount: None,
						name: "same".to_owned(),
					})
				})
				.collect()
		}

		fn traverse_independent(&self) -> Result<Vec<Object<'a>>> {
			self.listed.iter().map(|addr| self.mem.struct_at("node", *addr)).collect()
		}
	}

	fn profile() -> Profile {
		Profile::new(8, Endianness::Little)
			.with_struct("node", StructLayout::new(8).member("value", 0, TypeSpec::Int { size: 8, signed: false }))
			.with_struct("other", StructLayout::new(8))
	}

	#[test]
	fn phases_advance_to_done() {
		let mut phase = Phase::Init;
		let mut seen = vec![phase];
		while phase != Phase::Done {
			phase = phase.next();
			seen.push(phase);
		}
		assert_eq!(seen.len(), 6);
		assert_eq!(Phase::Done.next(), Phase::Done);
	}

	#[test]
	fn membership_is_by_identity_not_name() {
		let profile = profile();
		let space = SegmentSpace::from_segments(vec![Segment::new(0x100, vec![0; 0x40])]).expect("maps");
		let view = FixedView {
			mem: Memory::new(&profile, &space),
			active: true,
			structural: vec![0x100, 0x108, 0x110],
			listed: vec![0x108],
		};

		let results = reconcile(&view).expect("runs").expect("active");
		let known: Vec<(u64, bool)> = results.iter().map(|row| (row.candidate.object.offset(), row.known)).collect();
		assert_eq!(known, vec![(0x100, false), (0x108, true), (0x110, false)]);
	}

	#[test]
	fn same_address_with_other_type_is_not_a_match() {
		let profile = profile();
		let space = SegmentSpace::from_segments(vec![Segment::new(0x100, vec![0; 0x40])]).expect("maps");
		let mem = Memory::new(&profile, &space);
		let node = mem.struct_at("node", 0x100).expect("node");
		let other = mem.struct_at("other", 0x100).expect("other");
		assert_ne!(node.identity(), other.identity());
	}

	#[test]
	fn inactive_view_is_not_an_error() {
		let profile = profile();
		let space = SegmentSpace::from_segments(vec![Segment::new(0x100, vec![0; 8])]).expect("maps");
		let view = FixedView {
			mem: Memory::new(&profile, &space),
			active: false,
			structural: vec![0x100],
			listed: Vec::new(),
		};
		assert!(reconcile(&view).expect("inactive is ok").is_none());
	}
}
