use std::collections::HashSet;

use crate::Result;
use crate::image::{Memory, Object, Value};

/// Stop reason for a `list_head` walk that did not return to its head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStopReason {
	/// A `next` pointer was NULL.
	NullNext,
	/// A `next` pointer pointed at unmapped memory.
	Unreadable(u64),
	/// A node was reached twice without passing the head.
	Cycle(u64),
	/// `max_steps` nodes were visited.
	StepLimit,
}

/// Stop metadata with traversal step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStop {
	/// Item index where the walk stopped.
	pub step: usize,
	/// Structured stop reason.
	pub reason: WalkStopReason,
}

/// Linked-list traversal options.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
	/// Maximum number of entries to visit.
	pub max_steps: usize,
}

impl Default for WalkOptions {
	fn default() -> Self {
		Self { max_steps: 4096 }
	}
}

/// Result of walking a circular `list_head`.
#[derive(Debug, Clone)]
pub struct ListWalk<'a> {
	/// Containing entries in list order.
	pub items: Vec<Object<'a>>,
	/// Set when the walk ended before returning to the head.
	pub stop: Option<WalkStop>,
}

/// Iterate the circular `list_head` at `head` as entries of struct `ty`
/// linked through its `link` member (a dotted path such as `mkobj.kobj.entry`).
///
/// The head itself is never yielded. Fails only when the profile lacks
/// `list_head`, `ty` or `link`; damaged links end the walk with a stop reason.
pub fn list_of_type<'a>(head: &Object<'a>, ty: &str, link: &str, options: &WalkOptions) -> Result<ListWalk<'a>> {
	let mem = head.memory();
	let (link_offset, _) = mem.profile.member_path(ty, link)?;
	mem.profile.struct_layout("list_head")?;

	let head_addr = head.offset();
	let mut items = Vec::new();
	let mut visited = HashSet::new();

	let mut current = head_addr;
	for step in 0..=options.max_steps {
		let next = match read_next(mem, current)? {
			Some(next) => next,
			None => return Ok(stopped(items, step, WalkStopReason::Unreadable(current))),
		};
		if next == 0 {
			return Ok(stopped(items, step, WalkStopReason::NullNext));
		}
		if next == head_addr {
			return Ok(ListWalk { items, stop: None });
		}
		if !visited.insert(next) {
			return Ok(stopped(items, step, WalkStopReason::Cycle(next)));
		}
		if step == options.max_steps {
			break;
		}
		if !mem.struct_at("list_head", next)?.is_readable() {
			return Ok(stopped(items, step, WalkStopReason::Unreadable(next)));
		}

		let entry = mem.struct_at(ty, next.wrapping_sub(link_offset))?;
		log::trace!("list step {step}: {ty} @ 0x{:x} via 0x{next:x}", entry.offset());
		items.push(entry);
		current = next;
	}

	let step = items.len();
	Ok(stopped(items, step, WalkStopReason::StepLimit))
}

fn read_next(mem: Memory<'_>, node: u64) -> Result<Option<u64>> {
	let node = mem.struct_at("list_head", node)?;
	Ok(match node.member("next") {
		Value::Object(next) => next.raw_uint(),
		_ => None,
	})
}

fn stopped(items: Vec<Object<'_>>, step: usize, reason: WalkStopReason) -> ListWalk<'_> {
	log::debug!("list walk stopped at step {step}: {reason:?}");
	ListWalk {
		items,
		stop: Some(WalkStop { step, reason }),
	}
}

#[cfg(test)]
mod tests;
