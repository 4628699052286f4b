//! Borrowed view over the shared event buffer.
//!
//! The buffer belongs to the transport. An [`EventBuffer`] only borrows it,
//! and its lifetime keeps the view from outliving the session it came from.

use bitflags::bitflags;

use crate::error::{AccessError, AccessResult};
use super::event::{Event, EventKind, EventRecord};
use super::payload::Payload;

/// Anything that can lend out its event records.
pub trait EventSource {
    fn event_buffer(&self) -> EventBuffer<'_>;
}

bitflags! {
    /// Set of event kinds, for filtering a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindSet: u32 {
        const INVALID         = 1 << EventKind::Invalid as u32;
        const PRESS           = 1 << EventKind::Press as u32;
        const RELEASE         = 1 << EventKind::Release as u32;
        const RELATIVE_MOTION = 1 << EventKind::RelativeMotion as u32;
        const ABSOLUTE_MOTION = 1 << EventKind::AbsoluteMotion as u32;
        const WHEEL           = 1 << EventKind::Wheel as u32;
        const FOCUS_ENTER     = 1 << EventKind::FocusEnter as u32;
        const FOCUS_LEAVE     = 1 << EventKind::FocusLeave as u32;
        const HOVER_LEAVE     = 1 << EventKind::HoverLeave as u32;
        const TOUCH           = 1 << EventKind::Touch as u32;
        const TOUCH_RELEASE   = 1 << EventKind::TouchRelease as u32;

        const KEYS    = Self::PRESS.bits() | Self::RELEASE.bits();
        const POINTER = Self::RELATIVE_MOTION.bits() | Self::ABSOLUTE_MOTION.bits()
                      | Self::WHEEL.bits() | Self::HOVER_LEAVE.bits();
        const TOUCHES = Self::TOUCH.bits() | Self::TOUCH_RELEASE.bits();
        const FOCUS   = Self::FOCUS_ENTER.bits() | Self::FOCUS_LEAVE.bits();
    }
}

impl KindSet {
    pub fn contains_kind(self, kind: EventKind) -> bool {
        self.contains(Self::from(kind))
    }
}

impl From<EventKind> for KindSet {
    fn from(kind: EventKind) -> Self {
        Self::from_bits_truncate(1 << kind as u32)
    }
}

/// Read-only window onto a contiguous run of event records.
#[derive(Debug, Clone, Copy)]
pub struct EventBuffer<'a> {
    records: &'a [EventRecord],
}

impl<'a> EventBuffer<'a> {
    pub fn new(records: &'a [EventRecord]) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self { records: &[] }
    }

    /// View a foreign record array (e.g. a mapped shared-memory dataspace).
    ///
    /// # Safety
    /// - `ptr` must be non-null, 4-byte aligned, and point to `len` initialized records
    /// - the memory must stay valid and unmodified for `'a`
    pub unsafe fn from_raw_parts(ptr: *const EventRecord, len: usize) -> Self {
        if len == 0 {
            return Self::empty();
        }
        // SAFETY: upheld by the caller per the contract above.
        let records = unsafe { std::slice::from_raw_parts(ptr, len) };
        Self { records }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const EventRecord {
        self.records.as_ptr()
    }

    /// Record at `index`.
    pub fn get(&self, index: usize) -> AccessResult<&'a EventRecord> {
        self.records
            .get(index)
            .ok_or(AccessError::OutOfRange { index, len: self.records.len() })
    }

    pub fn kind(&self, index: usize) -> AccessResult<EventKind> {
        self.get(index).map(EventRecord::kind)
    }

    pub fn payload_as<V: Payload>(&self, index: usize) -> AccessResult<V> {
        self.get(index)?.payload_as::<V>()
    }

    pub fn event(&self, index: usize) -> AccessResult<Event> {
        self.get(index).map(EventRecord::event)
    }

    pub fn records(&self) -> &'a [EventRecord] {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'a, EventRecord> {
        self.records.iter()
    }

    /// Decoded events, in buffer order.
    pub fn events(&self) -> impl Iterator<Item = Event> + 'a {
        self.records.iter().map(EventRecord::event)
    }

    /// Decoded events whose kind is in `kinds`.
    pub fn matching(&self, kinds: KindSet) -> impl Iterator<Item = Event> + 'a {
        self.records
            .iter()
            .filter(move |r| kinds.contains_kind(r.kind()))
            .map(EventRecord::event)
    }
}

impl<'a> IntoIterator for EventBuffer<'a> {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<'a> From<&'a [EventRecord]> for EventBuffer<'a> {
    fn from(records: &'a [EventRecord]) -> Self {
        Self::new(records)
    }
}
