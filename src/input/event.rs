//! Event kinds, the shared-memory record, and the decoded event.

use std::fmt;

use crate::error::{AccessError, AccessResult};
use super::keycode::Keycode;
use super::payload::{
    AbsoluteMotion, AttrWords, Codepoint, Payload, Press, RelativeMotion, Release, Touch, TouchId,
    TouchRelease, Wheel,
};

// =============================================================================
// Event Kind
// =============================================================================

/// Discriminant stored in every record. Values are part of the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum EventKind {
    #[default]
    Invalid = 0,
    Press = 1,
    Release = 2,
    RelativeMotion = 3,
    AbsoluteMotion = 4,
    Wheel = 5,
    FocusEnter = 6,
    FocusLeave = 7,
    HoverLeave = 8,
    Touch = 9,
    TouchRelease = 10,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        Self::Invalid,
        Self::Press,
        Self::Release,
        Self::RelativeMotion,
        Self::AbsoluteMotion,
        Self::Wheel,
        Self::FocusEnter,
        Self::FocusLeave,
        Self::HoverLeave,
        Self::Touch,
        Self::TouchRelease,
    ];

    /// Kinds whose records carry no payload.
    pub fn has_payload(self) -> bool {
        !matches!(self, Self::Invalid | Self::FocusEnter | Self::FocusLeave | Self::HoverLeave)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Press => "PRESS",
            Self::Release => "RELEASE",
            Self::RelativeMotion => "REL_MOTION",
            Self::AbsoluteMotion => "ABS_MOTION",
            Self::Wheel => "WHEEL",
            Self::FocusEnter => "FOCUS_ENTER",
            Self::FocusLeave => "FOCUS_LEAVE",
            Self::HoverLeave => "HOVER_LEAVE",
            Self::Touch => "TOUCH",
            Self::TouchRelease => "TOUCH_RELEASE",
        }
    }
}

impl From<u32> for EventKind {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Press,
            2 => Self::Release,
            3 => Self::RelativeMotion,
            4 => Self::AbsoluteMotion,
            5 => Self::Wheel,
            6 => Self::FocusEnter,
            7 => Self::FocusLeave,
            8 => Self::HoverLeave,
            9 => Self::Touch,
            10 => Self::TouchRelease,
            _ => Self::Invalid,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Event Record
// =============================================================================

/// Size of one record: kind(4) + attr(12).
pub const EVENT_RECORD_SIZE: usize = 16;

/// Fixed-layout record as it sits in the shared event buffer.
///
/// Only the transport writes records. Readers go through [`EventRecord::kind`]
/// and [`EventRecord::payload_as`], or decode the whole thing with
/// [`EventRecord::event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct EventRecord {
    kind: u32,
    attr: AttrWords,
}

const _: () = assert!(std::mem::size_of::<EventRecord>() == EVENT_RECORD_SIZE);
const _: () = assert!(std::mem::align_of::<EventRecord>() == 4);

impl EventRecord {
    /// Record with kind `Invalid` and zeroed payload.
    pub const INVALID: EventRecord = EventRecord { kind: 0, attr: [0; 3] };

    /// Build a record from raw words, exactly as a foreign writer would.
    pub const fn from_raw(kind: u32, attr: AttrWords) -> Self {
        Self { kind, attr }
    }

    /// Build a record from a typed payload.
    pub fn from_payload<V: Payload>(payload: V) -> Self {
        Self { kind: V::KIND as u32, attr: payload.encode() }
    }

    fn bare(kind: EventKind) -> Self {
        Self { kind: kind as u32, attr: [0; 3] }
    }

    /// The event's kind. Unknown discriminants read as `Invalid`.
    #[inline]
    pub fn kind(&self) -> EventKind {
        EventKind::from(self.kind)
    }

    #[inline]
    pub fn raw_kind(&self) -> u32 {
        self.kind
    }

    #[inline]
    pub fn attr_words(&self) -> &AttrWords {
        &self.attr
    }

    /// Payload as variant `V`, which must match the stored kind.
    pub fn payload_as<V: Payload>(&self) -> AccessResult<V> {
        let actual = self.kind();
        if actual != V::KIND {
            return Err(AccessError::KindMismatch { expected: V::KIND, actual });
        }
        Ok(V::decode(self.attr))
    }

    /// Decode into the sum type.
    pub fn event(&self) -> Event {
        match self.kind() {
            EventKind::Invalid => Event::Invalid,
            EventKind::Press => Event::Press(Press::decode(self.attr)),
            EventKind::Release => Event::Release(Release::decode(self.attr)),
            EventKind::RelativeMotion => Event::RelativeMotion(RelativeMotion::decode(self.attr)),
            EventKind::AbsoluteMotion => Event::AbsoluteMotion(AbsoluteMotion::decode(self.attr)),
            EventKind::Wheel => Event::Wheel(Wheel::decode(self.attr)),
            EventKind::FocusEnter => Event::FocusEnter,
            EventKind::FocusLeave => Event::FocusLeave,
            EventKind::HoverLeave => Event::HoverLeave,
            EventKind::Touch => Event::Touch(Touch::decode(self.attr)),
            EventKind::TouchRelease => Event::TouchRelease(TouchRelease::decode(self.attr)),
        }
    }
}

// =============================================================================
// Event
// =============================================================================

/// A decoded input event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Event {
    #[default]
    Invalid,
    Press(Press),
    Release(Release),
    RelativeMotion(RelativeMotion),
    AbsoluteMotion(AbsoluteMotion),
    Wheel(Wheel),
    FocusEnter,
    FocusLeave,
    HoverLeave,
    Touch(Touch),
    TouchRelease(TouchRelease),
}

impl Event {
    /// Key press that produced no text.
    pub fn press(key: Keycode) -> Self {
        Self::Press(Press { key, codepoint: Codepoint::INVALID })
    }

    pub fn press_char(key: Keycode, codepoint: impl Into<Codepoint>) -> Self {
        Self::Press(Press { key, codepoint: codepoint.into() })
    }

    pub fn release(key: Keycode) -> Self {
        Self::Release(Release { key })
    }

    pub fn absolute_motion_to(x: i32, y: i32) -> Self {
        Self::AbsoluteMotion(AbsoluteMotion { x, y })
    }

    pub fn relative_motion_by(x: i32, y: i32) -> Self {
        Self::RelativeMotion(RelativeMotion { x, y })
    }

    pub fn wheel_by(x: i32, y: i32) -> Self {
        Self::Wheel(Wheel { x, y })
    }

    pub fn touch_at(id: i32, x: f32, y: f32) -> Self {
        Self::Touch(Touch { id: TouchId(id), x, y })
    }

    pub fn touch_released(id: i32) -> Self {
        Self::TouchRelease(TouchRelease { id: TouchId(id) })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Invalid => EventKind::Invalid,
            Self::Press(_) => EventKind::Press,
            Self::Release(_) => EventKind::Release,
            Self::RelativeMotion(_) => EventKind::RelativeMotion,
            Self::AbsoluteMotion(_) => EventKind::AbsoluteMotion,
            Self::Wheel(_) => EventKind::Wheel,
            Self::FocusEnter => EventKind::FocusEnter,
            Self::FocusLeave => EventKind::FocusLeave,
            Self::HoverLeave => EventKind::HoverLeave,
            Self::Touch(_) => EventKind::Touch,
            Self::TouchRelease(_) => EventKind::TouchRelease,
        }
    }

    /// Encode for the shared buffer.
    pub fn to_record(&self) -> EventRecord {
        match *self {
            Self::Press(p) => EventRecord::from_payload(p),
            Self::Release(p) => EventRecord::from_payload(p),
            Self::RelativeMotion(p) => EventRecord::from_payload(p),
            Self::AbsoluteMotion(p) => EventRecord::from_payload(p),
            Self::Wheel(p) => EventRecord::from_payload(p),
            Self::Touch(p) => EventRecord::from_payload(p),
            Self::TouchRelease(p) => EventRecord::from_payload(p),
            Self::Invalid | Self::FocusEnter | Self::FocusLeave | Self::HoverLeave => {
                EventRecord::bare(self.kind())
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_press(&self) -> bool {
        matches!(self, Self::Press(_))
    }

    pub fn is_release(&self) -> bool {
        matches!(self, Self::Release(_))
    }

    /// Press of exactly `key`.
    pub fn key_press(&self, key: Keycode) -> bool {
        matches!(self, Self::Press(p) if p.key == key)
    }

    pub fn key_release(&self, key: Keycode) -> bool {
        matches!(self, Self::Release(r) if r.key == key)
    }

    /// Key of a press event.
    pub fn press_key(&self) -> Option<Keycode> {
        match self {
            Self::Press(p) => Some(p.key),
            _ => None,
        }
    }

    /// Text produced by a press, if the press produced any.
    pub fn codepoint(&self) -> Option<Codepoint> {
        match self {
            Self::Press(p) if p.codepoint.valid() => Some(p.codepoint),
            _ => None,
        }
    }

    pub fn absolute_motion(&self) -> Option<AbsoluteMotion> {
        match self {
            Self::AbsoluteMotion(m) => Some(*m),
            _ => None,
        }
    }

    pub fn relative_motion(&self) -> Option<RelativeMotion> {
        match self {
            Self::RelativeMotion(m) => Some(*m),
            _ => None,
        }
    }

    pub fn wheel(&self) -> Option<Wheel> {
        match self {
            Self::Wheel(w) => Some(*w),
            _ => None,
        }
    }

    pub fn touch(&self) -> Option<Touch> {
        match self {
            Self::Touch(t) => Some(*t),
            _ => None,
        }
    }

    pub fn touch_release(&self) -> Option<TouchRelease> {
        match self {
            Self::TouchRelease(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_focus_enter(&self) -> bool {
        matches!(self, Self::FocusEnter)
    }

    pub fn is_focus_leave(&self) -> bool {
        matches!(self, Self::FocusLeave)
    }

    pub fn is_hover_leave(&self) -> bool {
        matches!(self, Self::HoverLeave)
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        event.to_record()
    }
}

impl From<&EventRecord> for Event {
    fn from(record: &EventRecord) -> Self {
        record.event()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Self::Press(p) if p.codepoint.valid() => write!(f, "{kind} {} {}", p.key, p.codepoint),
            Self::Press(p) => write!(f, "{kind} {}", p.key),
            Self::Release(r) => write!(f, "{kind} {}", r.key),
            Self::RelativeMotion(RelativeMotion { x, y })
            | Self::AbsoluteMotion(AbsoluteMotion { x, y })
            | Self::Wheel(Wheel { x, y }) => write!(f, "{kind} {x},{y}"),
            Self::Touch(t) => write!(f, "{kind} #{} {},{}", t.id.0, t.x, t.y),
            Self::TouchRelease(t) => write!(f, "{kind} #{}", t.id.0),
            Self::Invalid | Self::FocusEnter | Self::FocusLeave | Self::HoverLeave => {
                f.write_str(kind.name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Event> {
        vec![
            Event::Invalid,
            Event::press(Keycode::KEY_ESC),
            Event::press_char(Keycode::KEY_A, 'a'),
            Event::release(Keycode::BTN_LEFT),
            Event::relative_motion_by(-4, 7),
            Event::absolute_motion_to(640, 480),
            Event::wheel_by(0, -1),
            Event::FocusEnter,
            Event::FocusLeave,
            Event::HoverLeave,
            Event::touch_at(1, 0.5, 0.125),
            Event::touch_released(1),
        ]
    }

    #[test]
    fn test_kind_discriminants() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(*kind as u32, i as u32);
            assert_eq!(EventKind::from(i as u32), *kind);
        }
        assert_eq!(EventKind::from(11), EventKind::Invalid);
        assert_eq!(EventKind::from(u32::MAX), EventKind::Invalid);
    }

    #[test]
    fn test_record_round_trip_every_kind() {
        for event in samples() {
            let record = event.to_record();
            assert_eq!(record.kind(), event.kind());
            assert_eq!(record.event(), event);
        }
    }

    #[test]
    fn test_default_record_is_invalid() {
        let record = EventRecord::default();
        assert_eq!(record, EventRecord::INVALID);
        assert_eq!(record.kind(), EventKind::Invalid);
        assert_eq!(record.event(), Event::Invalid);
        assert_eq!(Event::default().kind(), EventKind::Invalid);
    }

    #[test]
    fn test_payloadless_kinds_ignore_attr_words() {
        for kind in [EventKind::FocusEnter, EventKind::FocusLeave, EventKind::HoverLeave] {
            assert!(!kind.has_payload());
            let record = EventRecord::from_raw(kind as u32, [0xdead, 0xbeef, 0xffff_ffff]);
            assert_eq!(record.kind(), kind);
            // Reading any payload neither succeeds nor changes the kind
            assert!(record.payload_as::<Press>().is_err());
            assert!(record.payload_as::<Touch>().is_err());
            assert_eq!(record.kind(), kind);
            assert_eq!(record.event().kind(), kind);
        }
    }

    #[test]
    fn test_payload_as_matching_kind() {
        let record = Event::press_char(Keycode::KEY_A, 'a').to_record();
        let press = record.payload_as::<Press>().unwrap();
        assert_eq!(press.key, Keycode::KEY_A);
        assert_eq!(press.codepoint, Codepoint(0x61));
    }

    #[test]
    fn test_payload_as_mismatch_fails() {
        let record = Event::wheel_by(1, 2).to_record();
        assert_eq!(
            record.payload_as::<AbsoluteMotion>(),
            Err(AccessError::KindMismatch {
                expected: EventKind::AbsoluteMotion,
                actual: EventKind::Wheel,
            })
        );
    }

    #[test]
    fn test_unknown_raw_kind_reads_invalid() {
        let record = EventRecord::from_raw(42, [1, 2, 3]);
        assert_eq!(record.raw_kind(), 42);
        assert_eq!(record.kind(), EventKind::Invalid);
        assert_eq!(record.event(), Event::Invalid);
    }

    #[test]
    fn test_queries() {
        let press = Event::press_char(Keycode::KEY_B, 'b');
        assert!(press.is_press());
        assert!(press.key_press(Keycode::KEY_B));
        assert!(!press.key_press(Keycode::KEY_A));
        assert_eq!(press.press_key(), Some(Keycode::KEY_B));
        assert_eq!(press.codepoint().and_then(Codepoint::as_char), Some('b'));

        let silent = Event::press(Keycode::KEY_LEFTSHIFT);
        assert_eq!(silent.codepoint(), None);

        let release = Event::release(Keycode::KEY_B);
        assert!(release.is_release());
        assert!(release.key_release(Keycode::KEY_B));
        assert_eq!(release.press_key(), None);

        assert_eq!(Event::wheel_by(0, 3).wheel(), Some(Wheel { x: 0, y: 3 }));
        assert_eq!(Event::absolute_motion_to(1, 2).relative_motion(), None);
        assert!(Event::FocusEnter.is_focus_enter());
        assert!(Event::HoverLeave.is_hover_leave());
        assert_eq!(Event::touch_released(4).touch_release().map(|t| t.id), Some(TouchId(4)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Event::press_char(Keycode::KEY_A, 'a').to_string(), "PRESS KEY_A 0x61");
        assert_eq!(Event::press(Keycode::KEY_ESC).to_string(), "PRESS KEY_ESC");
        assert_eq!(Event::absolute_motion_to(10, 20).to_string(), "ABS_MOTION 10,20");
        assert_eq!(Event::touch_released(2).to_string(), "TOUCH_RELEASE #2");
        assert_eq!(Event::FocusLeave.to_string(), "FOCUS_LEAVE");
    }
}
