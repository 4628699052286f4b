//! Per-kind event payloads.
//!
//! Each payload knows its [`EventKind`] and how it packs into the three
//! 32-bit attribute words of an [`EventRecord`](super::EventRecord):
//!
//! ```text
//! kind            word 0        word 1          word 2
//! ─────────────   ───────────   ─────────────   ─────────────
//! Press           key           codepoint       0
//! Release         key           0               0
//! Wheel           x (i32)       y (i32)         0
//! Abs/RelMotion   x (i32)       y (i32)         0
//! Touch           id (i32)      x (f32 bits)    y (f32 bits)
//! TouchRelease    id (i32)      0               0
//! ```

use std::fmt;

use super::event::EventKind;
use super::keycode::Keycode;

/// Attribute words of one record.
pub type AttrWords = [u32; 3];

/// A payload type with a fixed event kind and a fixed word encoding.
pub trait Payload: Copy + Sized {
    const KIND: EventKind;

    fn decode(words: AttrWords) -> Self;

    fn encode(self) -> AttrWords;
}

// =============================================================================
// Codepoint
// =============================================================================

/// Unicode scalar produced by a key press, or [`Codepoint::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Codepoint(pub u32);

impl Codepoint {
    /// Marker for "no text produced".
    pub const INVALID: Codepoint = Codepoint(0xfffe);

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn valid(self) -> bool {
        self != Self::INVALID && char::from_u32(self.0).is_some()
    }

    pub fn as_char(self) -> Option<char> {
        if self == Self::INVALID {
            return None;
        }
        char::from_u32(self.0)
    }
}

impl Default for Codepoint {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<char> for Codepoint {
    fn from(c: char) -> Self {
        Self(c as u32)
    }
}

impl fmt::Display for Codepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identifier of one touch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct TouchId(pub i32);

// =============================================================================
// Payloads
// =============================================================================

/// Key press, with the text it produced if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    pub key: Keycode,
    pub codepoint: Codepoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub key: Keycode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wheel {
    pub x: i32,
    pub y: i32,
}

/// Pointer position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteMotion {
    pub x: i32,
    pub y: i32,
}

/// Pointer movement delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeMotion {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: TouchId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchRelease {
    pub id: TouchId,
}

impl Payload for Press {
    const KIND: EventKind = EventKind::Press;

    fn decode(words: AttrWords) -> Self {
        Self { key: Keycode(words[0]), codepoint: Codepoint(words[1]) }
    }

    fn encode(self) -> AttrWords {
        [self.key.0, self.codepoint.0, 0]
    }
}

impl Payload for Release {
    const KIND: EventKind = EventKind::Release;

    fn decode(words: AttrWords) -> Self {
        Self { key: Keycode(words[0]) }
    }

    fn encode(self) -> AttrWords {
        [self.key.0, 0, 0]
    }
}

/// Payloads that are just a signed x/y pair.
macro_rules! xy_payload {
    ($ty:ident, $kind:ident) => {
        impl Payload for $ty {
            const KIND: EventKind = EventKind::$kind;

            fn decode(words: AttrWords) -> Self {
                Self { x: words[0] as i32, y: words[1] as i32 }
            }

            fn encode(self) -> AttrWords {
                [self.x as u32, self.y as u32, 0]
            }
        }
    };
}

xy_payload!(Wheel, Wheel);
xy_payload!(AbsoluteMotion, AbsoluteMotion);
xy_payload!(RelativeMotion, RelativeMotion);

impl Payload for Touch {
    const KIND: EventKind = EventKind::Touch;

    fn decode(words: AttrWords) -> Self {
        Self {
            id: TouchId(words[0] as i32),
            x: f32::from_bits(words[1]),
            y: f32::from_bits(words[2]),
        }
    }

    fn encode(self) -> AttrWords {
        [self.id.0 as u32, self.x.to_bits(), self.y.to_bits()]
    }
}

impl Payload for TouchRelease {
    const KIND: EventKind = EventKind::TouchRelease;

    fn decode(words: AttrWords) -> Self {
        Self { id: TouchId(words[0] as i32) }
    }

    fn encode(self) -> AttrWords {
        [self.id.0 as u32, 0, 0]
    }
}
