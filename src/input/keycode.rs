//! Key codes carried by press/release events.
//!
//! Values follow the evdev numbering the host's input drivers already use,
//! so a keycode crosses the buffer unchanged. Codes without a symbolic name
//! here are still valid and survive a round trip verbatim.

use std::fmt;

/// Physical/logical key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Keycode(pub u32);

macro_rules! keycodes {
    ($($name:ident = $value:expr),* $(,)?) => {
        impl Keycode {
            $(pub const $name: Keycode = Keycode($value);)*

            const NAMES: &'static [(&'static str, Keycode)] = &[
                $((stringify!($name), Keycode($value)),)*
            ];
        }
    };
}

keycodes! {
    KEY_RESERVED = 0,
    KEY_ESC = 1,
    KEY_1 = 2, KEY_2 = 3, KEY_3 = 4, KEY_4 = 5, KEY_5 = 6,
    KEY_6 = 7, KEY_7 = 8, KEY_8 = 9, KEY_9 = 10, KEY_0 = 11,
    KEY_MINUS = 12,
    KEY_EQUAL = 13,
    KEY_BACKSPACE = 14,
    KEY_TAB = 15,
    KEY_Q = 16, KEY_W = 17, KEY_E = 18, KEY_R = 19, KEY_T = 20,
    KEY_Y = 21, KEY_U = 22, KEY_I = 23, KEY_O = 24, KEY_P = 25,
    KEY_LEFTBRACE = 26,
    KEY_RIGHTBRACE = 27,
    KEY_ENTER = 28,
    KEY_LEFTCTRL = 29,
    KEY_A = 30, KEY_S = 31, KEY_D = 32, KEY_F = 33, KEY_G = 34,
    KEY_H = 35, KEY_J = 36, KEY_K = 37, KEY_L = 38,
    KEY_SEMICOLON = 39,
    KEY_APOSTROPHE = 40,
    KEY_GRAVE = 41,
    KEY_LEFTSHIFT = 42,
    KEY_BACKSLASH = 43,
    KEY_Z = 44, KEY_X = 45, KEY_C = 46, KEY_V = 47, KEY_B = 48,
    KEY_N = 49, KEY_M = 50,
    KEY_COMMA = 51,
    KEY_DOT = 52,
    KEY_SLASH = 53,
    KEY_RIGHTSHIFT = 54,
    KEY_KPASTERISK = 55,
    KEY_LEFTALT = 56,
    KEY_SPACE = 57,
    KEY_CAPSLOCK = 58,
    KEY_F1 = 59, KEY_F2 = 60, KEY_F3 = 61, KEY_F4 = 62, KEY_F5 = 63,
    KEY_F6 = 64, KEY_F7 = 65, KEY_F8 = 66, KEY_F9 = 67, KEY_F10 = 68,
    KEY_NUMLOCK = 69,
    KEY_SCROLLLOCK = 70,
    KEY_F11 = 87,
    KEY_F12 = 88,
    KEY_KPENTER = 96,
    KEY_RIGHTCTRL = 97,
    KEY_RIGHTALT = 100,
    KEY_HOME = 102,
    KEY_UP = 103,
    KEY_PAGEUP = 104,
    KEY_LEFT = 105,
    KEY_RIGHT = 106,
    KEY_END = 107,
    KEY_DOWN = 108,
    KEY_PAGEDOWN = 109,
    KEY_INSERT = 110,
    KEY_DELETE = 111,
    KEY_LEFTMETA = 125,
    KEY_RIGHTMETA = 126,
    KEY_COMPOSE = 127,
    KEY_MENU = 139,
    BTN_LEFT = 0x110,
    BTN_RIGHT = 0x111,
    BTN_MIDDLE = 0x112,
    BTN_SIDE = 0x113,
    BTN_EXTRA = 0x114,
    BTN_TOUCH = 0x14a,
}

impl Keycode {
    /// First and last codes of the evdev button block.
    const BTN_FIRST: u32 = 0x100;
    const BTN_LAST: u32 = 0x151;

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Symbolic name, if this code has one.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.iter().find(|(_, k)| *k == self).map(|(n, _)| *n)
    }

    /// Reverse of [`Keycode::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES.iter().find(|(n, _)| *n == name).map(|(_, k)| *k)
    }

    /// Pointer/touch buttons as opposed to keyboard keys.
    pub fn is_button(self) -> bool {
        (Self::BTN_FIRST..=Self::BTN_LAST).contains(&self.0)
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::KEY_LEFTCTRL
                | Self::KEY_RIGHTCTRL
                | Self::KEY_LEFTSHIFT
                | Self::KEY_RIGHTSHIFT
                | Self::KEY_LEFTALT
                | Self::KEY_RIGHTALT
                | Self::KEY_LEFTMETA
                | Self::KEY_RIGHTMETA
                | Self::KEY_CAPSLOCK
        )
    }
}

impl From<u32> for Keycode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "KEY({})", self.0),
        }
    }
}
