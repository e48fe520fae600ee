use std::{fmt, ops::BitOr};

use log::warn;

use crate::event::Event;

/// A set of host event kinds, one bit per kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventKind(u32);

impl EventKind {
    pub const NONE: Self = Self(0);
    pub const WINDOW_RESIZE: Self = Self(1 << 0);
    pub const POINTER_MOVE: Self = Self(1 << 1);
    pub const POINTER_DOWN: Self = Self(1 << 2);
    pub const POINTER_UP: Self = Self(1 << 3);
    pub const ANIMATION_FRAME: Self = Self(1 << 4);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::WINDOW_RESIZE, "WindowResize"),
        (Self::POINTER_MOVE, "PointerMove"),
        (Self::POINTER_DOWN, "PointerDown"),
        (Self::POINTER_UP, "PointerUp"),
        (Self::ANIMATION_FRAME, "AnimationFrame"),
    ];

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Whether every kind in `other` is also in `self`.
    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for EventKind {
    /// Names of the set kinds joined by `|`; empty for [`EventKind::NONE`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, name) in Self::NAMES {
            if self.0 & kind.0 != 0 {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKind({self})")
    }
}

/// One occurrence of a host event: its kind and up to [`Payload::MAX_VALUES`] values, stored
/// inline so dispatch never allocates.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    kind: EventKind,
    len: u8,
    values: [u32; Payload::MAX_VALUES],
}

impl Payload {
    /// Most values a single event may carry.
    pub const MAX_VALUES: usize = 32;

    /// Build a payload, dropping any values past [`MAX_VALUES`](Self::MAX_VALUES).
    pub fn new(kind: EventKind, values: &[u32]) -> Self {
        let len = if values.len() > Self::MAX_VALUES {
            warn!(
                "{kind} event carried {} values, keeping the first {}",
                values.len(),
                Self::MAX_VALUES
            );
            Self::MAX_VALUES
        } else {
            values.len()
        };

        let mut inline = [0; Self::MAX_VALUES];
        inline[..len].copy_from_slice(&values[..len]);
        Self {
            kind,
            len: len as u8,
            values: inline,
        }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn values(&self) -> &[u32] {
        &self.values[..self.len as usize]
    }
}

impl Event for Payload {}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("kind", &self.kind)
            .field("values", &self.values())
            .finish()
    }
}

#[test]
fn kind_display_joins_names() {
    assert_eq!(EventKind::NONE.to_string(), "");
    assert_eq!(EventKind::POINTER_DOWN.to_string(), "PointerDown");
    assert_eq!(
        (EventKind::WINDOW_RESIZE | EventKind::ANIMATION_FRAME).to_string(),
        "WindowResize|AnimationFrame"
    );
    assert_eq!(
        format!("{:?}", EventKind::POINTER_MOVE),
        "EventKind(PointerMove)"
    );
}

#[test]
fn kind_bits_and_contains() {
    let both = EventKind::POINTER_UP | EventKind::POINTER_DOWN;

    assert_eq!(both.bits(), 0b1100);
    assert!(both.contains(EventKind::POINTER_UP));
    assert!(!both.contains(EventKind::POINTER_MOVE));
    assert!(EventKind::from_bits(0).is_empty());
}

#[test]
fn payload_keeps_values() {
    let payload = Payload::new(EventKind::WINDOW_RESIZE, &[640, 480]);

    assert_eq!(payload.kind(), EventKind::WINDOW_RESIZE);
    assert_eq!(payload.values(), &[640, 480]);
}

#[test]
fn payload_truncates_oversized_data() {
    let data: Vec<u32> = (0..40).collect();

    let payload = Payload::new(EventKind::POINTER_MOVE, &data);

    assert_eq!(payload.values().len(), Payload::MAX_VALUES);
    assert_eq!(payload.values(), &data[..Payload::MAX_VALUES]);
}

#[test]
fn payload_without_values() {
    let payload = Payload::new(EventKind::ANIMATION_FRAME, &[]);

    assert!(payload.values().is_empty());
    assert_eq!(
        format!("{payload:?}"),
        "Payload { kind: EventKind(AnimationFrame), values: [] }"
    );
}
