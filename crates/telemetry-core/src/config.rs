//! Compile-time wire/layout constants and the runtime [`Config`] for a ring.
//!
//! The constants below fix the wire format: changing any of them changes the
//! byte layout produced by `schema_serialize`/`schema_stream` and the entry
//! size of the ring. They mirror the teacher's `LOW_LATENCY_CONFIG` /
//! `HIGH_THROUGHPUT_CONFIG` preset pattern, but most of what used to be a
//! runtime `Config` field here is a `const` because the wire format is fixed
//! at build time, not chosen per-`Context`.

/// Maximum payload size of a single logged entry, in bytes.
pub const MAX_PAYLOAD: usize = 232;
/// Maximum number of concurrently open consumers.
pub const MAX_CLIENTS: usize = 8;
/// Maximum number of registrable schema ids.
pub const MAX_SCHEMA_ENTRIES: usize = 64;
/// Maximum number of fields per schema entry.
pub const MAX_FIELDS: usize = 16;
/// Maximum byte length of a name (schema, enum, bitfield).
pub const NAME_MAX: usize = 64;
/// Maximum byte length of a schema description.
pub const DESC_MAX: usize = 128;
/// Maximum number of labels in an enum field.
pub const ENUM_MAX_VALUES: usize = 64;
/// Maximum byte length of a single enum label.
pub const ENUM_LABEL_MAX: usize = 32;
/// Maximum number of bit-sub-fields in a bitfield field.
pub const BITFIELD_MAX_BITS: usize = 16;
/// Maximum byte length of a bitfield sub-field name.
pub const BIT_NAME_MAX: usize = 32;
/// Maximum byte length of a single field's own name, embedded inside
/// `FieldWire`. One byte shorter than [`NAME_MAX`] so that
/// `name(63) + offset(2) + size(2) + type_tag(1) + array_count(2)` lands
/// exactly on the externally fixed 70-byte `FieldWire` record (spec.md §6).
pub const FIELD_NAME_MAX: usize = 63;

/// Total size of one ring [`crate::entry::Slot`], in bytes: a single
/// cache-line multiple with the defaults above (256 B == 4 x 64 B lines).
pub const ENTRY_SIZE: usize = 256;

/// Runtime configuration for a [`crate::Context`].
///
/// Unlike the compile-time constants above, the ring's `entry_count` is a
/// per-`Context` choice, the same role the teacher's `Config::ring_bits`
/// plays for `Ring<T>`.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of slots in the ring. Must be a power of two.
    pub entry_count: usize,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `entry_count` is zero or not a power of two — this mirrors
    /// the teacher's `Config::new`, which asserts its invariants at
    /// construction rather than deferring to a runtime `Result`.
    #[must_use]
    pub const fn new(entry_count: usize) -> Self {
        assert!(entry_count > 0, "entry_count must be nonzero");
        assert!(
            entry_count.is_power_of_two(),
            "entry_count must be a power of two"
        );
        Self { entry_count }
    }

    /// Returns the index mask for wrapping (`entry_count - 1`).
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> usize {
        self.entry_count - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A small ring sized for latency-sensitive embedded loops (4K slots).
pub const LOW_LATENCY_CONFIG: Config = Config::new(4096);

/// A larger ring sized for bursty server hot paths (256K slots).
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(262_144);
