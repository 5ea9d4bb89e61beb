//! Fixed-stride packed records for the packet and schema blob wire formats
//! (spec.md §3, §6). Every record here has a `SIZE` constant matching the
//! byte-exact sizes spec.md §6 fixes as part of the wire contract, and a
//! hand-rolled `encode`/`decode` pair rather than a `#[repr(packed)]`
//! transmute — plain field-at-a-time byte writes sidestep the unaligned-
//! reference footguns packed structs have in safe Rust, at no real cost
//! since these records are written once per packet/session, not per slot.
//!
//! All multi-byte integers are written in the producer's native byte
//! order; [`SchemaHeader::endianness`] tells a decoder which order that was.

use crate::config::{
    BITFIELD_MAX_BITS, BIT_NAME_MAX, DESC_MAX, ENUM_LABEL_MAX, ENUM_MAX_VALUES, FIELD_NAME_MAX,
    MAX_FIELDS, NAME_MAX,
};

/// `0` on a little-endian producer, `1` on a big-endian one.
#[cfg(target_endian = "little")]
pub const NATIVE_ENDIANNESS: u8 = 0;
#[cfg(target_endian = "big")]
pub const NATIVE_ENDIANNESS: u8 = 1;

fn put_bytes(buf: &mut [u8], offset: &mut usize, bytes: &[u8]) {
    buf[*offset..*offset + bytes.len()].copy_from_slice(bytes);
    *offset += bytes.len();
}

fn get_bytes<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> &'a [u8] {
    let slice = &buf[*offset..*offset + len];
    *offset += len;
    slice
}

/// `[PacketHeader | EntryHeader x N | PayloadArea]` header (spec.md §3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketHeader {
    pub entry_count: u16,
    pub flags: u16,
    pub payload_size: u32,
    pub dropped: u32,
    pub reserved: u32,
}

impl PacketHeader {
    pub const SIZE: usize = 16;

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.entry_count.to_ne_bytes());
        put_bytes(buf, &mut off, &self.flags.to_ne_bytes());
        put_bytes(buf, &mut off, &self.payload_size.to_ne_bytes());
        put_bytes(buf, &mut off, &self.dropped.to_ne_bytes());
        put_bytes(buf, &mut off, &self.reserved.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let entry_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let flags = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let payload_size = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        let dropped = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        let reserved = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        Self {
            entry_count,
            flags,
            payload_size,
            dropped,
            reserved,
        }
    }
}

const _: () = assert!(PacketHeader::SIZE == 16);

/// One entry's table row inside a packet (spec.md §3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryHeader {
    pub id: u16,
    pub payload_size: u16,
    pub payload_offset: u32,
    pub timestamp: u64,
}

impl EntryHeader {
    pub const SIZE: usize = 16;

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.id.to_ne_bytes());
        put_bytes(buf, &mut off, &self.payload_size.to_ne_bytes());
        put_bytes(buf, &mut off, &self.payload_offset.to_ne_bytes());
        put_bytes(buf, &mut off, &self.timestamp.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let id = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let payload_size = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let payload_offset = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        let timestamp = u64::from_ne_bytes(get_bytes(buf, &mut off, 8).try_into().unwrap());
        Self {
            id,
            payload_size,
            payload_offset,
            timestamp,
        }
    }
}

const _: () = assert!(EntryHeader::SIZE == 16);

/// Header of the schema blob (spec.md §4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaHeader {
    pub endianness: u8,
    pub entry_count: u16,
}

impl SchemaHeader {
    pub const SIZE: usize = 3;

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &[self.endianness]);
        put_bytes(buf, &mut off, &self.entry_count.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let endianness = get_bytes(buf, &mut off, 1)[0];
        let entry_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        Self {
            endianness,
            entry_count,
        }
    }
}

const _: () = assert!(SchemaHeader::SIZE == 3);

fn write_fixed_str(buf: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    // zero-fill the remainder so padding bytes are deterministic
    for b in &mut buf[n..] {
        *b = 0;
    }
}

fn read_fixed_str(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// One field descriptor record, embedded `MAX_FIELDS` times per
/// [`SchemaWire`] (spec.md §3 "Field", §6 `FieldWire` = 70 B).
#[derive(Debug, Clone, Copy)]
pub struct FieldWire {
    pub name: [u8; FIELD_NAME_MAX],
    pub offset: u16,
    pub size: u16,
    pub type_tag: u8,
    pub array_count: u16,
}

impl FieldWire {
    pub const SIZE: usize = 70;

    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            name: [0; FIELD_NAME_MAX],
            offset: 0,
            size: 0,
            type_tag: 0,
            array_count: 0,
        }
    }

    pub fn name_str(&self) -> String {
        read_fixed_str(&self.name)
    }

    pub fn set_name(&mut self, name: &str) {
        write_fixed_str(&mut self.name, name);
    }

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.name);
        put_bytes(buf, &mut off, &self.offset.to_ne_bytes());
        put_bytes(buf, &mut off, &self.size.to_ne_bytes());
        put_bytes(buf, &mut off, &[self.type_tag]);
        put_bytes(buf, &mut off, &self.array_count.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let name: [u8; FIELD_NAME_MAX] = get_bytes(buf, &mut off, FIELD_NAME_MAX)
            .try_into()
            .unwrap();
        let offset = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let size = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let type_tag = get_bytes(buf, &mut off, 1)[0];
        let array_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        Self {
            name,
            offset,
            size,
            type_tag,
            array_count,
        }
    }
}

const _: () = assert!(FieldWire::SIZE == 70);

/// One schema descriptor record (spec.md §3 "Schema Entry Descriptor",
/// §6 `SchemaWire` = 1318 B).
#[derive(Debug, Clone)]
pub struct SchemaWire {
    pub id: u16,
    pub payload_size: u16,
    pub field_count: u16,
    pub name: [u8; NAME_MAX],
    pub description: [u8; DESC_MAX],
    pub fields: [FieldWire; MAX_FIELDS],
}

impl SchemaWire {
    pub const SIZE: usize = 1318;

    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            id: 0,
            payload_size: 0,
            field_count: 0,
            name: [0; NAME_MAX],
            description: [0; DESC_MAX],
            fields: [FieldWire::zeroed(); MAX_FIELDS],
        }
    }

    pub fn name_str(&self) -> String {
        read_fixed_str(&self.name)
    }

    pub fn description_str(&self) -> String {
        read_fixed_str(&self.description)
    }

    pub fn set_name(&mut self, name: &str) {
        write_fixed_str(&mut self.name, name);
    }

    pub fn set_description(&mut self, description: &str) {
        write_fixed_str(&mut self.description, description);
    }

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.id.to_ne_bytes());
        put_bytes(buf, &mut off, &self.payload_size.to_ne_bytes());
        put_bytes(buf, &mut off, &self.field_count.to_ne_bytes());
        put_bytes(buf, &mut off, &self.name);
        put_bytes(buf, &mut off, &self.description);
        for field in &self.fields {
            field.encode(&mut buf[off..off + FieldWire::SIZE]);
            off += FieldWire::SIZE;
        }
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let id = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let payload_size = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let field_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let name: [u8; NAME_MAX] = get_bytes(buf, &mut off, NAME_MAX).try_into().unwrap();
        let description: [u8; DESC_MAX] =
            get_bytes(buf, &mut off, DESC_MAX).try_into().unwrap();
        let mut fields = [FieldWire::zeroed(); MAX_FIELDS];
        for field in &mut fields {
            *field = FieldWire::decode(&buf[off..off + FieldWire::SIZE]);
            off += FieldWire::SIZE;
        }
        Self {
            id,
            payload_size,
            field_count,
            name,
            description,
            fields,
        }
    }
}

const _: () = assert!(SchemaWire::SIZE == 1318);

/// One enum field's label table (spec.md §6 `EnumWire` = 2053 B).
#[derive(Debug, Clone, Copy)]
pub struct EnumWire {
    pub schema_id: u16,
    pub field_index: u8,
    pub label_count: u16,
    pub labels: [[u8; ENUM_LABEL_MAX]; ENUM_MAX_VALUES],
}

impl EnumWire {
    pub const SIZE: usize = 2053;

    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            schema_id: 0,
            field_index: 0,
            label_count: 0,
            labels: [[0; ENUM_LABEL_MAX]; ENUM_MAX_VALUES],
        }
    }

    pub fn label_str(&self, i: usize) -> String {
        read_fixed_str(&self.labels[i])
    }

    pub fn set_label(&mut self, i: usize, label: &str) {
        write_fixed_str(&mut self.labels[i], label);
    }

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.schema_id.to_ne_bytes());
        put_bytes(buf, &mut off, &[self.field_index]);
        put_bytes(buf, &mut off, &self.label_count.to_ne_bytes());
        for label in &self.labels {
            put_bytes(buf, &mut off, label);
        }
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let schema_id = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let field_index = get_bytes(buf, &mut off, 1)[0];
        let label_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let mut labels = [[0u8; ENUM_LABEL_MAX]; ENUM_MAX_VALUES];
        for label in &mut labels {
            *label = get_bytes(buf, &mut off, ENUM_LABEL_MAX).try_into().unwrap();
        }
        Self {
            schema_id,
            field_index,
            label_count,
            labels,
        }
    }
}

const _: () = assert!(EnumWire::SIZE == 2053);

/// One bitfield field's sub-field table (spec.md §6 `BitfieldWire` = 549 B).
#[derive(Debug, Clone, Copy)]
pub struct BitfieldWire {
    pub schema_id: u16,
    pub field_index: u8,
    pub bit_count: u16,
    pub names: [[u8; BIT_NAME_MAX]; BITFIELD_MAX_BITS],
    pub start: [u8; BITFIELD_MAX_BITS],
    pub width: [u8; BITFIELD_MAX_BITS],
}

impl BitfieldWire {
    pub const SIZE: usize = 549;

    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            schema_id: 0,
            field_index: 0,
            bit_count: 0,
            names: [[0; BIT_NAME_MAX]; BITFIELD_MAX_BITS],
            start: [0; BITFIELD_MAX_BITS],
            width: [0; BITFIELD_MAX_BITS],
        }
    }

    pub fn name_str(&self, i: usize) -> String {
        read_fixed_str(&self.names[i])
    }

    pub fn set_name(&mut self, i: usize, name: &str) {
        write_fixed_str(&mut self.names[i], name);
    }

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.schema_id.to_ne_bytes());
        put_bytes(buf, &mut off, &[self.field_index]);
        put_bytes(buf, &mut off, &self.bit_count.to_ne_bytes());
        for name in &self.names {
            put_bytes(buf, &mut off, name);
        }
        put_bytes(buf, &mut off, &self.start);
        put_bytes(buf, &mut off, &self.width);
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let schema_id = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let field_index = get_bytes(buf, &mut off, 1)[0];
        let bit_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let mut names = [[0u8; BIT_NAME_MAX]; BITFIELD_MAX_BITS];
        for name in &mut names {
            *name = get_bytes(buf, &mut off, BIT_NAME_MAX).try_into().unwrap();
        }
        let start: [u8; BITFIELD_MAX_BITS] =
            get_bytes(buf, &mut off, BITFIELD_MAX_BITS).try_into().unwrap();
        let width: [u8; BITFIELD_MAX_BITS] =
            get_bytes(buf, &mut off, BITFIELD_MAX_BITS).try_into().unwrap();
        Self {
            schema_id,
            field_index,
            bit_count,
            names,
            start,
            width,
        }
    }
}

const _: () = assert!(BitfieldWire::SIZE == 549);

/// One entry in the file collaborator's footer index (spec.md §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexEntry {
    pub packet_offset: u64,
    pub packet_len: u32,
    pub entry_count: u16,
    pub first_timestamp: u64,
    pub dropped: u32,
    pub reserved: u16,
}

impl IndexEntry {
    pub const SIZE: usize = 28;

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.packet_offset.to_ne_bytes());
        put_bytes(buf, &mut off, &self.packet_len.to_ne_bytes());
        put_bytes(buf, &mut off, &self.entry_count.to_ne_bytes());
        put_bytes(buf, &mut off, &self.first_timestamp.to_ne_bytes());
        put_bytes(buf, &mut off, &self.dropped.to_ne_bytes());
        put_bytes(buf, &mut off, &self.reserved.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let packet_offset = u64::from_ne_bytes(get_bytes(buf, &mut off, 8).try_into().unwrap());
        let packet_len = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        let entry_count = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        let first_timestamp = u64::from_ne_bytes(get_bytes(buf, &mut off, 8).try_into().unwrap());
        let dropped = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        let reserved = u16::from_ne_bytes(get_bytes(buf, &mut off, 2).try_into().unwrap());
        Self {
            packet_offset,
            packet_len,
            entry_count,
            first_timestamp,
            dropped,
            reserved,
        }
    }
}

const _: () = assert!(IndexEntry::SIZE == 28);

/// Trailer identifying the footer index of a `.btlm` file (spec.md §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexFooter {
    pub magic: u32,
    pub index_offset: u64,
    pub index_count: u32,
}

impl IndexFooter {
    pub const SIZE: usize = 16;
    /// `0x494C5442` — spec.md §6.
    pub const MAGIC: u32 = 0x494C_5442;

    pub fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.magic.to_ne_bytes());
        put_bytes(buf, &mut off, &self.index_offset.to_ne_bytes());
        put_bytes(buf, &mut off, &self.index_count.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }

    #[must_use]
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        let magic = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        let index_offset = u64::from_ne_bytes(get_bytes(buf, &mut off, 8).try_into().unwrap());
        let index_count = u32::from_ne_bytes(get_bytes(buf, &mut off, 4).try_into().unwrap());
        Self {
            magic,
            index_offset,
            index_count,
        }
    }
}

const _: () = assert!(IndexFooter::SIZE == 16);
