//! Schema blob serialisation, buffered and streaming (spec.md §4.6).
//!
//! Both entry points walk the same sequence of fixed-size records —
//! `SchemaHeader`, then one `SchemaWire` per registered schema in ascending
//! id order, then a `u16 enum_count` followed by one `EnumWire` per enum
//! field, then a `u16 bitfield_count` followed by one `BitfieldWire` per
//! bitfield field, enum/bitfield records walked in the same id/field-index
//! order — so they produce byte-identical output (spec.md §3, §4.6).
//! `schema_serialize` assembles that sequence into one caller buffer (or
//! just reports its size); `schema_stream` emits each record (including the
//! two `u16` count prefixes, each its own chunk) through a callback from a
//! small on-stack scratch buffer, so a caller never needs to hold the whole
//! blob in memory at once.

use crate::error::{Aborted, CoreError};
use crate::schema::{FieldType, SchemaEntryDescriptor};
use crate::wire::{BitfieldWire, EnumWire, FieldWire, SchemaHeader, SchemaWire, NATIVE_ENDIANNESS};

use super::Context;

fn to_schema_wire(descriptor: &SchemaEntryDescriptor) -> SchemaWire {
    let mut wire = SchemaWire::zeroed();
    wire.id = descriptor.id;
    wire.payload_size = descriptor.payload_size;
    wire.field_count = descriptor.fields.len() as u16;
    wire.set_name(&descriptor.name);
    wire.set_description(&descriptor.description);
    for (i, field) in descriptor.fields.iter().enumerate() {
        let mut fw = FieldWire::zeroed();
        fw.set_name(&field.name);
        fw.offset = field.offset;
        fw.size = field.size;
        fw.type_tag = field.ty as u8;
        fw.array_count = field.array_count;
        wire.fields[i] = fw;
    }
    wire
}

fn enum_wire_for(schema_id: u16, field_index: u8, labels: &[String]) -> EnumWire {
    let mut wire = EnumWire::zeroed();
    wire.schema_id = schema_id;
    wire.field_index = field_index;
    wire.label_count = labels.len() as u16;
    for (i, label) in labels.iter().enumerate() {
        wire.set_label(i, label);
    }
    wire
}

fn bitfield_wire_for(
    schema_id: u16,
    field_index: u8,
    bits: &[crate::schema::BitSubField],
) -> BitfieldWire {
    let mut wire = BitfieldWire::zeroed();
    wire.schema_id = schema_id;
    wire.field_index = field_index;
    wire.bit_count = bits.len() as u16;
    for (i, bit) in bits.iter().enumerate() {
        wire.set_name(i, &bit.name);
        wire.start[i] = bit.start;
        wire.width[i] = bit.width;
    }
    wire
}

/// Number of enum-typed and bitfield-typed fields across the whole
/// registry, in the order the enum/bitfield sections are written in.
fn count_enum_and_bitfield_records(ctx: &Context) -> (usize, usize) {
    let mut enum_records = 0usize;
    let mut bitfield_records = 0usize;
    for descriptor in ctx.registry.iter() {
        for field in &descriptor.fields {
            match field.ty {
                FieldType::Enum => enum_records += 1,
                FieldType::Bitfield => bitfield_records += 1,
                _ => {}
            }
        }
    }
    (enum_records, bitfield_records)
}

/// Total byte length of the schema blob a registry would serialise to.
///
/// `SchemaHeader | SchemaWire x E | u16 enum_count | EnumWire x En |
/// u16 bitfield_count | BitfieldWire x Bn` (spec.md §3, §4.6) — the two
/// `u16` section-count prefixes are mandatory even when a section is empty.
fn total_size(ctx: &Context) -> usize {
    let mut size = SchemaHeader::SIZE + ctx.registry.iter().count() * SchemaWire::SIZE;
    let (enum_records, bitfield_records) = count_enum_and_bitfield_records(ctx);
    size += 2 + enum_records * EnumWire::SIZE;
    size += 2 + bitfield_records * BitfieldWire::SIZE;
    size
}

/// `schema_serialize` (spec.md §4.6): with `buf == None`, a pure size
/// query. With `Some(buf)`, writes the schema blob and returns its length,
/// or `BufferTooSmall` if `buf` is not large enough.
pub(crate) fn schema_serialize(ctx: &Context, buf: Option<&mut [u8]>) -> Result<usize, CoreError> {
    let needed = total_size(ctx);
    let Some(buf) = buf else {
        return Ok(needed);
    };
    if buf.len() < needed {
        return Err(CoreError::BufferTooSmall {
            needed,
            got: buf.len(),
        });
    }

    let mut off = 0;
    let header = SchemaHeader {
        endianness: NATIVE_ENDIANNESS,
        entry_count: ctx.registry.iter().count() as u16,
    };
    header.encode(&mut buf[off..off + SchemaHeader::SIZE]);
    off += SchemaHeader::SIZE;

    for descriptor in ctx.registry.iter() {
        let wire = to_schema_wire(descriptor);
        wire.encode(&mut buf[off..off + SchemaWire::SIZE]);
        off += SchemaWire::SIZE;
    }

    let (enum_records, bitfield_records) = count_enum_and_bitfield_records(ctx);

    buf[off..off + 2].copy_from_slice(&(enum_records as u16).to_ne_bytes());
    off += 2;
    for descriptor in ctx.registry.iter() {
        for (i, field) in descriptor.fields.iter().enumerate() {
            if field.ty == FieldType::Enum {
                let wire = enum_wire_for(descriptor.id, i as u8, &field.enum_labels);
                wire.encode(&mut buf[off..off + EnumWire::SIZE]);
                off += EnumWire::SIZE;
            }
        }
    }

    buf[off..off + 2].copy_from_slice(&(bitfield_records as u16).to_ne_bytes());
    off += 2;
    for descriptor in ctx.registry.iter() {
        for (i, field) in descriptor.fields.iter().enumerate() {
            if field.ty == FieldType::Bitfield {
                let wire = bitfield_wire_for(descriptor.id, i as u8, &field.bit_fields);
                wire.encode(&mut buf[off..off + BitfieldWire::SIZE]);
                off += BitfieldWire::SIZE;
            }
        }
    }

    debug_assert_eq!(off, needed);
    Ok(off)
}

/// `schema_stream` (spec.md §4.6): emits the same byte sequence
/// `schema_serialize` would produce, one fixed-size record at a time, via
/// `emit`. `emit` returning non-zero aborts the stream. Returns the total
/// number of bytes that would have been (or were) emitted.
pub(crate) fn schema_stream<F>(ctx: &Context, mut emit: F) -> Result<usize, Aborted>
where
    F: FnMut(&[u8]) -> u32,
{
    // Large enough for the biggest single record (`EnumWire`); every chunk
    // this function emits fits in one stack buffer of this size.
    let mut scratch = [0u8; EnumWire::SIZE];
    let mut total = 0usize;

    let header = SchemaHeader {
        endianness: NATIVE_ENDIANNESS,
        entry_count: ctx.registry.iter().count() as u16,
    };
    header.encode(&mut scratch[..SchemaHeader::SIZE]);
    if emit(&scratch[..SchemaHeader::SIZE]) != 0 {
        return Err(Aborted);
    }
    total += SchemaHeader::SIZE;

    for descriptor in ctx.registry.iter() {
        let wire = to_schema_wire(descriptor);
        wire.encode(&mut scratch[..SchemaWire::SIZE]);
        if emit(&scratch[..SchemaWire::SIZE]) != 0 {
            return Err(Aborted);
        }
        total += SchemaWire::SIZE;
    }

    let (enum_records, bitfield_records) = count_enum_and_bitfield_records(ctx);

    scratch[..2].copy_from_slice(&(enum_records as u16).to_ne_bytes());
    if emit(&scratch[..2]) != 0 {
        return Err(Aborted);
    }
    total += 2;
    for descriptor in ctx.registry.iter() {
        for (i, field) in descriptor.fields.iter().enumerate() {
            if field.ty == FieldType::Enum {
                let wire = enum_wire_for(descriptor.id, i as u8, &field.enum_labels);
                wire.encode(&mut scratch[..EnumWire::SIZE]);
                if emit(&scratch[..EnumWire::SIZE]) != 0 {
                    return Err(Aborted);
                }
                total += EnumWire::SIZE;
            }
        }
    }

    scratch[..2].copy_from_slice(&(bitfield_records as u16).to_ne_bytes());
    if emit(&scratch[..2]) != 0 {
        return Err(Aborted);
    }
    total += 2;
    for descriptor in ctx.registry.iter() {
        for (i, field) in descriptor.fields.iter().enumerate() {
            if field.ty == FieldType::Bitfield {
                let wire = bitfield_wire_for(descriptor.id, i as u8, &field.bit_fields);
                wire.encode(&mut scratch[..BitfieldWire::SIZE]);
                if emit(&scratch[..BitfieldWire::SIZE]) != 0 {
                    return Err(Aborted);
                }
                total += BitfieldWire::SIZE;
            }
        }
    }

    Ok(total)
}
