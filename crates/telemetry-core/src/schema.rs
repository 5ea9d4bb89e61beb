//! Schema descriptors and the fixed-size schema registry (spec.md §3
//! "Schema Entry Descriptor", §4.5).
//!
//! Descriptors here are the ergonomic, owned-`String` shape a caller builds
//! by hand; [`crate::wire`] holds the fixed-byte-array records these get
//! flattened into by `schema_serialize`/`schema_stream`. Keeping the two
//! separate means a caller never has to think about label padding or byte
//! budgets to describe a schema.

use crate::config::{MAX_FIELDS, MAX_SCHEMA_ENTRIES};
use crate::error::CoreError;

/// The primitive wire type of a field (spec.md §3, §6 `FieldWire.type_tag`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    U8 = 0,
    U16 = 1,
    U32 = 2,
    U64 = 3,
    I8 = 4,
    I16 = 5,
    I32 = 6,
    I64 = 7,
    F32 = 8,
    F64 = 9,
    Bool = 10,
    Bytes = 11,
    Enum = 12,
    Bitfield = 13,
}

impl FieldType {
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::U8,
            1 => Self::U16,
            2 => Self::U32,
            3 => Self::U64,
            4 => Self::I8,
            5 => Self::I16,
            6 => Self::I32,
            7 => Self::I64,
            8 => Self::F32,
            9 => Self::F64,
            10 => Self::Bool,
            11 => Self::Bytes,
            12 => Self::Enum,
            13 => Self::Bitfield,
            _ => return None,
        })
    }
}

/// One named, positioned bit range inside a [`FieldType::Bitfield`] field.
#[derive(Debug, Clone)]
pub struct BitSubField {
    pub name: String,
    pub start: u8,
    pub width: u8,
}

/// One field of a [`SchemaEntryDescriptor`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub offset: u16,
    pub size: u16,
    pub ty: FieldType,
    /// `1` for a scalar field, `> 1` for a fixed-size array of `ty`.
    pub array_count: u16,
    /// Populated only when `ty == FieldType::Enum`.
    pub enum_labels: Vec<String>,
    /// Populated only when `ty == FieldType::Bitfield`.
    pub bit_fields: Vec<BitSubField>,
}

impl Field {
    #[must_use]
    pub fn scalar(name: impl Into<String>, offset: u16, size: u16, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            ty,
            array_count: 1,
            enum_labels: Vec::new(),
            bit_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn array(
        name: impl Into<String>,
        offset: u16,
        size: u16,
        ty: FieldType,
        array_count: u16,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            ty,
            array_count,
            enum_labels: Vec::new(),
            bit_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn enum_field(
        name: impl Into<String>,
        offset: u16,
        size: u16,
        labels: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            ty: FieldType::Enum,
            array_count: 1,
            enum_labels: labels,
            bit_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn bitfield(
        name: impl Into<String>,
        offset: u16,
        size: u16,
        bits: Vec<BitSubField>,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            ty: FieldType::Bitfield,
            array_count: 1,
            enum_labels: Vec::new(),
            bit_fields: bits,
        }
    }
}

/// A registered schema: an id, a human name/description, the payload size
/// it describes, and up to [`MAX_FIELDS`] fields (spec.md §3).
#[derive(Debug, Clone)]
pub struct SchemaEntryDescriptor {
    pub id: u16,
    pub name: String,
    pub description: String,
    pub payload_size: u16,
    pub fields: Vec<Field>,
}

impl SchemaEntryDescriptor {
    /// Validates the descriptor's shape against the registry's fixed
    /// capacity limits; does not touch the registry itself.
    fn validate(&self) -> Result<(), CoreError> {
        if self.id as usize >= MAX_SCHEMA_ENTRIES {
            return Err(CoreError::InvalidSchemaId {
                id: self.id,
                max: (MAX_SCHEMA_ENTRIES - 1) as u16,
            });
        }
        if self.payload_size as usize > crate::config::MAX_PAYLOAD {
            return Err(CoreError::PayloadTooLarge {
                size: self.payload_size as usize,
                max: crate::config::MAX_PAYLOAD,
            });
        }
        if self.fields.len() > MAX_FIELDS {
            return Err(CoreError::InvalidArgument(
                "schema has more fields than MAX_FIELDS",
            ));
        }
        if self.name.len() >= crate::config::NAME_MAX {
            return Err(CoreError::InvalidArgument("schema name too long"));
        }
        if self.description.len() >= crate::config::DESC_MAX {
            return Err(CoreError::InvalidArgument("schema description too long"));
        }
        for field in &self.fields {
            if field.name.len() >= crate::config::FIELD_NAME_MAX {
                return Err(CoreError::InvalidArgument("field name too long"));
            }
            match field.ty {
                FieldType::Enum if field.enum_labels.len() > crate::config::ENUM_MAX_VALUES => {
                    return Err(CoreError::InvalidArgument("enum has too many labels"));
                }
                FieldType::Bitfield
                    if field.bit_fields.len() > crate::config::BITFIELD_MAX_BITS =>
                {
                    return Err(CoreError::InvalidArgument(
                        "bitfield has too many sub-fields",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// The fixed-capacity registry of up to [`MAX_SCHEMA_ENTRIES`] descriptors
/// (spec.md §4.5). Stores references rather than owned descriptors: a
/// `Context` borrows schemas for its whole lifetime, the same ownership
/// shape the teacher's `Ring<T>` uses for a caller-owned backing buffer.
pub(crate) struct SchemaRegistry<'a> {
    entries: [Option<&'a SchemaEntryDescriptor>; MAX_SCHEMA_ENTRIES],
    /// Largest registered id + 1 (spec.md §4.5: "`schema_count` tracks the
    /// largest id + 1"), not a count of registered entries — a registry
    /// with only id 7 populated reports `schema_count() == 8`.
    max_id_plus_one: usize,
}

impl<'a> SchemaRegistry<'a> {
    pub(crate) fn new() -> Self {
        Self {
            entries: [None; MAX_SCHEMA_ENTRIES],
            max_id_plus_one: 0,
        }
    }

    /// `register` (spec.md §4.5): adds a descriptor. "Duplicate registration
    /// of an id replaces the previous entry (no error)."
    pub(crate) fn register(
        &mut self,
        descriptor: &'a SchemaEntryDescriptor,
    ) -> Result<(), CoreError> {
        descriptor.validate()?;
        crate::invariants::debug_assert_schema_bounds!(descriptor.id, descriptor.payload_size as usize);
        self.entries[descriptor.id as usize] = Some(descriptor);
        self.max_id_plus_one = self.max_id_plus_one.max(descriptor.id as usize + 1);
        Ok(())
    }

    pub(crate) fn get(&self, id: u16) -> Option<&'a SchemaEntryDescriptor> {
        self.entries.get(id as usize).copied().flatten()
    }

    pub(crate) fn is_registered(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn schema_count(&self) -> usize {
        self.max_id_plus_one
    }

    /// Iterates registered descriptors in ascending id order, the order
    /// `schema_serialize`/`schema_stream` write them in (spec.md §4.6).
    pub(crate) fn iter(&self) -> impl Iterator<Item = &'a SchemaEntryDescriptor> + '_ {
        self.entries.iter().filter_map(|e| *e)
    }
}
