//! Remote field descriptors and attribute filtering

use crate::entity::types::FieldType;
use crate::partner::RemoteField;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Attribute flags a field listing can be narrowed by.
///
/// Flags compose as a logical AND: `CUSTOM | FILTERABLE` keeps fields that are both.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldAttributes(u8);

impl FieldAttributes {
    /// No filtering
    pub const DONT_CARE: FieldAttributes = FieldAttributes(0);
    pub const CUSTOM: FieldAttributes = FieldAttributes(1);
    pub const UPDATABLE: FieldAttributes = FieldAttributes(1 << 1);
    pub const FILTERABLE: FieldAttributes = FieldAttributes(1 << 2);

    pub const fn contains(&self, other: FieldAttributes) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn is_dont_care(&self) -> bool {
        self.0 == 0
    }

    /// Whether a field satisfies every requested flag
    pub fn matches(&self, field: &RemoteField) -> bool {
        (!self.contains(Self::CUSTOM) || field.custom)
            && (!self.contains(Self::UPDATABLE) || field.updateable)
            && (!self.contains(Self::FILTERABLE) || field.filterable)
    }
}

impl BitOr for FieldAttributes {
    type Output = FieldAttributes;

    fn bitor(self, rhs: Self) -> Self::Output {
        FieldAttributes(self.0 | rhs.0)
    }
}

impl BitOrAssign for FieldAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for FieldAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dont_care() {
            return write!(f, "DONT_CARE");
        }
        let names: Vec<&str> = [
            (Self::CUSTOM, "CUSTOM"),
            (Self::UPDATABLE, "UPDATABLE"),
            (Self::FILTERABLE, "FILTERABLE"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// Schema metadata of one remote field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub custom: bool,
    pub updatable: bool,
    pub filterable: bool,
}

impl From<&RemoteField> for FieldDescriptor {
    fn from(field: &RemoteField) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type,
            custom: field.custom,
            updatable: field.updateable,
            filterable: field.filterable,
        }
    }
}

/// Narrow the fields by each requested flag in turn, then project to descriptors
pub fn filter_fields(fields: &[RemoteField], attributes: FieldAttributes) -> Vec<FieldDescriptor> {
    fields
        .iter()
        .filter(|f| attributes.matches(f))
        .map(FieldDescriptor::from)
        .collect()
}
