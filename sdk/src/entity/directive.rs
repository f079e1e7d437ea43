//! Per-field directives and the extraction contexts that consult them

use std::fmt;

/// Marker attached to an entity field in its field table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Not requested on reads
    IgnoreForGet,
    /// Not sent on create
    IgnoreForCreate,
    /// Not sent on update
    IgnoreForUpdate,
    /// Not sent on create or update, still read
    IgnoreForCreateAndUpdate,
    /// The field holds a nested entity whose fields are flattened into dotted names
    ExtractRecursively,
}

impl Directive {
    const fn bit(self) -> u8 {
        match self {
            Directive::IgnoreForGet => 1,
            Directive::IgnoreForCreate => 1 << 1,
            Directive::IgnoreForUpdate => 1 << 2,
            Directive::IgnoreForCreateAndUpdate => 1 << 3,
            Directive::ExtractRecursively => 1 << 4,
        }
    }
}

/// The operation a field list or field-value map is being built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionContext {
    Get,
    Create,
    Update,
}

impl fmt::Display for ExtractionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionContext::Get => "get",
            ExtractionContext::Create => "create",
            ExtractionContext::Update => "update",
        };
        write!(f, "{}", name)
    }
}

/// Set of directives on one field. Directives are additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DirectiveSet(u8);

impl DirectiveSet {
    pub const EMPTY: DirectiveSet = DirectiveSet(0);

    pub const fn with(self, directive: Directive) -> Self {
        DirectiveSet(self.0 | directive.bit())
    }

    pub const fn contains(&self, directive: Directive) -> bool {
        self.0 & directive.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether a field carrying this set is left out in the given context
    pub const fn excludes(&self, context: ExtractionContext) -> bool {
        match context {
            ExtractionContext::Get => self.contains(Directive::IgnoreForGet),
            ExtractionContext::Create => {
                self.contains(Directive::IgnoreForCreate)
                    || self.contains(Directive::IgnoreForCreateAndUpdate)
            }
            ExtractionContext::Update => {
                self.contains(Directive::IgnoreForUpdate)
                    || self.contains(Directive::IgnoreForCreateAndUpdate)
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Directive> + '_ {
        [
            Directive::IgnoreForGet,
            Directive::IgnoreForCreate,
            Directive::IgnoreForUpdate,
            Directive::IgnoreForCreateAndUpdate,
            Directive::ExtractRecursively,
        ]
        .into_iter()
        .filter(|d| self.contains(*d))
    }
}

impl FromIterator<Directive> for DirectiveSet {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        iter.into_iter().fold(DirectiveSet::EMPTY, DirectiveSet::with)
    }
}
