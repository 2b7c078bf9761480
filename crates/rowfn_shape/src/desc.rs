//! Type descriptors for parameter and return positions.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use rowfn_driver::{Destination, Scan};

/// Allocates a fresh, defaulted destination for one column.
pub type Alloc = fn() -> Box<dyn Destination>;

/// Role a type plays in a function shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Row cursor handle (first parameter of row decoders, result of `query`).
    RowCursor,
    /// Error return.
    Error,
    /// `bool` returned by a callback to continue (`true`) or stop (`false`).
    Bool,
    /// Cancellation/deadline context (first parameter of statement calls).
    Context,
    /// Transaction scope capability.
    Transaction,
    /// Outcome of an exec statement.
    ExecOutcome,
    /// A decoded column value.
    Column,
    /// A caller-supplied destination for one column.
    OutParam,
    /// A positional query argument.
    Arg,
}

impl TypeKind {
    pub fn describe(self) -> &'static str {
        match self {
            TypeKind::RowCursor => "a row cursor",
            TypeKind::Error => "an error",
            TypeKind::Bool => "a bool",
            TypeKind::Context => "a context",
            TypeKind::Transaction => "a transaction scope",
            TypeKind::ExecOutcome => "an execution outcome",
            TypeKind::Column => "a column value",
            TypeKind::OutParam => "a column destination",
            TypeKind::Arg => "a query argument",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Descriptor of one parameter or return position.
///
/// Identity is `(TypeId, TypeKind)`: the display name and the allocator are
/// carried along for diagnostics and synthesis but never compared.
#[derive(Copy, Clone)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
    alloc: Option<Alloc>,
}

fn alloc_default<T: Scan + Default + 'static>() -> Box<dyn Destination> {
    Box::new(T::default())
}

impl TypeDesc {
    fn of<T: ?Sized + 'static>(kind: TypeKind) -> Self {
        TypeDesc {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind,
            alloc: None,
        }
    }

    pub fn row_cursor<T: ?Sized + 'static>() -> Self {
        Self::of::<T>(TypeKind::RowCursor)
    }

    pub fn error<T: ?Sized + 'static>() -> Self {
        Self::of::<T>(TypeKind::Error)
    }

    pub fn bool() -> Self {
        Self::of::<bool>(TypeKind::Bool)
    }

    pub fn context<T: ?Sized + 'static>() -> Self {
        Self::of::<T>(TypeKind::Context)
    }

    pub fn transaction<T: ?Sized + 'static>() -> Self {
        Self::of::<T>(TypeKind::Transaction)
    }

    pub fn exec_outcome<T: ?Sized + 'static>() -> Self {
        Self::of::<T>(TypeKind::ExecOutcome)
    }

    pub fn arg<T: ?Sized + 'static>() -> Self {
        Self::of::<T>(TypeKind::Arg)
    }

    /// A decoded column of type `T`; carries the allocator used to create
    /// a fresh destination per row.
    pub fn column<T: Scan + Default + 'static>() -> Self {
        TypeDesc {
            alloc: Some(alloc_default::<T>),
            ..Self::of::<T>(TypeKind::Column)
        }
    }

    /// A caller-supplied `&mut T` destination.
    pub fn out_param<T: Scan + 'static>() -> Self {
        Self::of::<T>(TypeKind::OutParam)
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is(&self, kind: TypeKind) -> bool {
        self.kind == kind
    }

    /// Allocate a fresh destination. `None` for non-column descriptors.
    pub fn alloc(&self) -> Option<Box<dyn Destination>> {
        self.alloc.map(|alloc| alloc())
    }

    pub fn allocator(&self) -> Option<Alloc> {
        self.alloc
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDesc")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TypeKind::OutParam {
            f.write_str("&mut ")?;
        }
        write_short_name(f, self.name)
    }
}

/// Write `name` with every path prefix stripped:
/// `core::option::Option<alloc::string::String>` becomes `Option<String>`.
fn write_short_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let mut segment_start = 0;
    for (i, c) in name.char_indices() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';') {
            write_last_segment(f, &name[segment_start..i])?;
            write!(f, "{c}")?;
            segment_start = i + c.len_utf8();
        }
    }
    write_last_segment(f, &name[segment_start..])
}

fn write_last_segment(f: &mut fmt::Formatter<'_>, path: &str) -> fmt::Result {
    f.write_str(path.rsplit("::").next().unwrap_or(path))
}
