use core::{
    any::{type_name, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

const INTERFACE_PREFIX: &str = "dyn ";

/// Shape of a type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Registered through a concrete `Arc<T>`
    Concrete,
    /// Registered through a trait object handle `Arc<dyn I>`
    Interface,
}

/// Static type token of a registered instance.
///
/// Tokens compare by [`TypeId`] only; the name is kept for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
    pub kind: TypeKind,
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        let name = type_name::<T>();
        let kind = if name.starts_with(INTERFACE_PREFIX) {
            TypeKind::Interface
        } else {
            TypeKind::Concrete
        };

        Self {
            name,
            id: TypeId::of::<T>(),
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Last path segment of the type name, without generics of the outer path.
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let name = self.name.strip_prefix(INTERFACE_PREFIX).unwrap_or(self.name);
        let path = name.split_once('<').map_or(name, |(path, _)| path);
        match path.rsplit_once("::") {
            Some((_, short)) => &name[path.len() - short.len()..],
            None => name,
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Concrete => f.write_str(self.short_name()),
            TypeKind::Interface => write!(f, "{INTERFACE_PREFIX}{}", self.short_name()),
        }
    }
}
