//! Function shape: the identity of a requested decoding function.

use std::fmt;

use crate::desc::TypeDesc;

/// Ordered parameter and return descriptors of a function.
///
/// Immutable once built. Two shapes are equal exactly when every position
/// has the same type identity and role, which makes the shape usable as a
/// cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShape {
    params: Box<[TypeDesc]>,
    returns: Box<[TypeDesc]>,
}

impl FunctionShape {
    pub fn new(
        params: impl IntoIterator<Item = TypeDesc>,
        returns: impl IntoIterator<Item = TypeDesc>,
    ) -> Self {
        FunctionShape {
            params: params.into_iter().collect(),
            returns: returns.into_iter().collect(),
        }
    }

    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    pub fn returns(&self) -> &[TypeDesc] {
        &self.returns
    }
}

impl fmt::Display for FunctionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        match &*self.returns {
            [] => Ok(()),
            [single] => write!(f, " -> {single}"),
            many => {
                f.write_str(" -> (")?;
                for (i, ret) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ret}")?;
                }
                f.write_str(")")
            }
        }
    }
}
