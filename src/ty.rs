use std::fmt;

/// Numeric type of an expression. Every value in the language is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Long,
  Double,
}

impl Type {
  /// Result type of a binary operation: `Double` dominates `Long`.
  pub fn promote(lhs: Type, rhs: Type) -> Type {
    if lhs.is_double() || rhs.is_double() {
      Type::Double
    } else {
      Type::Long
    }
  }

  pub fn is_double(self) -> bool {
    matches!(self, Type::Double)
  }

  pub fn name(self) -> &'static str {
    match self {
      Type::Long => "long",
      Type::Double => "double",
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn double_dominates() {
    assert_eq!(Type::promote(Type::Long, Type::Long), Type::Long);
    assert_eq!(Type::promote(Type::Long, Type::Double), Type::Double);
    assert_eq!(Type::promote(Type::Double, Type::Long), Type::Double);
    assert_eq!(Type::promote(Type::Double, Type::Double), Type::Double);
  }
}
