//! Opaque index keys into the arrays owned by a [`super::model::Grammar`].
//! Cross-references in the compiled grammar image are indices rather than
//! pointers, so the grammar model can be ordinary owned Rust data with no
//! unsafe aliasing.

macro_rules! index_id {
  ($name:ident) => {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct $name(pub u32);

    impl $name {
      pub fn index(self) -> usize {
        self.0 as usize
      }
    }

    impl From<u32> for $name {
      fn from(v: u32) -> Self {
        $name(v)
      }
    }

    impl From<usize> for $name {
      fn from(v: usize) -> Self {
        $name(v as u32)
      }
    }
  };
}

index_id!(StringId);
index_id!(IntFaId);
index_id!(IntFaStateId);
index_id!(GlaId);
index_id!(GlaStateId);
index_id!(RtnId);
index_id!(RtnStateId);
