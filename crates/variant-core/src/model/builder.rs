//! Incremental, type-checked construction of container values.
//!
//! # Example
//!
//! ```rust
//! use variant_core::{Variant, VariantBuilder, VariantType};
//!
//! let ty = VariantType::new("a(is)").unwrap();
//! let mut builder = VariantBuilder::new(&ty).unwrap();
//! builder.open(&VariantType::TUPLE).unwrap();
//! builder.add_value(Variant::from_i32(1)).unwrap();
//! builder.add_value(Variant::new_string("one").unwrap()).unwrap();
//! builder.close().unwrap();
//! let value = builder.end().unwrap();
//!
//! assert_eq!(value.type_string(), "a(is)");
//! assert_eq!(value.n_children(), 1);
//! ```

use log::trace;

use crate::error::BuilderError;
use crate::model::{TypeInfo, Variant, VariantClass, VariantType};

/// The kinds of container a builder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerClass {
    Variant,
    Maybe,
    Array,
    Tuple,
    DictEntry,
}

impl ContainerClass {
    /// Returns the container class of `ty`, or `None` for non-container
    /// types and the wildcards `*` and `?`.
    pub fn of(ty: &VariantType) -> Option<ContainerClass> {
        match ty.class()? {
            VariantClass::Variant => Some(ContainerClass::Variant),
            VariantClass::Maybe => Some(ContainerClass::Maybe),
            VariantClass::Array => Some(ContainerClass::Array),
            VariantClass::Tuple => Some(ContainerClass::Tuple),
            VariantClass::DictEntry => Some(ContainerClass::DictEntry),
            _ => None,
        }
    }

    /// Returns the most general type of this class.
    pub fn generic_type(self) -> VariantType {
        match self {
            ContainerClass::Variant => VariantType::VARIANT,
            ContainerClass::Maybe => VariantType::MAYBE,
            ContainerClass::Array => VariantType::ARRAY,
            ContainerClass::Tuple => VariantType::TUPLE,
            ContainerClass::DictEntry => VariantType::DICT_ENTRY,
        }
    }
}

/// One container under construction.
#[derive(Debug)]
struct Frame {
    ty: VariantType,
    class: ContainerClass,
    /// Declared member types of a tuple or dictionary entry.
    items: Vec<VariantType>,
    min_items: usize,
    max_items: Option<usize>,
    /// Type of the first element of an array or maybe; later elements must
    /// match it exactly.
    established: Option<VariantType>,
    children: Vec<Variant>,
}

impl Frame {
    fn new(ty: &VariantType) -> Result<Frame, BuilderError> {
        let class = ContainerClass::of(ty).ok_or_else(|| BuilderError::NotAContainer(ty.clone()))?;
        let items = match class {
            ContainerClass::Tuple | ContainerClass::DictEntry => ty.items(),
            _ => Vec::new(),
        };
        let (min_items, max_items) = match class {
            ContainerClass::Variant => (1, Some(1)),
            ContainerClass::Maybe => (0, Some(1)),
            ContainerClass::Array => (0, None),
            // The indefinite tuple `r` takes any number of members.
            ContainerClass::Tuple if ty.as_str() == "r" => (0, None),
            ContainerClass::Tuple | ContainerClass::DictEntry => (items.len(), Some(items.len())),
        };

        Ok(Frame {
            ty: ty.clone(),
            class,
            items,
            min_items,
            max_items,
            established: None,
            children: Vec::new(),
        })
    }

    /// Returns the type the next child must be a subtype of.
    fn expected(&self) -> VariantType {
        match self.class {
            ContainerClass::Variant => VariantType::ANY,
            ContainerClass::Maybe | ContainerClass::Array => self
                .established
                .clone()
                .unwrap_or_else(|| self.ty.element()),
            ContainerClass::Tuple | ContainerClass::DictEntry => self
                .items
                .get(self.children.len())
                .cloned()
                .unwrap_or(VariantType::ANY),
        }
    }

    fn check_add(&self, ty: &VariantType) -> Result<(), BuilderError> {
        if let Some(max) = self.max_items {
            if self.children.len() >= max {
                return Err(BuilderError::TooMany {
                    container: self.ty.clone(),
                    max,
                });
            }
        }
        let expected = self.expected();
        if !ty.is_subtype_of(&expected) {
            return Err(BuilderError::TypeMismatch {
                expected,
                found: ty.clone(),
            });
        }
        Ok(())
    }

    fn add(&mut self, value: Variant) {
        if matches!(self.class, ContainerClass::Maybe | ContainerClass::Array) && self.established.is_none() {
            self.established = Some(value.variant_type().clone());
        }
        self.children.push(value);
    }

    fn check_end(&self) -> Result<(), BuilderError> {
        if self.children.len() < self.min_items {
            return Err(BuilderError::TooFew {
                container: self.ty.clone(),
                min: self.min_items,
                found: self.children.len(),
            });
        }
        // An empty tuple of unknown members is the unit tuple.
        if self.children.is_empty() && !self.ty.is_definite() && self.class != ContainerClass::Tuple {
            return Err(BuilderError::CannotInferType {
                container: self.ty.clone(),
            });
        }
        Ok(())
    }

    /// Builds the tree. Call only after `check_end` succeeded.
    fn finish(self) -> Variant {
        let ty = if self.ty.is_definite() {
            self.ty
        } else {
            let first = || self.children[0].variant_type();
            match self.class {
                ContainerClass::Variant => VariantType::VARIANT,
                ContainerClass::Maybe => VariantType::new_maybe(first()),
                ContainerClass::Array => VariantType::new_array(first()),
                ContainerClass::Tuple => VariantType::new_tuple(self.children.iter().map(Variant::variant_type)),
                ContainerClass::DictEntry => VariantType::new_dict_entry(
                    self.children[0].variant_type(),
                    self.children[1].variant_type(),
                ),
            }
        };

        trace!("built {} with {} children", ty, self.children.len());
        let trusted = self.children.iter().all(Variant::is_trusted);
        Variant::tree(TypeInfo::get(&ty), self.children, trusted)
    }
}

/// Builds a container value one child at a time.
///
/// Nested containers are built in place with [`open`](Self::open) and
/// [`close`](Self::close). Every addition is checked against the declared
/// type; indefinite types are inferred from the children when the builder
/// ends.
#[derive(Debug)]
pub struct VariantBuilder {
    /// Innermost open container last.
    stack: Vec<Frame>,
}

impl VariantBuilder {
    /// Creates a builder for a value of (a subtype of) `ty`.
    pub fn new(ty: &VariantType) -> Result<VariantBuilder, BuilderError> {
        Ok(VariantBuilder {
            stack: vec![Frame::new(ty)?],
        })
    }

    /// Creates a builder for any container of `class`.
    pub fn with_class(class: ContainerClass) -> VariantBuilder {
        match Frame::new(&class.generic_type()) {
            Ok(frame) => VariantBuilder { stack: vec![frame] },
            Err(_) => unreachable!("generic container types are containers"),
        }
    }

    fn top(&self) -> &Frame {
        // The outermost frame is only removed by `end`, which consumes self.
        match self.stack.last() {
            Some(frame) => frame,
            None => unreachable!("builder without a frame"),
        }
    }

    fn top_mut(&mut self) -> &mut Frame {
        match self.stack.last_mut() {
            Some(frame) => frame,
            None => unreachable!("builder without a frame"),
        }
    }

    /// Number of children added to the innermost open container.
    pub fn n_children(&self) -> usize {
        self.top().children.len()
    }

    /// Returns the type the next child of the innermost open container must
    /// be a subtype of.
    pub fn expected_type(&self) -> VariantType {
        self.top().expected()
    }

    /// Checks whether a child of type `ty` may be added next.
    pub fn check_add(&self, ty: &VariantType) -> Result<(), BuilderError> {
        self.top().check_add(ty)
    }

    /// Adds `value` to the innermost open container.
    pub fn add_value(&mut self, value: Variant) -> Result<(), BuilderError> {
        self.check_add(value.variant_type())?;
        self.top_mut().add(value);
        Ok(())
    }

    /// Checks whether the innermost open container has enough children and
    /// a type that can be inferred.
    pub fn check_end(&self) -> Result<(), BuilderError> {
        self.top().check_end()
    }

    /// Starts a nested container of type `ty` as the next child.
    ///
    /// If the parent expects a more specific type, the nested container
    /// takes that type instead.
    pub fn open(&mut self, ty: &VariantType) -> Result<(), BuilderError> {
        let expected = self.top().expected();
        let ty = if expected.is_subtype_of(ty) { &expected } else { ty };
        self.check_add(ty)?;
        let frame = Frame::new(ty)?;
        self.stack.push(frame);
        Ok(())
    }

    /// Finishes the innermost nested container and adds it to its parent.
    pub fn close(&mut self) -> Result<(), BuilderError> {
        if self.stack.len() < 2 {
            return Err(BuilderError::NoOpenContainer);
        }
        self.check_end()?;
        let Some(frame) = self.stack.pop() else {
            return Err(BuilderError::NoOpenContainer);
        };
        let value = frame.finish();
        self.add_value(value)
    }

    /// Finishes the builder and returns the new value.
    ///
    /// The value is floating, and trusted if every child was trusted.
    pub fn end(mut self) -> Result<Variant, BuilderError> {
        if self.stack.len() > 1 {
            return Err(BuilderError::UnclosedContainers {
                open: self.stack.len() - 1,
            });
        }
        self.check_end()?;
        match self.stack.pop() {
            Some(frame) => Ok(frame.finish()),
            None => unreachable!("builder without a frame"),
        }
    }
}

impl From<ContainerClass> for VariantBuilder {
    fn from(class: ContainerClass) -> VariantBuilder {
        VariantBuilder::with_class(class)
    }
}
