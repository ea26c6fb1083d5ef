use hostshare_common::attributes::{Builtin, InterpolationSampling, InterpolationType};
use std::fmt::{Display, Formatter};

/// A single attribute attached to a decorated schema.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Attribute {
    /// `@align(N)`, overriding the alignment of the inner schema.
    Align(usize),
    /// `@size(N)`, overriding the size of the inner schema.
    Size(usize),
    /// `@location(N)`
    Location(u32),
    /// `@interpolate(type, sampling)`
    Interpolate(InterpolationType, Option<InterpolationSampling>),
    /// `@builtin(name)`
    Builtin(Builtin),
    /// `@invariant`
    Invariant,
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Align(align) => write!(f, "@align({align})"),
            Attribute::Size(size) => write!(f, "@size({size})"),
            Attribute::Location(location) => write!(f, "@location({location})"),
            Attribute::Interpolate(ty, None) => write!(f, "@interpolate({ty:?})"),
            Attribute::Interpolate(ty, Some(sampling)) => {
                write!(f, "@interpolate({ty:?}, {sampling:?})")
            }
            Attribute::Builtin(builtin) => write!(f, "@builtin({builtin})"),
            Attribute::Invariant => f.write_str("@invariant"),
        }
    }
}

/// The set of attributes on a decorated schema. At most one attribute of each kind is kept.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct AttributeSet {
    align: Option<usize>,
    size: Option<usize>,
    location: Option<u32>,
    interpolate: Option<(InterpolationType, Option<InterpolationSampling>)>,
    builtin: Option<Builtin>,
    invariant: bool,
}

impl AttributeSet {
    /// Insert an attribute, replacing an existing attribute of the same kind.
    pub fn insert(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Align(align) => self.align = Some(align),
            Attribute::Size(size) => self.size = Some(size),
            Attribute::Location(location) => self.location = Some(location),
            Attribute::Interpolate(ty, sampling) => self.interpolate = Some((ty, sampling)),
            Attribute::Builtin(builtin) => self.builtin = Some(builtin),
            Attribute::Invariant => self.invariant = true,
        }
    }

    pub fn align(&self) -> Option<usize> {
        self.align
    }

    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn location(&self) -> Option<u32> {
        self.location
    }

    pub fn interpolate(&self) -> Option<(InterpolationType, Option<InterpolationSampling>)> {
        self.interpolate
    }

    pub fn builtin(&self) -> Option<Builtin> {
        self.builtin
    }

    pub fn is_invariant(&self) -> bool {
        self.invariant
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        let (ty, sampling) = match self.interpolate {
            Some((ty, sampling)) => (Some(ty), sampling),
            None => (None, None),
        };
        self.align
            .map(Attribute::Align)
            .into_iter()
            .chain(self.size.map(Attribute::Size))
            .chain(self.location.map(Attribute::Location))
            .chain(ty.map(|ty| Attribute::Interpolate(ty, sampling)))
            .chain(self.builtin.map(Attribute::Builtin))
            .chain(self.invariant.then_some(Attribute::Invariant))
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = AttributeSet::default();
        set.extend(iter);
        set
    }
}

impl Extend<Attribute> for AttributeSet {
    fn extend<I: IntoIterator<Item = Attribute>>(&mut self, iter: I) {
        for attribute in iter {
            self.insert(attribute);
        }
    }
}
