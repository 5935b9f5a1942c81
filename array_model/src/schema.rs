use crate::attribute::AttributeDesc;
use crate::dimension::DimensionDesc;
use crate::error::{NoDimensionsSnafu, Result};
use std::fmt;

/// Versioned array id: one per `(uaid, version)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayId(pub u64);

/// Unversioned array id: stable across an array's versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnversionedArrayId(pub u64);

/// The closed set of partitioning schemes (§3). Every array at every plan
/// edge has exactly one; operators declare what they require (C5/C7) and
/// what they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitioningScheme {
    Replication,
    HashPartitioned,
    LocalInstance,
    ByRow,
    ByCol,
    GroupBy,
    ScaLapack,
    Undefined,
}

impl fmt::Display for PartitioningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Replication => "replication",
            Self::HashPartitioned => "hashPartitioned",
            Self::LocalInstance => "localInstance",
            Self::ByRow => "byRow",
            Self::ByCol => "byCol",
            Self::GroupBy => "groupBy",
            Self::ScaLapack => "scaLAPACK",
            Self::Undefined => "undefined",
        };
        write!(f, "{s}")
    }
}

/// The full descriptor of one array version (§3 ArrayDesc).
#[derive(Debug, Clone)]
pub struct ArrayDesc {
    name: String,
    uaid: UnversionedArrayId,
    id: ArrayId,
    version: u32,
    attributes: Vec<AttributeDesc>,
    dimensions: Vec<DimensionDesc>,
    scheme: PartitioningScheme,
}

impl ArrayDesc {
    pub fn new(
        name: impl Into<String>,
        uaid: UnversionedArrayId,
        id: ArrayId,
        version: u32,
        attributes: Vec<AttributeDesc>,
        dimensions: Vec<DimensionDesc>,
        scheme: PartitioningScheme,
    ) -> Result<Self> {
        if dimensions.is_empty() {
            return NoDimensionsSnafu.fail();
        }
        Ok(Self {
            name: name.into(),
            uaid,
            id,
            version,
            attributes,
            dimensions,
            scheme,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uaid(&self) -> UnversionedArrayId {
        self.uaid
    }

    pub fn id(&self) -> ArrayId {
        self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn attributes(&self) -> &[AttributeDesc] {
        &self.attributes
    }

    pub fn dimensions(&self) -> &[DimensionDesc] {
        &self.dimensions
    }

    pub fn scheme(&self) -> PartitioningScheme {
        self.scheme
    }

    pub fn num_dims(&self) -> usize {
        self.dimensions.len()
    }

    /// The last attribute is the hidden empty-bitmap attribute, when present
    /// (§3 ArrayDesc). Data-attribute iteration skips it by convention.
    pub fn empty_indicator_attr(&self) -> Option<&AttributeDesc> {
        self.attributes.last().filter(|a| a.is_empty_indicator())
    }

    pub fn data_attributes(&self) -> impl Iterator<Item = &AttributeDesc> {
        let skip_last = self.empty_indicator_attr().is_some();
        let n = self.attributes.len();
        self.attributes
            .iter()
            .enumerate()
            .filter(move |(i, _)| !(skip_last && *i == n - 1))
            .map(|(_, a)| a)
    }

    /// Any chunk in this array is empty iff any dimension has a zero-length
    /// range (§8 boundary behaviors).
    pub fn has_no_chunks(&self) -> bool {
        self.dimensions.iter().any(DimensionDesc::is_empty)
    }

    pub fn with_scheme(&self, scheme: PartitioningScheme) -> Self {
        Self {
            scheme,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeDesc;

    fn desc(scheme: PartitioningScheme) -> ArrayDesc {
        ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![
                AttributeDesc::new(0, "v", "int64"),
                AttributeDesc::empty_indicator(1),
            ],
            vec![DimensionDesc::new("i", 0, 99, 10, 0).unwrap()],
            scheme,
        )
        .unwrap()
    }

    #[test]
    fn data_attributes_skips_empty_indicator() {
        let d = desc(PartitioningScheme::Replication);
        let names: Vec<_> = d.data_attributes().map(AttributeDesc::name).collect();
        assert_eq!(names, vec!["v"]);
    }

    #[test]
    fn with_scheme_preserves_everything_else() {
        let d = desc(PartitioningScheme::Replication);
        let d2 = d.with_scheme(PartitioningScheme::HashPartitioned);
        assert_eq!(d2.scheme(), PartitioningScheme::HashPartitioned);
        assert_eq!(d2.name(), d.name());
    }

    #[test]
    fn empty_dimension_means_no_chunks() {
        let empty_dim = DimensionDesc::new("i", 5, 4, 10, 0).unwrap();
        let d = ArrayDesc::new(
            "A",
            UnversionedArrayId(1),
            ArrayId(1),
            0,
            vec![AttributeDesc::new(0, "v", "int64")],
            vec![empty_dim],
            PartitioningScheme::Replication,
        )
        .unwrap();
        assert!(d.has_no_chunks());
    }
}
