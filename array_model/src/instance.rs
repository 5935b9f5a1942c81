use std::fmt;

/// Identifies one node (process) of the cluster (GLOSSARY "Instance"). Used
/// wherever a partitioning scheme maps a chunk position to an owner: SG
/// stream state, redistribute's destination test, the storage header's
/// local instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u32);

impl InstanceId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance-{}", self.0)
    }
}

impl From<u32> for InstanceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
