use super::error::{FieldErrors, SpecError};
use super::wire::RawFileSpec;
use super::SpecDocument;
use serde::{Deserialize, Serialize};

/// One file resource, identified by its platform id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFileSpec", into = "RawFileSpec")]
pub struct FileSpec {
    id: i64,
}

impl FileSpec {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

impl SpecDocument for FileSpec {
    type Raw = RawFileSpec;

    fn from_raw(raw: RawFileSpec) -> Result<Self, FieldErrors> {
        Ok(Self { id: raw.id })
    }

    fn to_raw(&self) -> RawFileSpec {
        RawFileSpec { id: self.id }
    }
}

impl TryFrom<RawFileSpec> for FileSpec {
    type Error = SpecError;

    fn try_from(raw: RawFileSpec) -> Result<Self, Self::Error> {
        Ok(Self::from_raw(raw)?)
    }
}

impl From<FileSpec> for RawFileSpec {
    fn from(spec: FileSpec) -> Self {
        spec.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_and_load() {
        let spec = FileSpec::new(6);
        assert_eq!(spec.dump().unwrap(), serde_json::json!({"id": 6}));
        assert_eq!(FileSpec::load(serde_json::json!({"id": 6})).unwrap(), spec);
    }

    #[test]
    fn missing_id_is_malformed() {
        assert!(matches!(
            FileSpec::load(serde_json::json!({})),
            Err(SpecError::Malformed(_))
        ));
    }
}
