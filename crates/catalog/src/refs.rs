//! Loosely-typed entity references.
//!
//! Create operations accept a reference to a related entity as an id, a
//! unique name, or an already-loaded value. The manager resolves each
//! reference to a concrete entity before staging anything; an unresolvable
//! reference fails with `CatalogError::Reference` and leaves the unit of
//! work untouched.

use crate::entities::File;

/// Reference to an entity by id, by unique name, or by value.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef<T> {
    Id(i32),
    Name(String),
    Value(T),
}

impl<T> EntityRef<T> {
    pub fn id(id: i32) -> Self {
        EntityRef::Id(id)
    }

    pub fn name(name: impl Into<String>) -> Self {
        EntityRef::Name(name.into())
    }

    pub fn value(value: T) -> Self {
        EntityRef::Value(value)
    }
}

impl<T> From<i32> for EntityRef<T> {
    fn from(id: i32) -> Self {
        EntityRef::Id(id)
    }
}

impl<T> From<&str> for EntityRef<T> {
    fn from(name: &str) -> Self {
        EntityRef::Name(name.to_string())
    }
}

impl<T> From<String> for EntityRef<T> {
    fn from(name: String) -> Self {
        EntityRef::Name(name)
    }
}

/// Reference to a file by uid or by value. Files are keyed by a string uid,
/// so they get their own reference type.
#[derive(Debug, Clone, PartialEq)]
pub enum FileRef {
    Uid(String),
    Value(File),
}

impl FileRef {
    pub fn uid(uid: impl Into<String>) -> Self {
        FileRef::Uid(uid.into())
    }

    pub fn value(file: File) -> Self {
        FileRef::Value(file)
    }
}

impl From<&str> for FileRef {
    fn from(uid: &str) -> Self {
        FileRef::Uid(uid.to_string())
    }
}

impl From<String> for FileRef {
    fn from(uid: String) -> Self {
        FileRef::Uid(uid)
    }
}

impl From<File> for FileRef {
    fn from(file: File) -> Self {
        FileRef::Value(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::FileType;
    use chrono::Utc;

    #[test]
    fn test_entity_ref_from_id() {
        let r: EntityRef<FileType> = 7.into();
        assert_eq!(r, EntityRef::Id(7));
    }

    #[test]
    fn test_entity_ref_from_name() {
        let r: EntityRef<FileType> = "swath".into();
        assert_eq!(r, EntityRef::Name("swath".to_string()));
    }

    #[test]
    fn test_entity_ref_by_value() {
        let ft = FileType {
            file_type_id: 1,
            file_type_name: "swath".to_string(),
            description: "polar swath".to_string(),
        };
        let r = EntityRef::value(ft.clone());
        assert_eq!(r, EntityRef::Value(ft));
    }

    #[test]
    fn test_file_ref_from_uid() {
        let r: FileRef = "F001".into();
        assert_eq!(r, FileRef::Uid("F001".to_string()));
    }

    #[test]
    fn test_file_ref_from_value() {
        let file = File {
            uid: "F001".to_string(),
            file_type_id: 1,
            file_format_id: 1,
            is_archived: false,
            created_at: Utc::now(),
        };
        let r: FileRef = file.clone().into();
        assert_eq!(r, FileRef::Value(file));
    }
}
