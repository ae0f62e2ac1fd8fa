use super::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub key_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDef {
    pub name: String,
    pub key_path: String,
    pub auto_increment: bool,
    pub indexes: Vec<IndexDef>,
}

impl CollectionDef {
    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|index| index.name == name)
    }

    pub(crate) fn table(&self) -> String {
        table_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    CreateCollection {
        name: String,
        key_path: String,
        auto_increment: bool,
    },
    CreateIndex {
        collection: String,
        name: String,
        key_path: String,
    },
    DeleteIndex {
        collection: String,
        name: String,
    },
}

/// Schema changes requested by an upgrade callback; applied in one transaction.
#[derive(Debug, Default)]
pub struct UpgradePlan {
    changes: Vec<SchemaChange>,
}

impl UpgradePlan {
    pub fn create_collection(
        &mut self,
        name: &str,
        key_path: &str,
        auto_increment: bool,
    ) -> Result<&mut Self, StoreError> {
        validate_identifier(name)?;
        validate_key_path(key_path)?;
        self.changes.push(SchemaChange::CreateCollection {
            name: name.to_string(),
            key_path: key_path.to_string(),
            auto_increment,
        });
        Ok(self)
    }

    pub fn create_index(
        &mut self,
        collection: &str,
        name: &str,
        key_path: &str,
    ) -> Result<&mut Self, StoreError> {
        validate_identifier(collection)?;
        validate_identifier(name)?;
        validate_key_path(key_path)?;
        self.changes.push(SchemaChange::CreateIndex {
            collection: collection.to_string(),
            name: name.to_string(),
            key_path: key_path.to_string(),
        });
        Ok(self)
    }

    pub fn delete_index(&mut self, collection: &str, name: &str) -> Result<&mut Self, StoreError> {
        validate_identifier(collection)?;
        validate_identifier(name)?;
        self.changes.push(SchemaChange::DeleteIndex {
            collection: collection.to_string(),
            name: name.to_string(),
        });
        Ok(self)
    }

    pub fn changes(&self) -> &[SchemaChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

pub(crate) fn table_name(collection: &str) -> String {
    format!("\"col_{collection}\"")
}

pub(crate) fn index_name(collection: &str, index: &str) -> String {
    format!("\"idx_{collection}_{index}\"")
}

pub(crate) fn json_expr(key_path: &str) -> String {
    format!("json_extract(record_value, '$.{key_path}')")
}

// Names end up inside SQL text, so only a conservative alphabet is accepted.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name.len() > 64
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StoreError::InvalidName(format!(
            "'{name}' must be 1-64 characters of [A-Za-z0-9_]"
        )));
    }
    Ok(())
}

pub fn validate_key_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidName("key path cannot be empty".into()));
    }
    for segment in path.split('.') {
        validate_identifier(segment)?;
    }
    Ok(())
}
