//! DynamoDB table stack
//!
//! Declares the five gallery tables. Table names are
//! `<app>-<table>-<stage>` and every name is exported for the API stack.

use super::template::{reference, DeletionPolicy, Output, Resource, Template};
use super::Stack;
use crate::error::{Error, Result};
use crate::types::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};

/// DynamoDB scalar attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// String
    S,
    /// Number
    N,
    /// Binary
    B,
}

impl AttributeType {
    fn as_str(self) -> &'static str {
        match self {
            AttributeType::S => "S",
            AttributeType::N => "N",
            AttributeType::B => "B",
        }
    }
}

/// A key attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl KeyAttribute {
    /// String key
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::S,
        }
    }

    /// Number key
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::N,
        }
    }
}

/// Global secondary index, always projecting all attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalIndex {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
}

impl GlobalIndex {
    /// Index on a single string attribute, named `<attribute>-index`
    pub fn on(attribute: &str) -> Self {
        Self {
            name: format!("{attribute}-index"),
            partition_key: KeyAttribute::string(attribute),
            sort_key: None,
        }
    }

    /// Add a sort key
    #[must_use]
    pub fn sorted_by(mut self, key: KeyAttribute) -> Self {
        self.sort_key = Some(key);
        self
    }
}

/// One table declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Short name, e.g. `client-sessions`
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub indexes: Vec<GlobalIndex>,
    /// Attribute holding the item expiry (epoch seconds)
    pub ttl_attribute: Option<String>,
}

impl TableDefinition {
    /// Table keyed by a single string attribute
    pub fn new(name: impl Into<String>, partition_key: &str) -> Self {
        Self {
            name: name.into(),
            partition_key: KeyAttribute::string(partition_key),
            sort_key: None,
            indexes: Vec::new(),
            ttl_attribute: None,
        }
    }

    /// Add a string sort key
    #[must_use]
    pub fn sort_key(mut self, attribute: &str) -> Self {
        self.sort_key = Some(KeyAttribute::string(attribute));
        self
    }

    /// Add a global secondary index
    #[must_use]
    pub fn index(mut self, index: GlobalIndex) -> Self {
        self.indexes.push(index);
        self
    }

    /// Expire items through the given attribute
    #[must_use]
    pub fn ttl(mut self, attribute: &str) -> Self {
        self.ttl_attribute = Some(attribute.to_string());
        self
    }

    /// CloudFormation logical id, e.g. `ClientSessionsTable`
    pub fn logical_id(&self) -> String {
        let mut id: String = self
            .name
            .split(|c| c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        id.push_str("Table");
        id
    }

    /// Every key attribute the table and its indexes use, by name
    fn attribute_definitions(&self) -> Result<BTreeMap<&str, AttributeType>> {
        let mut attributes = BTreeMap::new();
        let keys = std::iter::once(&self.partition_key)
            .chain(self.sort_key.iter())
            .chain(
                self.indexes
                    .iter()
                    .flat_map(|i| std::iter::once(&i.partition_key).chain(i.sort_key.iter())),
            );

        for key in keys {
            match attributes.insert(key.name.as_str(), key.attribute_type) {
                Some(previous) if previous != key.attribute_type => {
                    return Err(Error::infra(
                        "database",
                        format!(
                            "attribute '{}' of table '{}' is declared as both {} and {}",
                            key.name,
                            self.name,
                            previous.as_str(),
                            key.attribute_type.as_str()
                        ),
                    ));
                }
                _ => {}
            }
        }

        Ok(attributes)
    }
}

fn key_schema(partition_key: &KeyAttribute, sort_key: Option<&KeyAttribute>) -> Value {
    let mut schema = vec![json!({ "AttributeName": partition_key.name, "KeyType": "HASH" })];
    if let Some(sort) = sort_key {
        schema.push(json!({ "AttributeName": sort.name, "KeyType": "RANGE" }));
    }
    Value::Array(schema)
}

/// The gallery's table set
pub fn default_tables() -> Vec<TableDefinition> {
    vec![
        TableDefinition::new("photographers", "photographerId").index(GlobalIndex::on("email")),
        TableDefinition::new("galleries", "galleryId").index(
            GlobalIndex::on("photographerId").sorted_by(KeyAttribute::string("createdAt")),
        ),
        TableDefinition::new("photos", "galleryId").sort_key("photoId"),
        TableDefinition::new("favorites", "clientId")
            .sort_key("photoId")
            .index(GlobalIndex::on("galleryId")),
        TableDefinition::new("client-sessions", "sessionToken")
            .index(GlobalIndex::on("galleryId"))
            .ttl("expiresAt"),
    ]
}

/// Stack holding all persisted tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStack {
    pub app_name: String,
    pub stage: Stage,
    pub tables: Vec<TableDefinition>,
}

impl DatabaseStack {
    /// Stack with the default table set
    pub fn new(app_name: impl Into<String>, stage: Stage) -> Self {
        Self {
            app_name: app_name.into(),
            stage,
            tables: default_tables(),
        }
    }

    /// Physical table name
    pub fn table_name(&self, table: &TableDefinition) -> String {
        format!("{}-{}-{}", self.app_name, table.name, self.stage)
    }

    fn table_resource(&self, table: &TableDefinition) -> Result<Resource> {
        let attributes: Vec<Value> = table
            .attribute_definitions()?
            .into_iter()
            .map(|(name, ty)| json!({ "AttributeName": name, "AttributeType": ty.as_str() }))
            .collect();

        let mut properties = json!({
            "TableName": self.table_name(table),
            "BillingMode": "PAY_PER_REQUEST",
            "AttributeDefinitions": attributes,
            "KeySchema": key_schema(&table.partition_key, table.sort_key.as_ref()),
        });

        if !table.indexes.is_empty() {
            let indexes: Vec<Value> = table
                .indexes
                .iter()
                .map(|index| {
                    json!({
                        "IndexName": index.name,
                        "KeySchema": key_schema(&index.partition_key, index.sort_key.as_ref()),
                        "Projection": { "ProjectionType": "ALL" },
                    })
                })
                .collect();
            properties["GlobalSecondaryIndexes"] = Value::Array(indexes);
        }

        if let Some(ref ttl) = table.ttl_attribute {
            properties["TimeToLiveSpecification"] = json!({
                "AttributeName": ttl,
                "Enabled": true,
            });
        }

        if self.stage.is_production() {
            properties["PointInTimeRecoverySpecification"] =
                json!({ "PointInTimeRecoveryEnabled": true });
        }

        let policy = if self.stage.is_production() {
            DeletionPolicy::Retain
        } else {
            DeletionPolicy::Delete
        };

        Ok(Resource::new("AWS::DynamoDB::Table", properties).with_removal_policy(policy))
    }

    fn validate(&self) -> Result<()> {
        validate_app_name("database", &self.app_name)?;

        if self.tables.is_empty() {
            return Err(Error::infra("database", "no tables declared"));
        }

        let mut seen = HashSet::new();
        let mut logical_ids = BTreeMap::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                return Err(Error::infra("database", "table with empty name"));
            }
            if !seen.insert(table.name.as_str()) {
                return Err(Error::infra(
                    "database",
                    format!("duplicate table '{}'", table.name),
                ));
            }
            if let Some(other) = logical_ids.insert(table.logical_id(), table.name.as_str()) {
                return Err(Error::infra(
                    "database",
                    format!(
                        "tables '{other}' and '{}' map to the same logical id {}",
                        table.name,
                        table.logical_id()
                    ),
                ));
            }
            let mut index_names = HashSet::new();
            for index in &table.indexes {
                if !index_names.insert(index.name.as_str()) {
                    return Err(Error::infra(
                        "database",
                        format!("duplicate index '{}' on table '{}'", index.name, table.name),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Stack for DatabaseStack {
    fn name(&self) -> String {
        format!("{}-database-{}", self.app_name, self.stage)
    }

    fn synthesize(&self) -> Result<Template> {
        self.validate()?;

        let mut template = Template::new(format!("Gallery data tables ({} stage)", self.stage));

        for table in &self.tables {
            let logical_id = table.logical_id();
            template.add_resource(logical_id.clone(), self.table_resource(table)?);
            template.add_output(
                format!("{logical_id}Name"),
                Output::new(reference(&logical_id))
                    .description(format!("Name of the {} table", table.name))
                    .export(format!("{logical_id}Name-{}", self.stage)),
            );
        }

        Ok(template)
    }
}

/// App names become part of table names, so keep them lowercase and dash-separated
pub(crate) fn validate_app_name(stack: &str, app_name: &str) -> Result<()> {
    if app_name.is_empty() {
        return Err(Error::infra(stack, "app name is empty"));
    }
    let valid = app_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !app_name.starts_with('-')
        && !app_name.ends_with('-');
    if !valid {
        return Err(Error::infra(
            stack,
            format!("app name '{app_name}' must be lowercase letters, digits and inner dashes"),
        ));
    }
    Ok(())
}
