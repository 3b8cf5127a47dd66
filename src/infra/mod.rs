//! Infrastructure definitions
//!
//! The gallery's cloud resources as typed stacks. Each stack synthesizes a
//! CloudFormation template; nothing here talks to AWS.
//!
//! # Stacks
//!
//! - `DatabaseStack` - photographers, galleries, photos, favorites and
//!   client-sessions tables
//! - `DnsStack` - hosted zone for the base domain and a wildcard certificate

mod database;
mod dns;
mod template;

pub use database::{
    default_tables, AttributeType, DatabaseStack, GlobalIndex, KeyAttribute, TableDefinition,
};
pub use dns::{normalize_domain, validate_domain, DnsStack};
pub use template::{
    get_att, join, reference, DeletionPolicy, Export, Output, Resource, Template,
    TEMPLATE_FORMAT_VERSION,
};

use crate::config::InfraSettings;
use crate::error::Result;
use crate::types::Stage;
use std::collections::BTreeMap;
use tracing::debug;

/// A deployable unit producing one template
pub trait Stack: Send + Sync {
    /// Stack name as deployed, stage included
    fn name(&self) -> String;

    /// Validate and produce the template
    fn synthesize(&self) -> Result<Template>;
}

/// Which stacks to synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackSelection {
    #[default]
    All,
    Database,
    Dns,
}

/// All stacks of one deployment stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryInfra {
    pub database: DatabaseStack,
    pub dns: DnsStack,
}

impl GalleryInfra {
    /// Build the stacks for a stage
    pub fn new(app_name: &str, stage: Stage, base_domain: &str) -> Self {
        Self {
            database: DatabaseStack::new(app_name, stage),
            dns: DnsStack::new(app_name, stage, base_domain),
        }
    }

    /// Build the stacks from configuration
    pub fn from_settings(settings: &InfraSettings) -> Self {
        Self::new(&settings.app_name, settings.stage, &settings.base_domain)
    }

    /// Stacks matching the selection
    pub fn stacks(&self, selection: StackSelection) -> Vec<&dyn Stack> {
        match selection {
            StackSelection::All => vec![&self.dns, &self.database],
            StackSelection::Database => vec![&self.database],
            StackSelection::Dns => vec![&self.dns],
        }
    }

    /// Synthesize the selected stacks, keyed by stack name
    pub fn synthesize(&self, selection: StackSelection) -> Result<BTreeMap<String, Template>> {
        let mut templates = BTreeMap::new();
        for stack in self.stacks(selection) {
            let name = stack.name();
            let template = stack.synthesize()?;
            debug!(
                "Synthesized {} ({} resources, {} outputs)",
                name,
                template.resources.len(),
                template.outputs.len()
            );
            templates.insert(name, template);
        }
        Ok(templates)
    }
}

#[cfg(test)]
mod tests;
