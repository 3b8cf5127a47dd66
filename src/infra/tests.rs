//! Tests for the infra module

use super::*;
use crate::error::Error;
use crate::types::Stage;
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// Database stack
// ============================================================================

#[test]
fn test_database_stack_declares_five_tables() {
    let template = DatabaseStack::new("gallery", Stage::Dev).synthesize().unwrap();

    let names: Vec<&String> = template
        .resources_of_type("AWS::DynamoDB::Table")
        .map(|(id, _)| id)
        .collect();
    assert_eq!(
        names,
        vec![
            "ClientSessionsTable",
            "FavoritesTable",
            "GalleriesTable",
            "PhotographersTable",
            "PhotosTable",
        ]
    );
}

#[test]
fn test_table_names_and_exports_carry_stage() {
    let stack = DatabaseStack::new("gallery", Stage::Staging);
    let template = stack.synthesize().unwrap();

    let photos = &template.resources["PhotosTable"];
    assert_eq!(photos.properties["TableName"], "gallery-photos-staging");
    assert_eq!(photos.properties["BillingMode"], "PAY_PER_REQUEST");

    let mut exports = template.export_names();
    exports.sort_unstable();
    assert_eq!(
        exports,
        vec![
            "ClientSessionsTableName-staging",
            "FavoritesTableName-staging",
            "GalleriesTableName-staging",
            "PhotographersTableName-staging",
            "PhotosTableName-staging",
        ]
    );
    assert_eq!(
        template.outputs["PhotosTableName"].value,
        json!({ "Ref": "PhotosTable" })
    );
    assert_eq!(stack.name(), "gallery-database-staging");
}

#[test]
fn test_table_keys_and_indexes() {
    let template = DatabaseStack::new("gallery", Stage::Dev).synthesize().unwrap();

    let favorites = &template.resources["FavoritesTable"].properties;
    assert_eq!(
        favorites["KeySchema"],
        json!([
            { "AttributeName": "clientId", "KeyType": "HASH" },
            { "AttributeName": "photoId", "KeyType": "RANGE" },
        ])
    );
    assert_eq!(
        favorites["AttributeDefinitions"],
        json!([
            { "AttributeName": "clientId", "AttributeType": "S" },
            { "AttributeName": "galleryId", "AttributeType": "S" },
            { "AttributeName": "photoId", "AttributeType": "S" },
        ])
    );
    assert_eq!(
        favorites["GlobalSecondaryIndexes"][0]["IndexName"],
        "galleryId-index"
    );

    let galleries = &template.resources["GalleriesTable"].properties;
    assert_eq!(
        galleries["GlobalSecondaryIndexes"][0]["KeySchema"],
        json!([
            { "AttributeName": "photographerId", "KeyType": "HASH" },
            { "AttributeName": "createdAt", "KeyType": "RANGE" },
        ])
    );

    let photos = &template.resources["PhotosTable"].properties;
    assert!(photos.get("GlobalSecondaryIndexes").is_none());
}

#[test]
fn test_client_sessions_expire() {
    let template = DatabaseStack::new("gallery", Stage::Dev).synthesize().unwrap();
    let sessions = &template.resources["ClientSessionsTable"].properties;

    assert_eq!(
        sessions["TimeToLiveSpecification"],
        json!({ "AttributeName": "expiresAt", "Enabled": true })
    );
}

#[test]
fn test_production_tables_are_retained() {
    let prod = DatabaseStack::new("gallery", Stage::Prod).synthesize().unwrap();
    let dev = DatabaseStack::new("gallery", Stage::Dev).synthesize().unwrap();

    let prod_table = &prod.resources["GalleriesTable"];
    assert_eq!(prod_table.deletion_policy, Some(DeletionPolicy::Retain));
    assert_eq!(prod_table.update_replace_policy, Some(DeletionPolicy::Retain));
    assert_eq!(
        prod_table.properties["PointInTimeRecoverySpecification"]["PointInTimeRecoveryEnabled"],
        true
    );

    let dev_table = &dev.resources["GalleriesTable"];
    assert_eq!(dev_table.deletion_policy, Some(DeletionPolicy::Delete));
    assert!(dev_table
        .properties
        .get("PointInTimeRecoverySpecification")
        .is_none());
}

#[test]
fn test_database_validation() {
    let mut stack = DatabaseStack::new("gallery", Stage::Dev);
    stack.tables.push(TableDefinition::new("photos", "photoId"));
    assert!(matches!(stack.synthesize(), Err(Error::Infra { .. })));

    let stack = DatabaseStack::new("Gallery App", Stage::Dev);
    assert!(stack.synthesize().is_err());

    let mut stack = DatabaseStack::new("gallery", Stage::Dev);
    stack.tables.clear();
    assert!(stack.synthesize().is_err());

    let mut stack = DatabaseStack::new("gallery", Stage::Dev);
    stack.tables = vec![TableDefinition::new("orders", "orderId")
        .index(GlobalIndex::on("customerId"))
        .index(GlobalIndex::on("customerId"))];
    assert!(stack.synthesize().is_err());

    let mut stack = DatabaseStack::new("gallery", Stage::Dev);
    stack
        .tables
        .push(TableDefinition::new("client_sessions", "sessionToken"));
    let err = stack.synthesize().unwrap_err();
    assert!(err
        .to_string()
        .contains("map to the same logical id ClientSessionsTable"));
}

#[test]
fn test_conflicting_attribute_types() {
    let mut stack = DatabaseStack::new("gallery", Stage::Dev);
    stack.tables = vec![TableDefinition::new("events", "eventId").index(GlobalIndex {
        name: "by-id".to_string(),
        partition_key: KeyAttribute::number("eventId"),
        sort_key: None,
    })];

    let err = stack.synthesize().unwrap_err();
    assert!(err.to_string().contains("declared as both S and N"));
}

#[test]
fn test_logical_ids() {
    assert_eq!(
        TableDefinition::new("client-sessions", "x").logical_id(),
        "ClientSessionsTable"
    );
    assert_eq!(
        TableDefinition::new("photo_tags", "x").logical_id(),
        "PhotoTagsTable"
    );
}

// ============================================================================
// DNS stack
// ============================================================================

#[test]
fn test_dns_stack_resources_and_exports() {
    let stack = DnsStack::new("gallery", Stage::Prod, "Example.com.");
    let template = stack.synthesize().unwrap();

    assert_eq!(stack.base_domain, "example.com");
    assert_eq!(stack.name(), "gallery-dns-prod");

    let zone = &template.resources["HostedZone"];
    assert_eq!(zone.resource_type, "AWS::Route53::HostedZone");
    assert_eq!(zone.properties["Name"], "example.com");

    let cert = &template.resources["WildcardCertificate"].properties;
    assert_eq!(cert["DomainName"], "*.example.com");
    assert_eq!(cert["SubjectAlternativeNames"], json!(["example.com"]));
    assert_eq!(cert["ValidationMethod"], "DNS");
    assert_eq!(
        cert["DomainValidationOptions"][1],
        json!({ "DomainName": "example.com", "HostedZoneId": { "Ref": "HostedZone" } })
    );

    let mut exports = template.export_names();
    exports.sort_unstable();
    assert_eq!(
        exports,
        vec!["BaseDomain-prod", "HostedZoneId-prod", "WildcardCertificateArn-prod"]
    );
    assert_eq!(template.outputs["BaseDomain"].value, json!("example.com"));
    assert!(template.outputs["NameServers"].export.is_none());
}

#[test]
fn test_validate_domain() {
    validate_domain("example.com").unwrap();
    validate_domain("photos.example.co.uk").unwrap();
    validate_domain("my-gallery.io").unwrap();

    assert!(validate_domain("").is_err());
    assert!(validate_domain("localhost").is_err());
    assert!(validate_domain("*.example.com").is_err());
    assert!(validate_domain("example..com").is_err());
    assert!(validate_domain("-bad.com").is_err());
    assert!(validate_domain("under_score.com").is_err());
    assert!(validate_domain(&format!("{}.com", "a".repeat(64))).is_err());
}

#[test]
fn test_dns_stack_rejects_bad_domain() {
    let stack = DnsStack::new("gallery", Stage::Dev, "not a domain");
    assert!(matches!(stack.synthesize(), Err(Error::Infra { .. })));
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn test_template_serialization() {
    let template = DnsStack::new("gallery", Stage::Dev, "example.com")
        .synthesize()
        .unwrap();
    let value = serde_json::to_value(&template).unwrap();

    assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(value["Resources"]["HostedZone"]["Type"], "AWS::Route53::HostedZone");
    assert!(value["Resources"]["HostedZone"].get("DeletionPolicy").is_none());
    assert_eq!(
        value["Outputs"]["HostedZoneId"]["Export"]["Name"],
        "HostedZoneId-dev"
    );
    assert_eq!(
        value["Outputs"]["NameServers"]["Value"],
        json!({ "Fn::Join": [",", { "Fn::GetAtt": ["HostedZone", "NameServers"] }] })
    );
}

#[test]
fn test_synthesis_is_deterministic() {
    let infra = GalleryInfra::new("gallery", Stage::Dev, "example.com");
    let first = infra.synthesize(StackSelection::All).unwrap();
    let second = infra.synthesize(StackSelection::All).unwrap();

    assert_eq!(
        first["gallery-database-dev"].to_json_pretty().unwrap(),
        second["gallery-database-dev"].to_json_pretty().unwrap()
    );
}

#[test]
fn test_stack_selection() {
    let infra = GalleryInfra::new("gallery", Stage::Prod, "example.com");

    let all: Vec<String> = infra
        .synthesize(StackSelection::All)
        .unwrap()
        .into_keys()
        .collect();
    assert_eq!(all, vec!["gallery-database-prod", "gallery-dns-prod"]);

    let dns = infra.synthesize(StackSelection::Dns).unwrap();
    assert_eq!(dns.len(), 1);
    assert!(dns.contains_key("gallery-dns-prod"));
}
