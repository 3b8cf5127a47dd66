//! DNS and certificate stack
//!
//! A Route53 hosted zone for the base domain and one DNS-validated ACM
//! certificate covering `*.<base>` and `<base>`.

use super::database::validate_app_name;
use super::template::{get_att, join, reference, Output, Resource, Template};
use super::Stack;
use crate::error::{Error, Result};
use crate::types::Stage;
use serde_json::json;

const HOSTED_ZONE_ID: &str = "HostedZone";
const CERTIFICATE_ID: &str = "WildcardCertificate";

/// Hosted zone + wildcard certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsStack {
    pub app_name: String,
    pub stage: Stage,
    pub base_domain: String,
}

impl DnsStack {
    /// Create the stack. The domain is normalized to lowercase without a trailing dot.
    pub fn new(app_name: impl Into<String>, stage: Stage, base_domain: &str) -> Self {
        Self {
            app_name: app_name.into(),
            stage,
            base_domain: normalize_domain(base_domain),
        }
    }

    /// The certificate's primary name
    pub fn wildcard_domain(&self) -> String {
        format!("*.{}", self.base_domain)
    }

    /// Export name of the hosted zone id
    pub fn hosted_zone_export(&self) -> String {
        format!("HostedZoneId-{}", self.stage)
    }

    /// Export name of the certificate ARN
    pub fn certificate_export(&self) -> String {
        format!("WildcardCertificateArn-{}", self.stage)
    }

    /// Export name of the base domain
    pub fn base_domain_export(&self) -> String {
        format!("BaseDomain-{}", self.stage)
    }
}

impl Stack for DnsStack {
    fn name(&self) -> String {
        format!("{}-dns-{}", self.app_name, self.stage)
    }

    fn synthesize(&self) -> Result<Template> {
        validate_app_name("dns", &self.app_name)?;
        validate_domain(&self.base_domain)?;

        let mut template = Template::new(format!(
            "Hosted zone and wildcard certificate for {} ({} stage)",
            self.base_domain, self.stage
        ));

        template.add_resource(
            HOSTED_ZONE_ID,
            Resource::new(
                "AWS::Route53::HostedZone",
                json!({ "Name": self.base_domain }),
            ),
        );

        let wildcard = self.wildcard_domain();
        let zone = reference(HOSTED_ZONE_ID);
        template.add_resource(
            CERTIFICATE_ID,
            Resource::new(
                "AWS::CertificateManager::Certificate",
                json!({
                    "DomainName": wildcard,
                    "SubjectAlternativeNames": [self.base_domain],
                    "ValidationMethod": "DNS",
                    "DomainValidationOptions": [
                        { "DomainName": wildcard, "HostedZoneId": zone },
                        { "DomainName": self.base_domain, "HostedZoneId": zone },
                    ],
                }),
            ),
        );

        template.add_output(
            "HostedZoneId",
            Output::new(reference(HOSTED_ZONE_ID))
                .description("Route53 hosted zone id")
                .export(self.hosted_zone_export()),
        );
        template.add_output(
            "WildcardCertificateArn",
            Output::new(reference(CERTIFICATE_ID))
                .description(format!("ACM certificate for {wildcard}"))
                .export(self.certificate_export()),
        );
        template.add_output(
            "BaseDomain",
            Output::new(json!(self.base_domain))
                .description("Apex domain served by the hosted zone")
                .export(self.base_domain_export()),
        );
        // Not exported: only needed once, to delegate from the registrar
        template.add_output(
            "NameServers",
            Output::new(join(",", get_att(HOSTED_ZONE_ID, "NameServers")))
                .description("Name servers to configure at the registrar"),
        );

        Ok(template)
    }
}

/// Lowercase, trimmed, without the trailing root dot
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Check that `domain` is a plain DNS name with at least two labels
pub fn validate_domain(domain: &str) -> Result<()> {
    let fail = |message: String| Err(Error::infra("dns", message));

    if domain.is_empty() {
        return fail("base domain is empty".to_string());
    }
    if domain.len() > 253 {
        return fail(format!("domain '{domain}' is longer than 253 characters"));
    }
    if domain.starts_with("*.") {
        return fail(format!("base domain '{domain}' must not be a wildcard"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return fail(format!("domain '{domain}' needs at least two labels"));
    }

    for label in labels {
        let valid = !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            return fail(format!("invalid label '{label}' in domain '{domain}'"));
        }
    }

    Ok(())
}
