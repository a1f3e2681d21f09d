//! # Assessment Projection
//!
//! An assessment is the risk record a policy is evaluated against. The
//! evaluator only ever sees its projection: a flat [`EvaluationContext`]
//! with a fixed set of typed fields plus any caller-defined custom fields
//! under `custom.<key>`.
//!
//! | Context field | Type | Absent as |
//! |---|---|---|
//! | `jurisdictions`, `dataTypes`, `techStack`, `deploymentRegions`, `vendors` | string array | `[]` |
//! | `industry`, `systemCriticality`, `riskLevel`, `name`, `status` | string | null |
//! | `riskScore`, `complianceScore`, `vendorRiskScore` | number | null |
//! | `processesPersonalData`, `humanOversight` | boolean | null |

use std::collections::BTreeMap;

use rgov_core::{AssessmentId, FieldValue, GeographyAccountId};
use rgov_logic::EvaluationContext;
use serde::{Deserialize, Serialize};

/// Prefix under which custom fields are projected.
pub const CUSTOM_FIELD_PREFIX: &str = "custom.";

/// A risk assessment as supplied by the assessment store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub geography_account_id: GeographyAccountId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub system_criticality: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub compliance_score: Option<f64>,
    #[serde(default)]
    pub vendor_risk_score: Option<f64>,
    #[serde(default)]
    pub processes_personal_data: Option<bool>,
    #[serde(default)]
    pub human_oversight: Option<bool>,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    #[serde(default)]
    pub data_types: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub deployment_regions: Vec<String>,
    #[serde(default)]
    pub vendors: Vec<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

impl Assessment {
    /// An assessment with only its identity set.
    pub fn new(id: AssessmentId, geography_account_id: GeographyAccountId) -> Self {
        Self {
            id,
            geography_account_id,
            name: None,
            status: None,
            industry: None,
            system_criticality: None,
            risk_level: None,
            risk_score: None,
            compliance_score: None,
            vendor_risk_score: None,
            processes_personal_data: None,
            human_oversight: None,
            jurisdictions: Vec::new(),
            data_types: Vec::new(),
            tech_stack: Vec::new(),
            deployment_regions: Vec::new(),
            vendors: Vec::new(),
            custom_fields: BTreeMap::new(),
        }
    }
}

/// Project an assessment onto an evaluation context. Pure; no I/O.
pub fn build_context(assessment: &Assessment) -> EvaluationContext {
    let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();
    let mut put = |name: &str, value: FieldValue| {
        fields.insert(name.to_string(), value);
    };

    put("jurisdictions", assessment.jurisdictions.clone().into());
    put("dataTypes", assessment.data_types.clone().into());
    put("techStack", assessment.tech_stack.clone().into());
    put("deploymentRegions", assessment.deployment_regions.clone().into());
    put("vendors", assessment.vendors.clone().into());

    put("industry", assessment.industry.clone().into());
    put("systemCriticality", assessment.system_criticality.clone().into());
    put("riskLevel", assessment.risk_level.clone().into());
    put("name", assessment.name.clone().into());
    put("status", assessment.status.clone().into());

    put("riskScore", finite(assessment.risk_score));
    put("complianceScore", finite(assessment.compliance_score));
    put("vendorRiskScore", finite(assessment.vendor_risk_score));

    put("processesPersonalData", assessment.processes_personal_data.into());
    put("humanOversight", assessment.human_oversight.into());

    for (key, raw) in &assessment.custom_fields {
        let value = FieldValue::try_from(raw).unwrap_or_else(|reason| {
            tracing::debug!(
                assessment = %assessment.id,
                field = %key,
                %reason,
                "custom field projected as null"
            );
            FieldValue::Null
        });
        put(&format!("{CUSTOM_FIELD_PREFIX}{key}"), value);
    }

    EvaluationContext::from_fields(fields)
}

fn finite(n: Option<f64>) -> FieldValue {
    n.filter(|v| v.is_finite()).into()
}
