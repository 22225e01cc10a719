//! Typed model of a deployment-template fragment.
//!
//! The template macros receive a CloudFormation fragment as loose JSON.
//! Rather than walking `serde_json::Value` everywhere, the handful of
//! resource kinds the macros recognize are parsed into a closed tagged
//! union; everything else rides along untouched as `Other` and
//! round-trips byte-for-byte. Unknown fields on recognized resources
//! are preserved through `#[serde(flatten)]`.

use crate::error::{Result, UniformError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PIPELINE_TYPE: &str = "AWS::CodePipeline::Pipeline";
pub const CODEBUILD_PROJECT_TYPE: &str = "AWS::CodeBuild::Project";
pub const IAM_ROLE_TYPE: &str = "AWS::IAM::Role";
pub const IAM_POLICY_TYPE: &str = "AWS::IAM::Policy";

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A template resource, classified by its CloudFormation `Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Pipeline(PipelineResource),
    CodeBuildProject(CodeBuildProject),
    IamRole(Value),
    IamPolicy(Value),
    Other(Value),
}

impl Resource {
    pub fn from_value(logical_name: &str, value: Value) -> Result<Resource> {
        let resource_type = value
            .get("Type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match resource_type.as_str() {
            PIPELINE_TYPE => serde_json::from_value(value)
                .map(Resource::Pipeline)
                .map_err(|e| malformed(logical_name, e)),
            CODEBUILD_PROJECT_TYPE => serde_json::from_value(value)
                .map(Resource::CodeBuildProject)
                .map_err(|e| malformed(logical_name, e)),
            IAM_ROLE_TYPE => Ok(Resource::IamRole(value)),
            IAM_POLICY_TYPE => Ok(Resource::IamPolicy(value)),
            _ => Ok(Resource::Other(value)),
        }
    }

    pub fn into_value(self) -> Result<Value> {
        Ok(match self {
            Resource::Pipeline(p) => serde_json::to_value(p)?,
            Resource::CodeBuildProject(p) => serde_json::to_value(p)?,
            Resource::IamRole(v) | Resource::IamPolicy(v) | Resource::Other(v) => v,
        })
    }

    /// IAM roles and policies are the resources the role reassignment
    /// macro strips from the fragment.
    pub fn is_iam(&self) -> bool {
        matches!(self, Resource::IamRole(_) | Resource::IamPolicy(_))
    }
}

fn malformed(logical_name: &str, err: serde_json::Error) -> UniformError {
    UniformError::MalformedResource {
        name: logical_name.to_string(),
        reason: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// PipelineResource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties")]
    pub properties: PipelineProperties,
    /// Dependency edge onto the auto-generated pipeline role; dropped
    /// when that role is replaced by the shared one.
    #[serde(rename = "DependsOn", default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineProperties {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "RoleArn", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<Value>,
    #[serde(rename = "Stages", default)]
    pub stages: Vec<StageNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageNode {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Actions", default)]
    pub actions: Vec<ActionNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RoleArn", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<Value>,
    #[serde(rename = "Configuration", default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// CodeBuildProject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBuildProject {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties")]
    pub properties: CodeBuildProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBuildProperties {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "ServiceRole", default, skip_serializing_if = "Option::is_none")]
    pub service_role: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// TemplateFragment
// ---------------------------------------------------------------------------

/// A template fragment: the `Resources` map parsed into typed
/// resources, plus all other top-level sections passed through.
/// Resource order is preserved so the transformed output diffs cleanly
/// against the generator's.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFragment {
    pub resources: Vec<(String, Resource)>,
    extra: Map<String, Value>,
}

impl TemplateFragment {
    pub fn from_value(value: Value) -> Result<TemplateFragment> {
        let mut root = match value {
            Value::Object(map) => map,
            other => {
                return Err(UniformError::MalformedResource {
                    name: "<fragment>".to_string(),
                    reason: format!("expected an object, found {other}"),
                })
            }
        };

        let mut resources = Vec::new();
        if let Some(section) = root.remove("Resources") {
            let section = match section {
                Value::Object(map) => map,
                other => {
                    return Err(UniformError::MalformedResource {
                        name: "Resources".to_string(),
                        reason: format!("expected an object, found {other}"),
                    })
                }
            };
            for (logical_name, resource) in section {
                let parsed = Resource::from_value(&logical_name, resource)?;
                resources.push((logical_name, parsed));
            }
        }

        Ok(TemplateFragment {
            resources,
            extra: root,
        })
    }

    pub fn into_value(self) -> Result<Value> {
        let mut root = self.extra;
        let mut section = Map::new();
        for (logical_name, resource) in self.resources {
            section.insert(logical_name, resource.into_value()?);
        }
        root.insert("Resources".to_string(), Value::Object(section));
        Ok(Value::Object(root))
    }

    pub fn pipelines_mut(&mut self) -> impl Iterator<Item = &mut PipelineResource> {
        self.resources.iter_mut().filter_map(|(_, r)| match r {
            Resource::Pipeline(p) => Some(p),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_fragment() -> Value {
        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "Pipeline1": {
                    "Type": "AWS::CodePipeline::Pipeline",
                    "DependsOn": ["PipelineRole"],
                    "Properties": {
                        "Name": "orders-api-1.2.3-uniform-pipeline",
                        "RoleArn": {"Fn::GetAtt": ["PipelineRole", "Arn"]},
                        "Stages": [
                            {
                                "Name": "Source",
                                "Actions": [
                                    {"Name": "S3Source", "RoleArn": "arn:aws:iam::1:role/x"}
                                ]
                            }
                        ],
                        "RestartExecutionOnUpdate": true
                    }
                },
                "PipelineRole": {
                    "Type": "AWS::IAM::Role",
                    "Properties": {"AssumeRolePolicyDocument": {}}
                },
                "Bucket": {
                    "Type": "AWS::S3::Bucket",
                    "Properties": {"BucketName": "artifacts"}
                }
            }
        })
    }

    #[test]
    fn classifies_resources() {
        let fragment = TemplateFragment::from_value(sample_fragment()).unwrap();
        assert_eq!(fragment.resources.len(), 3);
        let kinds: Vec<bool> = fragment.resources.iter().map(|(_, r)| r.is_iam()).collect();
        assert_eq!(kinds.iter().filter(|iam| **iam).count(), 1);

        let pipeline = fragment
            .resources
            .iter()
            .find_map(|(_, r)| match r {
                Resource::Pipeline(p) => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            pipeline.properties.name.as_deref(),
            Some("orders-api-1.2.3-uniform-pipeline")
        );
        assert_eq!(pipeline.properties.stages.len(), 1);
        assert_eq!(pipeline.properties.stages[0].actions[0].name, "S3Source");
    }

    #[test]
    fn roundtrip_preserves_unknown_fields() {
        let original = sample_fragment();
        let fragment = TemplateFragment::from_value(original.clone()).unwrap();
        let out = fragment.into_value().unwrap();

        assert_eq!(out["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(
            out["Resources"]["Pipeline1"]["Properties"]["RestartExecutionOnUpdate"],
            json!(true)
        );
        assert_eq!(out["Resources"]["Bucket"], original["Resources"]["Bucket"]);
        assert_eq!(
            out["Resources"]["Pipeline1"]["DependsOn"],
            json!(["PipelineRole"])
        );
    }

    #[test]
    fn non_object_fragment_is_malformed() {
        let err = TemplateFragment::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, UniformError::MalformedResource { .. }));
    }

    #[test]
    fn pipeline_without_stages_parses() {
        let fragment = TemplateFragment::from_value(json!({
            "Resources": {
                "P": {"Type": "AWS::CodePipeline::Pipeline", "Properties": {"Name": "p"}}
            }
        }))
        .unwrap();
        let (_, resource) = &fragment.resources[0];
        match resource {
            Resource::Pipeline(p) => assert!(p.properties.stages.is_empty()),
            other => panic!("expected pipeline, found {other:?}"),
        }
    }
}
