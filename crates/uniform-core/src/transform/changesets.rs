//! Changeset renaming macro.
//!
//! The template generator emits every Prepare/Deploy action with the
//! same fixed changeset name. Across a multi-account deployment that
//! name must be unique per pipeline, so it is rewritten to carry the
//! pipeline's own name. Anything other than the expected literal means
//! the generator drifted from this transform's assumptions and the
//! macro aborts rather than guess.

use crate::error::{Result, UniformError};
use crate::template::{ActionNode, PipelineResource, TemplateFragment};
use serde_json::Value;
use tracing::debug;

const PREPARE_ACTION: &str = "Prepare";
const DEPLOY_ACTION: &str = "Deploy";
const PREVIOUS_CHANGESET_NAME: &str = "PipelineChange";
const CHANGESET_NAME_KEY: &str = "ChangeSetName";

pub fn rename(fragment: &mut TemplateFragment) -> Result<()> {
    for pipeline in fragment.pipelines_mut() {
        rename_pipeline(pipeline)?;
    }
    Ok(())
}

fn rename_pipeline(pipeline: &mut PipelineResource) -> Result<()> {
    // A nameless pipeline cannot be disambiguated across accounts.
    let pipeline_name = pipeline
        .properties
        .name
        .clone()
        .ok_or(UniformError::NamelessPipeline)?;
    debug!(pipeline = %pipeline_name, "renaming changesets");

    for stage in &mut pipeline.properties.stages {
        for action in &mut stage.actions {
            if action.name == PREPARE_ACTION || action.name == DEPLOY_ACTION {
                alter_changeset_name(action, &pipeline_name)?;
            }
        }
    }
    Ok(())
}

fn alter_changeset_name(action: &mut ActionNode, pipeline_name: &str) -> Result<()> {
    let action_name = action.name.clone();
    let Some(configuration) = action.configuration.as_mut() else {
        return Err(UniformError::UnexpectedActionConfiguration {
            action: action_name,
            found: "<missing>".to_string(),
        });
    };

    let found = configuration
        .get(CHANGESET_NAME_KEY)
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    if found != PREVIOUS_CHANGESET_NAME {
        return Err(UniformError::UnexpectedActionConfiguration {
            action: action_name,
            found,
        });
    }

    configuration.insert(
        CHANGESET_NAME_KEY.to_string(),
        Value::String(format!("UniformPipelineChange-{pipeline_name}")),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment_with_changeset(changeset_name: &str) -> TemplateFragment {
        TemplateFragment::from_value(json!({
            "Resources": {
                "Pipeline1": {
                    "Type": "AWS::CodePipeline::Pipeline",
                    "Properties": {
                        "Name": "my-pipe",
                        "Stages": [
                            {
                                "Name": "deployment-test-1-eu-west-1",
                                "Actions": [
                                    {
                                        "Name": "Prepare",
                                        "Configuration": {"ChangeSetName": changeset_name}
                                    },
                                    {
                                        "Name": "Deploy",
                                        "Configuration": {"ChangeSetName": changeset_name}
                                    },
                                    {
                                        "Name": "other-action",
                                        "Configuration": {"ChangeSetName": "untouched"}
                                    }
                                ]
                            }
                        ]
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn renames_prepare_and_deploy_actions() {
        let mut fragment = fragment_with_changeset("PipelineChange");
        rename(&mut fragment).unwrap();

        let out = fragment.into_value().unwrap();
        let actions = &out["Resources"]["Pipeline1"]["Properties"]["Stages"][0]["Actions"];
        assert_eq!(
            actions[0]["Configuration"]["ChangeSetName"],
            "UniformPipelineChange-my-pipe"
        );
        assert_eq!(
            actions[1]["Configuration"]["ChangeSetName"],
            "UniformPipelineChange-my-pipe"
        );
        // Actions outside the Prepare/Deploy pair are left alone.
        assert_eq!(actions[2]["Configuration"]["ChangeSetName"], "untouched");
    }

    #[test]
    fn unexpected_changeset_literal_is_fatal() {
        let mut fragment = fragment_with_changeset("SomethingElse");
        let err = rename(&mut fragment).unwrap_err();
        assert!(matches!(
            err,
            UniformError::UnexpectedActionConfiguration { action, found }
                if action == "Prepare" && found == "SomethingElse"
        ));
    }

    #[test]
    fn missing_configuration_is_fatal() {
        let mut fragment = TemplateFragment::from_value(json!({
            "Resources": {
                "Pipeline1": {
                    "Type": "AWS::CodePipeline::Pipeline",
                    "Properties": {
                        "Name": "my-pipe",
                        "Stages": [
                            {"Name": "Source", "Actions": [{"Name": "Deploy"}]}
                        ]
                    }
                }
            }
        }))
        .unwrap();
        let err = rename(&mut fragment).unwrap_err();
        assert!(matches!(
            err,
            UniformError::UnexpectedActionConfiguration { found, .. } if found == "<missing>"
        ));
    }

    #[test]
    fn nameless_pipeline_is_fatal() {
        let mut fragment = TemplateFragment::from_value(json!({
            "Resources": {
                "Pipeline1": {
                    "Type": "AWS::CodePipeline::Pipeline",
                    "Properties": {"Stages": []}
                }
            }
        }))
        .unwrap();
        let err = rename(&mut fragment).unwrap_err();
        assert!(matches!(err, UniformError::NamelessPipeline));
    }

    #[test]
    fn fragment_without_pipelines_is_untouched() {
        let value = json!({
            "Resources": {
                "Bucket": {"Type": "AWS::S3::Bucket", "Properties": {}}
            }
        });
        let mut fragment = TemplateFragment::from_value(value.clone()).unwrap();
        rename(&mut fragment).unwrap();
        assert_eq!(fragment.into_value().unwrap(), value);
    }
}
