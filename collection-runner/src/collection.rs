//! Collection files: settings, initial environment and the scripted steps.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use workflows::core::operator::{Operator, compile_pattern};
use workflows::io::config::load_config;
use workflows::{CheckDef, PollConfig, Response, VariableDef};

pub const COLLECTION_SCHEMA: &str = include_str!("../schemas/collection.schema.json");

pub const DEFAULT_MAX_EXECUTIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub poll: PollConfig,
    /// Hard cap on step invocations for one run.
    pub max_executions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            max_executions: DEFAULT_MAX_EXECUTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
    pub name: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Invocation N answers with entry N; the last entry repeats.
    #[serde(default)]
    pub responses: Vec<ScriptedResponse>,
    #[serde(default)]
    pub populate: Vec<VariableDef>,
    /// `None` runs a status-only check (unless `populate` already did).
    #[serde(default)]
    pub checks: Option<Vec<CheckDef>>,
    #[serde(default)]
    pub extend_get_404: bool,
    #[serde(default)]
    pub poll: Option<PollDef>,
    #[serde(default)]
    pub clear_runtime_vars: Option<ClearMode>,
    #[serde(default)]
    pub expect: Option<Vec<(String, u8)>>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl StepDef {
    /// Step with a single canned 200 response and nothing else.
    pub fn passthrough(name: &str) -> Self {
        Self {
            name: name.to_string(),
            method: default_method(),
            responses: Vec::new(),
            populate: Vec::new(),
            checks: None,
            extend_get_404: false,
            poll: None,
            clear_runtime_vars: None,
            expect: None,
        }
    }

    /// Response for the `invocation`-th run of this step (0-based).
    pub fn response(&self, invocation: usize) -> Response {
        let scripted = self
            .responses
            .get(invocation)
            .or_else(|| self.responses.last());
        match scripted {
            Some(scripted) => Response::new(self.method.as_str(), scripted.status, scripted.raw_body()),
            None => Response::new(self.method.as_str(), 200, ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    /// A string is sent verbatim; anything else is sent as JSON.
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_status() -> u16 {
    200
}

impl ScriptedResponse {
    pub fn raw_body(&self) -> String {
        match &self.body {
            None => String::new(),
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDef {
    pub next: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearMode {
    Clear,
    Delete,
}

impl Collection {
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name == name)
    }

    pub fn delay_step_name(&self) -> &str {
        &self.settings.poll.delay_step
    }
}

/// Read, schema-check and validate a collection file.
pub fn load_collection(path: &Path) -> Result<Collection> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read collection {}", path.display()))?;
    parse_collection(&contents).with_context(|| format!("load collection {}", path.display()))
}

/// Load a collection and, when `poll_config` is given, replace its poll
/// settings with that file's. `max_executions` stays with the collection.
pub fn load_with_poll_config(path: &Path, poll_config: Option<&Path>) -> Result<Collection> {
    let mut collection = load_collection(path)?;
    if let Some(config_path) = poll_config {
        collection.settings.poll = load_config(config_path)?;
    }
    Ok(collection)
}

/// Parse a collection from TOML text (schema + semantic validation).
pub fn parse_collection(contents: &str) -> Result<Collection> {
    let raw: Value = toml::from_str(contents).context("parse collection toml")?;
    validate_schema(&raw)?;
    let collection: Collection =
        serde_json::from_value(raw).context("deserialize collection")?;
    let errors = validate_collection(&collection);
    if !errors.is_empty() {
        return Err(anyhow!("invalid collection:\n- {}", errors.join("\n- ")));
    }
    Ok(collection)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(COLLECTION_SCHEMA).context("parse collection schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile collection schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!("schema validation failed:\n- {}", messages.join("\n- ")));
    }
    Ok(())
}

/// Semantic checks the schema cannot express: unique step names, known
/// operators, compilable patterns and resolvable poll targets.
pub fn validate_collection(collection: &Collection) -> Vec<String> {
    let mut errors = Vec::new();
    if let Err(err) = collection.settings.poll.validate() {
        errors.push(format!("settings: {err}"));
    }

    let mut seen = HashSet::new();
    for step in &collection.steps {
        if !seen.insert(step.name.as_str()) {
            errors.push(format!("duplicate step name '{}'", step.name));
        }
    }

    for step in &collection.steps {
        for (i, check) in step.checks.iter().flatten().enumerate() {
            let op = check.op.as_deref().unwrap_or("==");
            match op.parse::<Operator>() {
                Ok(Operator::Regex) => {
                    if let Some(value) = &check.value {
                        if let Err(err) = compile_pattern(value) {
                            errors.push(format!("step '{}' check {i}: {err}", step.name));
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => errors.push(format!("step '{}' check {i}: {err}", step.name)),
            }
        }
        if let Some(poll) = &step.poll {
            if collection.step_index(&poll.next).is_none() {
                errors.push(format!(
                    "step '{}' polls into unknown step '{}'",
                    step.name, poll.next
                ));
            }
        }
    }
    errors
}
