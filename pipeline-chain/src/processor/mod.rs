//! Output of the configuration processor.
//!
//! The processor that parses user configuration lives outside this crate;
//! these types are the boundary it hands to the chain. Everything is
//! serde-deserializable so processors can pass JSON through unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// When a job (or pipeline) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    /// Run when earlier stages succeed.
    #[default]
    OnSuccess,
    /// Run when an earlier stage fails.
    OnFailure,
    /// Always run.
    Always,
    /// Wait for a manual action.
    Manual,
    /// Never run; excluded from the pipeline.
    Never,
}

impl fmt::Display for When {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnSuccess => write!(f, "on_success"),
            Self::OnFailure => write!(f, "on_failure"),
            Self::Always => write!(f, "always"),
            Self::Manual => write!(f, "manual"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// A single rule clause.
///
/// A rule matches when it has no `if_ref` pattern or the pattern matches the
/// pipeline's ref name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    /// Regular expression matched against the ref name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_ref: Option<String>,
    /// Outcome when the rule matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,
}

impl Rule {
    /// A rule matching refs by pattern.
    #[must_use]
    pub fn if_ref(pattern: impl Into<String>, when: When) -> Self {
        Self {
            if_ref: Some(pattern.into()),
            when: Some(when),
        }
    }

    /// A rule matching every ref.
    #[must_use]
    pub fn always(when: When) -> Self {
        Self {
            if_ref: None,
            when: Some(when),
        }
    }
}

/// A declared dependency on another job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Need {
    /// The needed job's name.
    pub job: String,
    /// Whether artifacts are downloaded from the needed job.
    pub artifacts: bool,
    /// Whether the need may be dropped when the job is excluded.
    pub optional: bool,
}

impl Need {
    /// A required need with artifacts.
    #[must_use]
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            artifacts: true,
            optional: false,
        }
    }

    /// Marks the need optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Skips artifact download.
    #[must_use]
    pub fn without_artifacts(mut self) -> Self {
        self.artifacts = false;
        self
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NeedRepr {
    Name(String),
    Full {
        job: String,
        #[serde(default = "default_true")]
        artifacts: bool,
        #[serde(default)]
        optional: bool,
    },
}

impl<'de> Deserialize<'de> for Need {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match NeedRepr::deserialize(deserializer)? {
            NeedRepr::Name(job) => Self::new(job),
            NeedRepr::Full {
                job,
                artifacts,
                optional,
            } => Self {
                job,
                artifacts,
                optional,
            },
        })
    }
}

/// One job as declared in configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobAttributes {
    /// The job name.
    pub name: String,
    /// Script lines.
    #[serde(default)]
    pub script: Vec<String>,
    /// Declared dependencies.
    #[serde(default)]
    pub needs: Vec<Need>,
    /// Inclusion rules.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// When the job runs.
    #[serde(default)]
    pub when: When,
    /// Whether failure is tolerated.
    #[serde(default)]
    pub allow_failure: bool,
    /// Processor-specific options carried through untouched.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl JobAttributes {
    /// Creates a job with a single script line.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            script: vec![format!("echo {name}")],
            name,
            ..Self::default()
        }
    }

    /// Adds a need.
    #[must_use]
    pub fn needs(mut self, need: impl Into<Need>) -> Self {
        self.needs.push(need.into());
        self
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets when the job runs.
    #[must_use]
    pub fn with_when(mut self, when: When) -> Self {
        self.when = when;
        self
    }
}

impl From<&str> for Need {
    fn from(job: &str) -> Self {
        Self::new(job)
    }
}

/// One stage as declared in configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageAttributes {
    /// The stage name.
    pub name: String,
    /// The stage position; defaults to declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// The stage's jobs in declaration order.
    #[serde(default)]
    pub builds: Vec<JobAttributes>,
}

impl StageAttributes {
    /// Creates a stage.
    #[must_use]
    pub fn new(name: impl Into<String>, builds: Vec<JobAttributes>) -> Self {
        Self {
            name: name.into(),
            index: None,
            builds,
        }
    }
}

/// The processed configuration handed to the chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessorResult {
    /// Stages in declaration order.
    #[serde(default)]
    pub stages_attributes: Vec<StageAttributes>,
    /// Pipeline-level rules.
    #[serde(default)]
    pub workflow_rules: Vec<Rule>,
}

impl ProcessorResult {
    /// Creates a result from stages.
    #[must_use]
    pub fn new(stages_attributes: Vec<StageAttributes>) -> Self {
        Self {
            stages_attributes,
            workflow_rules: Vec::new(),
        }
    }

    /// Sets the workflow rules.
    #[must_use]
    pub fn with_workflow_rules(mut self, rules: Vec<Rule>) -> Self {
        self.workflow_rules = rules;
        self
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
