//! The pipeline seed graph and its construction.

use super::rules::{self, Evaluation, InvalidPattern};
use super::{cycles, BuildSeed, NeedSeed, StageSeed};
use crate::core::Pipeline;
use crate::errors::SeedError;
use crate::processor::{JobAttributes, StageAttributes, When};
use std::collections::{HashMap, HashSet};

/// Default upper bound on needs per job.
pub const DEFAULT_MAX_NEEDS: usize = 50;

/// Limits applied while building a seed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedLimits {
    /// Maximum needs a single job may declare.
    pub max_needs: usize,
}

impl Default for SeedLimits {
    fn default() -> Self {
        Self {
            max_needs: DEFAULT_MAX_NEEDS,
        }
    }
}

/// The in-memory stages and jobs of a pipeline, before persistence.
///
/// Construction never fails: every structural problem found in the
/// configuration is collected and reported through [`errors`](Self::errors)
/// so a user sees all of them at once.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSeed {
    stages: Vec<StageSeed>,
    errors: Vec<SeedError>,
}

impl PipelineSeed {
    /// Builds the seed graph for `pipeline` from processed stages.
    #[must_use]
    pub fn new(pipeline: &Pipeline, stages_attributes: &[StageAttributes], limits: &SeedLimits) -> Self {
        let mut errors = Vec::new();
        let mut declared: HashMap<&str, &str> = HashMap::new();
        let mut excluded: HashSet<&str> = HashSet::new();
        let mut stage_names: HashSet<&str> = HashSet::new();
        let mut positions: HashMap<usize, &str> = HashMap::new();
        let mut candidates: Vec<(&StageAttributes, usize, Vec<(&JobAttributes, When)>)> = Vec::new();

        for (declared_idx, stage) in stages_attributes.iter().enumerate() {
            let position = stage.index.unwrap_or(declared_idx);
            if !stage_names.insert(stage.name.as_str()) {
                errors.push(SeedError::DuplicateStage {
                    stage: stage.name.clone(),
                });
                continue;
            }
            if let Some(other) = positions.get(&position) {
                errors.push(SeedError::ConflictingStagePosition {
                    stage: stage.name.clone(),
                    other: (*other).to_string(),
                    position,
                });
                continue;
            }
            positions.insert(position, stage.name.as_str());

            let mut in_stage: HashSet<&str> = HashSet::new();
            let mut included = Vec::new();

            for job in &stage.builds {
                if !in_stage.insert(job.name.as_str()) {
                    errors.push(SeedError::DuplicateJobInStage {
                        stage: stage.name.clone(),
                        job: job.name.clone(),
                    });
                    continue;
                }
                if let Some(first_stage) = declared.get(job.name.as_str()) {
                    errors.push(SeedError::DuplicateJobAcrossStages {
                        job: job.name.clone(),
                        first_stage: (*first_stage).to_string(),
                        second_stage: stage.name.clone(),
                    });
                    continue;
                }
                declared.insert(job.name.as_str(), stage.name.as_str());

                match rules::evaluate(&job.rules, &pipeline.ref_name, job.when) {
                    Ok(Evaluation::Included(when)) => included.push((job, when)),
                    Ok(Evaluation::Excluded) => {
                        excluded.insert(job.name.as_str());
                    }
                    Err(InvalidPattern(pattern)) => {
                        errors.push(SeedError::InvalidRulePattern {
                            job: job.name.clone(),
                            pattern,
                        });
                        included.push((job, job.when));
                    }
                }
            }

            candidates.push((stage, position, included));
        }

        let mut stages = Vec::with_capacity(candidates.len());
        for (stage, position, included) in candidates {
            let builds: Vec<BuildSeed> = included
                .into_iter()
                .map(|(job, when)| BuildSeed {
                    name: job.name.clone(),
                    stage: stage.name.clone(),
                    stage_idx: position,
                    script: job.script.clone(),
                    when,
                    allow_failure: job.allow_failure,
                    needs: resolve_needs(job, &declared, &excluded, limits, &mut errors),
                    options: job.options.clone(),
                })
                .collect();

            // Stages whose jobs were all excluded do not appear.
            if !builds.is_empty() {
                stages.push(StageSeed {
                    name: stage.name.clone(),
                    position,
                    builds,
                });
            }
        }
        stages.sort_by_key(|stage| stage.position);

        let order: Vec<&str> = stages
            .iter()
            .flat_map(|stage| stage.builds.iter().map(|build| build.name.as_str()))
            .collect();
        let edges: HashMap<&str, Vec<&str>> = stages
            .iter()
            .flat_map(|stage| stage.builds.iter())
            .map(|build| {
                (
                    build.name.as_str(),
                    build.needs.iter().map(|need| need.name.as_str()).collect(),
                )
            })
            .collect();
        let cycle_errors: Vec<SeedError> = cycles::find_cycles(&order, &edges)
            .into_iter()
            .map(|path| SeedError::DependencyCycle { path })
            .collect();
        errors.extend(cycle_errors);

        if !errors.is_empty() {
            tracing::debug!(
                project_id = pipeline.project_id.0,
                error_count = errors.len(),
                "Seed graph has validation errors"
            );
        }

        Self { stages, errors }
    }

    /// Returns the stage seeds in position order.
    #[must_use]
    pub fn stages(&self) -> &[StageSeed] {
        &self.stages
    }

    /// Finds a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSeed> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// Finds a job by name across all stages.
    #[must_use]
    pub fn build(&self, name: &str) -> Option<&BuildSeed> {
        self.stages.iter().find_map(|stage| stage.build(name))
    }

    /// Returns the number of included jobs.
    #[must_use]
    pub fn size(&self) -> usize {
        self.stages.iter().map(StageSeed::size).sum()
    }

    /// Returns the validation errors, if any.
    #[must_use]
    pub fn seed_errors(&self) -> &[SeedError] {
        &self.errors
    }

    /// Returns the error messages, or `None` when the graph is valid.
    #[must_use]
    pub fn errors(&self) -> Option<Vec<String>> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.iter().map(ToString::to_string).collect())
        }
    }

    /// Returns true if construction found no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn resolve_needs(
    job: &JobAttributes,
    declared: &HashMap<&str, &str>,
    excluded: &HashSet<&str>,
    limits: &SeedLimits,
    errors: &mut Vec<SeedError>,
) -> Vec<NeedSeed> {
    if job.needs.len() > limits.max_needs {
        errors.push(SeedError::TooManyNeeds {
            job: job.name.clone(),
            limit: limits.max_needs,
            count: job.needs.len(),
        });
        return Vec::new();
    }

    let mut needs: Vec<NeedSeed> = Vec::with_capacity(job.needs.len());
    for need in &job.needs {
        if !declared.contains_key(need.job.as_str()) {
            errors.push(SeedError::UndefinedNeed {
                job: job.name.clone(),
                need: need.job.clone(),
            });
            continue;
        }
        if excluded.contains(need.job.as_str()) {
            if !need.optional {
                errors.push(SeedError::ExcludedNeed {
                    job: job.name.clone(),
                    need: need.job.clone(),
                });
            }
            continue;
        }
        if needs.iter().any(|existing| existing.name == need.job) {
            continue;
        }

        needs.push(NeedSeed {
            name: need.job.clone(),
            artifacts: need.artifacts,
        });
    }
    needs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProjectId;
    use crate::processor::{Need, Rule};
    use crate::seed::SchedulingType;
    use pretty_assertions::assert_eq;

    fn pipeline(ref_name: &str) -> Pipeline {
        Pipeline::new(ProjectId(1), ref_name)
    }

    fn build(stages: &[StageAttributes]) -> PipelineSeed {
        PipelineSeed::new(&pipeline("main"), stages, &SeedLimits::default())
    }

    #[test]
    fn test_two_stage_graph() {
        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile")]),
            StageAttributes::new("test", vec![JobAttributes::new("rspec").needs("compile")]),
        ]);

        assert!(seed.is_valid());
        assert_eq!(seed.errors(), None);
        assert_eq!(seed.size(), 2);

        let names: Vec<&str> = seed.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["build", "test"]);

        let rspec = seed.build("rspec").unwrap();
        assert_eq!(
            rspec.needs,
            vec![NeedSeed {
                name: "compile".to_string(),
                artifacts: true
            }]
        );
        assert_eq!(rspec.stage_idx, 1);
        assert_eq!(rspec.scheduling_type(), SchedulingType::Dag);
        assert_eq!(seed.build("compile").unwrap().scheduling_type(), SchedulingType::Stage);
    }

    #[test]
    fn test_needs_may_cross_to_later_stages() {
        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile").needs("lint")]),
            StageAttributes::new("check", vec![JobAttributes::new("lint")]),
        ]);

        assert!(seed.is_valid());
        assert!(seed.build("compile").unwrap().needs_job("lint"));
    }

    #[test]
    fn test_duplicate_job_in_stage() {
        let seed = build(&[StageAttributes::new(
            "build",
            vec![JobAttributes::new("compile"), JobAttributes::new("compile")],
        )]);

        assert_eq!(
            seed.seed_errors(),
            [SeedError::DuplicateJobInStage {
                stage: "build".to_string(),
                job: "compile".to_string(),
            }]
        );
        assert_eq!(seed.size(), 1);
    }

    #[test]
    fn test_duplicate_job_across_stages() {
        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile")]),
            StageAttributes::new("test", vec![JobAttributes::new("compile")]),
        ]);

        assert_eq!(
            seed.errors().unwrap(),
            vec!["job 'compile' is defined in both stage 'build' and stage 'test'".to_string()]
        );
    }

    #[test]
    fn test_undefined_need() {
        let seed = build(&[StageAttributes::new(
            "test",
            vec![JobAttributes::new("rspec").needs("compile")],
        )]);

        assert_eq!(seed.seed_errors()[0].code(), "SEED-002-UNDEFINED_NEED");
        assert!(seed.build("rspec").unwrap().needs.is_empty());
    }

    #[test]
    fn test_cycle_across_stages() {
        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile").needs("rspec")]),
            StageAttributes::new("test", vec![JobAttributes::new("rspec").needs("compile")]),
        ]);

        assert_eq!(
            seed.errors().unwrap(),
            vec!["dependency cycle detected: compile -> rspec -> compile".to_string()]
        );
    }

    #[test]
    fn test_self_need_is_a_cycle() {
        let seed = build(&[StageAttributes::new(
            "build",
            vec![JobAttributes::new("compile").needs("compile")],
        )]);

        assert_eq!(
            seed.seed_errors(),
            [SeedError::DependencyCycle {
                path: vec!["compile".to_string(), "compile".to_string()],
            }]
        );
    }

    #[test]
    fn test_all_errors_are_batched() {
        let seed = build(&[
            StageAttributes::new(
                "build",
                vec![
                    JobAttributes::new("compile"),
                    JobAttributes::new("compile"),
                    JobAttributes::new("a").needs("b"),
                ],
            ),
            StageAttributes::new(
                "test",
                vec![JobAttributes::new("b").needs("a"), JobAttributes::new("rspec").needs("nope")],
            ),
        ]);

        let codes: Vec<&str> = seed.seed_errors().iter().map(SeedError::code).collect();
        assert_eq!(
            codes,
            vec!["SEED-001-DUPLICATE", "SEED-002-UNDEFINED_NEED", "SEED-005-CYCLE"]
        );
        assert_eq!(seed.errors().unwrap().len(), 3);
    }

    #[test]
    fn test_rules_exclude_jobs_and_empty_stages() {
        let seed = PipelineSeed::new(
            &pipeline("feature"),
            &[
                StageAttributes::new("build", vec![JobAttributes::new("compile")]),
                StageAttributes::new(
                    "deploy",
                    vec![JobAttributes::new("production").with_rule(Rule::if_ref("^main$", When::Manual))],
                ),
            ],
            &SeedLimits::default(),
        );

        assert!(seed.is_valid());
        assert_eq!(seed.stages().len(), 1);
        assert!(seed.stage("deploy").is_none());
    }

    #[test]
    fn test_rule_outcome_sets_when() {
        let seed = build(&[StageAttributes::new(
            "deploy",
            vec![JobAttributes::new("production").with_rule(Rule::if_ref("^main$", When::Manual))],
        )]);

        assert_eq!(seed.build("production").unwrap().when, When::Manual);
    }

    #[test]
    fn test_need_on_excluded_job() {
        let stages = [
            StageAttributes::new(
                "build",
                vec![JobAttributes::new("docs").with_rule(Rule::always(When::Never))],
            ),
            StageAttributes::new(
                "test",
                vec![
                    JobAttributes::new("rspec").needs("docs"),
                    JobAttributes::new("lint").needs(Need::new("docs").optional()),
                ],
            ),
        ];
        let seed = build(&stages);

        assert_eq!(
            seed.seed_errors(),
            [SeedError::ExcludedNeed {
                job: "rspec".to_string(),
                need: "docs".to_string(),
            }]
        );
        assert!(seed.build("lint").unwrap().needs.is_empty());
    }

    #[test]
    fn test_needs_limit() {
        let seed = PipelineSeed::new(
            &pipeline("main"),
            &[StageAttributes::new(
                "build",
                vec![
                    JobAttributes::new("a"),
                    JobAttributes::new("b"),
                    JobAttributes::new("c").needs("a").needs("b"),
                ],
            )],
            &SeedLimits { max_needs: 1 },
        );

        assert_eq!(
            seed.errors().unwrap(),
            vec!["'c' job can only need 1 others, but it needs 2".to_string()]
        );
    }

    #[test]
    fn test_invalid_rule_pattern() {
        let seed = build(&[StageAttributes::new(
            "build",
            vec![JobAttributes::new("compile").with_rule(Rule::if_ref("[", When::Always))],
        )]);

        assert_eq!(seed.seed_errors()[0].code(), "SEED-004-RULE_PATTERN");
    }

    #[test]
    fn test_duplicate_needs_collapse() {
        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile")]),
            StageAttributes::new(
                "test",
                vec![JobAttributes::new("rspec").needs("compile").needs("compile")],
            ),
        ]);

        assert_eq!(seed.build("rspec").unwrap().needs.len(), 1);
    }

    #[test]
    fn test_explicit_stage_index_orders_stages() {
        let mut late = StageAttributes::new("late", vec![JobAttributes::new("a")]);
        late.index = Some(5);
        let mut early = StageAttributes::new("early", vec![JobAttributes::new("b")]);
        early.index = Some(1);

        let seed = build(&[late, early]);

        let names: Vec<&str> = seed.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
        assert_eq!(seed.build("a").unwrap().stage_idx, 5);
    }

    #[test]
    fn test_duplicate_stage_name_is_reported() {
        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile")]),
            StageAttributes::new("build", vec![JobAttributes::new("lint")]),
        ]);

        assert!(!seed.is_valid());
        assert_eq!(
            seed.seed_errors(),
            [SeedError::DuplicateStage {
                stage: "build".into()
            }]
        );
        assert_eq!(seed.stages().len(), 1);
        assert!(seed.build("lint").is_none());
    }

    #[test]
    fn test_conflicting_stage_index_is_reported() {
        let mut test = StageAttributes::new("test", vec![JobAttributes::new("rspec")]);
        test.index = Some(0);

        let seed = build(&[
            StageAttributes::new("build", vec![JobAttributes::new("compile")]),
            test,
        ]);

        assert_eq!(
            seed.seed_errors(),
            [SeedError::ConflictingStagePosition {
                stage: "test".into(),
                other: "build".into(),
                position: 0,
            }]
        );
        assert_eq!(seed.seed_errors()[0].code(), "SEED-006-STAGE_POSITION");
        assert_eq!(
            seed.errors().unwrap(),
            vec!["stage 'test' has position 0, which is already taken by stage 'build'".to_string()]
        );
    }
}
