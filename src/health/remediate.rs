// Remediation engine.
// Plans the minimal corrective writes from current verdicts, applies them and re-evaluates.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, info};

use crate::cache::CacheKey;
use crate::error::HealthError;
use crate::github::{
    OrgApi, ProtectionUpdate, RepoSettingsPatch, RequiredReviews, RequiredStatusChecks, Topics,
};

use super::check::{CheckKey, ProtectionRule, TrackedBranch};
use super::evaluate::EvalContext;
use super::fetch::Fetcher;
use super::policy::{DENIED_CONTEXTS, REQUIRED_CONTEXTS, RequiredTeam};
use super::record::RepoRecord;

/// Team ids by required team, resolved from the org team lookup.
pub type TeamIds = BTreeMap<RequiredTeam, u64>;

/// What a fix pass did.
#[derive(Debug, Default)]
pub struct FixOutcome {
    /// Successful writes.
    pub writes: usize,
    /// Teams whose repository access changed.
    pub updated_teams: BTreeSet<RequiredTeam>,
    /// Failed writes, for display to the operator.
    pub errors: Vec<String>,
}

impl FixOutcome {
    fn failed(&mut self, repo: &str, step: &str, err: HealthError) {
        error!(repo, step, error = %err, "fix failed");
        self.errors.push(format!("{}: {} failed: {}", repo, step, err));
    }
}

/// Settings patch containing only the fields whose check fails.
pub fn plan_settings(record: &RepoRecord) -> RepoSettingsPatch {
    let fails = |key| record.verdict(key).is_fail();
    RepoSettingsPatch {
        has_wiki: fails(CheckKey::Wikis).then_some(false),
        has_issues: fails(CheckKey::Issues).then_some(true),
        allow_merge_commit: fails(CheckKey::MergeCommits).then_some(true),
        allow_rebase_merge: fails(CheckKey::RebaseMerge).then_some(true),
        allow_squash_merge: fails(CheckKey::SquashMerge).then_some(false),
        default_branch: fails(CheckKey::DefaultBranch)
            .then(|| record.expected_default_branch().to_string()),
        homepage: fails(CheckKey::Homepage).then(|| record.expected_homepage()),
    }
}

/// Existing topics plus any missing required ones. Never drops a topic.
pub fn plan_topics(record: &RepoRecord) -> Option<Topics> {
    if !record.verdict(CheckKey::Topics).is_fail() {
        return None;
    }
    let mut names = record.topics().to_vec();
    for required in record.kind().profile().required_topics {
        if !names.iter().any(|t| t == required) {
            names.push(required.to_string());
        }
    }
    Some(Topics { names })
}

/// Teams whose access check fails.
pub fn plan_teams(record: &RepoRecord) -> Vec<RequiredTeam> {
    RequiredTeam::ALL
        .into_iter()
        .filter(|team| record.verdict(team.check_key()).is_fail())
        .collect()
}

/// Protection document for `branch`, if any of its rules fails.
/// Required contexts are merged into the configured ones and legacy contexts dropped.
pub fn plan_protection(record: &RepoRecord, branch: TrackedBranch) -> Option<ProtectionUpdate> {
    let any_fail = ProtectionRule::ALL
        .into_iter()
        .any(|rule| record.verdict(CheckKey::Protection(branch, rule)).is_fail());
    if !any_fail {
        return None;
    }

    let existing = record
        .protection
        .get(&branch)
        .and_then(|p| p.as_ref())
        .and_then(|p| p.required_status_checks.as_ref())
        .map(|c| c.contexts.as_slice())
        .unwrap_or(&[]);

    let mut contexts: Vec<String> = REQUIRED_CONTEXTS.iter().map(|c| c.to_string()).collect();
    for context in existing {
        if !contexts.contains(context) {
            contexts.push(context.clone());
        }
    }
    contexts.retain(|c| !DENIED_CONTEXTS.contains(&c.as_str()));

    Some(ProtectionUpdate {
        enforce_admins: false,
        required_status_checks: RequiredStatusChecks {
            strict: false,
            contexts,
        },
        required_pull_request_reviews: RequiredReviews {
            dismiss_stale_reviews: false,
            require_code_owner_reviews: false,
            required_approving_review_count: branch.required_reviews(),
        },
        restrictions: None,
    })
}

/// Run every fix step for one record, then re-evaluate it.
/// The record's verdicts must be current when this is called.
pub async fn remediate<A: OrgApi>(
    record: &mut RepoRecord,
    fetcher: &mut Fetcher<'_, A>,
    team_ids: &TeamIds,
    ctx: &EvalContext,
) -> FixOutcome {
    let mut outcome = FixOutcome::default();
    info!(repo = %record.name, "applying fixes");

    fix_settings(record, fetcher, &mut outcome).await;
    fix_topics(record, fetcher, &mut outcome).await;
    fix_teams(record, fetcher, team_ids, &mut outcome).await;
    fix_protection(record, fetcher, &mut outcome).await;

    record.evaluate(ctx);
    outcome
}

async fn fix_settings<A: OrgApi>(
    record: &mut RepoRecord,
    fetcher: &mut Fetcher<'_, A>,
    outcome: &mut FixOutcome,
) {
    let patch = plan_settings(record);
    if patch.is_empty() {
        return;
    }
    match fetcher.api.update_repo(&record.name, &patch).await {
        Ok(updated) => {
            outcome.writes += 1;
            if let Some(repo) = updated {
                fetcher.store(&CacheKey::Repo(record.name.clone()), &repo);
                record.repo = Some(repo);
            }
        }
        Err(e) => outcome.failed(&record.name, "settings", e),
    }
}

async fn fix_topics<A: OrgApi>(
    record: &mut RepoRecord,
    fetcher: &mut Fetcher<'_, A>,
    outcome: &mut FixOutcome,
) {
    let Some(topics) = plan_topics(record) else {
        return;
    };
    match fetcher.api.replace_topics(&record.name, &topics).await {
        Ok(updated) => {
            outcome.writes += 1;
            let names = updated.unwrap_or(topics).names;
            if let Some(repo) = record.repo.as_mut() {
                repo.topics = Some(names);
                fetcher.store(&CacheKey::Repo(record.name.clone()), repo);
            }
        }
        Err(e) => outcome.failed(&record.name, "topics", e),
    }
}

async fn fix_teams<A: OrgApi>(
    record: &mut RepoRecord,
    fetcher: &mut Fetcher<'_, A>,
    team_ids: &TeamIds,
    outcome: &mut FixOutcome,
) {
    for team in plan_teams(record) {
        let Some(&team_id) = team_ids.get(&team) else {
            outcome.failed(
                &record.name,
                team.slug(),
                HealthError::Other(format!("team {} id unknown", team.slug())),
            );
            continue;
        };
        match fetcher
            .api
            .set_team_permission(team_id, &record.name, team.permission())
            .await
        {
            Ok(()) => {
                outcome.writes += 1;
                outcome.updated_teams.insert(team);
            }
            Err(e) => outcome.failed(&record.name, team.slug(), e),
        }
    }
}

async fn fix_protection<A: OrgApi>(
    record: &mut RepoRecord,
    fetcher: &mut Fetcher<'_, A>,
    outcome: &mut FixOutcome,
) {
    for &branch in record.kind().profile().protected_branches {
        let Some(update) = plan_protection(record, branch) else {
            continue;
        };
        let result = fetcher
            .api
            .update_branch_protection(&record.name, branch.as_str(), &update)
            .await;
        match result {
            Ok(updated) => {
                outcome.writes += 1;
                if let Some(protection) = updated {
                    let key = CacheKey::Protection {
                        repo: record.name.clone(),
                        branch: branch.as_str().to_string(),
                    };
                    let protection = Some(protection);
                    fetcher.store(&key, &protection);
                    record.protection.insert(branch, protection);
                }
            }
            Err(e) => outcome.failed(&record.name, &format!("{} protection", branch), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::github::{BranchProtection, EnforceAdmins, Repository};
    use crate::health::check::Verdict;
    use crate::health::testing::{FakeApi, compliant_core_tool, compliant_pipeline, ctx, strings};
    use tempfile::TempDir;

    fn team_ids() -> TeamIds {
        TeamIds::from([(RequiredTeam::All, 1), (RequiredTeam::Core, 2)])
    }

    fn all_pass(record: &RepoRecord) -> bool {
        record.verdicts.values().all(Verdict::is_pass)
    }

    #[test]
    fn test_compliant_record_plans_nothing() {
        let mut record = compliant_pipeline("rnaseq");
        record.evaluate(&ctx());
        assert!(plan_settings(&record).is_empty());
        assert!(plan_topics(&record).is_none());
        assert!(plan_teams(&record).is_empty());
        assert!(plan_protection(&record, TrackedBranch::Master).is_none());
        assert!(plan_protection(&record, TrackedBranch::Dev).is_none());
    }

    #[test]
    fn test_settings_patch_only_failing_fields() {
        let mut record = compliant_pipeline("rnaseq");
        {
            let repo = record.repo.as_mut().unwrap();
            repo.has_wiki = Some(true);
            repo.homepage = None;
            // Unknown is not a failure and must not be patched blind.
            repo.allow_merge_commit = None;
        }
        record.evaluate(&ctx());

        let patch = plan_settings(&record);
        assert_eq!(
            patch,
            RepoSettingsPatch {
                has_wiki: Some(false),
                homepage: Some("https://nf-co.re/rnaseq".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_default_branch_not_set_when_missing() {
        let mut record = compliant_pipeline("rnaseq");
        record.branches.as_mut().unwrap().retain(|b| b.name != "master");
        record.repo.as_mut().unwrap().default_branch = Some("dev".into());
        record.evaluate(&ctx());

        assert!(plan_settings(&record).default_branch.is_none());
    }

    #[test]
    fn test_topics_union_keeps_existing() {
        let mut record = compliant_pipeline("rnaseq");
        record.repo.as_mut().unwrap().topics = Some(strings(&["genomics", "nf-core"]));
        record.evaluate(&ctx());

        let topics = plan_topics(&record).unwrap();
        assert_eq!(
            topics.names,
            strings(&["genomics", "nf-core", "nextflow", "workflow", "pipeline"])
        );
    }

    #[test]
    fn test_protection_merges_and_drops_legacy_contexts() {
        let mut record = compliant_pipeline("rnaseq");
        record.protection.insert(
            TrackedBranch::Dev,
            Some(BranchProtection {
                required_status_checks: Some(RequiredStatusChecks {
                    strict: true,
                    contexts: strings(&["custom lint", "test", "continuous-integration/travis-ci"]),
                }),
                required_pull_request_reviews: None,
                enforce_admins: Some(EnforceAdmins { enabled: true }),
            }),
        );
        record.evaluate(&ctx());

        let update = plan_protection(&record, TrackedBranch::Dev).unwrap();
        let contexts = &update.required_status_checks.contexts;
        for required in REQUIRED_CONTEXTS {
            assert!(contexts.iter().any(|c| c == required));
        }
        assert!(contexts.iter().any(|c| c == "custom lint"));
        for denied in DENIED_CONTEXTS {
            assert!(!contexts.iter().any(|c| c == denied));
        }
        assert!(!update.required_status_checks.strict);
        assert!(!update.enforce_admins);
        assert_eq!(update.required_pull_request_reviews.required_approving_review_count, 1);
        assert!(update.restrictions.is_none());
    }

    #[test]
    fn test_missing_branch_is_not_protected() {
        let mut record = compliant_pipeline("rnaseq");
        record.branches.as_mut().unwrap().retain(|b| b.name != "dev");
        record.protection.insert(TrackedBranch::Dev, None);
        record.evaluate(&ctx());

        assert!(plan_protection(&record, TrackedBranch::Dev).is_none());
    }

    #[tokio::test]
    async fn test_fix_brings_record_into_compliance() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(temp_dir.path());
        let mut api = FakeApi::new();

        let mut record = compliant_pipeline("rnaseq");
        {
            let repo = record.repo.as_mut().unwrap();
            repo.allow_squash_merge = Some(true);
            repo.topics = Some(strings(&["nf-core"]));
        }
        record.teams.remove(&RequiredTeam::Core);
        record.protection.insert(TrackedBranch::Master, None);
        api.add_record(&record);
        record.evaluate(&ctx());
        assert_eq!(record.verdict(CheckKey::Topics), Verdict::Fail);

        let mut fetcher = Fetcher::new(&mut api, &cache);
        let outcome = remediate(&mut record, &mut fetcher, &team_ids(), &ctx()).await;

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.writes, 4);
        assert_eq!(
            outcome.updated_teams,
            BTreeSet::from([RequiredTeam::Core])
        );

        // Team access is re-read from the listing later; everything else passes now.
        assert_eq!(record.verdict(CheckKey::Topics), Verdict::Pass);
        assert_eq!(record.verdict(CheckKey::SquashMerge), Verdict::Pass);
        for rule in ProtectionRule::ALL {
            assert_eq!(
                record.verdict(CheckKey::Protection(TrackedBranch::Master, rule)),
                Verdict::Pass
            );
        }

        let mut topics = record.topics().to_vec();
        topics.sort();
        assert_eq!(topics, strings(&["nextflow", "nf-core", "pipeline", "workflow"]));

        // The cache holds the server's post-fix state.
        let cached: Repository = cache
            .read_json(&CacheKey::Repo("rnaseq".into()))
            .unwrap()
            .unwrap()
            .data;
        assert_eq!(cached.allow_squash_merge, Some(false));
        assert_eq!(cached.topics.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_second_fix_pass_issues_no_writes() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(temp_dir.path());
        let mut api = FakeApi::new();

        let mut record = compliant_core_tool("tools");
        record.repo.as_mut().unwrap().has_issues = Some(false);
        api.add_record(&record);
        record.evaluate(&ctx());

        let mut fetcher = Fetcher::new(&mut api, &cache);
        let first = remediate(&mut record, &mut fetcher, &team_ids(), &ctx()).await;
        assert_eq!(first.writes, 1);
        assert!(all_pass(&record));

        let second = remediate(&mut record, &mut fetcher, &team_ids(), &ctx()).await;
        assert_eq!(second.writes, 0);
        assert!(plan_settings(&record).is_empty());
        assert_eq!(api.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_record_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(temp_dir.path());
        let mut api = FakeApi::new();
        api.reject_writes = true;

        let mut record = compliant_core_tool("tools");
        record.repo.as_mut().unwrap().has_wiki = Some(true);
        api.add_record(&record);
        record.evaluate(&ctx());
        let before = record.repo.clone();

        let mut fetcher = Fetcher::new(&mut api, &cache);
        let outcome = remediate(&mut record, &mut fetcher, &team_ids(), &ctx()).await;

        assert_eq!(outcome.writes, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("PATCH"), "{}", outcome.errors[0]);
        assert_eq!(record.repo, before);
        assert_eq!(record.verdict(CheckKey::Wikis), Verdict::Fail);
    }
}
