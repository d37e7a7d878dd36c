// Test evaluator.
// Pure mapping from a record's fetched state to a verdict per applicable check.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::check::{CheckKey, ProtectionRule, Reason, TrackedBranch, Verdict};
use super::policy::{DENIED_CONTEXTS, REQUIRED_CONTEXTS, RequiredTeam, SOCIAL_PREVIEW_PREFIX};
use super::record::RepoRecord;

static SOCIAL_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+name="twitter:image:src"\s+content="([^"]+)"\s*/?>"#)
        .expect("valid social image pattern")
});

/// Org-wide facts that some checks compare against.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Publication date of the latest tools release.
    pub tools_last_release: Option<DateTime<Utc>>,
    /// Teams whose repository listing could not be loaded.
    pub missing_teams: BTreeSet<RequiredTeam>,
}

impl RepoRecord {
    /// Recompute every verdict from the current raw state.
    pub fn evaluate(&mut self, ctx: &EvalContext) {
        self.verdicts = evaluate(self, ctx);
    }
}

/// Verdicts for every check that applies to the record's kind.
pub fn evaluate(record: &RepoRecord, ctx: &EvalContext) -> BTreeMap<CheckKey, Verdict> {
    record
        .kind()
        .check_keys()
        .into_iter()
        .map(|key| (key, check(record, key, ctx)))
        .collect()
}

pub fn check(record: &RepoRecord, key: CheckKey, ctx: &EvalContext) -> Verdict {
    let repo = record.repo.as_ref();

    match key {
        CheckKey::HasRelease => record.release.as_ref().map(|r| r.has_release).into(),
        CheckKey::ReleasedAfterTools => released_after_tools(record, ctx),
        CheckKey::Wikis => repo.and_then(|r| r.has_wiki).map(|on| !on).into(),
        CheckKey::Issues => repo.and_then(|r| r.has_issues).into(),
        CheckKey::MergeCommits => repo.and_then(|r| r.allow_merge_commit).into(),
        CheckKey::RebaseMerge => repo.and_then(|r| r.allow_rebase_merge).into(),
        CheckKey::SquashMerge => repo.and_then(|r| r.allow_squash_merge).map(|on| !on).into(),
        CheckKey::DefaultBranch => default_branch(record),
        CheckKey::Topics => {
            let required = record.kind().profile().required_topics;
            repo.and_then(|r| r.topics.as_ref())
                .map(|topics| required.iter().all(|t| topics.iter().any(|have| have == t)))
                .into()
        }
        CheckKey::Description => repo
            .map(|r| r.description.as_deref().is_some_and(|d| !d.trim().is_empty()))
            .into(),
        CheckKey::Homepage => {
            let expected = record.expected_homepage();
            repo.map(|r| r.homepage.as_deref() == Some(expected.as_str()))
                .into()
        }
        CheckKey::SocialPreview => record
            .webpage
            .as_deref()
            .map(|page| {
                social_preview_url(page).is_some_and(|url| url.starts_with(SOCIAL_PREVIEW_PREFIX))
            })
            .into(),
        CheckKey::TeamAll => team_access(record, RequiredTeam::All, ctx),
        CheckKey::TeamCore => team_access(record, RequiredTeam::Core, ctx),
        CheckKey::BranchExists(branch) => record.has_branch(branch.as_str()).into(),
        CheckKey::Protection(branch, rule) => protection(record, branch, rule),
    }
}

/// Preview image URL from the repository's public page, if the page declares one.
pub fn social_preview_url(html: &str) -> Option<&str> {
    SOCIAL_IMAGE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Required contexts all present and no denied context left.
pub fn has_required_contexts(contexts: &[String]) -> bool {
    let has = |name: &str| contexts.iter().any(|c| c == name);
    REQUIRED_CONTEXTS.iter().all(|c| has(c)) && !DENIED_CONTEXTS.iter().any(|c| has(c))
}

fn released_after_tools(record: &RepoRecord, ctx: &EvalContext) -> Verdict {
    match &record.release {
        None => Verdict::Unknown,
        Some(release) if !release.has_release => Verdict::NotApplicable(Reason::NoRelease),
        Some(release) => match (release.last_release, ctx.tools_last_release) {
            (Some(ours), Some(tools)) => (ours > tools).into(),
            _ => Verdict::Unknown,
        },
    }
}

fn default_branch(record: &RepoRecord) -> Verdict {
    let expected = record.expected_default_branch();
    if record.has_branch(expected) == Some(false) {
        return Verdict::NotApplicable(Reason::DefaultBranchMissing(expected.to_string()));
    }
    record
        .repo
        .as_ref()
        .and_then(|r| r.default_branch.as_deref())
        .map(|current| current == expected)
        .into()
}

/// A repository missing from a loaded listing has no access; without the listing nothing is known.
fn team_access(record: &RepoRecord, team: RequiredTeam, ctx: &EvalContext) -> Verdict {
    if ctx.missing_teams.contains(&team) {
        return Verdict::Unknown;
    }
    record
        .teams
        .get(&team)
        .is_some_and(|permissions| team.is_satisfied_by(permissions))
        .into()
}

fn protection(record: &RepoRecord, branch: TrackedBranch, rule: ProtectionRule) -> Verdict {
    match record.has_branch(branch.as_str()) {
        None => return Verdict::Unknown,
        Some(false) => return Verdict::NotApplicable(Reason::BranchMissing(branch)),
        Some(true) => {}
    }
    let Some(protection) = record.protection.get(&branch) else {
        return Verdict::Unknown;
    };

    // An unprotected branch fails every rule.
    let protection = protection.as_ref();
    let checks = protection.and_then(|p| p.required_status_checks.as_ref());
    let reviews = protection.and_then(|p| p.required_pull_request_reviews.as_ref());

    let pass = match rule {
        ProtectionRule::StrictUpdates => checks.is_some_and(|c| !c.strict),
        ProtectionRule::RequiredCi => checks.is_some_and(|c| has_required_contexts(&c.contexts)),
        ProtectionRule::StaleReviews => reviews.is_some_and(|r| !r.dismiss_stale_reviews),
        ProtectionRule::CodeOwnerReviews => reviews.is_some_and(|r| !r.require_code_owner_reviews),
        ProtectionRule::ReviewCount => {
            reviews.is_some_and(|r| r.required_approving_review_count == branch.required_reviews())
        }
        ProtectionRule::EnforceAdmins => protection
            .and_then(|p| p.enforce_admins)
            .is_some_and(|admins| !admins.enabled),
    };
    pass.into()
}
