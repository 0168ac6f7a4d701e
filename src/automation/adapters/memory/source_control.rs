//! In-memory source-control host for orchestration tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::automation::{
    domain::{
        ApprovalStatus, BranchName, BranchSnapshot, FileDelta, InlineComment, NewPullRequest,
        PullRequestNumber, PullRequestRecord, PullRequestState, ReviewState, ReviewSubmission,
    },
    ports::{SourceControlClient, SourceControlError, SourceControlResult},
};

/// In-memory source-control host.
///
/// The host models the behaviour the orchestrator depends on: branch
/// protection approval counts, per-reviewer review history, diff-anchored
/// comments, collaborator-only review requests and the rule that authors
/// cannot approve their own pull requests. Pull requests it opens are
/// authored by the configured acting identity, which is always a
/// collaborator.
#[derive(Debug, Clone)]
pub struct InMemorySourceControl {
    repository: String,
    state: Arc<RwLock<HostState>>,
}

#[derive(Debug)]
struct HostState {
    acting_identity: String,
    collaborators: BTreeSet<String>,
    branches: HashMap<BranchName, BranchSnapshot>,
    pull_requests: BTreeMap<PullRequestNumber, HostedPullRequest>,
    required_approvals: HashMap<BranchName, u32>,
    published: Vec<(PullRequestNumber, ApprovalStatus)>,
    next_number: u64,
}

#[derive(Debug)]
struct HostedPullRequest {
    record: PullRequestRecord,
    files: Vec<FileDelta>,
    reviews: Vec<ReviewSubmission>,
    comments: Vec<InlineComment>,
}

impl HostState {
    fn hosted(&self, number: PullRequestNumber) -> SourceControlResult<&HostedPullRequest> {
        self.pull_requests
            .get(&number)
            .ok_or(SourceControlError::PullRequestNotFound(number))
    }

    fn hosted_mut(
        &mut self,
        number: PullRequestNumber,
    ) -> SourceControlResult<&mut HostedPullRequest> {
        self.pull_requests
            .get_mut(&number)
            .ok_or(SourceControlError::PullRequestNotFound(number))
    }

    fn allocate_number(&mut self) -> SourceControlResult<PullRequestNumber> {
        let number =
            PullRequestNumber::new(self.next_number).map_err(SourceControlError::transport)?;
        self.next_number = self.next_number.saturating_add(1);
        Ok(number)
    }
}

impl InMemorySourceControl {
    /// Creates an empty host for `repository`, acting as `acting_identity`.
    #[must_use]
    pub fn new(repository: impl Into<String>, acting_identity: impl Into<String>) -> Self {
        let acting_identity = acting_identity.into();
        Self {
            repository: repository.into(),
            state: Arc::new(RwLock::new(HostState {
                collaborators: BTreeSet::from([acting_identity.clone()]),
                acting_identity,
                branches: HashMap::new(),
                pull_requests: BTreeMap::new(),
                required_approvals: HashMap::new(),
                published: Vec::new(),
                next_number: 1,
            })),
        }
    }

    fn read_state(&self) -> SourceControlResult<RwLockReadGuard<'_, HostState>> {
        self.state
            .read()
            .map_err(|err| SourceControlError::transport(std::io::Error::other(err.to_string())))
    }

    fn write_state(&self) -> SourceControlResult<RwLockWriteGuard<'_, HostState>> {
        self.state
            .write()
            .map_err(|err| SourceControlError::transport(std::io::Error::other(err.to_string())))
    }

    /// Publishes a branch.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn add_branch(&self, snapshot: BranchSnapshot) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        state.branches.insert(snapshot.name().clone(), snapshot);
        Ok(())
    }

    /// Grants `identity` access to the repository.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn add_collaborator(&self, identity: impl Into<String>) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        state.collaborators.insert(identity.into());
        Ok(())
    }

    /// Seeds an existing pull request with its changed files.
    ///
    /// Later pull requests opened through the port are numbered after the
    /// highest seeded number.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn add_pull_request(
        &self,
        record: PullRequestRecord,
        files: Vec<FileDelta>,
    ) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        let number = record.number();
        state.next_number = state.next_number.max(number.value().saturating_add(1));
        state.pull_requests.insert(
            number,
            HostedPullRequest {
                record,
                files,
                reviews: Vec::new(),
                comments: Vec::new(),
            },
        );
        Ok(())
    }

    /// Configures branch protection for `base`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn set_required_approvals(&self, base: BranchName, count: u32) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        state.required_approvals.insert(base, count);
        Ok(())
    }

    /// Records a review submitted by `reviewer`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError::PullRequestNotFound`] for unknown pull
    /// requests and [`SourceControlError::Rejected`] when the author approves
    /// their own pull request.
    pub fn submit_review(
        &self,
        number: PullRequestNumber,
        reviewer: &str,
        review_state: ReviewState,
    ) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        let hosted = state.hosted_mut(number)?;
        if review_state == ReviewState::Approved && hosted.record.author() == reviewer {
            return Err(SourceControlError::rejected(
                "submit review",
                "Can not approve your own pull request",
            ));
        }
        hosted
            .reviews
            .push(ReviewSubmission::new(reviewer, review_state, Utc::now()));
        Ok(())
    }

    /// Returns comments posted to a pull request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError::PullRequestNotFound`] for unknown pull
    /// requests.
    pub fn comments(&self, number: PullRequestNumber) -> SourceControlResult<Vec<InlineComment>> {
        let state = self.read_state()?;
        Ok(state.hosted(number)?.comments.clone())
    }

    /// Returns every approval status published so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn published_statuses(
        &self,
    ) -> SourceControlResult<Vec<(PullRequestNumber, ApprovalStatus)>> {
        Ok(self.read_state()?.published.clone())
    }

    fn pull_request_url(&self, number: PullRequestNumber) -> String {
        format!("https://github.com/{}/pull/{}", self.repository, number.value())
    }
}

#[async_trait]
impl SourceControlClient for InMemorySourceControl {
    async fn get_branch(&self, name: &BranchName) -> SourceControlResult<Option<BranchSnapshot>> {
        Ok(self.read_state()?.branches.get(name).cloned())
    }

    async fn create_pull_request(
        &self,
        draft: &NewPullRequest,
    ) -> SourceControlResult<PullRequestRecord> {
        let mut state = self.write_state()?;
        let Some(branch) = state.branches.get(&draft.head).cloned() else {
            return Err(SourceControlError::rejected(
                "create pull request",
                format!("head branch {} does not exist", draft.head),
            ));
        };
        let duplicate = state.pull_requests.values().any(|hosted| {
            hosted.record.state() == PullRequestState::Open && hosted.record.head() == &draft.head
        });
        if duplicate {
            return Err(SourceControlError::rejected(
                "create pull request",
                format!("a pull request already exists for {}", draft.head),
            ));
        }

        let number = state.allocate_number()?;
        let record = PullRequestRecord::new(
            number,
            draft.title.clone(),
            draft.head.clone(),
            draft.base.clone(),
            state.acting_identity.clone(),
            Utc::now(),
        )
        .with_body(draft.body.clone())
        .with_url(self.pull_request_url(number))
        .with_labels(draft.labels.iter().cloned());
        let files = branch
            .changed_files()
            .iter()
            .map(|path| FileDelta::new(path.clone(), "modified", 0, 0))
            .collect();

        state.pull_requests.insert(
            number,
            HostedPullRequest {
                record: record.clone(),
                files,
                reviews: Vec::new(),
                comments: Vec::new(),
            },
        );
        Ok(record)
    }

    async fn get_pull_request(
        &self,
        number: PullRequestNumber,
    ) -> SourceControlResult<Option<PullRequestRecord>> {
        let state = self.read_state()?;
        Ok(state
            .pull_requests
            .get(&number)
            .map(|hosted| hosted.record.clone()))
    }

    async fn list_open_pull_requests(&self) -> SourceControlResult<Vec<PullRequestRecord>> {
        let state = self.read_state()?;
        Ok(state
            .pull_requests
            .values()
            .filter(|hosted| hosted.record.state() == PullRequestState::Open)
            .map(|hosted| hosted.record.clone())
            .collect())
    }

    async fn list_all_pull_requests(&self) -> SourceControlResult<Vec<PullRequestRecord>> {
        let state = self.read_state()?;
        Ok(state
            .pull_requests
            .values()
            .map(|hosted| hosted.record.clone())
            .collect())
    }

    async fn get_changed_files(
        &self,
        number: PullRequestNumber,
    ) -> SourceControlResult<Vec<FileDelta>> {
        Ok(self.read_state()?.hosted(number)?.files.clone())
    }

    async fn add_inline_comment(
        &self,
        number: PullRequestNumber,
        comment: &InlineComment,
    ) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        let hosted = state.hosted_mut(number)?;
        if let Some(path) = comment.path.as_deref() {
            let in_diff = hosted.files.iter().any(|file| file.filename == path);
            if !in_diff {
                return Err(SourceControlError::rejected(
                    "add comment",
                    format!("path {path} is not part of the diff"),
                ));
            }
        }
        hosted.comments.push(comment.clone());
        Ok(())
    }

    async fn get_approval_status(
        &self,
        number: PullRequestNumber,
    ) -> SourceControlResult<ApprovalStatus> {
        let state = self.read_state()?;
        let hosted = state.hosted(number)?;
        let required = state.required_approvals.get(hosted.record.base()).copied();
        Ok(ApprovalStatus::from_reviews(&hosted.reviews, required))
    }

    async fn list_collaborators(&self) -> SourceControlResult<Vec<String>> {
        Ok(self.read_state()?.collaborators.iter().cloned().collect())
    }

    async fn request_reviewers(
        &self,
        number: PullRequestNumber,
        reviewers: &[String],
    ) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        if let Some(outsider) = reviewers
            .iter()
            .find(|reviewer| !state.collaborators.contains(reviewer.as_str()))
        {
            return Err(SourceControlError::rejected(
                "request reviewers",
                format!("{outsider} is not a collaborator of the repository"),
            ));
        }
        let hosted = state.hosted_mut(number)?;
        if reviewers
            .iter()
            .any(|reviewer| reviewer == hosted.record.author())
        {
            return Err(SourceControlError::rejected(
                "request reviewers",
                "Review cannot be requested from pull request author",
            ));
        }
        hosted
            .record
            .request_reviewers(reviewers.iter().cloned(), Utc::now());
        Ok(())
    }

    async fn auto_integrate(&self, number: PullRequestNumber) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        let hosted = state.hosted_mut(number)?;
        if hosted.record.state() != PullRequestState::Open {
            return Err(SourceControlError::rejected(
                "auto-integrate",
                "Pull Request is not mergeable",
            ));
        }
        hosted.record = hosted.record.clone().closed(true, Utc::now());
        Ok(())
    }

    async fn publish_approval_status(
        &self,
        number: PullRequestNumber,
        status: &ApprovalStatus,
    ) -> SourceControlResult<()> {
        let mut state = self.write_state()?;
        state.hosted(number)?;
        state.published.push((number, status.clone()));
        Ok(())
    }
}
