//! Completion-backed content generator.
//!
//! Prompts are rendered with `minijinja`, sent through a
//! [`CompletionClient`], and the answer's JSON object is parsed into domain
//! values. Any failure along the way yields the deterministic fallback.

use async_trait::async_trait;
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::automation::{
    domain::{
        AiContent, AiReview, BranchSnapshot, ChangeAnalysis, ChangeImpact, FALLBACK_REVIEW_SCORE,
        FileDelta, FileKind, Generated, InlineComment, PullRequestRecord, default_description,
        default_title, normalise_score,
    },
    ports::{CompletionClient, CompletionError, CompletionRequest, ContentGenerator},
};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Default response token cap.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Characters of patch text included per file in review prompts.
pub const PATCH_EXCERPT_CHARS: usize = 1000;

const CONTENT_SYSTEM_PROMPT: &str = "You are an expert software developer helping to create \
pull requests. Provide clear, professional, and helpful PR content.";

const REVIEW_SYSTEM_PROMPT: &str = "You are an expert code reviewer. Provide thorough, \
constructive feedback focusing on code quality, security, and best practices.";

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert software architect analyzing code \
changes for patterns, risks, and impact.";

const CONTENT_TEMPLATE: &str = r#"{% if custom_prompt %}{{ custom_prompt }}

Branch Information:
{% else %}Based on the following branch information, generate a pull request:

{% endif %}Branch: {{ branch.name }}
Commit Message: {{ branch.commit_message }}
Author: {{ branch.author }}
Files Changed: {{ branch.files | join(", ") }}
Additions: {{ branch.additions }}
Deletions: {{ branch.deletions }}

Please create:
1. A clear, descriptive title for the PR
2. A comprehensive description explaining what was changed and why
3. Appropriate labels for categorization (e.g. enhancement, bug-fix, documentation)
4. Suggested reviewers based on the files changed

Respond in JSON format:
{"title": "PR Title", "description": "Detailed description...", "labels": ["label1"], "reviewers": ["reviewer1"]}
"#;

const REVIEW_TEMPLATE: &str = r#"Please review this pull request.

Pull Request: #{{ pr.number }} - {{ pr.title }}
Author: {{ pr.author }}
Description: {{ pr.body }}
Files Changed: {{ files | length }} files
{% for file in files %}
File: {{ file.filename }}
Status: {{ file.status }}
Changes: +{{ file.additions }} -{{ file.deletions }}
{% if file.patch %}Patch:
{{ file.patch }}
{% endif %}{% endfor %}
Please provide a comprehensive code review including:
1. Overall assessment and score (0-10)
2. Specific comments for code improvements
3. Potential issues or bugs
4. Suggestions for better practices
5. Security considerations

Respond in JSON format:
{"summary": "Overall review summary", "score": 8.5, "comments": [{"body": "Comment text", "path": "src/lib.rs", "line": 42}], "suggestions": ["suggestion1"], "issues": ["issue1"]}
"#;

const ANALYSIS_TEMPLATE: &str = r#"Analyze these code changes and provide insights:
{% for file in files %}
File: {{ file.filename }}
Type: {{ file.kind }}
Changes: +{{ file.additions }} -{{ file.deletions }}
Status: {{ file.status }}
{% endfor %}
Please provide:
1. Change patterns and trends
2. Potential impact assessment
3. Risk factors
4. Testing recommendations
5. Performance considerations

Respond in JSON format:
{"patterns": ["pattern1"], "impact": "high/medium/low", "risks": ["risk1"], "testing_needs": ["test1"], "performance_notes": "performance considerations"}
"#;

/// Completion parameters shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// Model name.
    pub model: String,
    /// Response token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Reasons a generation attempt was abandoned.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Prompt rendering failed.
    #[error("prompt rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    /// The completion call failed.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// The answer contains no JSON object.
    #[error("completion contained no JSON object")]
    MissingJson,

    /// There were no changed files to analyse.
    #[error("no files to analyze")]
    NoFiles,

    /// The JSON object does not match the expected shape.
    #[error("completion JSON is malformed: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// [`ContentGenerator`] built on a [`CompletionClient`].
#[derive(Debug)]
pub struct CompletionContentGenerator<C>
where
    C: CompletionClient,
{
    client: Arc<C>,
    settings: GeneratorSettings,
}

impl<C> Clone for CompletionContentGenerator<C>
where
    C: CompletionClient,
{
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            settings: self.settings.clone(),
        }
    }
}

impl<C> CompletionContentGenerator<C>
where
    C: CompletionClient,
{
    /// Creates a generator using `client`.
    #[must_use]
    pub const fn new(client: Arc<C>, settings: GeneratorSettings) -> Self {
        Self { client, settings }
    }

    async fn try_generate_content(
        &self,
        branch: &BranchSnapshot,
        custom_prompt: Option<String>,
    ) -> Result<AiContent, GenerationError> {
        let context = ContentPromptContext {
            custom_prompt,
            branch: BranchPromptContext::from(branch),
        };
        let prompt = render(CONTENT_TEMPLATE, &context)?;
        let answer = self.complete(CONTENT_SYSTEM_PROMPT, prompt).await?;
        let wire: ContentWire = serde_json::from_str(extract_json(&answer)?)?;
        Ok(wire.into_content(branch))
    }

    async fn try_review(
        &self,
        pull_request: &PullRequestRecord,
        files: &[FileDelta],
    ) -> Result<AiReview, GenerationError> {
        let context = ReviewPromptContext {
            pr: PullRequestPromptContext::from(pull_request),
            files: files.iter().map(FilePromptContext::from).collect(),
        };
        let prompt = render(REVIEW_TEMPLATE, &context)?;
        let answer = self.complete(REVIEW_SYSTEM_PROMPT, prompt).await?;
        let wire: ReviewWire = serde_json::from_str(extract_json(&answer)?)?;
        Ok(wire.into_review())
    }

    async fn try_analyze(&self, files: &[FileDelta]) -> Result<ChangeAnalysis, GenerationError> {
        if files.is_empty() {
            return Err(GenerationError::NoFiles);
        }
        let context = AnalysisPromptContext {
            files: files.iter().map(FilePromptContext::from).collect(),
        };
        let prompt = render(ANALYSIS_TEMPLATE, &context)?;
        let answer = self.complete(ANALYSIS_SYSTEM_PROMPT, prompt).await?;
        let wire: AnalysisWire = serde_json::from_str(extract_json(&answer)?)?;
        Ok(wire.into_analysis())
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system: system.to_owned(),
            user,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let answer = self.client.complete(&request).await?;
        if answer.trim().is_empty() {
            return Err(CompletionError::EmptyResponse.into());
        }
        Ok(answer)
    }
}

#[async_trait]
impl<C> ContentGenerator for CompletionContentGenerator<C>
where
    C: CompletionClient,
{
    async fn generate_pr_content(
        &self,
        branch: &BranchSnapshot,
        custom_prompt: Option<String>,
    ) -> Generated<AiContent> {
        match self.try_generate_content(branch, custom_prompt).await {
            Ok(content) => {
                debug!(branch = %branch.name(), "generated pull request content");
                Generated::ai(content)
            }
            Err(err) => {
                warn!(branch = %branch.name(), error = %err, "using fallback pull request content");
                Generated::fallback(AiContent::fallback_for(branch), err.to_string())
            }
        }
    }

    async fn review_pull_request(
        &self,
        pull_request: &PullRequestRecord,
        files: &[FileDelta],
    ) -> Generated<AiReview> {
        match self.try_review(pull_request, files).await {
            Ok(review) => {
                debug!(pr = %pull_request.number(), score = review.score, "generated review");
                Generated::ai(review)
            }
            Err(err) => {
                warn!(pr = %pull_request.number(), error = %err, "using fallback review");
                Generated::fallback(AiReview::fallback_for(pull_request), err.to_string())
            }
        }
    }

    async fn analyze_changes(&self, files: &[FileDelta]) -> Generated<ChangeAnalysis> {
        match self.try_analyze(files).await {
            Ok(analysis) => {
                debug!(files = files.len(), impact = %analysis.impact, "generated change analysis");
                Generated::ai(analysis)
            }
            Err(err) => {
                warn!(files = files.len(), error = %err, "using fallback change analysis");
                Generated::fallback(ChangeAnalysis::fallback(), err.to_string())
            }
        }
    }

    fn model_name(&self) -> String {
        self.settings.model.clone()
    }
}

fn render(template: &str, context: &impl Serialize) -> Result<String, GenerationError> {
    let environment = Environment::new();
    Ok(environment.render_str(template, context)?)
}

/// Returns the outermost JSON object in a completion answer.
///
/// Models often wrap JSON in prose or code fences; everything outside the
/// first `{` and the last `}` is discarded.
fn extract_json(answer: &str) -> Result<&str, GenerationError> {
    let start = answer.find('{').ok_or(GenerationError::MissingJson)?;
    let end = answer.rfind('}').ok_or(GenerationError::MissingJson)?;
    answer
        .get(start..=end)
        .filter(|_| start < end)
        .ok_or(GenerationError::MissingJson)
}

fn excerpt(patch: &str) -> String {
    patch.char_indices().nth(PATCH_EXCERPT_CHARS).map_or_else(
        || patch.to_owned(),
        |(cut, _)| format!("{}...", patch.get(..cut).unwrap_or(patch)),
    )
}

#[derive(Serialize)]
struct ContentPromptContext {
    custom_prompt: Option<String>,
    branch: BranchPromptContext,
}

#[derive(Serialize)]
struct BranchPromptContext {
    name: String,
    commit_message: String,
    author: String,
    files: Vec<String>,
    additions: u64,
    deletions: u64,
}

impl From<&BranchSnapshot> for BranchPromptContext {
    fn from(branch: &BranchSnapshot) -> Self {
        Self {
            name: branch.name().to_string(),
            commit_message: branch.commit_message().to_owned(),
            author: branch.author().to_owned(),
            files: branch.changed_files().iter().cloned().collect(),
            additions: branch.additions(),
            deletions: branch.deletions(),
        }
    }
}

#[derive(Serialize)]
struct ReviewPromptContext {
    pr: PullRequestPromptContext,
    files: Vec<FilePromptContext>,
}

#[derive(Serialize)]
struct PullRequestPromptContext {
    number: u64,
    title: String,
    author: String,
    body: String,
}

impl From<&PullRequestRecord> for PullRequestPromptContext {
    fn from(pull_request: &PullRequestRecord) -> Self {
        Self {
            number: pull_request.number().value(),
            title: pull_request.title().to_owned(),
            author: pull_request.author().to_owned(),
            body: pull_request.body().to_owned(),
        }
    }
}

#[derive(Serialize)]
struct AnalysisPromptContext {
    files: Vec<FilePromptContext>,
}

#[derive(Serialize)]
struct FilePromptContext {
    filename: String,
    kind: &'static str,
    status: String,
    additions: u64,
    deletions: u64,
    patch: Option<String>,
}

impl From<&FileDelta> for FilePromptContext {
    fn from(file: &FileDelta) -> Self {
        Self {
            filename: file.filename.clone(),
            kind: FileKind::classify(&file.filename).as_str(),
            status: file.status.clone(),
            additions: file.additions,
            deletions: file.deletions,
            patch: file.patch.as_deref().map(excerpt),
        }
    }
}

// Wire shapes accept any JSON per field: a missing, null or mistyped field
// falls back to its default instead of discarding the whole answer.

#[derive(Deserialize)]
struct ContentWire {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    labels: Option<Value>,
    #[serde(default)]
    reviewers: Option<Value>,
}

impl ContentWire {
    fn into_content(self, branch: &BranchSnapshot) -> AiContent {
        AiContent {
            title: text(self.title).unwrap_or_else(|| default_title(branch)),
            description: text(self.description).unwrap_or_else(|| default_description(branch)),
            labels: texts(self.labels),
            reviewers: texts(self.reviewers),
        }
    }
}

#[derive(Deserialize)]
struct ReviewWire {
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    score: Option<Value>,
    #[serde(default)]
    comments: Option<Value>,
    #[serde(default)]
    suggestions: Option<Value>,
    #[serde(default)]
    issues: Option<Value>,
}

#[derive(Deserialize)]
struct CommentWire {
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    path: Option<Value>,
    #[serde(default)]
    line: Option<Value>,
}

impl ReviewWire {
    fn into_review(self) -> AiReview {
        let comments = items(self.comments)
            .into_iter()
            .filter_map(|item| serde_json::from_value::<CommentWire>(item).ok())
            .filter_map(CommentWire::into_comment)
            .collect();
        AiReview {
            summary: text(self.summary).unwrap_or_else(|| "AI review completed".to_owned()),
            score: normalise_score(number(self.score).unwrap_or(FALLBACK_REVIEW_SCORE)),
            comments,
            suggestions: texts(self.suggestions),
            issues: texts(self.issues),
        }
    }
}

impl CommentWire {
    fn into_comment(self) -> Option<InlineComment> {
        let body = text(self.body)?;
        Some(InlineComment {
            body,
            path: text(self.path),
            line: line_number(self.line),
        })
    }
}

#[derive(Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    patterns: Option<Value>,
    #[serde(default)]
    impact: Option<Value>,
    #[serde(default)]
    risks: Option<Value>,
    #[serde(default)]
    testing_needs: Option<Value>,
    #[serde(default)]
    performance_notes: Option<Value>,
}

impl AnalysisWire {
    fn into_analysis(self) -> ChangeAnalysis {
        ChangeAnalysis {
            patterns: texts(self.patterns),
            impact: text(self.impact)
                .map(|label| ChangeImpact::from_label(&label))
                .unwrap_or_default(),
            risks: texts(self.risks),
            testing_needs: texts(self.testing_needs),
            performance_notes: text(self.performance_notes),
        }
    }
}

/// Reads a non-blank string.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

/// Reads a list of non-blank strings; a lone string counts as a one-item
/// list and non-string entries are skipped.
fn texts(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list.into_iter().filter_map(|item| text(Some(item))).collect(),
        single => text(single).into_iter().collect(),
    }
}

fn items(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(list)) => list,
        _ => Vec::new(),
    }
}

/// Reads a positive line number; negative, fractional or oversized values
/// leave the comment unanchored.
fn line_number(value: Option<Value>) -> Option<u32> {
    let line = match value? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;
    u32::try_from(line).ok().filter(|&line| line > 0)
}

/// Reads a number, accepting numeric strings such as `"8.5"`.
fn number(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
