//! Research stage: decompose the claim, search, and synthesize findings
//!
//! 1. One non-streaming call splits the working claim into at most
//!    `max_sub_claims` sub-claims (the claim itself on any failure).
//! 2. Each sub-claim is searched; the top `fetch_top_n` results with a URL
//!    get their page text attached.
//! 3. A streaming call turns the search bundle into a [`ResearchReport`].

use super::{into_record, parse_reply, prompt_json, truncate_chars, PromptPair, StageContext};
use crate::models::ResearchReport;
use crate::services::{parse_string_list, GenerationError, SearchResult};
use crate::workflow::StageName;
use serde::Serialize;
use tracing::{debug, info};

/// Character budget for the serialized search bundle
pub const PROMPT_BUDGET: usize = 12_000;

/// Page text attached per fetched result
pub const FETCHED_TEXT_CHARS: usize = 1_500;

pub const DECOMPOSE_SYSTEM_PROMPT: &str = "You split factual claims into independently verifiable sub-claims. \
Reply with a JSON list of strings and nothing else.";

pub const SYSTEM_PROMPT: &str = r#"You are the research analyst of a fact-checking team: thorough and wide-ranging.

You receive a claim, its sub-claims, and web search results (some with page text).
For every sub-claim, collect the evidence the results contain, both for and against.
Quote or paraphrase the relevant passage in each snippet and keep the exact source URL.
Do not judge the claim; that is done later.

Reply with JSON in this shape:
```json
{
  "sub_claims": ["sub-claim 1", "sub-claim 2"],
  "findings": [
    {
      "sub_claim": "...",
      "evidence": [
        {"source_url": "...", "source_title": "...", "snippet": "...", "supports_claim": true}
      ]
    }
  ]
}
```"#;

/// One search result as handed to the model
#[derive(Debug, Clone, Serialize)]
pub struct SourceBundle {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_content: Option<String>,
}

impl From<SearchResult> for SourceBundle {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.title,
            url: result.url,
            snippet: result.snippet,
            fetched_content: None,
        }
    }
}

/// Search results gathered for one sub-claim
#[derive(Debug, Clone, Serialize)]
pub struct SubClaimBundle {
    pub sub_claim: String,
    pub search_results: Vec<SourceBundle>,
}

pub fn decomposition_prompt(claim: &str, max_sub_claims: usize) -> PromptPair {
    PromptPair {
        system: DECOMPOSE_SYSTEM_PROMPT,
        user: format!(
            "Split this claim into at most {} verifiable sub-claims. \
             Reply with a JSON list of strings only.\n\nClaim: {}",
            max_sub_claims, claim
        ),
    }
}

pub fn synthesis_prompt(claim: &str, bundles: &[SubClaimBundle]) -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT,
        user: format!(
            "Claim: {}\n\nSub-claims and search results:\n{}\n\nAnalyze these results and reply with the findings JSON.",
            claim,
            prompt_json(bundles, PROMPT_BUDGET)
        ),
    }
}

/// Sub-claims from the decomposition reply, falling back to the claim itself
pub fn sub_claims_from_reply(reply: &str, claim: &str, max_sub_claims: usize) -> Vec<String> {
    match parse_string_list(reply) {
        Some(mut sub_claims) if max_sub_claims > 0 => {
            sub_claims.truncate(max_sub_claims);
            sub_claims
        }
        _ => vec![claim.to_string()],
    }
}

async fn decompose(ctx: &StageContext<'_>, claim: &str) -> Result<Vec<String>, GenerationError> {
    let max_sub_claims = ctx.config.max_sub_claims;
    let prompt = decomposition_prompt(claim, max_sub_claims);
    let reply = ctx.client.call(prompt.system, &prompt.user).await?;
    Ok(sub_claims_from_reply(&reply, claim, max_sub_claims))
}

async fn gather(ctx: &StageContext<'_>, sub_claim: &str) -> SubClaimBundle {
    let emitter = ctx.emitter(StageName::Research);
    emitter.log(format!("Searching: \"{}\"...", truncate_chars(sub_claim, 60)));

    let results = ctx
        .evidence_source
        .search(sub_claim, ctx.config.results_per_query)
        .await;
    emitter.log(format!("Found {} results", results.len()));

    let mut search_results: Vec<SourceBundle> = results.into_iter().map(SourceBundle::from).collect();
    for source in search_results
        .iter_mut()
        .filter(|s| !s.url.is_empty())
        .take(ctx.config.fetch_top_n)
    {
        let text = ctx.evidence_source.fetch(&source.url).await;
        if !text.is_empty() {
            source.fetched_content = Some(truncate_chars(&text, FETCHED_TEXT_CHARS));
        } else {
            debug!(url = %source.url, "No page text");
        }
    }

    SubClaimBundle {
        sub_claim: sub_claim.to_string(),
        search_results,
    }
}

/// Run the research stage for the (possibly refined) working claim
pub async fn run(ctx: &StageContext<'_>, working_claim: &str) -> Result<ResearchReport, GenerationError> {
    let emitter = ctx.emitter(StageName::Research);

    emitter.log("Breaking claim into sub-claims...");
    let sub_claims = decompose(ctx, working_claim).await?;
    emitter.log(format!("Found {} sub-claims", sub_claims.len()));

    let mut bundles = Vec::with_capacity(sub_claims.len());
    for sub_claim in &sub_claims {
        bundles.push(gather(ctx, sub_claim).await);
    }

    emitter.log("Synthesizing findings...");
    let prompt = synthesis_prompt(working_claim, &bundles);
    let reply = ctx.generate(StageName::Research, &prompt).await?;

    let mut report = into_record(
        parse_reply(StageName::Research, &reply),
        ResearchReport::from_value,
        ResearchReport::unparsed,
    );
    if report.sub_claims.is_empty() {
        report.sub_claims = sub_claims;
    }

    info!(
        sub_claims = report.sub_claims.len(),
        evidence = report.evidence_count(),
        "Research complete"
    );
    Ok(report)
}
