//! Consensus arbitration
//!
//! Reconciles 2-3 judge verdicts into one [`ConsensusVerdict`]:
//! - computes deterministic agreement statistics (never trusts LLM
//!   arithmetic),
//! - prompts the arbiter to synthesize the judges' rationales,
//! - overwrites the LLM-produced numeric fields with the computed values,
//! - enforces the hard final-score range invariant.
//!
//! The arbiter never re-reads the original proposal; it only synthesizes
//! what the judges observed.

use crate::ports::llm_gateway::LlmGateway;
use crate::structured_output::{InvokeOptions, StructuredInvokeResult, StructuredOutputError, invoke_structured};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tribunal_domain::{
    ConsensusVerdict, DomainError, JudgeVerdict, PromptTemplate, RaterId, RaterScores,
    compute_agreement_stats,
};

const CONSENSUS_MAX_OUTPUT_TOKENS: u32 = 4000;
const CONSENSUS_SCHEMA_NAME: &str = "consensus_output";

/// Errors from consensus arbitration
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Consensus is undefined below 2 judges; the LLM is never called
    #[error("cannot run consensus with fewer than 2 judges (received {0})")]
    TooFewJudges(usize),

    #[error(transparent)]
    Extraction(#[from] StructuredOutputError),

    /// Hard invariant violations, including the final-score range check
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Input for the consensus arbiter
#[derive(Debug, Clone)]
pub struct ConsensusInput {
    /// Verdicts of the judges that succeeded, keyed by rater
    pub verdicts: BTreeMap<RaterId, JudgeVerdict>,
    /// Number of judges that did not complete
    pub missing_judge_count: usize,
}

/// Use case: reconcile judge verdicts into a consensus verdict
pub struct RunConsensusUseCase<G: LlmGateway> {
    gateway: Arc<G>,
}

impl<G: LlmGateway> RunConsensusUseCase<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Execute the arbiter
    ///
    /// # Errors
    ///
    /// Fails fast with [`ConsensusError::TooFewJudges`] below 2 verdicts.
    /// A final score outside the judges' range is an error, not a warning.
    pub async fn execute(
        &self,
        input: ConsensusInput,
    ) -> Result<StructuredInvokeResult<ConsensusVerdict>, ConsensusError> {
        let scores: Vec<u8> = input.verdicts.values().map(|v| v.overall_score).collect();
        if scores.len() < 2 {
            return Err(ConsensusError::TooFewJudges(scores.len()));
        }

        let stats = compute_agreement_stats(&scores)?;

        let ordered: Vec<(RaterId, &JudgeVerdict)> = input
            .verdicts
            .iter()
            .map(|(rater, verdict)| (*rater, verdict))
            .collect();
        let user_prompt = PromptTemplate::consensus_user(&ordered, input.missing_judge_count);

        let extraction = invoke_structured::<ConsensusVerdict>(
            &*self.gateway,
            InvokeOptions {
                system: PromptTemplate::arbiter_system().to_string(),
                user: user_prompt,
                max_output_tokens: Some(CONSENSUS_MAX_OUTPUT_TOKENS),
                schema_name: Some(CONSENSUS_SCHEMA_NAME.to_string()),
            },
        )
        .await?;

        let rater_scores = RaterScores {
            rater_a: input
                .verdicts
                .get(&RaterId::RaterA)
                .map(|v| v.overall_score),
            rater_b: input
                .verdicts
                .get(&RaterId::RaterB)
                .map(|v| v.overall_score),
            rater_c: input
                .verdicts
                .get(&RaterId::RaterC)
                .map(|v| v.overall_score),
        };

        // Only the qualitative synthesis is kept from the model output
        let verdict = extraction
            .result
            .with_computed_stats(rater_scores, &stats);

        verdict.validate()?;
        verdict.ensure_score_in_range(&scores)?;

        info!(
            final_score = verdict.final_score,
            agreement = %verdict.agreement.agreement_level,
            spread = verdict.agreement.spread,
            tier = extraction.tier.number(),
            total_tokens = extraction.usage.total_tokens,
            "consensus completed"
        );

        Ok(StructuredInvokeResult {
            result: verdict,
            tier: extraction.tier,
            usage: extraction.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedGateway, consensus_json};
    use tribunal_domain::{AgreementLevel, ItemReview};

    fn verdict(rater: RaterId, overall: u8) -> JudgeVerdict {
        JudgeVerdict {
            proposal_id: 1,
            evaluator_id: rater.evaluator_id(),
            evaluator_name: rater.label().to_string(),
            items: vec![ItemReview::new(1, "Reasonable.", overall)],
            overall_score: overall,
        }
    }

    fn input_with(pairs: &[(RaterId, u8)]) -> ConsensusInput {
        let verdicts: BTreeMap<RaterId, JudgeVerdict> = pairs
            .iter()
            .map(|(rater, score)| (*rater, verdict(*rater, *score)))
            .collect();
        ConsensusInput {
            missing_judge_count: 3 - verdicts.len(),
            verdicts,
        }
    }

    #[tokio::test]
    async fn test_too_few_judges_never_calls_llm() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let use_case = RunConsensusUseCase::new(Arc::clone(&gateway));

        let err = use_case
            .execute(input_with(&[(RaterId::RaterA, 4)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::TooFewJudges(1)));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stats_are_overwritten() {
        // consensus_json deliberately reports wrong stats
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ScriptedGateway::completed(
            &consensus_json(4),
        ))]));
        let use_case = RunConsensusUseCase::new(gateway);

        let result = use_case
            .execute(input_with(&[
                (RaterId::RaterA, 3),
                (RaterId::RaterB, 4),
                (RaterId::RaterC, 5),
            ]))
            .await
            .unwrap();

        let agreement = &result.result.agreement;
        assert_eq!(agreement.mean_score, 4.0);
        assert_eq!(agreement.median_score, 4);
        assert_eq!(agreement.spread, 2);
        assert_eq!(agreement.agreement_level, AgreementLevel::Moderate);
        assert_eq!(agreement.scores.rater_a, Some(3));
        assert_eq!(agreement.scores.rater_c, Some(5));
    }

    #[tokio::test]
    async fn test_missing_judge_reflected_in_scores_and_prompt() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ScriptedGateway::completed(
            &consensus_json(4),
        ))]));
        let use_case = RunConsensusUseCase::new(Arc::clone(&gateway));

        let result = use_case
            .execute(input_with(&[(RaterId::RaterA, 4), (RaterId::RaterC, 5)]))
            .await
            .unwrap();

        assert_eq!(result.result.agreement.scores.rater_b, None);
        let requests = gateway.requests();
        assert!(requests[0]
            .input
            .contains("1 judge(s) did not complete evaluation"));
    }

    #[tokio::test]
    async fn test_range_violation_is_an_error() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ScriptedGateway::completed(
            &consensus_json(2),
        ))]));
        let use_case = RunConsensusUseCase::new(gateway);

        let err = use_case
            .execute(input_with(&[(RaterId::RaterA, 4), (RaterId::RaterB, 5)]))
            .await
            .unwrap_err();

        match err {
            ConsensusError::Domain(e) => assert!(e.is_range_violation()),
            other => panic!("expected range violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stats_deterministic_across_runs() {
        let run = |final_score: u8| async move {
            let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ScriptedGateway::completed(
                &consensus_json(final_score),
            ))]));
            RunConsensusUseCase::new(gateway)
                .execute(input_with(&[
                    (RaterId::RaterA, 2),
                    (RaterId::RaterB, 3),
                    (RaterId::RaterC, 5),
                ]))
                .await
                .unwrap()
        };

        let first = run(3).await;
        let second = run(3).await;
        assert_eq!(first.result.agreement, second.result.agreement);
        assert_eq!(first.result.agreement.agreement_level, AgreementLevel::Weak);
    }
}
