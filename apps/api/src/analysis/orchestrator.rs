//! Analysis run — evaluate, optimize, then re-evaluate the optimized CV.
//!
//! Flow: prepare_run (validation, no provider call) → evaluate(original) →
//!       optimize(original) → evaluate(optimized) → AnalysisResult.
//!
//! The three calls run strictly in sequence and the run never short-circuits:
//! when a step fails, its rendered error text stands in for the artifact and later
//! steps still run. In particular the final evaluation is then asked to score
//! the error text as if it were the optimized CV.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::prompts::{build_evaluation_prompt, build_optimization_prompt};
use crate::errors::AppError;
use crate::llm_client::{complete, render_completion, CompletionProvider};
use crate::session::credential::Credential;
use crate::session::experience::ExperienceStore;

pub const TEXT_PLAIN: &str = "text/plain";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One of the three text outputs of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    InitialEvaluation,
    OptimizedCv,
    FinalEvaluation,
}

impl Artifact {
    /// Download order, as offered to the user.
    pub const DOWNLOADS: [Artifact; 3] = [
        Artifact::OptimizedCv,
        Artifact::InitialEvaluation,
        Artifact::FinalEvaluation,
    ];

    pub fn filename(self) -> &'static str {
        match self {
            Artifact::InitialEvaluation => "evaluation_initiale.txt",
            Artifact::OptimizedCv => "cv_optimise.txt",
            Artifact::FinalEvaluation => "evaluation_finale.txt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Artifact::InitialEvaluation => "Évaluation Initiale",
            Artifact::OptimizedCv => "CV Optimisé",
            Artifact::FinalEvaluation => "Évaluation Finale",
        }
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        Self::DOWNLOADS.into_iter().find(|a| a.filename() == name)
    }
}

/// Everything a run needs, snapshotted from the session when the run starts.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub credential: Credential,
    pub cv_text: String,
    pub job_description: String,
}

/// The three artifacts of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub initial_evaluation: String,
    pub optimized_cv: String,
    pub final_evaluation: String,
    /// Steps whose provider call failed; their artifact holds the rendered error.
    pub failed_steps: Vec<Artifact>,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn artifact(&self, artifact: Artifact) -> &str {
        match artifact {
            Artifact::InitialEvaluation => &self.initial_evaluation,
            Artifact::OptimizedCv => &self.optimized_cv,
            Artifact::FinalEvaluation => &self.final_evaluation,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Validates a run request. No provider call is made when this fails.
pub fn prepare_run(
    credential: Option<&Credential>,
    store: &ExperienceStore,
    job_description: &str,
) -> Result<RunInput, AppError> {
    let credential = credential.ok_or(AppError::CredentialRequired)?;

    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Veuillez coller une offre d'emploi".to_string(),
        ));
    }

    if store.is_empty() {
        return Err(AppError::Validation(
            "Veuillez ajouter au moins une expérience".to_string(),
        ));
    }

    Ok(RunInput {
        credential: credential.clone(),
        cv_text: store.format_all(),
        job_description: job_description.to_string(),
    })
}

/// Runs the three completion calls in order. Always returns three artifacts.
pub async fn run_analysis(provider: &dyn CompletionProvider, input: &RunInput) -> AnalysisResult {
    let run_id = Uuid::new_v4();
    let mut failed_steps = Vec::new();
    info!("Analysis run {run_id} started");

    let initial_evaluation = run_step(
        provider,
        &input.credential,
        Artifact::InitialEvaluation,
        build_evaluation_prompt(&input.cv_text, &input.job_description),
        &mut failed_steps,
    )
    .await;

    let optimized_cv = run_step(
        provider,
        &input.credential,
        Artifact::OptimizedCv,
        build_optimization_prompt(&input.cv_text, &input.job_description),
        &mut failed_steps,
    )
    .await;

    let final_evaluation = run_step(
        provider,
        &input.credential,
        Artifact::FinalEvaluation,
        build_evaluation_prompt(&optimized_cv, &input.job_description),
        &mut failed_steps,
    )
    .await;

    info!(
        "Analysis run {run_id} finished ({} of 3 steps failed)",
        failed_steps.len()
    );

    AnalysisResult {
        run_id,
        initial_evaluation,
        optimized_cv,
        final_evaluation,
        failed_steps,
        completed_at: Utc::now(),
    }
}

async fn run_step(
    provider: &dyn CompletionProvider,
    credential: &Credential,
    artifact: Artifact,
    prompt: String,
    failed_steps: &mut Vec<Artifact>,
) -> String {
    info!("Requesting {}", artifact.label());
    let result = complete(provider, credential, &prompt).await;
    if let Err(e) = &result {
        warn!("{} failed: {e}", artifact.label());
        failed_steps.push(artifact);
    }
    render_completion(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{FailingProvider, ScriptedProvider};
    use crate::llm_client::PROVIDER_ERROR_PREFIX;

    const JOB: &str = "Seeking a data analyst";

    fn analyst_store() -> ExperienceStore {
        let mut store = ExperienceStore::new();
        store.add("Analyst", "Built reports", "2020-2022").unwrap();
        store
    }

    fn credential() -> Credential {
        Credential::parse("sk-test").unwrap()
    }

    #[test]
    fn test_prepare_run_requires_credential() {
        let result = prepare_run(None, &analyst_store(), JOB);
        assert!(matches!(result, Err(AppError::CredentialRequired)));
    }

    #[test]
    fn test_prepare_run_rejects_empty_job_description() {
        let credential = credential();
        for job in ["", "  \n"] {
            let result = prepare_run(Some(&credential), &analyst_store(), job);
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_prepare_run_rejects_empty_store() {
        let credential = credential();
        let result = prepare_run(Some(&credential), &ExperienceStore::new(), JOB);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_prepare_run_snapshots_flattened_cv() {
        let credential = credential();
        let input = prepare_run(Some(&credential), &analyst_store(), JOB).unwrap();
        assert_eq!(input.cv_text, "Analyst (2020-2022)\nBuilt reports\n");
        assert_eq!(input.job_description, JOB);
    }

    #[test]
    fn test_artifact_filenames_round_trip() {
        assert_eq!(
            Artifact::from_filename("cv_optimise.txt"),
            Some(Artifact::OptimizedCv)
        );
        assert_eq!(
            Artifact::from_filename("evaluation_initiale.txt"),
            Some(Artifact::InitialEvaluation)
        );
        assert_eq!(
            Artifact::from_filename("evaluation_finale.txt"),
            Some(Artifact::FinalEvaluation)
        );
        assert_eq!(Artifact::from_filename("cv.pdf"), None);
    }

    #[tokio::test]
    async fn test_run_issues_evaluate_optimize_evaluate_in_order() {
        let provider = ScriptedProvider::new(&["Note : 55/100", "CV OPTIMISÉ", "Note : 80/100"]);
        let input = prepare_run(Some(&credential()), &analyst_store(), JOB).unwrap();

        let result = run_analysis(&provider, &input).await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], build_evaluation_prompt(&input.cv_text, JOB));
        assert_eq!(calls[1], build_optimization_prompt(&input.cv_text, JOB));
        assert_eq!(calls[2], build_evaluation_prompt("CV OPTIMISÉ", JOB));

        assert_eq!(result.initial_evaluation, "Note : 55/100");
        assert_eq!(result.optimized_cv, "CV OPTIMISÉ");
        assert_eq!(result.final_evaluation, "Note : 80/100");
        assert!(result.failed_steps.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_does_not_short_circuit() {
        let provider = FailingProvider::default();
        let input = prepare_run(Some(&credential()), &analyst_store(), JOB).unwrap();

        let result = run_analysis(&provider, &input).await;

        assert_eq!(provider.calls().len(), 3);
        for artifact in Artifact::DOWNLOADS {
            assert!(result.artifact(artifact).starts_with(PROVIDER_ERROR_PREFIX));
        }
        assert_eq!(
            result.failed_steps,
            vec![
                Artifact::InitialEvaluation,
                Artifact::OptimizedCv,
                Artifact::FinalEvaluation
            ]
        );
        // The final evaluation is asked to score the error text as the CV
        assert!(provider.calls()[2].contains(&result.optimized_cv));
    }
}
