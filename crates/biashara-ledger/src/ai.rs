//! # AI Text Flows
//!
//! Typed contracts for the optional text flows. The model itself sits
//! behind [`TextCompletion`]; this module only fixes what goes in and what
//! must come back.
//!
//! ## Flow Contracts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Flow                     Input                     Output              │
//! │  ───────────────────────  ────────────────────────  ─────────────────── │
//! │  translation              {text, targetLanguage,    {translatedText}    │
//! │                            sourceLanguage?}                             │
//! │  report_generation        {financialReport,         {summary, factors[],│
//! │                            context?}                 recommendations[]} │
//! │  discrepancy_explanation  {financialReport,         {explanation,       │
//! │                            discrepancy,              likelyCauses[]}    │
//! │                            expected?, actual?}                          │
//! │  root_cause_analysis      {financialReport,         {rootCauses[],      │
//! │                            problem, context?}        recommendations[]} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `financialReport` is always the plain-text rendering of
//! [`FinancialReport`]: the flows read projected data, never the log.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use biashara_core::FinancialReport;

use crate::error::{LedgerError, LedgerResult};

/// Opaque text-completion service (a hosted language model).
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Fills `template` with `input` and returns the structured answer.
    async fn complete(&self, template: &str, input: Value) -> Result<Value, String>;
}

/// A flow: fixed prompt template plus input/output schemas.
pub trait AiFlow {
    const NAME: &'static str;
    const TEMPLATE: &'static str;

    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned;

    /// Rejects well-formed output that is still unusable.
    fn check(_output: &Self::Output) -> Result<(), String> {
        Ok(())
    }
}

/// Runs a flow against a completion service.
///
/// ## Errors
/// `LedgerError::Ai` if the service fails or its answer does not match the
/// flow's output schema.
pub async fn run_flow<F: AiFlow>(
    service: &dyn TextCompletion,
    input: &F::Input,
) -> LedgerResult<F::Output> {
    let input = serde_json::to_value(input).map_err(|e| LedgerError::ai(F::NAME, e.to_string()))?;
    debug!(flow = F::NAME, "Running AI flow");

    let raw = service.complete(F::TEMPLATE, input).await.map_err(|e| {
        warn!(flow = F::NAME, error = %e, "AI completion failed");
        LedgerError::ai(F::NAME, e)
    })?;

    let output: F::Output = serde_json::from_value(raw)
        .map_err(|e| LedgerError::ai(F::NAME, format!("unexpected output: {}", e)))?;
    F::check(&output).map_err(|e| LedgerError::ai(F::NAME, e))?;
    Ok(output)
}

// =============================================================================
// Translation
// =============================================================================

pub struct Translation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInput {
    pub text: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutput {
    pub translated_text: String,
}

impl AiFlow for Translation {
    const NAME: &'static str = "translation";
    const TEMPLATE: &'static str = "Translate the following text into {{targetLanguage}}. \
Keep numbers, currency amounts and product names unchanged.\n\n{{text}}";

    type Input = TranslationInput;
    type Output = TranslationOutput;

    fn check(output: &TranslationOutput) -> Result<(), String> {
        if output.translated_text.trim().is_empty() {
            return Err("empty translation".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Report Generation
// =============================================================================

pub struct ReportGeneration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGenerationInput {
    pub financial_report: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ReportGenerationInput {
    pub fn new(report: &FinancialReport, context: Option<String>) -> Self {
        ReportGenerationInput {
            financial_report: report.render(),
            context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGenerationOutput {
    pub summary: String,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AiFlow for ReportGeneration {
    const NAME: &'static str = "report_generation";
    const TEMPLATE: &'static str = "You are advising the owner of a small business. \
Summarise the financial report below, list the main factors behind the result \
and give practical recommendations.\n\n{{financialReport}}\n\n{{context}}";

    type Input = ReportGenerationInput;
    type Output = ReportGenerationOutput;

    fn check(output: &ReportGenerationOutput) -> Result<(), String> {
        if output.summary.trim().is_empty() {
            return Err("empty summary".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Discrepancy Explanation
// =============================================================================

pub struct DiscrepancyExplanation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscrepancyInput {
    pub financial_report: String,
    /// What looks wrong, in the user's words.
    pub discrepancy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscrepancyOutput {
    pub explanation: String,
    #[serde(default)]
    pub likely_causes: Vec<String>,
}

impl AiFlow for DiscrepancyExplanation {
    const NAME: &'static str = "discrepancy_explanation";
    const TEMPLATE: &'static str = "A business owner reports a discrepancy: \
{{discrepancy}} (expected {{expected}}, found {{actual}}). Using the financial \
report below, explain what most likely happened.\n\n{{financialReport}}";

    type Input = DiscrepancyInput;
    type Output = DiscrepancyOutput;
}

// =============================================================================
// Root-Cause Analysis
// =============================================================================

pub struct RootCauseAnalysis;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCauseInput {
    pub financial_report: String,
    pub problem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCauseOutput {
    pub root_causes: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AiFlow for RootCauseAnalysis {
    const NAME: &'static str = "root_cause_analysis";
    const TEMPLATE: &'static str = "Identify the root causes of the following \
business problem using the financial report.\n\nProblem: {{problem}}\n\n\
{{financialReport}}\n\n{{context}}";

    type Input = RootCauseInput;
    type Output = RootCauseOutput;

    fn check(output: &RootCauseOutput) -> Result<(), String> {
        if output.root_causes.is_empty() {
            return Err("no root causes returned".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
