//! The pipeline entry point.
//!
//! Sequences the stages for one document:
//!
//! 1. Cache lookup by content hash (concurrent misses share one run)
//! 2. Number disambiguation over the raw text
//! 3. Field extraction through the completion service
//! 4. Field validation against the disambiguated context
//! 5. Document-type classification
//! 6. Cost-table merge and financial derivation
//! 7. Contextual risk analysis (optional, never fatal)
//! 8. Cache write (never fatal)

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::cache::{content_hash, ResultCache};
use crate::error::{ExtractionError, Result};
use crate::pipeline::classify::classify_document;
use crate::pipeline::cost_table::merge_cost_tables;
use crate::pipeline::disambiguate::disambiguate;
use crate::pipeline::financial::{derive, FinancialInputs};
use crate::pipeline::parse::{parse_contextual_analysis, parse_extraction};
use crate::pipeline::prompts::{
    format_contextual_analysis_prompt, format_extraction_prompt, SYSTEM_PROMPT,
};
use crate::pipeline::validate::{validate, ValidationOutcome};
use crate::traits::clock::{Clock, SystemClock};
use crate::traits::completion::{CompletionPurpose, CompletionRequest, CompletionService};
use crate::types::classification::{DocumentClassification, DocumentType, TypeGuess};
use crate::types::config::PipelineConfig;
use crate::types::context::ContextualAnalysis;
use crate::types::cost_table::CostTable;
use crate::types::record::{ExtractionRecord, RawExtraction};
use crate::types::warning::{RecordField, Severity, ValidationWarning};

/// One document to process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineInput {
    /// Full document text, already converted from PDF/DOCX/CSV.
    pub text: String,

    /// Original filename, used as a document-type signal.
    pub filename: Option<String>,

    /// Parsed cost-table analyses supplied alongside the document.
    pub cost_tables: Vec<Value>,
}

impl PipelineInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_cost_table(mut self, analysis: Value) -> Self {
        self.cost_tables.push(analysis);
        self
    }
}

/// Turns document text into validated, financially annotated records.
///
/// # Example
///
/// ```rust,ignore
/// use tender_extraction::{Pipeline, PipelineInput};
/// use tender_extraction::testing::MockCompletion;
///
/// let pipeline = Pipeline::new(MockCompletion::new());
/// let record = pipeline.run(PipelineInput::new(text).with_filename("Teknik_Sartname.pdf")).await?;
/// ```
pub struct Pipeline<C: CompletionService> {
    completion: Arc<C>,
    config: PipelineConfig,
    cache: Arc<ResultCache>,
    clock: Arc<dyn Clock>,
}

impl<C: CompletionService> Pipeline<C> {
    /// Create a pipeline with default configuration.
    pub fn new(completion: C) -> Self {
        Self::with_config(completion, PipelineConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(completion: C, config: PipelineConfig) -> Self {
        let cache = Arc::new(ResultCache::from_config(&config));
        Self {
            completion: Arc::new(completion),
            config,
            cache,
            clock: Arc::new(SystemClock),
        }
    }

    /// Share a cache between pipelines, or supply one with a test clock.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Time source for `processed_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Process one document.
    ///
    /// Identical texts are served from the cache; concurrent requests for
    /// the same text share a single upstream extraction. The filename and
    /// cost tables are applied per request, so a cached record reached
    /// with different auxiliary inputs comes back as a new record.
    #[instrument(skip(self, input), fields(filename = ?input.filename, text_len = input.text.len()))]
    pub async fn run(&self, input: PipelineInput) -> Result<ExtractionRecord> {
        let key = content_hash(&input.text);
        let cost_table = merge_cost_tables(&input.cost_tables)?;

        let mut record = self
            .cache
            .get_or_compute(&key, || {
                self.extract(&key, &input.text, input.filename.as_deref(), cost_table.clone())
            })
            .await?;

        // the cache key is the text alone
        let (document, document_warnings) = self.classify(
            input.filename.as_deref(),
            &input.text,
            record.document.completion_guess.clone(),
        );
        if document != record.document {
            debug!(key = %key, doc_type = %document.doc_type, "document reclassified for this filename");
            record
                .warnings
                .retain(|w| w.field != RecordField::DocumentType);
            record.warnings.extend(document_warnings);
            record.document = document;
        }

        if record.cost_table != cost_table {
            debug!(key = %key, "cost tables differ from the cached record");
            record.cost_table = cost_table;
        }
        Ok(record)
    }

    /// Run every stage for a cache miss.
    async fn extract(
        &self,
        key: &str,
        text: &str,
        filename: Option<&str>,
        cost_table: Option<CostTable>,
    ) -> Result<ExtractionRecord> {
        let started = Instant::now();

        let context = disambiguate(text);
        debug!(
            personnel = ?context.personnel_numbers,
            recipients = ?context.recipient_numbers,
            ambiguous = ?context.ambiguous_numbers,
            "disambiguated head counts"
        );

        let prompt = format_extraction_prompt(text, filename, &context);
        let reply = self
            .call(CompletionRequest::new(
                CompletionPurpose::FieldExtraction,
                SYSTEM_PROMPT,
                prompt,
            ))
            .await?;
        let raw = parse_extraction(&reply)?;

        let ValidationOutcome {
            fields,
            mut warnings,
        } = validate(&raw, &context, &self.config)?;

        let (document, document_warnings) = self.classify(filename, text, completion_guess(&raw));
        warnings.extend(document_warnings);

        let financial = derive(
            &FinancialInputs {
                headcount: fields.headcount,
                meals_per_day: fields.meals_per_day,
                days: fields.days,
                budget: fields.budget,
                sample_menu: &fields.sample_menu,
                special_conditions: &fields.special_conditions,
            },
            &self.config.financial(),
        );

        let mut record = ExtractionRecord {
            content_hash: key.to_string(),
            institution: fields.institution,
            tender_type: fields.tender_type,
            headcount: fields.headcount,
            staff_count: fields.staff_count,
            meals_per_day: fields.meals_per_day,
            days: fields.days,
            budget: fields.budget,
            delivery_duration: fields.delivery_duration,
            tender_duration: fields.tender_duration,
            tender_date: fields.tender_date,
            bid_deadline: fields.bid_deadline,
            sample_menu: fields.sample_menu,
            special_conditions: fields.special_conditions,
            risks: fields.risks,
            evidence: fields.evidence,
            confidence: fields.confidence,
            document,
            warnings,
            financial: Some(financial),
            cost_table,
            contextual_analysis: None,
            processed_at: self.clock.now(),
        };

        if self.config.run_contextual_analysis {
            self.attach_analysis(&mut record).await;
        }

        info!(
            key = %key,
            doc_type = %record.document.doc_type,
            headcount = ?record.headcount,
            verdict = ?record.financial.as_ref().and_then(|f| f.verdict),
            warnings = record.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extraction complete"
        );

        Ok(record)
    }

    /// Classify the document and reconcile with the type the reply proposed.
    fn classify(
        &self,
        filename: Option<&str>,
        text: &str,
        proposed: Option<TypeGuess>,
    ) -> (DocumentClassification, Vec<ValidationWarning>) {
        let mut document = classify_document(filename, text, self.config.content_scan_chars);
        let mut warnings = Vec::new();

        if let Some(guess) = proposed.as_ref().filter(|g| g.doc_type != document.doc_type) {
            let proposed = guess.doc_type;
            if document.doc_type.is_determined() {
                warnings.push(ValidationWarning::flagged(
                    RecordField::DocumentType,
                    Severity::Info,
                    format!(
                        "completion proposed {proposed}, classifiers found {}",
                        document.doc_type
                    ),
                    json!(proposed.code()),
                ));
            } else {
                warnings.push(ValidationWarning::fixed(
                    RecordField::DocumentType,
                    Severity::Info,
                    "classifiers undetermined, document type taken from completion reply",
                    json!(document.doc_type.code()),
                    json!(proposed.code()),
                ));
                document.doc_type = proposed;
                document.confidence = guess.confidence;
            }
        }

        document.completion_guess = proposed;
        (document, warnings)
    }

    /// Attach the qualitative risk narrative, or a warning saying why not.
    async fn attach_analysis(&self, record: &mut ExtractionRecord) {
        // nothing useful can be said without knowing who is buying what
        let message = if record.institution.is_none() || record.tender_type.is_none() {
            "contextual analysis skipped: institution and tender type are required".to_string()
        } else {
            match self.analyze(record).await {
                Ok(analysis) => {
                    record.contextual_analysis = Some(analysis);
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "contextual analysis failed; continuing without it");
                    format!("contextual analysis unavailable: {err}")
                }
            }
        };

        record.warnings.push(ValidationWarning::flagged(
            RecordField::ContextualAnalysis,
            Severity::Info,
            message,
            Value::Null,
        ));
    }

    /// Ask for the qualitative risk narrative.
    async fn analyze(&self, record: &ExtractionRecord) -> Result<ContextualAnalysis> {
        let record_json = serde_json::to_string_pretty(record)?;
        let reply = self
            .call(CompletionRequest::new(
                CompletionPurpose::ContextualAnalysis,
                SYSTEM_PROMPT,
                format_contextual_analysis_prompt(&record_json),
            ))
            .await?;
        parse_contextual_analysis(&reply)
    }

    async fn call(&self, request: CompletionRequest) -> Result<String> {
        let purpose = request.purpose;
        let started = Instant::now();

        let reply = match self.config.completion_timeout_secs {
            Some(secs) => {
                tokio::time::timeout(Duration::from_secs(secs), self.completion.complete(request))
                    .await
                    .map_err(|_| {
                        ExtractionError::completion(format!(
                            "{purpose:?} timed out after {secs}s"
                        ))
                    })?
            }
            None => self.completion.complete(request).await,
        };

        debug!(
            service = self.completion.name(),
            purpose = ?purpose,
            ok = reply.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion call finished"
        );
        reply
    }
}

/// The reply's own `belge_turu`, when it names a known type.
fn completion_guess(raw: &RawExtraction) -> Option<TypeGuess> {
    let doc_type = DocumentType::from_code(raw.document_type.as_deref()?);
    let confidence = raw
        .document_type_confidence
        .filter(|c| c.is_finite())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);
    doc_type.is_determined().then(|| TypeGuess {
        doc_type,
        confidence,
        matched: vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;
    use crate::traits::completion::MockCompletionService;
    use crate::types::financial::Verdict;

    const NOTICE: &str = "İHALE İLANI. Ankara Üniversitesi yemek hizmeti alımı açık ihale usulü ile \
        ihale edilecektir. İhale kayıt numarası 2025/123456. Günlük 500 kişi için yemek hazırlanacak. \
        Teklifler ihale tarihi ve saatine kadar sunulacaktır.";

    fn extraction_reply() -> &'static str {
        r#"```json
        {
            "kurum": "Ankara Üniversitesi",
            "ihale_turu": "Açık İhale",
            "kisi_sayisi": 500,
            "ogun_sayisi": 3,
            "gun_sayisi": 365,
            "tahmini_butce": "15.000.000 TL",
            "belge_turu": "ihale_ilani",
            "guven_skoru": 0.92
        }
        ```"#
    }

    fn mock() -> MockCompletion {
        MockCompletion::new()
            .with_reply(CompletionPurpose::FieldExtraction, extraction_reply())
            .with_failure(CompletionPurpose::ContextualAnalysis, "not configured")
    }

    #[tokio::test]
    async fn test_run_builds_annotated_record() {
        let pipeline = Pipeline::new(mock());
        let record = pipeline
            .run(PipelineInput::new(NOTICE).with_filename("Ihale_Ilani.pdf"))
            .await
            .unwrap();

        assert_eq!(record.headcount, Some(500));
        assert_eq!(record.budget, Some(15_000_000.0));
        assert_eq!(record.document.doc_type, DocumentType::TenderNotice);

        let financial = record.financial.as_ref().unwrap();
        assert_eq!(financial.unit_price, Some(27.40));
        assert_eq!(financial.verdict, Some(Verdict::Proceed));

        // analysis failure is recorded, not raised
        assert!(record.contextual_analysis.is_none());
        assert!(record
            .warnings
            .iter()
            .any(|w| w.field == RecordField::ContextualAnalysis));
    }

    #[tokio::test]
    async fn test_analysis_disabled_makes_one_call() {
        let mut completion = MockCompletionService::new();
        completion
            .expect_complete()
            .withf(|request| request.purpose == CompletionPurpose::FieldExtraction)
            .times(1)
            .returning(|_| Ok(extraction_reply().to_string()));
        completion.expect_name().return_const("mock".to_string());

        let config = PipelineConfig::default().with_contextual_analysis(false);
        let pipeline = Pipeline::with_config(completion, config);

        let first = pipeline.run(PipelineInput::new(NOTICE)).await.unwrap();
        let second = pipeline.run(PipelineInput::new(NOTICE)).await.unwrap();
        assert_eq!(first, second);
        assert!(first.contextual_analysis.is_none());
        assert_eq!(pipeline.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_cached_record_is_reclassified_per_filename() {
        // too short for the content scorer, so the filename decides
        let text = "Günlük 500 kişiye üç öğün yemek verilecektir.";
        let completion = mock();
        let pipeline = Pipeline::new(completion.clone());
        let run = |filename: Option<&'static str>| {
            let mut input = PipelineInput::new(text);
            input.filename = filename.map(str::to_string);
            pipeline.run(input)
        };

        let technical = run(Some("Teknik_Sartname.pdf")).await.unwrap();
        assert_eq!(technical.document.doc_type, DocumentType::TechnicalSpecification);

        let contract = run(Some("Sozlesme_Tasarisi.pdf")).await.unwrap();
        assert_eq!(contract.document.doc_type, DocumentType::ContractDraft);
        assert_eq!(
            contract
                .warnings
                .iter()
                .filter(|w| w.field == RecordField::DocumentType)
                .count(),
            1
        );

        // no filename: the reply's own proposal is still available
        let unnamed = run(None).await.unwrap();
        assert_eq!(unnamed.document.doc_type, DocumentType::TenderNotice);
        assert!(unnamed
            .warnings
            .iter()
            .any(|w| w.field == RecordField::DocumentType && w.auto_fixed));

        assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 1);
        assert_eq!(contract.headcount, technical.headcount);
    }

    #[tokio::test]
    async fn test_timeout_is_a_completion_failure() {
        let completion = mock().with_delay(Duration::from_millis(200));
        let config = PipelineConfig::default().with_completion_timeout_secs(0);
        let pipeline = Pipeline::with_config(completion, config);

        let err = pipeline.run(PipelineInput::new(NOTICE)).await.unwrap_err();
        assert!(err.is_upstream_failure());
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_cost_table_fails_before_completion() {
        let completion = mock();
        let pipeline = Pipeline::new(completion.clone());

        let err = pipeline
            .run(PipelineInput::new(NOTICE).with_cost_table(json!({"rows": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidCostTable { index: 0, .. }));
        assert!(completion.calls().is_empty());
    }
}
