//! Integration tests for the full extraction pipeline.
//!
//! These run every stage against a mock completion service:
//! 1. Disambiguate head counts in the text
//! 2. Validate the proposed fields
//! 3. Derive financial annotations
//! 4. Cache, coalesce and expire records

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tender_extraction::{
    testing::MockCompletion, CompletionPurpose, ExtractionError, ManualClock, Pipeline,
    PipelineConfig, PipelineInput, RecordField, ResultCache, RiskLevel, Severity,
};
use tokio_test::{assert_err, assert_ok};

const MEAL_TOTAL_TEXT: &str =
    "Kurum için 260.000 öğün, 365 gün, günde 3 öğün yemek hizmeti alınacaktır.";

const STAFF_TEXT: &str =
    "Yemekler 8 personel (1 aşçıbaşı, 3 aşçı, 2 garson) tarafından hazırlanacaktır.";

const FACILITY_TEXT: &str = "1. Kısım - Huzurevi: 150 kişi, 2. Kısım - Çocuk Evi: 80 kişi, \
    3. Kısım - Kadın Konukevi: 45 kişi";

const ANALYSIS_REPLY: &str = r#"{
    "operasyonel_riskler": {"seviye": "orta", "faktorler": ["mevsimsel fiyatlar"], "oneriler": []},
    "maliyet_sapma_olasiligi": {"oran": 20, "sebepler": ["gıda enflasyonu"], "onlem_oneriler": []},
    "zaman_uygunlugu": {"durum": "yeterli", "aciklama": "Hazırlık süresi yeterli."},
    "genel_oneri": "Şartlı katılım önerilir."
}"#;

/// Helper to build a field-extraction reply.
fn extraction_reply(headcount: Value) -> String {
    json!({
        "kurum": "Aile ve Sosyal Hizmetler İl Müdürlüğü",
        "ihale_turu": "Açık İhale",
        "kisi_sayisi": headcount,
        "ogun_sayisi": 3,
        "gun_sayisi": 365,
        "tahmini_butce": null,
        "ornek_menu_basliklari": ["Etli Kuru Fasulye", "Pilav"],
        "guven_skoru": 0.85
    })
    .to_string()
}

fn mock(headcount: Value) -> MockCompletion {
    MockCompletion::new()
        .with_reply(CompletionPurpose::FieldExtraction, extraction_reply(headcount))
        .with_reply(CompletionPurpose::ContextualAnalysis, ANALYSIS_REPLY)
}

#[tokio::test]
async fn test_total_meal_count_becomes_headcount() {
    let pipeline = Pipeline::new(mock(json!(260_000)));
    let record = pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();

    assert_eq!(record.headcount, Some(237));
    let fix = record
        .warnings
        .iter()
        .find(|w| w.field == RecordField::Headcount && w.auto_fixed)
        .expect("headcount correction");
    assert_eq!(fix.original_value, json!(260_000));
    assert_eq!(fix.suggested_value, Some(json!(237)));

    // no budget: the verdict stays open
    let financial = record.financial.as_ref().unwrap();
    assert_eq!(financial.verdict, None);
    assert_eq!(financial.protein_dependency_risk, RiskLevel::High);

    assert!(record.contextual_analysis.is_some());
}

#[tokio::test]
async fn test_staff_count_is_never_a_headcount() {
    let pipeline = Pipeline::new(mock(json!(8)));
    let record = pipeline.run(PipelineInput::new(STAFF_TEXT)).await.unwrap();

    assert_eq!(record.headcount, None);
    assert_eq!(record.staff_count, Some(6));
    assert!(record
        .warnings
        .iter()
        .any(|w| w.field == RecordField::Headcount && w.auto_fixed));
}

#[tokio::test]
async fn test_facility_counts_are_summed() {
    let pipeline = Pipeline::new(mock(Value::Null));
    let record = pipeline.run(PipelineInput::new(FACILITY_TEXT)).await.unwrap();

    assert_eq!(record.headcount, Some(275));
    assert!(record.evidence["headcount_aggregation"].starts_with("150 + 80 + 45 = 275"));
}

#[tokio::test]
async fn test_idempotent_without_cache() {
    let pipeline = Pipeline::new(mock(json!(260_000)));

    let first = pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    pipeline.cache().clear();
    let mut second = pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();

    second.processed_at = first.processed_at;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_extraction() {
    let completion = mock(json!(260_000)).with_delay(Duration::from_millis(100));
    let pipeline = Arc::new(Pipeline::new(completion.clone()));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap().headcount, Some(237));
    }
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 1);
    assert_eq!(completion.call_count(CompletionPurpose::ContextualAnalysis), 1);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let completion = mock(json!(260_000))
        .with_failure(CompletionPurpose::FieldExtraction, "service unavailable");
    let pipeline = Pipeline::new(completion.clone());

    let err = assert_err!(pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await);
    assert!(matches!(err, ExtractionError::Completion(_)));
    assert!(pipeline.cache().is_empty());

    completion.clear_failure(CompletionPurpose::FieldExtraction);
    let record = assert_ok!(pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await);
    assert_eq!(record.headcount, Some(237));
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 2);
}

#[tokio::test]
async fn test_reply_errors_are_fatal() {
    let completion = MockCompletion::new()
        .with_reply(CompletionPurpose::FieldExtraction, "Bu belgeyi okuyamadım.");
    let pipeline = Pipeline::new(completion.clone());
    let err = assert_err!(pipeline.run(PipelineInput::new(STAFF_TEXT)).await);
    assert!(matches!(err, ExtractionError::MalformedResponse { .. }));

    completion.set_reply(CompletionPurpose::FieldExtraction, r#"{"kisi_sayisi": 500}"#);
    let err = pipeline.run(PipelineInput::new(STAFF_TEXT)).await.unwrap_err();
    assert!(matches!(err, ExtractionError::MissingConfidence));
}

#[tokio::test]
async fn test_cached_records_expire() {
    let clock = ManualClock::default();
    let cache = Arc::new(ResultCache::new(10, 60).with_clock(Arc::new(clock.clone())));
    let completion = mock(json!(260_000));
    let pipeline = Pipeline::new(completion.clone()).with_cache(cache);

    pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 1);

    clock.advance(chrono::Duration::seconds(61));
    pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 2);
    assert_eq!(pipeline.cache().stats().expirations, 1);
}

#[tokio::test]
async fn test_least_recently_used_record_is_evicted() {
    let completion = mock(Value::Null);
    let config = PipelineConfig::default().with_cache_capacity(2);
    let pipeline = Pipeline::with_config(completion.clone(), config);
    let run = |text: &'static str| pipeline.run(PipelineInput::new(text));

    run(MEAL_TOTAL_TEXT).await.unwrap();
    run(STAFF_TEXT).await.unwrap();
    run(MEAL_TOTAL_TEXT).await.unwrap(); // hit, now most recent
    run(FACILITY_TEXT).await.unwrap(); // evicts STAFF_TEXT
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 3);

    run(MEAL_TOTAL_TEXT).await.unwrap();
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 3);

    run(STAFF_TEXT).await.unwrap();
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 4);
    assert_eq!(pipeline.cache().stats().evictions, 2);
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_record() {
    let completion = mock(json!(260_000));
    let config = PipelineConfig::default().with_cache_capacity(0);
    let pipeline = Pipeline::with_config(completion.clone(), config);

    let record = pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    assert_eq!(record.headcount, Some(237));
    assert!(pipeline.cache().is_empty());

    pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 2);
}

#[tokio::test]
async fn test_cost_tables_supersede_cached_record() {
    let completion = mock(json!(260_000));
    let pipeline = Pipeline::new(completion.clone());
    let analysis = json!({"items": [
        {"urun_adi": "Dana kuşbaşı", "miktar": 50, "birim": "kg", "birim_fiyat": 500, "toplam_fiyat": 25000, "kategori": "et"}
    ]});

    let plain = pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();
    let with_table = pipeline
        .run(PipelineInput::new(MEAL_TOTAL_TEXT).with_cost_table(analysis))
        .await
        .unwrap();

    assert!(plain.cost_table.is_none());
    let table = with_table.cost_table.as_ref().unwrap();
    assert_eq!(table.summary.total_cost, 25_000.0);
    assert_eq!(with_table.headcount, plain.headcount);
    assert_eq!(completion.call_count(CompletionPurpose::FieldExtraction), 1);
}

#[tokio::test]
async fn test_missing_analysis_inputs_skip_with_info() {
    let completion = MockCompletion::new().with_reply(
        CompletionPurpose::FieldExtraction,
        json!({"kisi_sayisi": 237, "ogun_sayisi": 3, "gun_sayisi": 365, "guven_skoru": 0.7})
            .to_string(),
    );
    let pipeline = Pipeline::new(completion.clone());
    let record = pipeline.run(PipelineInput::new(MEAL_TOTAL_TEXT)).await.unwrap();

    assert_eq!(completion.call_count(CompletionPurpose::ContextualAnalysis), 0);
    assert!(record.warnings.iter().any(|w| {
        w.field == RecordField::ContextualAnalysis && w.severity == Severity::Info
    }));
}
